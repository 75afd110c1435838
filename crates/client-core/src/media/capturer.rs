//! Video capture sources

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which camera a capturer reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraPosition {
    Front,
    Back,
}

impl fmt::Display for CameraPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraPosition::Front => f.write_str("front"),
            CameraPosition::Back => f.write_str("back"),
        }
    }
}

/// A source of video frames feeding a local video track
///
/// The client starts the capturer once the session opens and stops it on
/// teardown or when the track is replaced.
pub trait VideoCapturer: Send + Sync + fmt::Debug {
    fn position(&self) -> CameraPosition;

    fn start(&self);

    fn stop(&self);

    fn is_capturing(&self) -> bool;

    /// Number of times `start` took effect
    fn start_count(&self) -> u64 {
        0
    }

    fn label(&self) -> String {
        format!("camera-{}", self.position())
    }
}

/// Camera capturer bound to a fixed position
#[derive(Debug)]
pub struct CameraCapturer {
    position: CameraPosition,
    capturing: AtomicBool,
    starts: AtomicU64,
}

impl CameraCapturer {
    pub fn new(position: CameraPosition) -> Self {
        Self {
            position,
            capturing: AtomicBool::new(false),
            starts: AtomicU64::new(0),
        }
    }
}

impl Default for CameraCapturer {
    fn default() -> Self {
        Self::new(CameraPosition::Front)
    }
}

impl VideoCapturer for CameraCapturer {
    fn position(&self) -> CameraPosition {
        self.position
    }

    fn start(&self) {
        if !self.capturing.swap(true, Ordering::SeqCst) {
            self.starts.fetch_add(1, Ordering::SeqCst);
            debug!("Camera capturer ({}) started", self.position);
        }
    }

    fn stop(&self) {
        if self.capturing.swap(false, Ordering::SeqCst) {
            debug!("Camera capturer ({}) stopped", self.position);
        }
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn start_count(&self) -> u64 {
        self.starts.load(Ordering::SeqCst)
    }
}
