//! Client configuration
//!
//! ```rust
//! use roomkit_client_core::ClientConfig;
//!
//! let config = ClientConfig::new()
//!     .with_stats_interval_ms(5_000)
//!     .with_default_signaling_url("wss://rooms.example.com/signaling");
//!
//! assert_eq!(config.stats_interval_ms, 5_000);
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};
use crate::media::{MAX_VIDEO_BITRATE_KBPS, MAX_VIDEO_FRAMERATE};

/// Settings shared by every session a client opens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Period of `start_stats_polling` when no interval is given
    pub stats_interval_ms: u64,
    /// Buffer of the broadcast channel behind `subscribe_events`
    pub event_channel_capacity: usize,
    pub max_video_bitrate_kbps: u32,
    pub max_video_framerate: u32,
    /// Used when a `ConnectOption` carries no signaling URL
    pub default_signaling_url: Option<String>,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stats_interval_ms(mut self, interval_ms: u64) -> Self {
        self.stats_interval_ms = interval_ms;
        self
    }

    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    pub fn with_max_video_bitrate_kbps(mut self, kbps: u32) -> Self {
        self.max_video_bitrate_kbps = kbps;
        self
    }

    pub fn with_max_video_framerate(mut self, fps: u32) -> Self {
        self.max_video_framerate = fps;
        self
    }

    pub fn with_default_signaling_url(mut self, url: impl Into<String>) -> Self {
        self.default_signaling_url = Some(url.into());
        self
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms)
    }

    /// Check a video send bitrate against `1..=max_video_bitrate_kbps`
    pub fn check_video_bitrate(&self, kbps: u32) -> ClientResult<()> {
        if kbps == 0 || kbps > self.max_video_bitrate_kbps {
            return Err(ClientError::invalid_configuration(
                "max_bitrate_kbps",
                format!("{} is outside 1..={}", kbps, self.max_video_bitrate_kbps),
            ));
        }
        Ok(())
    }

    pub fn check_video_framerate(&self, fps: u32) -> ClientResult<()> {
        if fps == 0 || fps > self.max_video_framerate {
            return Err(ClientError::invalid_configuration(
                "max_framerate",
                format!("{} is outside 1..={}", fps, self.max_video_framerate),
            ));
        }
        Ok(())
    }

    pub fn validate(&self) -> ClientResult<()> {
        if self.stats_interval_ms == 0 {
            return Err(ClientError::invalid_configuration("stats_interval_ms", "must be positive"));
        }
        if self.event_channel_capacity == 0 {
            return Err(ClientError::invalid_configuration("event_channel_capacity", "must be positive"));
        }
        if self.max_video_bitrate_kbps == 0 || self.max_video_bitrate_kbps > MAX_VIDEO_BITRATE_KBPS {
            return Err(ClientError::invalid_configuration(
                "max_video_bitrate_kbps",
                format!("must be within 1..={MAX_VIDEO_BITRATE_KBPS}"),
            ));
        }
        if self.max_video_framerate == 0 || self.max_video_framerate > MAX_VIDEO_FRAMERATE {
            return Err(ClientError::invalid_configuration(
                "max_video_framerate",
                format!("must be within 1..={MAX_VIDEO_FRAMERATE}"),
            ));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            stats_interval_ms: 1_000,
            event_channel_capacity: 256,
            max_video_bitrate_kbps: MAX_VIDEO_BITRATE_KBPS,
            max_video_framerate: MAX_VIDEO_FRAMERATE,
            default_signaling_url: None,
        }
    }
}
