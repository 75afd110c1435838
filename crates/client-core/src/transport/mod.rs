//! The seam between the session manager and the room service
//!
//! A [`SignalingTransport`] carries [`SignalingMessage`]s to the room and
//! hands back a stream of [`TransportEvent`]s. Media capture, codec
//! negotiation and the actual network live behind this trait; the crate
//! ships [`LoopbackTransport`], an in-memory room used by tests and the
//! demo CLI.

pub mod loopback;
pub mod message;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ClientResult;

pub use loopback::{LoopbackHandle, LoopbackTransport};
pub use message::{ConnectRequest, SignalingMessage, TrackDescriptor, TransportErrorKind, TransportEvent};

/// One entry of a stats report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtcStats {
    pub id: String,
    #[serde(rename = "type")]
    pub stats_type: String,
    /// Microseconds since the unix epoch
    pub timestamp_us: i64,
    pub statistics: serde_json::Map<String, serde_json::Value>,
}

/// Stats keyed by stats id
pub type StatsReport = HashMap<String, RtcStats>;

#[async_trait]
pub trait SignalingTransport: Send + Sync {
    /// Send the connect request and return the room's event stream
    ///
    /// The stream ends when the transport is closed. A rejected credential
    /// is reported as `ClientError::AuthenticationFailed`.
    async fn connect(&self, request: ConnectRequest) -> ClientResult<mpsc::UnboundedReceiver<TransportEvent>>;

    async fn send(&self, message: SignalingMessage) -> ClientResult<()>;

    /// Stats for one track, or for the whole session when `track_id` is `None`
    async fn stats(&self, track_id: Option<&str>) -> ClientResult<StatsReport>;

    async fn close(&self) -> ClientResult<()>;
}
