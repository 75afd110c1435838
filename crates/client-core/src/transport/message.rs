//! Signaling wire messages
//!
//! Outbound requests are [`SignalingMessage`]s, inbound notifications are
//! [`TransportEvent`]s. Both are JSON objects discriminated by a `type`
//! field:
//!
//! ```rust
//! use roomkit_client_core::transport::SignalingMessage;
//! use roomkit_client_core::MuteType;
//!
//! let message = SignalingMessage::UpdateMute {
//!     track_id: "t1".to_string(),
//!     mute: MuteType::SoftMute,
//! };
//! let json = serde_json::to_string(&message).unwrap();
//! assert_eq!(json, r#"{"type":"update_mute","track_id":"t1","mute":"soft_mute"}"#);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::media::{
    IceServersProtocol, LocalTrack, Metadata, MuteType, ReceivingOption, SendingOption, TrackKind,
    VideoRequirement,
};

/// A published track as announced over signaling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub track_id: String,
    pub stream_id: String,
    pub kind: TrackKind,
    pub mute: MuteType,
    #[serde(default)]
    pub meta: Metadata,
}

impl From<&LocalTrack> for TrackDescriptor {
    fn from(track: &LocalTrack) -> Self {
        Self {
            track_id: track.id().to_string(),
            stream_id: track.stream_id().to_string(),
            kind: track.kind(),
            mute: track.mute_type(),
            meta: track.meta(),
        }
    }
}

/// Request to join a room
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub signaling_url: Option<String>,
    pub client_id: String,
    pub access_token: String,
    #[serde(default)]
    pub meta: Metadata,
    pub tracks: Vec<TrackDescriptor>,
    pub sending: SendingOption,
    pub receiving: ReceivingOption,
    pub ice_servers_protocol: IceServersProtocol,
}

impl fmt::Debug for ConnectRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectRequest")
            .field("signaling_url", &self.signaling_url)
            .field("client_id", &self.client_id)
            .field("access_token", &"<redacted>")
            .field("meta", &self.meta)
            .field("tracks", &self.tracks)
            .field("sending", &self.sending)
            .field("receiving", &self.receiving)
            .field("ice_servers_protocol", &self.ice_servers_protocol)
            .finish()
    }
}

/// Requests sent from the client to the room service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalingMessage {
    Connect(ConnectRequest),
    UpdateConnectionMeta {
        meta: Metadata,
    },
    UpdateTrackMeta {
        track_id: String,
        meta: Metadata,
    },
    UpdateMute {
        track_id: String,
        mute: MuteType,
    },
    ChangeMediaRequirements {
        connection_id: String,
        video_requirement: VideoRequirement,
    },
    ChangeSendParameters {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_bitrate_kbps: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_framerate: Option<u32>,
    },
    /// Swap the media behind a published track; `track_id` stays the published id
    ReplaceTrack {
        track_id: String,
        new_track_id: String,
        kind: TrackKind,
    },
    Disconnect,
}

impl SignalingMessage {
    /// Name of the message as it appears in the `type` field
    pub fn name(&self) -> &'static str {
        match self {
            SignalingMessage::Connect(_) => "connect",
            SignalingMessage::UpdateConnectionMeta { .. } => "update_connection_meta",
            SignalingMessage::UpdateTrackMeta { .. } => "update_track_meta",
            SignalingMessage::UpdateMute { .. } => "update_mute",
            SignalingMessage::ChangeMediaRequirements { .. } => "change_media_requirements",
            SignalingMessage::ChangeSendParameters { .. } => "change_send_parameters",
            SignalingMessage::ReplaceTrack { .. } => "replace_track",
            SignalingMessage::Disconnect => "disconnect",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    Authentication,
    Network,
    Protocol,
    Internal,
}

impl TransportErrorKind {
    pub fn into_client_error(self, detail: impl Into<String>) -> ClientError {
        let reason = detail.into();
        match self {
            TransportErrorKind::Authentication => ClientError::AuthenticationFailed { reason },
            TransportErrorKind::Network => ClientError::NetworkError { reason },
            TransportErrorKind::Protocol => ClientError::ProtocolError { reason },
            TransportErrorKind::Internal => ClientError::InternalError { message: reason },
        }
    }
}

/// Notifications from the room service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportEvent {
    /// The room accepted the connect request
    Opened {
        connection_id: String,
    },
    RemoteConnectionAdded {
        connection_id: String,
        #[serde(default)]
        meta: Metadata,
    },
    RemoteConnectionUpdated {
        connection_id: String,
        #[serde(default)]
        meta: Metadata,
    },
    RemoteConnectionRemoved {
        connection_id: String,
    },
    RemoteTrackAdded {
        connection_id: String,
        track: TrackDescriptor,
    },
    RemoteTrackUpdated {
        connection_id: String,
        track_id: String,
        #[serde(default)]
        meta: Metadata,
    },
    RemoteMuteChanged {
        connection_id: String,
        track_id: String,
        mute: MuteType,
    },
    Error {
        kind: TransportErrorKind,
        detail: String,
    },
    /// The room ended the session
    Closed {
        #[serde(default)]
        reason: Option<String>,
    },
}
