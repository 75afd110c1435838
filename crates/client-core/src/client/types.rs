//! Session-side views of remote participants and the client itself

use chrono::{DateTime, Utc};

use crate::media::{MediaStreamTrack, Metadata, MuteType};
use crate::session::SessionState;

// ===== REMOTE PARTICIPANTS =====

/// A track published by a remote connection
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTrack {
    /// Connection that owns the track
    pub connection_id: String,
    pub track: MediaStreamTrack,
    pub stream_id: String,
    pub meta: Metadata,
    pub mute: MuteType,
}

impl RemoteTrack {
    pub fn track_id(&self) -> &str {
        self.track.id()
    }
}

/// A remote participant in the room and the tracks it publishes
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteConnection {
    pub connection_id: String,
    pub meta: Metadata,
    pub tracks: Vec<RemoteTrack>,
    pub joined_at: DateTime<Utc>,
}

impl RemoteConnection {
    pub(crate) fn new(connection_id: String, meta: Metadata) -> Self {
        Self {
            connection_id,
            meta,
            tracks: Vec::new(),
            joined_at: Utc::now(),
        }
    }

    pub fn track(&self, track_id: &str) -> Option<&RemoteTrack> {
        self.tracks.iter().find(|t| t.track_id() == track_id)
    }

    pub(crate) fn track_mut(&mut self, track_id: &str) -> Option<&mut RemoteTrack> {
        self.tracks.iter_mut().find(|t| t.track_id() == track_id)
    }
}

// ===== CLIENT =====

/// Snapshot of the client's current session
#[derive(Debug, Clone)]
pub struct ClientStats {
    pub state: SessionState,
    /// Id assigned by the room service once the session opened
    pub connection_id: Option<String>,
    pub local_tracks: usize,
    pub remote_connections: usize,
    pub remote_tracks: usize,
    /// When the current session reached `Open`
    pub opened_at: Option<DateTime<Utc>>,
    /// Whether periodic stats polling is running
    pub stats_polling: bool,
}
