//! Media streams, tracks and mute state

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::capturer::VideoCapturer;

/// Arbitrary key/value metadata attached to connections and tracks
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Build a [`Metadata`] map from string pairs
pub fn metadata<K, V, I>(pairs: I) -> Metadata
where
    K: Into<String>,
    V: Into<serde_json::Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Kind of media carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Audio,
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => f.write_str("audio"),
            TrackKind::Video => f.write_str("video"),
        }
    }
}

/// Mute state of a track
///
/// - `Unmute`: media is captured and sent.
/// - `SoftMute`: the track is disabled (silence / black frames) but the
///   sender stays attached, so unmuting is instant.
/// - `HardMute`: the track is disabled and the sender is detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuteType {
    Unmute,
    SoftMute,
    HardMute,
}

impl MuteType {
    pub fn is_muted(&self) -> bool {
        !matches!(self, MuteType::Unmute)
    }

    /// Whether the underlying media track should be enabled
    pub fn track_enabled(&self) -> bool {
        matches!(self, MuteType::Unmute)
    }

    /// Whether the sender stays attached to the transport
    pub fn sender_attached(&self) -> bool {
        !matches!(self, MuteType::HardMute)
    }
}

impl Default for MuteType {
    fn default() -> Self {
        MuteType::Unmute
    }
}

impl fmt::Display for MuteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MuteType::Unmute => f.write_str("unmute"),
            MuteType::SoftMute => f.write_str("soft_mute"),
            MuteType::HardMute => f.write_str("hard_mute"),
        }
    }
}

struct TrackInner {
    id: String,
    kind: TrackKind,
    label: String,
    enabled: AtomicBool,
    source: Option<Arc<dyn VideoCapturer>>,
}

/// A single audio or video media track
///
/// Cloning yields another handle to the same track; equality is by id.
#[derive(Clone)]
pub struct MediaStreamTrack {
    inner: Arc<TrackInner>,
}

impl MediaStreamTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), kind, label)
    }

    /// Track with a known id, e.g. one announced by a remote participant
    pub fn with_id(id: impl Into<String>, kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(TrackInner {
                id: id.into(),
                kind,
                label: label.into(),
                enabled: AtomicBool::new(true),
                source: None,
            }),
        }
    }

    /// Video track fed by a capturer
    pub fn from_capturer(capturer: Arc<dyn VideoCapturer>) -> Self {
        Self {
            inner: Arc::new(TrackInner {
                id: uuid::Uuid::new_v4().to_string(),
                kind: TrackKind::Video,
                label: capturer.label(),
                enabled: AtomicBool::new(true),
                source: Some(capturer),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Capturer feeding this track, if it is a local video track
    pub fn capturer(&self) -> Option<&Arc<dyn VideoCapturer>> {
        self.inner.source.as_ref()
    }
}

impl PartialEq for MediaStreamTrack {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for MediaStreamTrack {}

impl fmt::Debug for MediaStreamTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStreamTrack")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("label", &self.inner.label)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// A group of tracks captured together
#[derive(Debug, Clone)]
pub struct MediaStream {
    pub id: String,
    pub audio_tracks: Vec<MediaStreamTrack>,
    pub video_tracks: Vec<MediaStreamTrack>,
}

impl MediaStream {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            audio_tracks: Vec::new(),
            video_tracks: Vec::new(),
        }
    }

    pub fn add_track(&mut self, track: MediaStreamTrack) {
        match track.kind() {
            TrackKind::Audio => self.audio_tracks.push(track),
            TrackKind::Video => self.video_tracks.push(track),
        }
    }

    /// All tracks, audio first
    pub fn tracks(&self) -> impl Iterator<Item = &MediaStreamTrack> {
        self.audio_tracks.iter().chain(self.video_tracks.iter())
    }
}

impl Default for MediaStream {
    fn default() -> Self {
        Self::new()
    }
}

/// Options a local track is published with
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackOption {
    pub meta: Metadata,
    pub mute: MuteType,
}

impl TrackOption {
    pub fn new(meta: Metadata, mute: MuteType) -> Self {
        Self { meta, mute }
    }
}

struct LocalTrackState {
    media_stream_track: MediaStreamTrack,
    meta: Metadata,
    mute: MuteType,
}

/// A local track published into the room
///
/// Keeps its id across [`replace_media_stream_track`](crate::Client::replace_media_stream_track),
/// so the room keeps addressing the same published track.
#[derive(Clone)]
pub struct LocalTrack {
    id: String,
    stream_id: String,
    state: Arc<RwLock<LocalTrackState>>,
}

impl LocalTrack {
    pub fn new(media_stream_track: MediaStreamTrack, stream: &MediaStream, option: TrackOption) -> Self {
        media_stream_track.set_enabled(option.mute.track_enabled());
        Self {
            id: media_stream_track.id().to_string(),
            stream_id: stream.id.clone(),
            state: Arc::new(RwLock::new(LocalTrackState {
                media_stream_track,
                meta: option.meta,
                mute: option.mute,
            })),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn kind(&self) -> TrackKind {
        self.state.read().media_stream_track.kind()
    }

    pub fn media_stream_track(&self) -> MediaStreamTrack {
        self.state.read().media_stream_track.clone()
    }

    pub fn mute_type(&self) -> MuteType {
        self.state.read().mute
    }

    pub fn meta(&self) -> Metadata {
        self.state.read().meta.clone()
    }

    pub(crate) fn set_mute(&self, mute: MuteType) {
        let mut state = self.state.write();
        state.mute = mute;
        state.media_stream_track.set_enabled(mute.track_enabled());
    }

    pub(crate) fn set_meta(&self, meta: Metadata) {
        self.state.write().meta = meta;
    }

    /// Swap the underlying media track, returning the previous one
    pub(crate) fn replace(&self, track: MediaStreamTrack) -> MediaStreamTrack {
        let mut state = self.state.write();
        track.set_enabled(state.mute.track_enabled());
        std::mem::replace(&mut state.media_stream_track, track)
    }
}

impl PartialEq for LocalTrack {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("LocalTrack")
            .field("id", &self.id)
            .field("stream_id", &self.stream_id)
            .field("track", &state.media_stream_track)
            .field("mute", &state.mute)
            .finish()
    }
}
