//! Connect and capture options

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::capturer::VideoCapturer;
use super::track::{LocalTrack, MediaStream, MediaStreamTrack, Metadata, TrackKind};
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodecType {
    Vp8,
    Vp9,
    H264,
    H265,
    Av1,
}

impl Default for VideoCodecType {
    fn default() -> Self {
        VideoCodecType::Vp8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendingPriority {
    Normal,
    High,
}

impl Default for SendingPriority {
    fn default() -> Self {
        SendingPriority::Normal
    }
}

/// Which ICE server transports the room service may hand out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IceServersProtocol {
    All,
    Udp,
    Tcp,
    Tls,
}

impl Default for IceServersProtocol {
    fn default() -> Self {
        IceServersProtocol::All
    }
}

/// Whether this client wants video from a remote connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoRequirement {
    Required,
    Unrequired,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendingVideoOption {
    pub codec: VideoCodecType,
    pub priority: SendingPriority,
    /// Initial send bitrate; `None` leaves it to the room service
    pub max_bitrate_kbps: Option<u32>,
}

impl SendingVideoOption {
    pub fn new(codec: VideoCodecType, priority: SendingPriority) -> Self {
        Self {
            codec,
            priority,
            max_bitrate_kbps: None,
        }
    }

    pub fn with_max_bitrate_kbps(mut self, kbps: u32) -> Self {
        self.max_bitrate_kbps = Some(kbps);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendingOption {
    pub video: Option<SendingVideoOption>,
    pub enabled: bool,
}

impl SendingOption {
    /// Whether video is actually sent with this option
    pub fn sends_video(&self) -> bool {
        self.enabled && self.video.is_some()
    }
}

impl Default for SendingOption {
    fn default() -> Self {
        Self {
            video: Some(SendingVideoOption::default()),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceivingOption {
    pub enabled: bool,
}

impl Default for ReceivingOption {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Everything needed to join a room besides the credential
#[derive(Debug, Clone, Default)]
pub struct ConnectOption {
    pub signaling_url: Option<String>,
    pub local_tracks: Vec<LocalTrack>,
    pub meta: Metadata,
    pub sending: SendingOption,
    pub receiving: ReceivingOption,
    pub ice_servers_protocol: IceServersProtocol,
}

impl ConnectOption {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signaling_url(mut self, url: impl Into<String>) -> Self {
        self.signaling_url = Some(url.into());
        self
    }

    pub fn with_local_tracks(mut self, tracks: Vec<LocalTrack>) -> Self {
        self.local_tracks = tracks;
        self
    }

    pub fn with_meta(mut self, meta: Metadata) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_sending(mut self, sending: SendingOption) -> Self {
        self.sending = sending;
        self
    }

    pub fn with_receiving(mut self, receiving: ReceivingOption) -> Self {
        self.receiving = receiving;
        self
    }

    pub fn with_ice_servers_protocol(mut self, protocol: IceServersProtocol) -> Self {
        self.ice_servers_protocol = protocol;
        self
    }
}

/// What [`get_user_media`] should capture
#[derive(Debug, Clone, Default)]
pub struct MediaStreamConstraints {
    pub video_capturer: Option<Arc<dyn VideoCapturer>>,
    pub audio: bool,
}

impl MediaStreamConstraints {
    pub fn audio_only() -> Self {
        Self {
            video_capturer: None,
            audio: true,
        }
    }

    pub fn audio_video(capturer: Arc<dyn VideoCapturer>) -> Self {
        Self {
            video_capturer: Some(capturer),
            audio: true,
        }
    }

    /// Camera only, e.g. for switching cameras on a published track
    pub fn video_only(capturer: Arc<dyn VideoCapturer>) -> Self {
        Self {
            video_capturer: Some(capturer),
            audio: false,
        }
    }
}

/// Build a media stream from the requested sources
///
/// Capture does not start here; video capturers are started once the
/// session opens.
pub fn get_user_media(constraints: MediaStreamConstraints) -> ClientResult<MediaStream> {
    if !constraints.audio && constraints.video_capturer.is_none() {
        return Err(ClientError::invalid_configuration(
            "constraints",
            "neither audio nor video requested",
        ));
    }

    let mut stream = MediaStream::new();
    if constraints.audio {
        stream.add_track(MediaStreamTrack::new(TrackKind::Audio, "microphone"));
    }
    if let Some(capturer) = constraints.video_capturer {
        stream.add_track(MediaStreamTrack::from_capturer(capturer));
    }
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::capturer::{CameraCapturer, CameraPosition};

    #[test]
    fn test_get_user_media_requires_a_source() {
        let err = get_user_media(MediaStreamConstraints::default()).unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_get_user_media_audio_video() {
        let capturer = Arc::new(CameraCapturer::new(CameraPosition::Front));
        let stream = get_user_media(MediaStreamConstraints::audio_video(capturer.clone())).unwrap();

        assert_eq!(stream.audio_tracks.len(), 1);
        assert_eq!(stream.video_tracks.len(), 1);
        assert!(stream.video_tracks[0].capturer().is_some());
        assert!(!capturer.is_capturing());
    }

    #[test]
    fn test_get_user_media_video_only() {
        let capturer = Arc::new(CameraCapturer::new(CameraPosition::Back));
        let stream = get_user_media(MediaStreamConstraints::video_only(capturer)).unwrap();

        assert!(stream.audio_tracks.is_empty());
        assert_eq!(stream.video_tracks.len(), 1);
        assert_eq!(stream.video_tracks[0].kind(), TrackKind::Video);
    }

    #[test]
    fn test_option_serde_names() {
        assert_eq!(serde_json::to_value(VideoCodecType::H264).unwrap(), "h264");
        assert_eq!(serde_json::to_value(IceServersProtocol::Tls).unwrap(), "tls");
        assert_eq!(serde_json::to_value(VideoRequirement::Unrequired).unwrap(), "unrequired");
        assert!(SendingOption::default().sends_video());
        assert!(!SendingOption { video: None, enabled: true }.sends_video());
    }
}
