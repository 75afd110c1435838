//! Media pipeline control points: capture sources, tracks, mute state and
//! the options a session is opened with.

pub mod capturer;
pub mod options;
pub mod track;

pub use capturer::{CameraCapturer, CameraPosition, VideoCapturer};
pub use options::{
    ConnectOption, IceServersProtocol, MediaStreamConstraints, ReceivingOption, SendingOption,
    SendingPriority, SendingVideoOption, VideoCodecType, VideoRequirement, get_user_media,
};
pub use track::{
    LocalTrack, MediaStream, MediaStreamTrack, Metadata, MuteType, TrackKind, TrackOption, metadata,
};

/// Upper bound accepted by `change_video_send_bitrate`
pub const MAX_VIDEO_BITRATE_KBPS: u32 = 20_000;

/// Upper bound accepted by `change_video_send_framerate`
pub const MAX_VIDEO_FRAMERATE: u32 = 60;
