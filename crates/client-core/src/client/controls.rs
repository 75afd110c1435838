// Media control operations for an open session
//
// Mute, metadata, media requirements, send parameters and track
// replacement. Every operation checks the session is open, validates its
// input, sends the signaling request and only then updates local state, so a
// failed request leaves the session unchanged.

use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};
use crate::media::{
    self, LocalTrack, MediaStream, MediaStreamConstraints, MediaStreamTrack, Metadata, MuteType,
    VideoRequirement,
};
use crate::transport::SignalingMessage;

use super::manager::Client;

impl Client {
    /// Capture a local media stream
    ///
    /// Usable in any state; the stream's video capturer starts once a
    /// session carrying its track opens.
    pub fn get_user_media(&self, constraints: MediaStreamConstraints) -> ClientResult<MediaStream> {
        media::get_user_media(constraints)
    }

    /// Change the mute state of a published local track
    pub async fn change_mute(&self, track: &LocalTrack, next: MuteType) -> ClientResult<()> {
        self.require_open("change_mute")?;
        self.ensure_local_track(track).await?;

        let current = track.mute_type();
        if current == next {
            debug!("Track {} already {}", track.id(), next);
            return Ok(());
        }

        self.inner
            .transport
            .send(SignalingMessage::UpdateMute {
                track_id: track.id().to_string(),
                mute: next,
            })
            .await?;
        track.set_mute(next);

        info!("Track {} ({}) {} -> {}", track.id(), track.kind(), current, next);
        Ok(())
    }

    /// Replace this connection's metadata
    pub async fn update_meta(&self, meta: Metadata) -> ClientResult<()> {
        self.require_open("update_meta")?;

        self.inner
            .transport
            .send(SignalingMessage::UpdateConnectionMeta { meta: meta.clone() })
            .await?;
        self.inner.session.write().await.meta = meta;

        debug!("Connection metadata updated");
        Ok(())
    }

    pub async fn update_track_meta(&self, track: &LocalTrack, meta: Metadata) -> ClientResult<()> {
        self.require_open("update_track_meta")?;
        self.ensure_local_track(track).await?;

        self.inner
            .transport
            .send(SignalingMessage::UpdateTrackMeta {
                track_id: track.id().to_string(),
                meta: meta.clone(),
            })
            .await?;
        track.set_meta(meta);

        debug!("Metadata of track {} updated", track.id());
        Ok(())
    }

    /// Tell the room whether this client wants video from `connection_id`
    pub async fn change_media_requirements(
        &self,
        connection_id: &str,
        video_requirement: VideoRequirement,
    ) -> ClientResult<()> {
        self.require_open("change_media_requirements")?;

        let known = self
            .inner
            .session
            .read()
            .await
            .remote_connections
            .iter()
            .any(|c| c.connection_id == connection_id);
        if !known {
            return Err(ClientError::ConnectionNotFound {
                connection_id: connection_id.to_string(),
            });
        }

        self.inner
            .transport
            .send(SignalingMessage::ChangeMediaRequirements {
                connection_id: connection_id.to_string(),
                video_requirement,
            })
            .await?;

        info!("Video from {} now {:?}", connection_id, video_requirement);
        Ok(())
    }

    /// Cap the video send bitrate
    pub async fn change_video_send_bitrate(&self, kbps: u32) -> ClientResult<()> {
        self.require_open("change_video_send_bitrate")?;

        self.inner.config.check_video_bitrate(kbps)?;
        if !self.inner.session.read().await.sending.sends_video() {
            return Err(ClientError::invalid_configuration("sending", "video sending is disabled"));
        }

        self.inner
            .transport
            .send(SignalingMessage::ChangeSendParameters {
                max_bitrate_kbps: Some(kbps),
                max_framerate: None,
            })
            .await?;
        if let Some(video) = self.inner.session.write().await.sending.video.as_mut() {
            video.max_bitrate_kbps = Some(kbps);
        }

        info!("Video send bitrate set to {} kbps", kbps);
        Ok(())
    }

    /// Cap the video send framerate
    pub async fn change_video_send_framerate(&self, fps: u32) -> ClientResult<()> {
        self.require_open("change_video_send_framerate")?;

        self.inner.config.check_video_framerate(fps)?;

        self.inner
            .transport
            .send(SignalingMessage::ChangeSendParameters {
                max_bitrate_kbps: None,
                max_framerate: Some(fps),
            })
            .await?;

        info!("Video send framerate set to {} fps", fps);
        Ok(())
    }

    /// Swap the media behind a published track, e.g. to switch cameras
    ///
    /// The published track keeps its id and mute state. The previous
    /// track's capturer is stopped and the new one started.
    pub async fn replace_media_stream_track(
        &self,
        track: &LocalTrack,
        new_track: MediaStreamTrack,
    ) -> ClientResult<()> {
        self.require_open("replace_media_stream_track")?;
        self.ensure_local_track(track).await?;

        if track.kind() != new_track.kind() {
            return Err(ClientError::invalid_configuration(
                "track",
                format!("cannot replace a {} track with a {} track", track.kind(), new_track.kind()),
            ));
        }
        if track.media_stream_track() == new_track {
            return Ok(());
        }

        self.inner
            .transport
            .send(SignalingMessage::ReplaceTrack {
                track_id: track.id().to_string(),
                new_track_id: new_track.id().to_string(),
                kind: new_track.kind(),
            })
            .await?;

        let previous = track.replace(new_track.clone());
        if let Some(capturer) = previous.capturer() {
            capturer.stop();
        }
        if let Some(capturer) = new_track.capturer() {
            capturer.start();
        }

        info!(
            "Track {} now sends {} (was {})",
            track.id(),
            new_track.label(),
            previous.label()
        );
        Ok(())
    }

    async fn ensure_local_track(&self, track: &LocalTrack) -> ClientResult<()> {
        if self.inner.session.read().await.local_track(track.id()).is_some() {
            Ok(())
        } else {
            Err(ClientError::TrackNotFound {
                track_id: track.id().to_string(),
            })
        }
    }
}
