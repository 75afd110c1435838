//! The `session` sub-command
//!
//! Joins a loopback room with microphone and front camera, adds simulated
//! remote peers, then exercises each SDK call once. A failed call is logged
//! and the demo carries on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{error, info, warn};

use roomkit_client_core::{
    get_user_media, metadata, CameraCapturer, CameraPosition, Client, ClientBuilder, ClientError,
    ClientEventHandler, ClientResult, ConnectOption, ErrorEvent, IceServersProtocol, LocalTrack, LoopbackHandle,
    LoopbackTransport, MediaStreamConstraints, MuteType, OpenEvent, ReceivingOption, RemoteConnectionEvent,
    RemoteTrack, RemoveRemoteConnectionEvent, SessionState, SignalingMessage, TrackKind, TrackOption,
    VideoRequirement,
};
use roomkit_token_core::AccessTokenIssuer;

use crate::settings::AppSettings;

/// What the `session` sub-command should do once the room is open
#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub mute_audio: Option<MuteType>,
    pub mute_video: Option<MuteType>,
    /// Requested for every remote connection
    pub video_requirement: VideoRequirement,
    pub bitrate_kbps: Option<u32>,
    pub framerate: Option<u32>,
    pub camera: Option<CameraPosition>,
    pub remote_peers: usize,
    pub duration: Duration,
}

impl Default for SessionPlan {
    fn default() -> Self {
        Self {
            mute_audio: None,
            mute_video: None,
            video_requirement: VideoRequirement::Required,
            bitrate_kbps: None,
            framerate: None,
            camera: None,
            remote_peers: 0,
            duration: Duration::ZERO,
        }
    }
}

/// What a finished `session` run did
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub final_state: SessionState,
    /// Every message the room received, `connect` and `disconnect` included
    pub sent_messages: Vec<SignalingMessage>,
    /// SDK calls that failed and were skipped
    pub failed_operations: usize,
}

/// Logs session events and remembers which remote connections are present
#[derive(Default)]
struct DemoEventHandler {
    connection_ids: Mutex<Vec<String>>,
}

impl DemoEventHandler {
    fn connection_ids(&self) -> Vec<String> {
        self.connection_ids.lock().clone()
    }
}

#[async_trait]
impl ClientEventHandler for DemoEventHandler {
    async fn on_connecting(&self) {
        info!("Connecting");
    }

    async fn on_open(&self, event: OpenEvent) {
        info!("Open as {}", event.connection_id);
    }

    async fn on_closing(&self) {
        info!("Closing");
    }

    async fn on_closed(&self, reason: Option<String>) {
        self.connection_ids.lock().clear();
        match reason {
            Some(reason) => info!("Closed: {}", reason),
            None => info!("Closed"),
        }
    }

    async fn on_add_remote_connection(&self, event: RemoteConnectionEvent) {
        info!("Remote connection {} joined (meta: {:?})", event.connection_id, event.meta);
        self.connection_ids.lock().push(event.connection_id);
    }

    async fn on_update_remote_connection(&self, event: RemoteConnectionEvent) {
        info!("Remote connection {} meta: {:?}", event.connection_id, event.meta);
    }

    async fn on_remove_remote_connection(&self, event: RemoveRemoteConnectionEvent) {
        info!(
            "Remote connection {} left with {} tracks",
            event.connection_id,
            event.tracks.len()
        );
        self.connection_ids.lock().retain(|id| id != &event.connection_id);
    }

    async fn on_add_remote_track(&self, track: RemoteTrack) {
        info!(
            "Remote {} track {} from {}",
            track.track.kind(),
            track.track_id(),
            track.connection_id
        );
    }

    async fn on_update_mute(&self, track: RemoteTrack) {
        info!("Remote track {} is now {}", track.track_id(), track.mute);
    }

    async fn on_error(&self, event: ErrorEvent) {
        error!("{}", event.to_report_string());
    }
}

fn local_tracks(camera: Arc<CameraCapturer>) -> ClientResult<Vec<LocalTrack>> {
    let stream = get_user_media(MediaStreamConstraints::audio_video(camera))?;
    let tracks = stream
        .tracks()
        .map(|track| {
            let meta = metadata([("track_metadata", track.kind().to_string())]);
            LocalTrack::new(track.clone(), &stream, TrackOption::new(meta, MuteType::Unmute))
        })
        .collect();
    Ok(tracks)
}

/// Mint a token; on failure fall back to an empty token so connect reports it
fn access_token(issuer: &AccessTokenIssuer) -> String {
    match issuer.issue() {
        Ok(token) => token.into_string(),
        Err(e) => {
            error!("Failed to mint access token: {}", e);
            String::new()
        }
    }
}

/// Log the outcome of one SDK call; returns `false` on failure
fn report<T>(operation: &str, result: ClientResult<T>) -> bool {
    match result {
        Ok(_) => {
            info!("{} succeeded", operation);
            true
        }
        Err(e) => {
            warn!("{} failed: {}", operation, e);
            false
        }
    }
}

fn add_remote_peers(room: &LoopbackHandle, count: usize) {
    for index in 0..count {
        let connection_id = format!("peer-{}", index + 1);
        room.add_remote_connection(connection_id.clone(), metadata([("connect_meta", "simulated")]));
        room.add_remote_track(&connection_id, TrackKind::Audio, metadata([("track_metadata", "audio")]), MuteType::Unmute);
        room.add_remote_track(&connection_id, TrackKind::Video, metadata([("track_metadata", "video")]), MuteType::Unmute);
    }
}

pub async fn run_session(settings: &AppSettings, plan: SessionPlan) -> anyhow::Result<SessionSummary> {
    let issuer = AccessTokenIssuer::new(settings.token_config())?;
    let transport = LoopbackTransport::with_verifier(AccessTokenIssuer::new(settings.token_config())?);
    let room = transport.handle();

    let handler = Arc::new(DemoEventHandler::default());
    let client = ClientBuilder::new()
        .config(settings.client_config())
        .transport(Arc::new(transport))
        .event_handler(handler.clone())
        .build()?;

    let camera = Arc::new(CameraCapturer::new(CameraPosition::Front));
    let tracks = local_tracks(camera)?;
    let option = ConnectOption::new()
        .with_local_tracks(tracks.clone())
        .with_meta(metadata([("connect_meta", "cli")]))
        .with_sending(settings.sending_option())
        .with_receiving(ReceivingOption { enabled: true })
        .with_ice_servers_protocol(IceServersProtocol::All);

    client
        .connect(settings.client_id.clone(), access_token(&issuer), option)
        .await?;
    client.wait_for_state(SessionState::Open, Duration::from_secs(5)).await?;

    let mut failed_operations = 0;
    if !report("start_stats_polling", client.start_stats_polling(None)) {
        failed_operations += 1;
    }
    add_remote_peers(&room, plan.remote_peers);
    tokio::time::sleep(Duration::from_millis(100)).await;

    failed_operations += exercise(&client, &tracks, &handler.connection_ids(), &plan).await;

    tokio::time::sleep(plan.duration).await;
    if let Ok(report) = client.get_stats(None).await {
        info!("Final stats: {} entries", report.len());
    }

    client.disconnect().await?;
    if failed_operations > 0 {
        warn!("{} operations failed", failed_operations);
    }

    Ok(SessionSummary {
        final_state: client.state(),
        sent_messages: room.sent_messages(),
        failed_operations,
    })
}

/// Switch the published video track to the camera at `position`
async fn switch_camera(client: &Client, video: &LocalTrack, position: CameraPosition) -> ClientResult<()> {
    let capturer = Arc::new(CameraCapturer::new(position));
    let stream = get_user_media(MediaStreamConstraints::video_only(capturer))?;
    let track = stream
        .video_tracks
        .first()
        .cloned()
        .ok_or_else(|| ClientError::internal_error("camera produced no video track"))?;
    client.replace_media_stream_track(video, track).await
}

/// Run each planned SDK call once; returns how many failed
async fn exercise(client: &Client, tracks: &[LocalTrack], connection_ids: &[String], plan: &SessionPlan) -> usize {
    let audio = tracks.iter().find(|t| t.kind() == TrackKind::Audio);
    let video = tracks.iter().find(|t| t.kind() == TrackKind::Video);
    let mut outcomes = Vec::new();

    if let (Some(mute), Some(audio)) = (plan.mute_audio, audio) {
        outcomes.push(report("change_mute (audio)", client.change_mute(audio, mute).await));
    }
    if let (Some(mute), Some(video)) = (plan.mute_video, video) {
        outcomes.push(report("change_mute (video)", client.change_mute(video, mute).await));
    }

    outcomes.push(report(
        "update_meta",
        client
            .update_meta(metadata([("connect_meta", "new_connect_meta")]))
            .await,
    ));
    if let Some(video) = video {
        outcomes.push(report(
            "update_track_meta",
            client
                .update_track_meta(video, metadata([("track_metadata", "new_track_metadata")]))
                .await,
        ));
    }

    for connection_id in connection_ids {
        outcomes.push(report(
            "change_media_requirements",
            client
                .change_media_requirements(connection_id, plan.video_requirement)
                .await,
        ));
    }

    if let Some(kbps) = plan.bitrate_kbps {
        outcomes.push(report("change_video_send_bitrate", client.change_video_send_bitrate(kbps).await));
    }
    if let Some(fps) = plan.framerate {
        outcomes.push(report("change_video_send_framerate", client.change_video_send_framerate(fps).await));
    }

    if let (Some(position), Some(video)) = (plan.camera, video) {
        outcomes.push(report(
            "replace_media_stream_track",
            switch_camera(client, video, position).await,
        ));
    }

    outcomes.iter().filter(|ok| !**ok).count()
}
