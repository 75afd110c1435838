//! Session manager
//!
//! [`Client`] owns one room session at a time. Lifecycle calls
//! (`connect`, `disconnect`, a server-side close) are serialized; transport
//! events of a session are drained by one task per session; client events
//! are queued and delivered to handlers by a single dispatcher task, in the
//! order they were emitted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use roomkit_token_core::AccessToken;

use crate::client::config::ClientConfig;
use crate::client::types::{RemoteConnection, RemoteTrack};
use crate::error::{ClientError, ClientResult};
use crate::events::{
    ClientEvent, ClientEventHandler, ErrorEvent, EventEmitter, EventSubscription, LocalTrackEvent,
    OpenEvent, RemoteConnectionEvent, RemoveRemoteConnectionEvent,
};
use crate::media::{ConnectOption, LocalTrack, MediaStreamTrack, Metadata, SendingOption, TrackKind};
use crate::session::SessionState;
use crate::transport::{ConnectRequest, SignalingTransport, TrackDescriptor, TransportEvent};

/// Mutable per-session data
#[derive(Default)]
pub(crate) struct SessionData {
    pub(crate) connection_id: Option<String>,
    pub(crate) meta: Metadata,
    pub(crate) local_tracks: Vec<LocalTrack>,
    pub(crate) remote_connections: Vec<RemoteConnection>,
    pub(crate) sending: SendingOption,
    pub(crate) opened_at: Option<DateTime<Utc>>,
}

impl SessionData {
    pub(crate) fn local_track(&self, track_id: &str) -> Option<&LocalTrack> {
        self.local_tracks.iter().find(|t| t.id() == track_id)
    }

    pub(crate) fn remote_connection_mut(&mut self, connection_id: &str) -> Option<&mut RemoteConnection> {
        self.remote_connections
            .iter_mut()
            .find(|c| c.connection_id == connection_id)
    }
}

pub(crate) struct ClientInner {
    pub(crate) config: ClientConfig,
    pub(crate) transport: Arc<dyn SignalingTransport>,
    pub(crate) state_tx: watch::Sender<SessionState>,
    pub(crate) session: RwLock<SessionData>,
    /// Serializes connect and teardown
    lifecycle: Mutex<()>,
    /// Bumped on every connect; stale event loops compare against it
    epoch: AtomicU64,
    shutdown: parking_lot::Mutex<Option<watch::Sender<bool>>>,
    event_loop: parking_lot::Mutex<Option<JoinHandle<()>>>,
    pub(crate) stats_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
    emitter: Arc<EventEmitter>,
    dispatch_tx: mpsc::UnboundedSender<ClientEvent>,
    broadcast_tx: broadcast::Sender<ClientEvent>,
}

/// Handle to a room media-session client
///
/// Cloning is cheap; all clones drive the same session.
#[derive(Clone)]
pub struct Client {
    pub(crate) inner: Arc<ClientInner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client over `transport`
    ///
    /// Must be called inside a tokio runtime; the event dispatcher is
    /// spawned here.
    pub fn new(transport: Arc<dyn SignalingTransport>, config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ClientError::internal_error(format!("no tokio runtime: {}", e)))?;

        let emitter = Arc::new(EventEmitter::new());
        let (dispatch_tx, mut dispatch_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let dispatcher = emitter.clone();
        runtime.spawn(async move {
            while let Some(event) = dispatch_rx.recv().await {
                dispatcher.emit(event).await;
            }
            debug!("Event dispatcher finished");
        });

        let (broadcast_tx, _) = broadcast::channel(config.event_channel_capacity);
        let (state_tx, _) = watch::channel(SessionState::Init);

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                transport,
                state_tx,
                session: RwLock::new(SessionData::default()),
                lifecycle: Mutex::new(()),
                epoch: AtomicU64::new(0),
                shutdown: parking_lot::Mutex::new(None),
                event_loop: parking_lot::Mutex::new(None),
                stats_task: parking_lot::Mutex::new(None),
                emitter,
                dispatch_tx,
                broadcast_tx,
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    // ===== LIFECYCLE =====

    /// Join a room
    ///
    /// Allowed from `Init` or `Closed`. Emits `Connecting`, then
    /// `AddLocalTrack` for every track of `option`; `Open` follows once the
    /// room accepts the session. An empty or malformed `access_token`
    /// fails with [`ClientError::AuthenticationFailed`] and leaves the
    /// client `Closed`. An initial video bitrate outside
    /// `1..=max_video_bitrate_kbps` is rejected before anything is emitted.
    pub async fn connect(
        &self,
        client_id: impl Into<String>,
        access_token: impl Into<String>,
        option: ConnectOption,
    ) -> ClientResult<()> {
        let client_id = client_id.into();
        let access_token = access_token.into();
        let inner = &self.inner;
        if let Some(kbps) = option.sending.video.as_ref().and_then(|video| video.max_bitrate_kbps) {
            inner.config.check_video_bitrate(kbps)?;
        }

        let _lifecycle = inner.lifecycle.lock().await;
        if !inner.transition(SessionState::Connecting) {
            return Err(ClientError::invalid_state("connect", inner.state()));
        }
        let epoch = inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        inner.emit(ClientEvent::Connecting);
        info!("Connecting client {} (session {})", client_id, epoch);

        if access_token.is_empty() {
            return Err(inner.fail_connect(ClientError::authentication_failed("access token is empty")));
        }
        if !AccessToken::is_well_formed(&access_token) {
            return Err(inner.fail_connect(ClientError::authentication_failed("access token is malformed")));
        }

        let tracks: Vec<TrackDescriptor> = option.local_tracks.iter().map(TrackDescriptor::from).collect();
        {
            let mut session = inner.session.write().await;
            *session = SessionData {
                meta: option.meta.clone(),
                local_tracks: option.local_tracks.clone(),
                sending: option.sending.clone(),
                ..SessionData::default()
            };
        }
        for track in &option.local_tracks {
            inner.emit(ClientEvent::AddLocalTrack(LocalTrackEvent::new(track)));
        }

        let request = ConnectRequest {
            signaling_url: option
                .signaling_url
                .clone()
                .or_else(|| inner.config.default_signaling_url.clone()),
            client_id,
            access_token,
            meta: option.meta,
            tracks,
            sending: option.sending,
            receiving: option.receiving,
            ice_servers_protocol: option.ice_servers_protocol,
        };

        let events = match inner.transport.connect(request).await {
            Ok(events) => events,
            Err(e) => {
                let local_tracks = std::mem::take(&mut inner.session.write().await.local_tracks);
                inner.emit(ClientEvent::Error(ErrorEvent::new(e.clone(), Some("connect".to_string()))));
                for track in &local_tracks {
                    inner.emit(ClientEvent::RemoveLocalTrack(LocalTrackEvent::new(track)));
                }
                inner.transition(SessionState::Closed);
                inner.emit(ClientEvent::Closed {
                    reason: Some(e.to_string()),
                });
                error!("Connect failed: {}", e);
                return Err(e);
            }
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        *inner.shutdown.lock() = Some(shutdown_tx);
        let handle = tokio::spawn(run_event_loop(Arc::downgrade(inner), epoch, events, shutdown_rx));
        if let Some(previous) = inner.event_loop.lock().replace(handle) {
            previous.abort();
        }

        Ok(())
    }

    /// Leave the room
    ///
    /// From `Connecting` or `Open` this emits `Closing`, stops stats
    /// polling, closes the transport, withdraws local tracks, forgets remote
    /// connections and ends in `Closed`. In any other state it does nothing.
    pub async fn disconnect(&self) -> ClientResult<()> {
        if !self.inner.teardown(None, None).await {
            debug!("Disconnect ignored in state {}", self.state());
        }
        Ok(())
    }

    // ===== QUERIES =====

    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    /// Wait until the session reaches `target`
    pub async fn wait_for_state(&self, target: SessionState, timeout: Duration) -> ClientResult<()> {
        let mut rx = self.inner.state_tx.subscribe();
        let reached = tokio::time::timeout(timeout, async move {
            rx.wait_for(|state| *state == target).await.map(|_| ())
        })
        .await;

        match reached {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(ClientError::internal_error("state channel closed")),
            Err(_) => Err(ClientError::OperationTimeout {
                duration_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Id the room assigned to this client; `None` until `Open`
    pub async fn connection_id(&self) -> Option<String> {
        self.inner.session.read().await.connection_id.clone()
    }

    pub async fn meta(&self) -> Metadata {
        self.inner.session.read().await.meta.clone()
    }

    pub async fn local_tracks(&self) -> Vec<LocalTrack> {
        self.inner.session.read().await.local_tracks.clone()
    }

    /// First local track of `kind`
    pub async fn local_track(&self, kind: TrackKind) -> Option<LocalTrack> {
        self.inner
            .session
            .read()
            .await
            .local_tracks
            .iter()
            .find(|t| t.kind() == kind)
            .cloned()
    }

    pub async fn remote_connections(&self) -> Vec<RemoteConnection> {
        self.inner.session.read().await.remote_connections.clone()
    }

    pub async fn remote_tracks(&self, connection_id: &str) -> ClientResult<Vec<RemoteTrack>> {
        self.inner
            .session
            .read()
            .await
            .remote_connections
            .iter()
            .find(|c| c.connection_id == connection_id)
            .map(|c| c.tracks.clone())
            .ok_or_else(|| ClientError::ConnectionNotFound {
                connection_id: connection_id.to_string(),
            })
    }

    // ===== EVENTS =====

    pub fn subscribe(&self, subscription: EventSubscription) -> uuid::Uuid {
        self.inner.emitter.subscribe(subscription)
    }

    /// Register a handler for every event
    pub fn set_event_handler(&self, handler: Arc<dyn ClientEventHandler>) -> uuid::Uuid {
        self.subscribe(EventSubscription::all_events(handler))
    }

    pub fn unsubscribe(&self, subscription_id: uuid::Uuid) -> bool {
        self.inner.emitter.unsubscribe(subscription_id)
    }

    /// Raw event stream; events emitted before subscribing are not replayed
    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    pub(crate) fn require_open(&self, operation: &str) -> ClientResult<()> {
        let state = self.state();
        if state.is_active() {
            Ok(())
        } else {
            Err(ClientError::invalid_state(operation, state))
        }
    }
}

impl ClientInner {
    pub(crate) fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Move to `next` if the current state allows it
    fn transition(&self, next: SessionState) -> bool {
        let mut previous = None;
        let changed = self.state_tx.send_if_modified(|state| {
            if state.can_transition_to(next) {
                previous = Some(*state);
                *state = next;
                true
            } else {
                false
            }
        });
        if let Some(previous) = previous {
            debug!("Session state {} -> {}", previous, next);
        }
        changed
    }

    pub(crate) fn emit(&self, event: ClientEvent) {
        let _ = self.broadcast_tx.send(event.clone());
        if self.dispatch_tx.send(event).is_err() {
            warn!("Event dispatcher is gone; event dropped");
        }
    }

    /// Abort a connect that never reached the transport
    fn fail_connect(&self, error: ClientError) -> ClientError {
        warn!("Connect rejected: {}", error);
        self.emit(ClientEvent::Error(ErrorEvent::new(error.clone(), Some("connect".to_string()))));
        self.transition(SessionState::Closed);
        self.emit(ClientEvent::Closed {
            reason: Some(error.to_string()),
        });
        error
    }

    pub(crate) fn stop_stats_polling(&self) -> bool {
        match self.stats_task.lock().take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    /// Tear down the current session, or only session `epoch` if given
    ///
    /// Returns `false` if there was nothing to close.
    async fn teardown(&self, epoch: Option<u64>, reason: Option<String>) -> bool {
        let _lifecycle = self.lifecycle.lock().await;
        if epoch.is_some_and(|e| e != self.epoch.load(Ordering::SeqCst)) {
            return false;
        }
        if !self.transition(SessionState::Closing) {
            return false;
        }
        self.emit(ClientEvent::Closing);

        if self.stop_stats_polling() {
            debug!("Stats polling stopped");
        }
        if let Err(e) = self.transport.close().await {
            warn!("Transport close failed: {}", e);
        }
        if let Some(shutdown) = self.shutdown.lock().take() {
            let _ = shutdown.send(true);
        }

        let session = std::mem::take(&mut *self.session.write().await);
        for track in &session.local_tracks {
            if let Some(capturer) = track.media_stream_track().capturer() {
                capturer.stop();
            }
            self.emit(ClientEvent::RemoveLocalTrack(LocalTrackEvent::new(track)));
        }

        self.transition(SessionState::Closed);
        info!(
            "Session {} closed{}",
            session.connection_id.as_deref().unwrap_or("(unopened)"),
            reason.as_deref().map(|r| format!(": {}", r)).unwrap_or_default()
        );
        self.emit(ClientEvent::Closed { reason });
        true
    }

    async fn handle_transport_event(&self, epoch: u64, event: TransportEvent) {
        let state = self.state();
        match event {
            TransportEvent::Opened { connection_id } => {
                if state != SessionState::Connecting {
                    warn!("Ignoring open of {} in state {}", connection_id, state);
                    return;
                }

                // Observers of the Open state see the id and running capturers
                let opened_at = Utc::now();
                let local_tracks = {
                    let mut session = self.session.write().await;
                    session.connection_id = Some(connection_id.clone());
                    session.opened_at = Some(opened_at);
                    session.local_tracks.clone()
                };
                for track in &local_tracks {
                    if let Some(capturer) = track.media_stream_track().capturer() {
                        capturer.start();
                    }
                }

                if !self.transition(SessionState::Open) {
                    for track in &local_tracks {
                        if let Some(capturer) = track.media_stream_track().capturer() {
                            capturer.stop();
                        }
                    }
                    let mut session = self.session.write().await;
                    session.connection_id = None;
                    session.opened_at = None;
                    warn!("Session {} closed before it opened", connection_id);
                    return;
                }
                info!("Session open as {}", connection_id);
                self.emit(ClientEvent::Open(OpenEvent {
                    connection_id,
                    timestamp: opened_at,
                }));
            }
            TransportEvent::Error { kind, detail } => {
                let error = kind.into_client_error(detail.clone());
                error!("Transport error: {}", error);
                self.emit(ClientEvent::Error(ErrorEvent::new(error, Some(detail))));
            }
            TransportEvent::Closed { reason } => {
                info!("Room closed the session: {:?}", reason);
                self.teardown(Some(epoch), reason).await;
            }
            event if !state.is_active() => {
                warn!("Ignoring {:?} in state {}", event, state);
            }
            event => self.handle_room_event(event).await,
        }
    }

    /// Remote participant events; only called while `Open`
    async fn handle_room_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::RemoteConnectionAdded { connection_id, meta } => {
                {
                    let mut session = self.session.write().await;
                    if session.remote_connection_mut(&connection_id).is_some() {
                        warn!("Remote connection {} announced twice", connection_id);
                        return;
                    }
                    session
                        .remote_connections
                        .push(RemoteConnection::new(connection_id.clone(), meta.clone()));
                }
                debug!("Remote connection {} added", connection_id);
                self.emit(ClientEvent::AddRemoteConnection(RemoteConnectionEvent { connection_id, meta }));
            }
            TransportEvent::RemoteConnectionUpdated { connection_id, meta } => {
                {
                    let mut session = self.session.write().await;
                    let Some(connection) = session.remote_connection_mut(&connection_id) else {
                        warn!("Update for unknown remote connection {}", connection_id);
                        return;
                    };
                    connection.meta = meta.clone();
                }
                self.emit(ClientEvent::UpdateRemoteConnection(RemoteConnectionEvent { connection_id, meta }));
            }
            TransportEvent::RemoteConnectionRemoved { connection_id } => {
                let removed = {
                    let mut session = self.session.write().await;
                    let position = session
                        .remote_connections
                        .iter()
                        .position(|c| c.connection_id == connection_id);
                    position.map(|i| session.remote_connections.remove(i))
                };
                let Some(connection) = removed else {
                    warn!("Removal of unknown remote connection {}", connection_id);
                    return;
                };
                debug!(
                    "Remote connection {} removed with {} tracks",
                    connection_id,
                    connection.tracks.len()
                );
                self.emit(ClientEvent::RemoveRemoteConnection(RemoveRemoteConnectionEvent {
                    connection_id: connection.connection_id,
                    meta: connection.meta,
                    tracks: connection.tracks,
                }));
            }
            TransportEvent::RemoteTrackAdded { connection_id, track } => {
                let media = MediaStreamTrack::with_id(
                    track.track_id.clone(),
                    track.kind,
                    format!("remote-{}", track.kind),
                );
                media.set_enabled(track.mute.track_enabled());
                let remote = RemoteTrack {
                    connection_id: connection_id.clone(),
                    track: media,
                    stream_id: track.stream_id,
                    meta: track.meta,
                    mute: track.mute,
                };

                // A track may arrive before its connection was announced
                let implicit_connection = {
                    let mut session = self.session.write().await;
                    match session.remote_connection_mut(&connection_id) {
                        Some(connection) => {
                            if connection.track(remote.track_id()).is_some() {
                                warn!("Remote track {} announced twice", remote.track_id());
                                return;
                            }
                            connection.tracks.push(remote.clone());
                            false
                        }
                        None => {
                            let mut connection = RemoteConnection::new(connection_id.clone(), Metadata::new());
                            connection.tracks.push(remote.clone());
                            session.remote_connections.push(connection);
                            true
                        }
                    }
                };
                if implicit_connection {
                    self.emit(ClientEvent::AddRemoteConnection(RemoteConnectionEvent {
                        connection_id: connection_id.clone(),
                        meta: Metadata::new(),
                    }));
                }
                debug!("Remote {} track {} added for {}", remote.track.kind(), remote.track_id(), connection_id);
                self.emit(ClientEvent::AddRemoteTrack(remote));
            }
            TransportEvent::RemoteTrackUpdated {
                connection_id,
                track_id,
                meta,
            } => {
                let updated = {
                    let mut session = self.session.write().await;
                    session
                        .remote_connection_mut(&connection_id)
                        .and_then(|c| c.track_mut(&track_id))
                        .map(|track| {
                            track.meta = meta;
                            track.clone()
                        })
                };
                match updated {
                    Some(track) => self.emit(ClientEvent::UpdateRemoteTrack(track)),
                    None => warn!("Update for unknown remote track {}", track_id),
                }
            }
            TransportEvent::RemoteMuteChanged {
                connection_id,
                track_id,
                mute,
            } => {
                let updated = {
                    let mut session = self.session.write().await;
                    session
                        .remote_connection_mut(&connection_id)
                        .and_then(|c| c.track_mut(&track_id))
                        .map(|track| {
                            track.mute = mute;
                            track.track.set_enabled(mute.track_enabled());
                            track.clone()
                        })
                };
                match updated {
                    Some(track) => self.emit(ClientEvent::UpdateMute(track)),
                    None => warn!("Mute change for unknown remote track {}", track_id),
                }
            }
            TransportEvent::Opened { .. } | TransportEvent::Error { .. } | TransportEvent::Closed { .. } => {}
        }
    }
}

async fn run_event_loop(
    inner: Weak<ClientInner>,
    epoch: u64,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            event = events.recv() => {
                let Some(inner) = inner.upgrade() else { break };
                if inner.epoch.load(Ordering::SeqCst) != epoch {
                    break;
                }
                match event {
                    Some(event) => inner.handle_transport_event(epoch, event).await,
                    None => {
                        // Stream ended without a close notification
                        inner
                            .teardown(Some(epoch), Some("transport closed".to_string()))
                            .await;
                        break;
                    }
                }
            }
        }
    }
    debug!("Event loop of session {} finished", epoch);
}
