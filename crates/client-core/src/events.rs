//! Event handling for room sessions
//!
//! The client reports everything that happens to a session through
//! [`ClientEvent`]s: lifecycle changes, local tracks being published or
//! withdrawn, remote participants and their tracks coming and going, and
//! asynchronous errors.
//!
//! Events of one client are delivered in emission order. A handler sees
//! `Connecting`, then one `AddLocalTrack` per published track, then `Open`;
//! teardown always ends with `Closing` (if the session was open) and `Closed`.
//!
//! ```rust
//! use roomkit_client_core::events::{ClientEventHandler, OpenEvent, RemoteConnectionEvent};
//! use async_trait::async_trait;
//!
//! struct LoggingHandler;
//!
//! #[async_trait]
//! impl ClientEventHandler for LoggingHandler {
//!     async fn on_open(&self, event: OpenEvent) {
//!         println!("joined as {}", event.connection_id);
//!     }
//!
//!     async fn on_add_remote_connection(&self, event: RemoteConnectionEvent) {
//!         println!("{} joined", event.connection_id);
//!     }
//! }
//! ```
//!
//! Handlers only see the events their [`EventFilter`] lets through:
//!
//! ```rust
//! use roomkit_client_core::events::{EventFilter, EventPriority};
//!
//! let filter = EventFilter {
//!     min_priority: Some(EventPriority::High),
//!     ..Default::default()
//! };
//! assert!(filter.kinds.is_none());
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::client::types::RemoteTrack;
use crate::error::ClientError;
use crate::media::{LocalTrack, Metadata};

/// Event priority levels for filtering
///
/// ```rust
/// use roomkit_client_core::events::EventPriority;
///
/// assert!(EventPriority::Critical > EventPriority::High);
/// assert!(EventPriority::Normal > EventPriority::Low);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventPriority {
    /// Metadata and mute updates
    Low,
    /// Tracks and remote connections
    Normal,
    /// Session lifecycle
    High,
    /// Errors
    Critical,
}

/// Discriminant of [`ClientEvent`], used for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientEventKind {
    Connecting,
    Open,
    Closing,
    Closed,
    AddLocalTrack,
    RemoveLocalTrack,
    AddRemoteConnection,
    UpdateRemoteConnection,
    RemoveRemoteConnection,
    AddRemoteTrack,
    UpdateRemoteTrack,
    UpdateMute,
    Error,
}

/// The session was accepted by the room service
#[derive(Debug, Clone)]
pub struct OpenEvent {
    /// Id the room service assigned to this client
    pub connection_id: String,
    pub timestamp: DateTime<Utc>,
}

/// A local track was published or withdrawn
#[derive(Debug, Clone)]
pub struct LocalTrackEvent {
    pub track: LocalTrack,
    pub stream_id: String,
}

impl LocalTrackEvent {
    pub(crate) fn new(track: &LocalTrack) -> Self {
        Self {
            stream_id: track.stream_id().to_string(),
            track: track.clone(),
        }
    }
}

/// A remote connection joined or changed its metadata
#[derive(Debug, Clone)]
pub struct RemoteConnectionEvent {
    pub connection_id: String,
    pub meta: Metadata,
}

/// A remote connection left; its tracks are gone with it
#[derive(Debug, Clone)]
pub struct RemoveRemoteConnectionEvent {
    pub connection_id: String,
    pub meta: Metadata,
    pub tracks: Vec<RemoteTrack>,
}

/// An error surfaced outside of a direct call's return value
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    pub error: ClientError,
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorEvent {
    pub fn new(error: ClientError, detail: Option<String>) -> Self {
        Self {
            error,
            detail,
            timestamp: Utc::now(),
        }
    }

    /// One-line description suitable for logs and bug reports
    pub fn to_report_string(&self) -> String {
        let mut report = format!(
            "{} [{}] {}",
            self.timestamp.format("%Y/%m/%d %H:%M:%S%.3f"),
            self.error.category(),
            self.error
        );
        if let Some(detail) = &self.detail {
            report.push_str(" (");
            report.push_str(detail);
            report.push(')');
        }
        report
    }
}

/// Everything a session reports to its observers
#[derive(Debug, Clone)]
pub enum ClientEvent {
    Connecting,
    Open(OpenEvent),
    Closing,
    Closed {
        /// Why the session ended, if it was not a local disconnect
        reason: Option<String>,
    },
    AddLocalTrack(LocalTrackEvent),
    RemoveLocalTrack(LocalTrackEvent),
    AddRemoteConnection(RemoteConnectionEvent),
    UpdateRemoteConnection(RemoteConnectionEvent),
    RemoveRemoteConnection(RemoveRemoteConnectionEvent),
    AddRemoteTrack(RemoteTrack),
    UpdateRemoteTrack(RemoteTrack),
    /// A remote track changed its mute state
    UpdateMute(RemoteTrack),
    Error(ErrorEvent),
}

impl ClientEvent {
    pub fn kind(&self) -> ClientEventKind {
        match self {
            ClientEvent::Connecting => ClientEventKind::Connecting,
            ClientEvent::Open(_) => ClientEventKind::Open,
            ClientEvent::Closing => ClientEventKind::Closing,
            ClientEvent::Closed { .. } => ClientEventKind::Closed,
            ClientEvent::AddLocalTrack(_) => ClientEventKind::AddLocalTrack,
            ClientEvent::RemoveLocalTrack(_) => ClientEventKind::RemoveLocalTrack,
            ClientEvent::AddRemoteConnection(_) => ClientEventKind::AddRemoteConnection,
            ClientEvent::UpdateRemoteConnection(_) => ClientEventKind::UpdateRemoteConnection,
            ClientEvent::RemoveRemoteConnection(_) => ClientEventKind::RemoveRemoteConnection,
            ClientEvent::AddRemoteTrack(_) => ClientEventKind::AddRemoteTrack,
            ClientEvent::UpdateRemoteTrack(_) => ClientEventKind::UpdateRemoteTrack,
            ClientEvent::UpdateMute(_) => ClientEventKind::UpdateMute,
            ClientEvent::Error(_) => ClientEventKind::Error,
        }
    }

    pub fn priority(&self) -> EventPriority {
        match self {
            ClientEvent::Error(_) => EventPriority::Critical,
            ClientEvent::Connecting
            | ClientEvent::Open(_)
            | ClientEvent::Closing
            | ClientEvent::Closed { .. } => EventPriority::High,
            ClientEvent::AddLocalTrack(_)
            | ClientEvent::RemoveLocalTrack(_)
            | ClientEvent::AddRemoteConnection(_)
            | ClientEvent::RemoveRemoteConnection(_)
            | ClientEvent::AddRemoteTrack(_) => EventPriority::Normal,
            ClientEvent::UpdateRemoteConnection(_)
            | ClientEvent::UpdateRemoteTrack(_)
            | ClientEvent::UpdateMute(_) => EventPriority::Low,
        }
    }

    /// Remote connection the event is about, if any
    pub fn connection_id(&self) -> Option<&str> {
        match self {
            ClientEvent::AddRemoteConnection(e) | ClientEvent::UpdateRemoteConnection(e) => {
                Some(&e.connection_id)
            }
            ClientEvent::RemoveRemoteConnection(e) => Some(&e.connection_id),
            ClientEvent::AddRemoteTrack(t)
            | ClientEvent::UpdateRemoteTrack(t)
            | ClientEvent::UpdateMute(t) => Some(&t.connection_id),
            _ => None,
        }
    }

    pub fn passes_filter(&self, filter: &EventFilter) -> bool {
        if let Some(min_priority) = filter.min_priority {
            if self.priority() < min_priority {
                return false;
            }
        }

        if let Some(kinds) = &filter.kinds {
            if !kinds.contains(&self.kind()) {
                return false;
            }
        }

        // Events without a connection never match a connection filter
        if let Some(connection_ids) = &filter.connection_ids {
            match self.connection_id() {
                Some(id) if connection_ids.contains(id) => {}
                _ => return false,
            }
        }

        true
    }
}

impl fmt::Display for ClientEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Which events a subscription receives; `None` fields match everything
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub kinds: Option<HashSet<ClientEventKind>>,
    pub connection_ids: Option<HashSet<String>>,
    pub min_priority: Option<EventPriority>,
}

impl EventFilter {
    pub fn kinds(kinds: impl IntoIterator<Item = ClientEventKind>) -> Self {
        Self {
            kinds: Some(kinds.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn connection(connection_id: impl Into<String>) -> Self {
        Self {
            connection_ids: Some(HashSet::from([connection_id.into()])),
            ..Default::default()
        }
    }
}

/// Receives session events
///
/// Every method has a no-op default; implement the ones you care about.
/// [`on_client_event`](Self::on_client_event) routes each event to its
/// method and normally does not need overriding.
#[async_trait]
pub trait ClientEventHandler: Send + Sync {
    async fn on_connecting(&self) {}

    async fn on_open(&self, _event: OpenEvent) {}

    async fn on_closing(&self) {}

    async fn on_closed(&self, _reason: Option<String>) {}

    async fn on_add_local_track(&self, _event: LocalTrackEvent) {}

    async fn on_remove_local_track(&self, _event: LocalTrackEvent) {}

    async fn on_add_remote_connection(&self, _event: RemoteConnectionEvent) {}

    async fn on_update_remote_connection(&self, _event: RemoteConnectionEvent) {}

    async fn on_remove_remote_connection(&self, _event: RemoveRemoteConnectionEvent) {}

    async fn on_add_remote_track(&self, _track: RemoteTrack) {}

    async fn on_update_remote_track(&self, _track: RemoteTrack) {}

    async fn on_update_mute(&self, _track: RemoteTrack) {}

    async fn on_error(&self, _event: ErrorEvent) {}

    async fn on_client_event(&self, event: ClientEvent) {
        match event {
            ClientEvent::Connecting => self.on_connecting().await,
            ClientEvent::Open(e) => self.on_open(e).await,
            ClientEvent::Closing => self.on_closing().await,
            ClientEvent::Closed { reason } => self.on_closed(reason).await,
            ClientEvent::AddLocalTrack(e) => self.on_add_local_track(e).await,
            ClientEvent::RemoveLocalTrack(e) => self.on_remove_local_track(e).await,
            ClientEvent::AddRemoteConnection(e) => self.on_add_remote_connection(e).await,
            ClientEvent::UpdateRemoteConnection(e) => self.on_update_remote_connection(e).await,
            ClientEvent::RemoveRemoteConnection(e) => self.on_remove_remote_connection(e).await,
            ClientEvent::AddRemoteTrack(t) => self.on_add_remote_track(t).await,
            ClientEvent::UpdateRemoteTrack(t) => self.on_update_remote_track(t).await,
            ClientEvent::UpdateMute(t) => self.on_update_mute(t).await,
            ClientEvent::Error(e) => self.on_error(e).await,
        }
    }
}

/// A handler paired with the filter deciding what it receives
#[derive(Clone)]
pub struct EventSubscription {
    handler: Arc<dyn ClientEventHandler>,
    filter: EventFilter,
    id: uuid::Uuid,
}

impl EventSubscription {
    pub fn new(handler: Arc<dyn ClientEventHandler>, filter: EventFilter) -> Self {
        Self {
            handler,
            filter,
            id: uuid::Uuid::new_v4(),
        }
    }

    pub fn all_events(handler: Arc<dyn ClientEventHandler>) -> Self {
        Self::new(handler, EventFilter::default())
    }

    /// Only events about one remote connection
    pub fn connection_events(handler: Arc<dyn ClientEventHandler>, connection_id: impl Into<String>) -> Self {
        Self::new(handler, EventFilter::connection(connection_id))
    }

    /// Lifecycle changes and errors only
    pub fn high_priority_events(handler: Arc<dyn ClientEventHandler>) -> Self {
        let filter = EventFilter {
            min_priority: Some(EventPriority::High),
            ..Default::default()
        };
        Self::new(handler, filter)
    }

    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn should_receive(&self, event: &ClientEvent) -> bool {
        event.passes_filter(&self.filter)
    }

    pub async fn deliver_event(&self, event: ClientEvent) {
        if self.should_receive(&event) {
            self.handler.on_client_event(event).await;
        }
    }
}

/// Fans events out to subscriptions
///
/// Delivery is sequential: each subscription finishes handling an event
/// before the next subscription (and the next event) is served, so every
/// handler observes events in emission order.
pub struct EventEmitter {
    subscriptions: RwLock<Vec<EventSubscription>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, subscription: EventSubscription) -> uuid::Uuid {
        let id = subscription.id();
        self.subscriptions.write().push(subscription);
        id
    }

    pub fn unsubscribe(&self, subscription_id: uuid::Uuid) -> bool {
        let mut subscriptions = self.subscriptions.write();
        if let Some(pos) = subscriptions.iter().position(|s| s.id() == subscription_id) {
            subscriptions.remove(pos);
            true
        } else {
            false
        }
    }

    pub async fn emit(&self, event: ClientEvent) {
        // Snapshot so handlers may (un)subscribe while being called
        let subscriptions = self.subscriptions.read().clone();
        for subscription in subscriptions {
            subscription.deliver_event(event.clone()).await;
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaStreamTrack, MuteType, TrackKind};

    #[derive(Default)]
    struct Recorder {
        seen: parking_lot::Mutex<Vec<ClientEventKind>>,
    }

    #[async_trait]
    impl ClientEventHandler for Recorder {
        async fn on_client_event(&self, event: ClientEvent) {
            self.seen.lock().push(event.kind());
        }
    }

    fn remote_track(connection_id: &str) -> RemoteTrack {
        RemoteTrack {
            connection_id: connection_id.to_string(),
            track: MediaStreamTrack::new(TrackKind::Video, "remote"),
            stream_id: "stream".to_string(),
            meta: Metadata::new(),
            mute: MuteType::Unmute,
        }
    }

    #[test]
    fn test_priorities() {
        assert_eq!(ClientEvent::Connecting.priority(), EventPriority::High);
        assert_eq!(ClientEvent::UpdateMute(remote_track("c1")).priority(), EventPriority::Low);
        let error = ClientEvent::Error(ErrorEvent::new(ClientError::internal_error("x"), None));
        assert_eq!(error.priority(), EventPriority::Critical);
    }

    #[test]
    fn test_connection_filter_rejects_unrelated_events() {
        let filter = EventFilter::connection("c1");
        assert!(ClientEvent::AddRemoteTrack(remote_track("c1")).passes_filter(&filter));
        assert!(!ClientEvent::AddRemoteTrack(remote_track("c2")).passes_filter(&filter));
        assert!(!ClientEvent::Connecting.passes_filter(&filter));
    }

    #[test]
    fn test_kind_filter() {
        let filter = EventFilter::kinds([ClientEventKind::Open, ClientEventKind::Closed]);
        assert!(ClientEvent::Closed { reason: None }.passes_filter(&filter));
        assert!(!ClientEvent::Closing.passes_filter(&filter));
    }

    #[test]
    fn test_error_report_string() {
        let event = ErrorEvent::new(
            ClientError::authentication_failed("empty token"),
            Some("connect".to_string()),
        );
        let report = event.to_report_string();
        assert!(report.contains("[auth] Authentication failed: empty token (connect)"));
    }

    #[tokio::test]
    async fn test_emitter_delivers_in_order_and_filters() {
        let emitter = EventEmitter::new();
        let all = Arc::new(Recorder::default());
        let high = Arc::new(Recorder::default());
        emitter.subscribe(EventSubscription::all_events(all.clone()));
        let high_id = emitter.subscribe(EventSubscription::high_priority_events(high.clone()));

        emitter.emit(ClientEvent::Connecting).await;
        emitter.emit(ClientEvent::AddRemoteTrack(remote_track("c1"))).await;
        emitter.emit(ClientEvent::Closed { reason: None }).await;

        assert_eq!(
            *all.seen.lock(),
            vec![
                ClientEventKind::Connecting,
                ClientEventKind::AddRemoteTrack,
                ClientEventKind::Closed
            ]
        );
        assert_eq!(*high.seen.lock(), vec![ClientEventKind::Connecting, ClientEventKind::Closed]);

        assert!(emitter.unsubscribe(high_id));
        assert!(!emitter.unsubscribe(high_id));
        assert_eq!(emitter.subscription_count(), 1);
    }
}
