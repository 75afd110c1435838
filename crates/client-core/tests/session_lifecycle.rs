//! Session lifecycle against the loopback room

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use roomkit_client_core::{
    ClientBuilder, ClientError, ClientEvent, ClientEventHandler, ClientEventKind, ConnectOption,
    LoopbackTransport, MuteType, SessionState, TransportEvent, VideoCapturer,
};
use roomkit_token_core::{AccessTokenIssuer, TokenConfig};

use common::*;

#[tokio::test]
async fn test_connect_and_disconnect_event_order() {
    let mut session = open_session().await;

    assert_eq!(
        kinds_until(&mut session.events, ClientEventKind::Open).await,
        vec![
            ClientEventKind::Connecting,
            ClientEventKind::AddLocalTrack,
            ClientEventKind::AddLocalTrack,
            ClientEventKind::Open,
        ]
    );
    assert!(session.client.connection_id().await.is_some());
    assert!(session.camera.is_capturing());

    session.client.disconnect().await.unwrap();

    assert_eq!(
        kinds_until(&mut session.events, ClientEventKind::Closed).await,
        vec![
            ClientEventKind::Closing,
            ClientEventKind::RemoveLocalTrack,
            ClientEventKind::RemoveLocalTrack,
            ClientEventKind::Closed,
        ]
    );
    assert_eq!(session.client.state(), SessionState::Closed);
    assert!(session.client.local_tracks().await.is_empty());
    assert!(session.client.connection_id().await.is_none());
    assert!(!session.camera.is_capturing());
    assert_eq!(session.camera.start_count(), 1);
    assert!(!session.room.is_connected());
}

#[tokio::test]
async fn test_connect_request_carries_tracks_and_meta() {
    let session = open_session().await;

    let request = session.room.connect_request().unwrap();
    assert_eq!(request.client_id, "test-client");
    assert_eq!(request.meta["connection_metadata"], "test");
    assert_eq!(request.tracks.len(), 2);
    assert_eq!(request.tracks[0].track_id, session.audio.id());
    assert_eq!(request.tracks[1].meta["track_metadata"], "video");
    assert!(request.tracks.iter().all(|t| t.mute == MuteType::Unmute));
}

#[tokio::test]
async fn test_empty_token_fails_authentication() {
    let (client, room) = new_client();
    let mut events = client.subscribe_events();

    let err = client.connect("test-client", "", ConnectOption::new()).await.unwrap_err();

    assert!(matches!(err, ClientError::AuthenticationFailed { .. }));
    assert_eq!(client.state(), SessionState::Closed);
    assert!(!room.is_connected());
    assert_eq!(
        kinds_until(&mut events, ClientEventKind::Closed).await,
        vec![ClientEventKind::Connecting, ClientEventKind::Error, ClientEventKind::Closed]
    );
}

#[tokio::test]
async fn test_malformed_token_fails_authentication() {
    let (client, room) = new_client();

    let err = client
        .connect("test-client", "definitely.not-a.jwt!", ConnectOption::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::AuthenticationFailed { .. }));
    assert_eq!(client.state(), SessionState::Closed);
    assert!(room.sent_messages().is_empty());
}

#[tokio::test]
async fn test_room_rejects_token_signed_with_other_secret() {
    init_tracing();
    let room_issuer = AccessTokenIssuer::new(TokenConfig::new("room-secret", "room")).unwrap();
    let rogue_issuer = AccessTokenIssuer::new(TokenConfig::new("other-secret", "room")).unwrap();
    let transport = LoopbackTransport::with_verifier(room_issuer);
    let client = ClientBuilder::new().transport(Arc::new(transport)).build().unwrap();
    let mut events = client.subscribe_events();
    let camera = Arc::new(roomkit_client_core::CameraCapturer::default());
    let (audio, video) = local_tracks(camera.clone());

    let token = rogue_issuer.issue().unwrap();
    let err = client
        .connect(
            "test-client",
            token.as_str(),
            ConnectOption::new().with_local_tracks(vec![audio, video]),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::AuthenticationFailed { .. }));
    assert_eq!(
        kinds_until(&mut events, ClientEventKind::Closed).await,
        vec![
            ClientEventKind::Connecting,
            ClientEventKind::AddLocalTrack,
            ClientEventKind::AddLocalTrack,
            ClientEventKind::Error,
            ClientEventKind::RemoveLocalTrack,
            ClientEventKind::RemoveLocalTrack,
            ClientEventKind::Closed,
        ]
    );
    assert!(client.local_tracks().await.is_empty());
    assert!(!camera.is_capturing());
}

#[tokio::test]
async fn test_signed_token_opens_with_its_connection_id() {
    init_tracing();
    let config = TokenConfig::new("room-secret", "room");
    let issuer = AccessTokenIssuer::new(config.clone()).unwrap();
    let transport = LoopbackTransport::with_verifier(AccessTokenIssuer::new(config).unwrap());
    let client = ClientBuilder::new().transport(Arc::new(transport)).build().unwrap();

    let token = issuer.issue().unwrap();
    client.connect("test-client", token.as_str(), ConnectOption::new()).await.unwrap();
    client.wait_for_state(SessionState::Open, TIMEOUT).await.unwrap();

    assert_eq!(
        client.connection_id().await.as_deref(),
        Some(token.claims().connection_id.as_str())
    );
}

#[tokio::test]
async fn test_second_connect_is_refused() {
    let session = open_session().await;

    let err = session
        .client
        .connect("test-client", UNSIGNED_TOKEN, ConnectOption::new())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ClientError::InvalidState {
            operation: "connect".to_string(),
            state: SessionState::Open,
        }
    );
    assert_eq!(session.client.state(), SessionState::Open);
}

#[tokio::test]
async fn test_disconnect_without_session_is_noop() {
    let (client, room) = new_client();

    client.disconnect().await.unwrap();
    assert_eq!(client.state(), SessionState::Init);

    client.disconnect().await.unwrap();
    assert!(room.sent_messages().is_empty());
}

#[tokio::test]
async fn test_reconnect_after_close() {
    let mut session = open_session().await;
    session.client.disconnect().await.unwrap();
    wait_for_kind(&mut session.events, ClientEventKind::Closed).await;

    session
        .client
        .connect("test-client", UNSIGNED_TOKEN, ConnectOption::new())
        .await
        .unwrap();
    session
        .client
        .wait_for_state(SessionState::Open, TIMEOUT)
        .await
        .unwrap();
    assert!(session.room.is_connected());
    assert!(session.client.local_tracks().await.is_empty());
}

#[tokio::test]
async fn test_remote_close_tears_down_session() {
    let mut session = open_session().await;
    wait_for_kind(&mut session.events, ClientEventKind::Open).await;

    assert!(session.room.close_remotely("room ended"));

    match wait_for_kind(&mut session.events, ClientEventKind::Closed).await {
        ClientEvent::Closed { reason } => assert_eq!(reason.as_deref(), Some("room ended")),
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(session.client.state(), SessionState::Closed);
    assert!(!session.camera.is_capturing());
}

#[tokio::test]
async fn test_operations_require_open_session() {
    let (client, _room) = new_client();
    let camera = Arc::new(roomkit_client_core::CameraCapturer::default());
    let (audio, _video) = local_tracks(camera);

    let err = client.change_mute(&audio, MuteType::SoftMute).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidState { state: SessionState::Init, .. }));
    assert!(client.change_video_send_bitrate(500).await.is_err());
    assert!(client.get_stats(None).await.is_err());
    assert!(client.start_stats_polling(None).is_err());
}

#[tokio::test]
async fn test_wait_for_state_times_out() {
    let (client, _room) = new_client();
    let err = client
        .wait_for_state(SessionState::Open, std::time::Duration::from_millis(20))
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::OperationTimeout { duration_ms: 20 });
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<ClientEventKind>>,
}

#[async_trait]
impl ClientEventHandler for Recorder {
    async fn on_client_event(&self, event: ClientEvent) {
        self.events.lock().push(event.kind());
    }
}

#[tokio::test]
async fn test_handler_sees_events_in_emission_order() {
    init_tracing();
    let recorder = Arc::new(Recorder::default());
    let client = ClientBuilder::new()
        .transport(Arc::new(LoopbackTransport::new()))
        .event_handler(recorder.clone())
        .build()
        .unwrap();
    let mut events = client.subscribe_events();

    client.connect("test-client", UNSIGNED_TOKEN, ConnectOption::new()).await.unwrap();
    wait_for_kind(&mut events, ClientEventKind::Open).await;
    client.disconnect().await.unwrap();

    tokio::time::timeout(TIMEOUT, async {
        while recorder.events.lock().last() != Some(&ClientEventKind::Closed) {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(
        *recorder.events.lock(),
        vec![
            ClientEventKind::Connecting,
            ClientEventKind::Open,
            ClientEventKind::Closing,
            ClientEventKind::Closed,
        ]
    );
}

/// Disconnecting from inside a handler must not stall event delivery
struct DisconnectOnOpen {
    client: Mutex<Option<roomkit_client_core::Client>>,
}

#[async_trait]
impl ClientEventHandler for DisconnectOnOpen {
    async fn on_open(&self, _event: roomkit_client_core::OpenEvent) {
        let client = self.client.lock().take();
        if let Some(client) = client {
            client.disconnect().await.unwrap();
        }
    }
}

#[tokio::test]
async fn test_handler_may_disconnect() {
    let (client, _room) = new_client();
    let handler = Arc::new(DisconnectOnOpen {
        client: Mutex::new(Some(client.clone())),
    });
    client.set_event_handler(handler);

    client.connect("test-client", UNSIGNED_TOKEN, ConnectOption::new()).await.unwrap();
    client.wait_for_state(SessionState::Closed, TIMEOUT).await.unwrap();
}

#[test]
fn test_closed_event_reason_from_wire() {
    let event: TransportEvent = serde_json::from_str(r#"{"type":"closed","reason":"kicked"}"#).unwrap();
    assert_eq!(
        event,
        TransportEvent::Closed {
            reason: Some("kicked".to_string())
        }
    );
}
