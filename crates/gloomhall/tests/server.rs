//! Integration tests for the server, handler, and full connection flow.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gloomhall::prelude::*;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port with instant pacing and returns the
/// address.
async fn start_server() -> String {
    let config = GameConfig {
        pacing: PacingProfile::instant(),
        ..GameConfig::default()
    };
    let server = GloomhallServerBuilder::new()
        .bind("127.0.0.1:0")
        .game_config(config)
        .build(OpenDoorAuth)
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

fn encode_envelope(payload: Payload) -> Message {
    let envelope = Envelope {
        seq: 0,
        timestamp: 0,
        channel: Channel::ReliableOrdered,
        payload,
    };
    let bytes = serde_json::to_vec(&envelope).expect("encode");
    Message::Binary(bytes.into())
}

fn decode_envelope(msg: Message) -> Envelope {
    serde_json::from_slice(&msg.into_data()).expect("decode")
}

async fn send(ws: &mut ClientWs, payload: Payload) {
    ws.send(encode_envelope(payload)).await.expect("send");
}

async fn recv(ws: &mut ClientWs) -> Payload {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for a message")
        .expect("stream ended")
        .expect("recv");
    decode_envelope(msg).payload
}

/// Reads messages until the predicate returns `Some`, skipping others.
async fn recv_until<T>(
    ws: &mut ClientWs,
    mut pick: impl FnMut(Payload) -> Option<T>,
) -> T {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let remaining = deadline - tokio::time::Instant::now();
        let msg = tokio::time::timeout(remaining, ws.next())
            .await
            .expect("timed out waiting for the expected message")
            .expect("stream ended")
            .expect("recv");
        if let Some(found) = pick(decode_envelope(msg).payload) {
            return found;
        }
    }
}

/// Sends a handshake and returns the assigned id and session token.
async fn handshake(ws: &mut ClientWs) -> (PlayerId, String) {
    handshake_with_token(ws, None).await
}

async fn handshake_with_token(
    ws: &mut ClientWs,
    token: Option<String>,
) -> (PlayerId, String) {
    send(
        ws,
        Payload::System(SystemMessage::Handshake {
            version: PROTOCOL_VERSION,
            token,
        }),
    )
    .await;
    match recv(ws).await {
        Payload::System(SystemMessage::HandshakeAck {
            player_id,
            session_token,
            ..
        }) => (player_id, session_token),
        other => panic!("expected HandshakeAck, got {other:?}"),
    }
}

/// Creates a room and returns its code, draining the join notices.
async fn create_room(ws: &mut ClientWs, name: &str) -> RoomCode {
    send(
        ws,
        Payload::System(SystemMessage::CreateRoom { name: name.into() }),
    )
    .await;
    let code = match recv(ws).await {
        Payload::System(SystemMessage::RoomJoined { room_code }) => room_code,
        other => panic!("expected RoomJoined, got {other:?}"),
    };
    // Roster update and snapshot follow membership confirmation.
    recv_until(ws, |p| match p {
        Payload::Notice(ServerNotice::RoomSnapshot { .. }) => Some(()),
        _ => None,
    })
    .await;
    code
}

async fn join_room(ws: &mut ClientWs, code: &RoomCode, name: &str) {
    send(
        ws,
        Payload::System(SystemMessage::JoinRoom {
            room_code: code.clone(),
            name: name.into(),
        }),
    )
    .await;
    match recv(ws).await {
        Payload::System(SystemMessage::RoomJoined { room_code }) => {
            assert_eq!(&room_code, code);
        }
        other => panic!("expected RoomJoined, got {other:?}"),
    }
}

// =========================================================================
// Connection plumbing
// =========================================================================

#[tokio::test]
async fn test_handshake_assigns_identity_and_token() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let (player_id, token) = handshake(&mut ws).await;
    assert!(player_id.0 > 0);
    assert!(!token.is_empty());
}

#[tokio::test]
async fn test_handshake_version_mismatch_rejected() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send(
        &mut ws,
        Payload::System(SystemMessage::Handshake {
            version: 999,
            token: None,
        }),
    )
    .await;
    match recv(&mut ws).await {
        Payload::System(SystemMessage::Error { code, .. }) => {
            assert_eq!(code, 400);
        }
        other => panic!("expected Error 400, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_handshake_first_message_rejected() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send(
        &mut ws,
        Payload::System(SystemMessage::Heartbeat { client_time: 0 }),
    )
    .await;
    match recv(&mut ws).await {
        Payload::System(SystemMessage::Error { code, .. }) => {
            assert_eq!(code, 400);
        }
        other => panic!("expected Error 400, got {other:?}"),
    }
}

#[tokio::test]
async fn test_heartbeat_echoes_client_time() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws).await;

    send(
        &mut ws,
        Payload::System(SystemMessage::Heartbeat { client_time: 12345 }),
    )
    .await;
    match recv(&mut ws).await {
        Payload::System(SystemMessage::HeartbeatAck { client_time, .. }) => {
            assert_eq!(client_time, 12345);
        }
        other => panic!("expected HeartbeatAck, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_envelope_skipped() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws).await;

    ws.send(Message::Binary(b"not json".to_vec().into()))
        .await
        .expect("send");

    // A valid heartbeat afterwards still works.
    send(
        &mut ws,
        Payload::System(SystemMessage::Heartbeat { client_time: 7 }),
    )
    .await;
    assert!(matches!(
        recv(&mut ws).await,
        Payload::System(SystemMessage::HeartbeatAck { client_time: 7, .. })
    ));
}

#[tokio::test]
async fn test_disconnect_closes_connection() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws).await;

    send(
        &mut ws,
        Payload::System(SystemMessage::Disconnect { reason: "bye".into() }),
    )
    .await;

    let result =
        tokio::time::timeout(Duration::from_secs(2), ws.next()).await;
    match result {
        Ok(Some(Ok(Message::Close(_)))) | Ok(None) => {}
        Ok(Some(Err(_))) => {}
        other => panic!("expected close, got {other:?}"),
    }
}

// =========================================================================
// Rooms over the wire
// =========================================================================

#[tokio::test]
async fn test_create_room_returns_five_letter_code() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws).await;

    let code = create_room(&mut ws, "Ada").await;
    assert_eq!(code.0.len(), 5);
    assert!(code.0.chars().all(|c| c.is_ascii_uppercase()));
}

#[tokio::test]
async fn test_join_unknown_room_is_404() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws).await;

    send(
        &mut ws,
        Payload::System(SystemMessage::JoinRoom {
            room_code: RoomCode::from("ZZZZZ"),
            name: "Grace".into(),
        }),
    )
    .await;
    match recv(&mut ws).await {
        Payload::System(SystemMessage::Error { code, .. }) => {
            assert_eq!(code, 404);
        }
        other => panic!("expected Error 404, got {other:?}"),
    }
}

#[tokio::test]
async fn test_second_player_joins_by_code() {
    let addr = start_server().await;

    let mut host = connect(&addr).await;
    handshake(&mut host).await;
    let code = create_room(&mut host, "Ada").await;

    let mut guest = connect(&addr).await;
    let (guest_id, _) = handshake(&mut guest).await;
    join_room(&mut guest, &code, "Grace").await;

    // The host sees the newcomer in the next roster update.
    let players = recv_until(&mut host, |p| match p {
        Payload::Notice(ServerNotice::PlayerListUpdate { players }) => {
            Some(players)
        }
        _ => None,
    })
    .await;
    assert!(players.iter().any(|p| p.id == guest_id));
}

#[tokio::test]
async fn test_intent_outside_room_is_rejected() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws).await;

    send(&mut ws, Payload::Intent(ClientIntent::EndTurn)).await;
    match recv(&mut ws).await {
        Payload::System(SystemMessage::Error { code, message }) => {
            assert_eq!(code, 400);
            assert!(message.contains("not in any room"));
        }
        other => panic!("expected Error 400, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cannot_create_second_room_while_seated() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws).await;
    create_room(&mut ws, "Ada").await;

    send(
        &mut ws,
        Payload::System(SystemMessage::CreateRoom { name: "Ada".into() }),
    )
    .await;
    let code = recv_until(&mut ws, |p| match p {
        Payload::System(SystemMessage::Error { code, .. }) => Some(code),
        _ => None,
    })
    .await;
    assert_eq!(code, 409);
}

// =========================================================================
// Reconnect
// =========================================================================

#[tokio::test]
async fn test_reconnect_resumes_identity_and_seat() {
    let addr = start_server().await;

    let mut ws = connect(&addr).await;
    let (player_id, token) = handshake(&mut ws).await;
    let code = create_room(&mut ws, "Ada").await;
    drop(ws);

    let mut ws = connect(&addr).await;
    let (resumed_id, _) =
        handshake_with_token(&mut ws, Some(token)).await;
    assert_eq!(resumed_id, player_id);

    // The seat is re-attached without a new JoinRoom.
    match recv(&mut ws).await {
        Payload::System(SystemMessage::RoomJoined { room_code }) => {
            assert_eq!(room_code, code);
        }
        other => panic!("expected RoomJoined, got {other:?}"),
    }
    let snapshot = recv_until(&mut ws, |p| match p {
        Payload::Notice(ServerNotice::RoomSnapshot { snapshot }) => {
            Some(snapshot)
        }
        _ => None,
    })
    .await;
    assert_eq!(snapshot.room_code, code);
    assert!(snapshot.players.iter().any(|p| p.id == player_id));
}

#[tokio::test]
async fn test_unknown_token_gets_fresh_identity() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let (player_id, token) =
        handshake_with_token(&mut ws, Some("stale-token".into())).await;
    assert!(player_id.0 > 0);
    assert_ne!(token, "stale-token");
}

// =========================================================================
// A game over the wire
// =========================================================================

#[tokio::test]
async fn test_two_humans_start_a_game() {
    let addr = start_server().await;

    let mut host = connect(&addr).await;
    let (host_id, _) = handshake(&mut host).await;
    let code = create_room(&mut host, "Ada").await;

    let mut guest = connect(&addr).await;
    let (guest_id, _) = handshake(&mut guest).await;
    join_room(&mut guest, &code, "Grace").await;

    send(
        &mut host,
        Payload::Intent(ClientIntent::ChooseClass {
            class_id: ClassId(1),
        }),
    )
    .await;
    send(
        &mut guest,
        Payload::Intent(ClientIntent::ChooseClass {
            class_id: ClassId(2),
        }),
    )
    .await;
    send(
        &mut host,
        Payload::Intent(ClientIntent::StartGame {
            mode: GameMode::Beginner,
        }),
    )
    .await;

    let snapshot = recv_until(&mut host, |p| match p {
        Payload::Notice(ServerNotice::GameStarted { snapshot }) => {
            Some(snapshot)
        }
        _ => None,
    })
    .await;

    // Two humans plus NPC fill-ins: four explorers and a DM.
    assert_eq!(snapshot.players.len(), 5);
    assert_eq!(snapshot.turn_order.len(), 5);
    assert_eq!(snapshot.phase, GamePhase::Active);
    let npcs = snapshot.players.iter().filter(|p| p.is_npc).count();
    assert_eq!(npcs, 3);
    assert!(snapshot.players.iter().any(|p| p.id == host_id));
    assert!(snapshot.players.iter().any(|p| p.id == guest_id));

    // With instant pacing the engine reaches a human turn on its own.
    let snapshot = recv_until(&mut guest, |p| match p {
        Payload::Notice(ServerNotice::RoomSnapshot { snapshot })
            if snapshot.active_player == Some(host_id)
                || snapshot.active_player == Some(guest_id) =>
        {
            Some(snapshot)
        }
        _ => None,
    })
    .await;
    assert!(snapshot.turns_elapsed >= 1);
}

#[tokio::test]
async fn test_start_game_requires_host() {
    let addr = start_server().await;

    let mut host = connect(&addr).await;
    handshake(&mut host).await;
    let code = create_room(&mut host, "Ada").await;

    let mut guest = connect(&addr).await;
    handshake(&mut guest).await;
    join_room(&mut guest, &code, "Grace").await;

    send(
        &mut guest,
        Payload::Intent(ClientIntent::StartGame {
            mode: GameMode::Beginner,
        }),
    )
    .await;
    let message = recv_until(&mut guest, |p| match p {
        Payload::Notice(ServerNotice::ActionError { message }) => {
            Some(message)
        }
        _ => None,
    })
    .await;
    assert!(!message.is_empty());
}

#[tokio::test]
async fn test_chat_relayed_to_room() {
    let addr = start_server().await;

    let mut host = connect(&addr).await;
    handshake(&mut host).await;
    let code = create_room(&mut host, "Ada").await;

    let mut guest = connect(&addr).await;
    handshake(&mut guest).await;
    join_room(&mut guest, &code, "Grace").await;

    send(
        &mut guest,
        Payload::Intent(ClientIntent::Chat {
            text: "ready when you are".into(),
        }),
    )
    .await;
    let text = recv_until(&mut host, |p| match p {
        Payload::Notice(ServerNotice::Chat { text, .. }) => Some(text),
        _ => None,
    })
    .await;
    assert_eq!(text, "ready when you are");
}
