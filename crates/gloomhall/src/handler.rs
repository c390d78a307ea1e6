//! Per-connection handler: handshake, identity, and message routing.
//!
//! Each accepted connection runs this handler on its own task:
//!   1. Receive Handshake → validate version, authenticate
//!   2. Resume the session by token, or create a fresh one
//!   3. Send HandshakeAck, then loop: socket frames in, room notices out

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use gloomhall_protocol::{
    Channel, ClientIntent, Codec, Envelope, Payload, PlayerId, ProtocolError,
    ServerNotice, SystemMessage,
};
use gloomhall_room::RoomError;
use gloomhall_session::Authenticator;
use gloomhall_transport::{Connection, WebSocketConnection};

use crate::GloomhallError;
use crate::server::{PROTOCOL_VERSION, ServerState};

/// How long the handler waits for the opening handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connections silent for this long are considered gone. Clients send
/// heartbeats well inside the window.
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Marks the session disconnected when the handler exits, starting the
/// reconnect window. Fires even if the handler errors out.
struct SessionGuard<'a, A, C> {
    player_id: PlayerId,
    state: &'a ServerState<A, C>,
}

impl<A, C> Drop for SessionGuard<'_, A, C> {
    fn drop(&mut self) {
        self.state.sessions.disconnect(self.player_id);
    }
}

/// The server→client half of one connection: envelope framing with a
/// per-connection sequence counter.
struct Outbound<'a, A, C> {
    conn: &'a WebSocketConnection,
    state: &'a ServerState<A, C>,
    seq: AtomicU64,
}

impl<A, C: Codec> Outbound<'_, A, C> {
    async fn payload(&self, payload: Payload) -> Result<(), GloomhallError> {
        let envelope = Envelope {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            timestamp: self.state.now(),
            channel: Channel::ReliableOrdered,
            payload,
        };
        let bytes = self.state.codec.encode(&envelope)?;
        self.conn
            .send(&bytes)
            .await
            .map_err(GloomhallError::Transport)
    }

    async fn system(&self, msg: SystemMessage) -> Result<(), GloomhallError> {
        self.payload(Payload::System(msg)).await
    }

    async fn error(
        &self,
        code: u16,
        message: &str,
    ) -> Result<(), GloomhallError> {
        self.system(SystemMessage::Error {
            code,
            message: message.to_string(),
        })
        .await
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A, C>>,
) -> Result<(), GloomhallError>
where
    A: Authenticator,
    C: Codec,
{
    let conn_id = conn.id();
    debug!(%conn_id, "handling new connection");

    let out = Outbound {
        conn: &conn,
        state: &state,
        seq: AtomicU64::new(0),
    };

    let player_id = perform_handshake(&conn, &state, &out).await?;
    info!(%conn_id, %player_id, "player connected");

    let _guard = SessionGuard {
        player_id,
        state: &state,
    };

    // Room notices for this player land here; the loop below relays them.
    let (notice_tx, mut notices) = mpsc::unbounded_channel::<ServerNotice>();

    // A resumed session may still hold a seat: re-attach it so the
    // player picks up where they left off.
    if let Some(room) = state.store.room_of(player_id) {
        if room.rebind(player_id, notice_tx.clone()).await.is_ok() {
            out.system(SystemMessage::RoomJoined {
                room_code: room.code().clone(),
            })
            .await?;
            info!(%player_id, room = %room.code(), "seat resumed");
        }
    }

    let idle = tokio::time::sleep(IDLE_TIMEOUT);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            frame = conn.recv() => {
                let data = match frame {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        info!(%player_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        debug!(%player_id, error = %e, "recv error");
                        break;
                    }
                };
                idle.as_mut().reset(
                    tokio::time::Instant::now() + IDLE_TIMEOUT,
                );

                let envelope: Envelope = match state.codec.decode(&data) {
                    Ok(env) => env,
                    Err(e) => {
                        debug!(%player_id, error = %e, "undecodable envelope");
                        continue;
                    }
                };

                match envelope.payload {
                    Payload::System(msg) => {
                        let close = handle_system_message(
                            &state, &out, player_id, &notice_tx, msg,
                        )
                        .await?;
                        if close {
                            let _ = conn.close().await;
                            break;
                        }
                    }
                    Payload::Intent(intent) => {
                        handle_intent(&state, &out, player_id, intent).await?;
                    }
                    Payload::Notice(_) => {
                        debug!(%player_id, "client sent a server notice, ignoring");
                    }
                }
            }

            notice = notices.recv() => {
                match notice {
                    Some(notice) => {
                        out.payload(Payload::Notice(notice)).await?;
                    }
                    // All senders gone means the room task is done with us.
                    None => break,
                }
            }

            () = &mut idle => {
                info!(%player_id, "connection idle, dropping");
                break;
            }
        }
    }

    // _guard drops here → reconnect window starts.
    Ok(())
}

/// Receives and validates the opening handshake, returning the player's
/// identity (resumed by token when possible, freshly minted otherwise).
async fn perform_handshake<A, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<A, C>>,
    out: &Outbound<'_, A, C>,
) -> Result<PlayerId, GloomhallError>
where
    A: Authenticator,
    C: Codec,
{
    let data = match tokio::time::timeout(HANDSHAKE_TIMEOUT, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(invalid("connection closed before handshake"));
        }
        Ok(Err(e)) => return Err(GloomhallError::Transport(e)),
        Err(_) => return Err(invalid("handshake timed out")),
    };

    let envelope: Envelope = state.codec.decode(&data)?;
    let (version, token) = match envelope.payload {
        Payload::System(SystemMessage::Handshake { version, token }) => {
            (version, token)
        }
        _ => {
            out.error(400, "expected Handshake").await?;
            return Err(invalid("first message must be Handshake"));
        }
    };

    if version != PROTOCOL_VERSION {
        let message = format!(
            "version mismatch: expected {PROTOCOL_VERSION}, got {version}"
        );
        out.error(400, &message).await?;
        return Err(invalid("protocol version mismatch"));
    }

    if let Err(e) = state.auth.authenticate(token.as_deref()).await {
        out.error(401, "unauthorized").await?;
        return Err(GloomhallError::Session(e));
    }

    // A known token resumes the old identity; anything else gets a new one.
    let (player_id, session_token) = match token
        .as_deref()
        .and_then(|t| state.sessions.reconnect(t).ok())
    {
        Some(id) => (id, token.unwrap_or_default()),
        None => state.sessions.create(),
    };

    out.system(SystemMessage::HandshakeAck {
        player_id,
        session_token,
        server_time: state.now(),
    })
    .await?;

    Ok(player_id)
}

/// Handles one system message. Returns `true` when the connection should
/// close.
async fn handle_system_message<A, C>(
    state: &Arc<ServerState<A, C>>,
    out: &Outbound<'_, A, C>,
    player_id: PlayerId,
    notice_tx: &mpsc::UnboundedSender<ServerNotice>,
    msg: SystemMessage,
) -> Result<bool, GloomhallError>
where
    A: Authenticator,
    C: Codec,
{
    match msg {
        SystemMessage::Heartbeat { client_time } => {
            state.sessions.touch(player_id);
            out.system(SystemMessage::HeartbeatAck {
                client_time,
                server_time: state.now(),
            })
            .await?;
        }

        SystemMessage::CreateRoom { name } => {
            let result = state
                .store
                .create_room(player_id, name, notice_tx.clone())
                .await;
            match result {
                Ok(handle) => {
                    out.system(SystemMessage::RoomJoined {
                        room_code: handle.code().clone(),
                    })
                    .await?;
                }
                Err(e) => {
                    out.error(room_error_code(&e), &e.to_string()).await?;
                }
            }
        }

        SystemMessage::JoinRoom { room_code, name } => {
            let result = state
                .store
                .join_room(&room_code, player_id, name, notice_tx.clone())
                .await;
            match result {
                Ok(handle) => {
                    out.system(SystemMessage::RoomJoined {
                        room_code: handle.code().clone(),
                    })
                    .await?;
                }
                Err(e) => {
                    out.error(room_error_code(&e), &e.to_string()).await?;
                }
            }
        }

        SystemMessage::LeaveRoom => {
            if let Err(e) = state.store.leave_room(player_id).await {
                debug!(%player_id, error = %e, "leave room failed");
            }
        }

        SystemMessage::Disconnect { reason } => {
            info!(%player_id, %reason, "client disconnected");
            return Ok(true);
        }

        // Server → client shapes have no business arriving here.
        _ => {
            debug!(%player_id, "ignoring unexpected system message");
        }
    }

    Ok(false)
}

/// Routes a game intent to the player's room.
async fn handle_intent<A, C>(
    state: &Arc<ServerState<A, C>>,
    out: &Outbound<'_, A, C>,
    player_id: PlayerId,
    intent: ClientIntent,
) -> Result<(), GloomhallError>
where
    A: Authenticator,
    C: Codec,
{
    let Some(room) = state.store.room_of(player_id) else {
        out.error(400, "not in any room").await?;
        return Ok(());
    };
    if let Err(e) = room.intent(player_id, intent).await {
        out.error(400, &e.to_string()).await?;
    }
    Ok(())
}

fn room_error_code(e: &RoomError) -> u16 {
    match e {
        RoomError::NotFound(_) => 404,
        RoomError::RoomFull
        | RoomError::AlreadyInRoom
        | RoomError::AlreadyStarted => 409,
        RoomError::NotInRoom => 400,
        RoomError::Unavailable => 503,
    }
}

fn invalid(message: &str) -> GloomhallError {
    GloomhallError::Protocol(ProtocolError::InvalidMessage(message.into()))
}
