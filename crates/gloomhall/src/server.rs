//! `GloomhallServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → session → room.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use gloomhall_catalog::Catalog;
use gloomhall_game::GameConfig;
use gloomhall_protocol::{Codec, JsonCodec, PlayerId};
use gloomhall_room::RoomStore;
use gloomhall_session::{Authenticator, SessionConfig, SessionManager};
use gloomhall_transport::{Transport, WebSocketTransport};

use crate::GloomhallError;
use crate::handler::handle_connection;

/// The current protocol version. Clients must send it in their handshake
/// or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;

/// How often disconnected sessions are checked against their reconnect
/// window.
const EXPIRY_SWEEP: Duration = Duration::from_secs(10);

/// Shared server state, one per server, cloned into each connection task.
pub(crate) struct ServerState<A, C> {
    pub(crate) sessions: SessionManager,
    pub(crate) store: Arc<RoomStore>,
    pub(crate) auth: A,
    pub(crate) codec: C,
    /// Epoch for envelope timestamps.
    pub(crate) started: Instant,
}

impl<A, C> ServerState<A, C> {
    /// Milliseconds since the server started.
    pub(crate) fn now(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Builder for configuring and starting a Gloomhall server.
///
/// ```rust,no_run
/// # async fn run() -> Result<(), gloomhall::GloomhallError> {
/// use gloomhall::prelude::*;
///
/// let server = GloomhallServer::<OpenDoorAuth, gloomhall_protocol::JsonCodec>::builder()
///     .bind("0.0.0.0:8080")
///     .build(OpenDoorAuth)
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct GloomhallServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
    game_config: GameConfig,
    catalog: Option<Arc<Catalog>>,
}

impl GloomhallServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            session_config: SessionConfig::default(),
            game_config: GameConfig::default(),
            catalog: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Overrides game pacing and party rules; mainly useful in tests.
    pub fn game_config(mut self, config: GameConfig) -> Self {
        self.game_config = config;
        self
    }

    /// Swaps in a custom card catalog. Defaults to the built-in one.
    pub fn catalog(mut self, catalog: Arc<Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Binds the transport and assembles the server.
    ///
    /// Uses [`JsonCodec`] and [`WebSocketTransport`].
    pub async fn build<A>(
        self,
        auth: A,
    ) -> Result<GloomhallServer<A, JsonCodec>, GloomhallError>
    where
        A: Authenticator + 'static,
    {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let catalog = self
            .catalog
            .unwrap_or_else(|| Arc::new(Catalog::builtin()));

        let state = Arc::new(ServerState {
            sessions: SessionManager::new(self.session_config),
            store: RoomStore::new(catalog, self.game_config),
            auth,
            codec: JsonCodec,
            started: Instant::now(),
        });

        Ok(GloomhallServer { transport, state })
    }
}

impl Default for GloomhallServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Gloomhall server. Call [`run`](Self::run) to start accepting
/// connections.
pub struct GloomhallServer<A, C> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A, C>>,
}

impl<A, C> GloomhallServer<A, C>
where
    A: Authenticator + 'static,
    C: Codec,
{
    pub fn builder() -> GloomhallServerBuilder {
        GloomhallServerBuilder::new()
    }

    /// The local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, GloomhallError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// Each accepted connection gets its own handler task. A background
    /// sweep converts seats of players whose reconnect window lapsed.
    pub async fn run(mut self) -> Result<(), GloomhallError> {
        tracing::info!("gloomhall server running");

        spawn_expiry_sweep(Arc::clone(&self.state));

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Periodically expires stale sessions and frees their room seats. Holds
/// only a weak reference so the task dies with the server.
fn spawn_expiry_sweep<A, C>(state: Arc<ServerState<A, C>>)
where
    A: Authenticator + 'static,
    C: Codec,
{
    let weak = Arc::downgrade(&state);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(EXPIRY_SWEEP);
        ticker.set_missed_tick_behavior(
            tokio::time::MissedTickBehavior::Delay,
        );
        loop {
            ticker.tick().await;
            let Some(state) = weak.upgrade() else { break };
            for player_id in state.sessions.expire_stale() {
                free_seat(&state, player_id).await;
            }
        }
    });
}

async fn free_seat<A, C>(state: &ServerState<A, C>, player_id: PlayerId) {
    if let Err(e) = state.store.leave_room(player_id).await {
        tracing::debug!(
            player = %player_id,
            error = %e,
            "expired session had no seat to free"
        );
    } else {
        tracing::info!(player = %player_id, "reconnect window lapsed, seat freed");
    }
}
