//! The per-room actor and its handle.

use std::collections::HashMap;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use gloomhall_catalog::Catalog;
use gloomhall_game::{Effects, GameConfig, GameState, PacingEvent};
use gloomhall_pacing::Pacer;
use gloomhall_protocol::{
    ClientIntent, GamePhase, PlayerId, Recipient, RoomCode, ServerNotice,
};

use crate::RoomError;

const COMMAND_BUFFER: usize = 64;

/// Everything the outside world can ask a room task to do.
pub enum RoomCommand {
    Join {
        player_id: PlayerId,
        name: String,
        /// Where this player's notices get delivered.
        outbound: mpsc::UnboundedSender<ServerNotice>,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Leave {
        player_id: PlayerId,
    },
    /// Re-attach a fresh notice channel to a seat that already exists,
    /// e.g. after a reconnect. The seat's state is untouched.
    Rebind {
        player_id: PlayerId,
        outbound: mpsc::UnboundedSender<ServerNotice>,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Intent {
        player_id: PlayerId,
        intent: ClientIntent,
    },
    Info {
        reply: oneshot::Sender<RoomInfo>,
    },
    Shutdown,
}

/// A point-in-time summary of a room.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub phase: GamePhase,
    pub seats: usize,
    pub humans: usize,
}

/// Cloneable access to one room task.
#[derive(Clone, Debug)]
pub struct RoomHandle {
    code: RoomCode,
    tx: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Seats a player and registers their notice channel.
    pub async fn join(
        &self,
        player_id: PlayerId,
        name: String,
        outbound: mpsc::UnboundedSender<ServerNotice>,
    ) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RoomCommand::Join {
                player_id,
                name,
                outbound,
                reply,
            })
            .await
            .map_err(|_| RoomError::Unavailable)?;
        rx.await.map_err(|_| RoomError::Unavailable)?
    }

    /// Swaps in a new notice channel for an existing seat and replays
    /// the current room snapshot to it.
    pub async fn rebind(
        &self,
        player_id: PlayerId,
        outbound: mpsc::UnboundedSender<ServerNotice>,
    ) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RoomCommand::Rebind {
                player_id,
                outbound,
                reply,
            })
            .await
            .map_err(|_| RoomError::Unavailable)?;
        rx.await.map_err(|_| RoomError::Unavailable)?
    }

    pub async fn leave(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.tx
            .send(RoomCommand::Leave { player_id })
            .await
            .map_err(|_| RoomError::Unavailable)
    }

    pub async fn intent(
        &self,
        player_id: PlayerId,
        intent: ClientIntent,
    ) -> Result<(), RoomError> {
        self.tx
            .send(RoomCommand::Intent { player_id, intent })
            .await
            .map_err(|_| RoomError::Unavailable)
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RoomCommand::Info { reply })
            .await
            .map_err(|_| RoomError::Unavailable)?;
        rx.await.map_err(|_| RoomError::Unavailable)
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(RoomCommand::Shutdown).await;
    }
}

/// Spawns a room task and returns its handle. `closed` is signalled with
/// the room code when the task exits so the store can drop its entry.
pub fn spawn_room(
    catalog: Arc<Catalog>,
    config: GameConfig,
    code: RoomCode,
    closed: mpsc::UnboundedSender<RoomCode>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let handle = RoomHandle {
        code: code.clone(),
        tx,
    };
    let actor = RoomActor {
        state: GameState::new(catalog, config, code.clone()),
        code,
        connections: HashMap::new(),
        pacer: Pacer::new(),
        cmd_rx: rx,
        rng: StdRng::from_os_rng(),
        finish_seen: false,
        closed,
    };
    tokio::spawn(actor.run());
    handle
}

struct RoomActor {
    state: GameState,
    code: RoomCode,
    connections: HashMap<PlayerId, mpsc::UnboundedSender<ServerNotice>>,
    pacer: Pacer<PacingEvent>,
    cmd_rx: mpsc::Receiver<RoomCommand>,
    rng: StdRng,
    finish_seen: bool,
    closed: mpsc::UnboundedSender<RoomCode>,
}

impl RoomActor {
    async fn run(mut self) {
        info!(room = %self.code, "room task started");
        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => {
                            if !self.handle_command(cmd) {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                event = self.pacer.next_due() => {
                    let fx = self.state.handle_pacing(event, &mut self.rng);
                    self.apply(fx);
                }
            }
        }
        info!(room = %self.code, "room task stopped");
        let _ = self.closed.send(self.code.clone());
    }

    /// Returns `false` when the room should shut down.
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                player_id,
                name,
                outbound,
                reply,
            } => {
                match self.state.join(player_id, name) {
                    Ok(fx) => {
                        self.connections.insert(player_id, outbound);
                        let _ = reply.send(Ok(()));
                        self.apply(fx);
                    }
                    Err(err) => {
                        let _ = reply.send(Err(err.into()));
                    }
                }
                true
            }
            RoomCommand::Rebind {
                player_id,
                outbound,
                reply,
            } => {
                if self.state.contains_player(player_id) {
                    let snapshot = self.state.snapshot();
                    let _ = outbound.send(ServerNotice::RoomSnapshot { snapshot });
                    self.connections.insert(player_id, outbound);
                    debug!(room = %self.code, player = %player_id, "seat rebound");
                    let _ = reply.send(Ok(()));
                } else {
                    let _ = reply.send(Err(RoomError::NotInRoom));
                }
                true
            }
            RoomCommand::Leave { player_id } => {
                self.connections.remove(&player_id);
                let fx = self.state.leave(player_id);
                self.apply(fx);
                if self.state.human_count() == 0 {
                    debug!(room = %self.code, "last human left");
                    return false;
                }
                true
            }
            RoomCommand::Intent { player_id, intent } => {
                let fx = self.state.handle_intent(player_id, intent, &mut self.rng);
                self.apply(fx);
                true
            }
            RoomCommand::Info { reply } => {
                let _ = reply.send(RoomInfo {
                    code: self.code.clone(),
                    phase: self.state.phase(),
                    seats: self.state.snapshot().players.len(),
                    humans: self.state.human_count(),
                });
                true
            }
            RoomCommand::Shutdown => false,
        }
    }

    fn apply(&mut self, fx: Effects) {
        for (to, notice) in fx.notices {
            self.deliver(to, notice);
        }
        for (delay, event) in fx.scheduled {
            self.pacer.schedule(delay, event);
        }
        // A finished game invalidates whatever beats were still queued.
        if self.state.is_finished() && !self.finish_seen {
            self.finish_seen = true;
            self.pacer.bump_generation();
            debug!(room = %self.code, "game finished, pending beats dropped");
        }
    }

    fn deliver(&mut self, to: Recipient, notice: ServerNotice) {
        match to {
            Recipient::All => {
                self.connections
                    .retain(|id, tx| match tx.send(notice.clone()) {
                        Ok(()) => true,
                        Err(_) => {
                            warn!(player = %id, "dropping dead notice channel");
                            false
                        }
                    });
            }
            Recipient::Player(target) => {
                if let Some(tx) = self.connections.get(&target) {
                    if tx.send(notice).is_err() {
                        self.connections.remove(&target);
                    }
                }
            }
            Recipient::AllExcept(skip) => {
                self.connections.retain(|id, tx| {
                    if *id == skip {
                        return true;
                    }
                    tx.send(notice.clone()).is_ok()
                });
            }
        }
    }
}
