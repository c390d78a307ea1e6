//! Creation, lookup, and reaping of rooms.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, info};

use gloomhall_catalog::Catalog;
use gloomhall_game::GameConfig;
use gloomhall_protocol::{PlayerId, RoomCode, ServerNotice};

use crate::room::{RoomHandle, spawn_room};
use crate::RoomError;

/// The server-wide registry of live rooms.
///
/// Rooms are created on demand with fresh five-letter codes; a
/// background task removes entries when their actor exits (last human
/// gone or explicit shutdown).
pub struct RoomStore {
    catalog: Arc<Catalog>,
    config: GameConfig,
    rooms: Mutex<HashMap<RoomCode, RoomHandle>>,
    player_rooms: Mutex<HashMap<PlayerId, RoomCode>>,
    closed_tx: mpsc::UnboundedSender<RoomCode>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RoomStore {
    pub fn new(catalog: Arc<Catalog>, config: GameConfig) -> Arc<Self> {
        let (closed_tx, mut closed_rx) = mpsc::unbounded_channel();
        let store = Arc::new(Self {
            catalog,
            config,
            rooms: Mutex::new(HashMap::new()),
            player_rooms: Mutex::new(HashMap::new()),
            closed_tx,
        });
        let weak = Arc::downgrade(&store);
        tokio::spawn(async move {
            while let Some(code) = closed_rx.recv().await {
                let Some(store) = weak.upgrade() else { break };
                store.reap(&code);
            }
        });
        store
    }

    /// Opens a new room with the caller as host.
    pub async fn create_room(
        &self,
        player_id: PlayerId,
        name: String,
        outbound: mpsc::UnboundedSender<ServerNotice>,
    ) -> Result<RoomHandle, RoomError> {
        if lock(&self.player_rooms).contains_key(&player_id) {
            return Err(RoomError::AlreadyInRoom);
        }
        // Mint and insert under one lock so two concurrent creates can
        // never claim the same code.
        let (code, handle) = {
            let mut rooms = lock(&self.rooms);
            let code = Self::fresh_code(&rooms);
            let handle = spawn_room(
                Arc::clone(&self.catalog),
                self.config,
                code.clone(),
                self.closed_tx.clone(),
            );
            rooms.insert(code.clone(), handle.clone());
            (code, handle)
        };
        info!(room = %code, host = %player_id, "room created");
        handle.join(player_id, name, outbound).await?;
        lock(&self.player_rooms).insert(player_id, code);
        Ok(handle)
    }

    /// Joins an existing room by code.
    pub async fn join_room(
        &self,
        code: &RoomCode,
        player_id: PlayerId,
        name: String,
        outbound: mpsc::UnboundedSender<ServerNotice>,
    ) -> Result<RoomHandle, RoomError> {
        if lock(&self.player_rooms).contains_key(&player_id) {
            return Err(RoomError::AlreadyInRoom);
        }
        let handle = lock(&self.rooms)
            .get(code)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        handle.join(player_id, name, outbound).await?;
        lock(&self.player_rooms).insert(player_id, code.clone());
        Ok(handle)
    }

    /// Removes a player from their room, if any.
    pub async fn leave_room(&self, player_id: PlayerId) -> Result<(), RoomError> {
        let code = lock(&self.player_rooms)
            .remove(&player_id)
            .ok_or(RoomError::NotInRoom)?;
        let handle = lock(&self.rooms).get(&code).cloned();
        if let Some(handle) = handle {
            handle.leave(player_id).await?;
        }
        Ok(())
    }

    /// The room a player currently sits in.
    pub fn room_of(&self, player_id: PlayerId) -> Option<RoomHandle> {
        let code = lock(&self.player_rooms).get(&player_id).cloned()?;
        lock(&self.rooms).get(&code).cloned()
    }

    pub fn room_count(&self) -> usize {
        lock(&self.rooms).len()
    }

    fn reap(&self, code: &RoomCode) {
        lock(&self.rooms).remove(code);
        lock(&self.player_rooms).retain(|_, c| c != code);
        debug!(room = %code, "room reaped");
    }

    /// A random five-letter code absent from `rooms`.
    fn fresh_code(rooms: &HashMap<RoomCode, RoomHandle>) -> RoomCode {
        let mut rng = rand::rng();
        loop {
            let code: String = (0..RoomCode::LEN)
                .map(|_| rng.random_range(b'A'..=b'Z') as char)
                .collect();
            let code = RoomCode(code);
            if !rooms.contains_key(&code) {
                return code;
            }
        }
    }
}
