//! Room lifecycle for Gloomhall.
//!
//! Each room is an actor: a tokio task that owns its [`GameState`] and a
//! [`Pacer`] of delayed beats, driven by a command channel. All access
//! goes through a cloneable [`RoomHandle`]; nothing outside the task can
//! touch game state directly, so there are no locks around the rules.
//!
//! The [`RoomStore`] creates rooms, generates join codes, tracks which
//! player sits where, and reaps rooms once their last human leaves.
//!
//! [`GameState`]: gloomhall_game::GameState
//! [`Pacer`]: gloomhall_pacing::Pacer

mod error;
mod room;
mod store;

pub use error::RoomError;
pub use room::{RoomCommand, RoomHandle, RoomInfo, spawn_room};
pub use store::RoomStore;
