//! Identity newtypes shared across every layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A unique identifier for a player seat — human or NPC.
///
/// Humans receive theirs at handshake time; NPC fill-ins are stamped with
/// ids above [`PlayerId::NPC_BASE`] when a game starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl PlayerId {
    /// NPC seats are numbered upward from here so they can never collide
    /// with authenticated humans.
    pub const NPC_BASE: u64 = 1 << 48;

    /// Whether this id belongs to a synthesized NPC seat.
    pub fn is_npc_range(&self) -> bool {
        self.0 >= Self::NPC_BASE
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A short join code identifying one room, e.g. `BRZKQ`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(pub String);

impl RoomCode {
    /// Length of generated room codes.
    pub const LEN: usize = 5;
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomCode {
    fn from(s: &str) -> Self {
        Self(s.to_uppercase())
    }
}

/// Identifier for a card: catalog templates live below 10 000, drawn
/// instances are stamped with fresh ids from 10 000 upward so duplicate
/// templates in one session stay distinguishable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct CardId(pub u32);

impl CardId {
    /// First instance id; everything below is catalog space.
    pub const INSTANCE_BASE: u32 = 10_000;
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// Identifier for a character class definition in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub u32);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&PlayerId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_player_id_npc_range() {
        assert!(!PlayerId(7).is_npc_range());
        assert!(PlayerId(PlayerId::NPC_BASE + 2).is_npc_range());
    }

    #[test]
    fn test_room_code_display_and_from() {
        let code = RoomCode::from("brzkq");
        assert_eq!(code.to_string(), "BRZKQ");
    }

    #[test]
    fn test_card_id_instance_base() {
        assert!(CardId(3).0 < CardId::INSTANCE_BASE);
        assert_eq!(CardId(10_000).0, CardId::INSTANCE_BASE);
    }

    #[test]
    fn test_ids_round_trip() {
        let pid: PlayerId = serde_json::from_str("9").unwrap();
        assert_eq!(pid, PlayerId(9));
        let code: RoomCode = serde_json::from_str("\"AB CDE\"").unwrap();
        assert_eq!(code.0, "AB CDE");
    }
}
