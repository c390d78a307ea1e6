//! Envelope-level wire types and the shared game enums.

use serde::{Deserialize, Serialize};

use crate::ids::{PlayerId, RoomCode};
use crate::messages::{ClientIntent, ServerNotice};

/// Who should receive a server notice.
///
/// Game logic returns `(Recipient, ServerNotice)` pairs; the room actor
/// fans them out to the right connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every player in the room.
    All,
    /// One specific player (e.g. a targeted action error).
    Player(PlayerId),
    /// Everyone except the given player.
    AllExcept(PlayerId),
}

/// Delivery guarantee for a message. Turn-based traffic is always
/// reliable-ordered; the field exists so the envelope shape stays stable
/// if an unreliable transport is added later.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "PascalCase")]
pub enum Channel {
    #[default]
    ReliableOrdered,
    ReliableUnordered,
    Unreliable,
}

/// The coarse category a card template belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardKind {
    Item,
    Spell,
    Monster,
    Weapon,
    Armor,
    WorldEvent,
    PlayerEvent,
    Discovery,
    Potion,
    Scroll,
    Consumable,
}

/// The game mode picked at start. Advanced inserts a setup-choice phase
/// where each explorer picks a bonus starting card.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
pub enum GameMode {
    #[default]
    Beginner,
    Advanced,
}

/// Coarse session phase.
///
/// ```text
/// Lobby → AdvancedSetupChoice → Active
/// ```
///
/// Beginner mode skips the middle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Lobby,
    AdvancedSetupChoice,
    Active,
}

impl GamePhase {
    /// Whether class selection and game start are still possible.
    pub fn is_lobby(&self) -> bool {
        matches!(self, Self::Lobby)
    }

    /// Whether turn-gated player actions are accepted.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::AdvancedSetupChoice => write!(f, "AdvancedSetupChoice"),
            Self::Active => write!(f, "Active"),
        }
    }
}

/// A seat's role in the party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Explorer,
    Dm,
}

/// Framework-level messages: connecting, heartbeats, room membership.
///
/// Internally tagged so the JSON reads `{ "type": "Handshake", ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SystemMessage {
    /// Client → Server: first message on every connection.
    Handshake {
        version: u32,
        token: Option<String>,
    },

    /// Server → Client: connection accepted, identity assigned. The
    /// `session_token` can be presented in a later handshake to resume
    /// this identity after a dropped connection.
    HandshakeAck {
        player_id: PlayerId,
        session_token: String,
        server_time: u64,
    },

    /// Either direction: orderly disconnect with a reason for the logs.
    Disconnect { reason: String },

    /// Client → Server keep-alive.
    Heartbeat { client_time: u64 },

    /// Server → Client keep-alive echo with timing info.
    HeartbeatAck {
        client_time: u64,
        server_time: u64,
    },

    /// Client → Server: open a new room and join it as host.
    CreateRoom { name: String },

    /// Client → Server: join an existing room by its code.
    JoinRoom { room_code: RoomCode, name: String },

    /// Client → Server: leave the current room.
    LeaveRoom,

    /// Server → Client: membership confirmed. The full room snapshot
    /// follows as a [`ServerNotice::RoomSnapshot`].
    RoomJoined { room_code: RoomCode },

    /// Server → Client: something went wrong. `code` follows HTTP-style
    /// conventions (400 bad request, 401 unauthorized, 404 not found).
    Error { code: u16, message: String },
}

/// The content of an envelope.
///
/// Adjacently tagged: `{ "type": "Intent", "data": { ... } }`. The three
/// arms let the connection handler route without inspecting game data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    /// Framework plumbing (handshake, heartbeat, room membership).
    System(SystemMessage),
    /// A player intent, routed to the room actor.
    Intent(ClientIntent),
    /// A server notice, fanned out by the room actor.
    Notice(ServerNotice),
}

/// The top-level wire wrapper. Every message is an `Envelope`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-direction auto-incrementing sequence number.
    pub seq: u64,
    /// Milliseconds since the server started.
    pub timestamp: u64,
    /// Delivery guarantee; defaults to reliable-ordered when omitted.
    #[serde(default)]
    pub channel: Channel,
    /// The actual content.
    pub payload: Payload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_message_handshake_json_format() {
        let msg = SystemMessage::Handshake {
            version: 1,
            token: Some("abc".into()),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Handshake");
        assert_eq!(json["version"], 1);
        assert_eq!(json["token"], "abc");
    }

    #[test]
    fn test_system_message_join_room_round_trip() {
        let msg = SystemMessage::JoinRoom {
            room_code: RoomCode::from("QWXYZ"),
            name: "Ada".into(),
        };
        let bytes = serde_json::to_vec(&msg).unwrap();
        let decoded: SystemMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_payload_intent_json_format() {
        let payload = Payload::Intent(ClientIntent::EndTurn);
        let json: serde_json::Value = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "Intent");
        assert_eq!(json["data"]["type"], "EndTurn");
    }

    #[test]
    fn test_envelope_channel_defaults_when_missing() {
        let json = r#"{
            "seq": 1,
            "timestamp": 100,
            "payload": { "type": "System", "data": { "type": "LeaveRoom" } }
        }"#;
        let envelope: Envelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.channel, Channel::ReliableOrdered);
    }

    #[test]
    fn test_envelope_round_trip() {
        let envelope = Envelope {
            seq: 42,
            timestamp: 15_000,
            channel: Channel::ReliableOrdered,
            payload: Payload::System(SystemMessage::LeaveRoom),
        };
        let bytes = serde_json::to_vec(&envelope).unwrap();
        let decoded: Envelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(envelope, decoded);
    }

    #[test]
    fn test_game_phase_predicates() {
        assert!(GamePhase::Lobby.is_lobby());
        assert!(!GamePhase::Active.is_lobby());
        assert!(GamePhase::Active.is_active());
        assert!(!GamePhase::AdvancedSetupChoice.is_active());
    }

    #[test]
    fn test_decode_unknown_system_message_type_returns_error() {
        let unknown = r#"{"type": "FlyToMoon", "speed": 9000}"#;
        let result: Result<SystemMessage, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }

    #[test]
    fn test_recipient_round_trip() {
        for r in [
            Recipient::All,
            Recipient::Player(PlayerId(7)),
            Recipient::AllExcept(PlayerId(3)),
        ] {
            let bytes = serde_json::to_vec(&r).unwrap();
            let decoded: Recipient = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(r, decoded);
        }
    }
}
