//! Event roll classification.

use gloomhall_protocol::EventOutcome;

/// Maps a d20 event roll onto its outcome band: 15+ discovery, 10–14
/// player event, below 10 nothing.
pub fn classify_event_roll(roll: i32) -> EventOutcome {
    if roll >= 15 {
        EventOutcome::Discovery
    } else if roll >= 10 {
        EventOutcome::PlayerEvent
    } else {
        EventOutcome::Nothing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_edges() {
        assert_eq!(classify_event_roll(1), EventOutcome::Nothing);
        assert_eq!(classify_event_roll(9), EventOutcome::Nothing);
        assert_eq!(classify_event_roll(10), EventOutcome::PlayerEvent);
        assert_eq!(classify_event_roll(14), EventOutcome::PlayerEvent);
        assert_eq!(classify_event_roll(15), EventOutcome::Discovery);
        assert_eq!(classify_event_roll(20), EventOutcome::Discovery);
    }
}
