//! NPC flavor-line pools.
//!
//! Lines may contain `{name}` and `{target}` placeholders; the NPC
//! behavior module substitutes them before narrating.

/// Flavor lines grouped by the situation that triggers them.
#[derive(Debug, Clone)]
pub struct DialoguePools {
    /// An NPC explorer attacks a monster.
    pub attack: Vec<String>,
    /// An NPC explorer heals an ally.
    pub heal: Vec<String>,
    /// An NPC explorer takes the guard stance.
    pub guard: Vec<String>,
    /// An NPC explorer has nothing useful to do.
    pub idle: Vec<String>,
    /// The DM spawns a monster.
    pub dm_spawn: Vec<String>,
    /// The DM plays a world event.
    pub dm_event: Vec<String>,
}

impl DialoguePools {
    pub(crate) fn builtin() -> Self {
        let lines = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect();
        Self {
            attack: lines(&[
                "{name} lunges at the {target} with a battle cry!",
                "{name} circles the {target}, weapon raised.",
                "\"Stay behind me!\" {name} charges the {target}.",
            ]),
            heal: lines(&[
                "{name} rushes to {target}'s side with a remedy.",
                "\"Hold still,\" mutters {name}, tending {target}'s wounds.",
            ]),
            guard: lines(&[
                "{name} plants their feet and raises a guard.",
                "{name} falls back into a defensive stance.",
            ]),
            idle: lines(&[
                "{name} scans the gloom, assessing the situation.",
                "{name} catches their breath and waits.",
            ]),
            dm_spawn: lines(&[
                "Something stirs in the dark... a {target} emerges!",
                "Claws scrape stone. A {target} blocks the way!",
            ]),
            dm_event: lines(&[
                "The hall itself seems to shift...",
                "A cold wind carries something new into the chamber.",
            ]),
        }
    }
}
