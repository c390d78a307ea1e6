//! Shuffled draw piles.

use gloomhall_catalog::CardTemplate;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::cards::{CardInstance, InstanceCounter};

/// An ordered pile of stamped card instances. Draws come off the back.
/// Whether an empty deck refills is the caller's decision — world events
/// reshuffle, monsters run out.
#[derive(Debug, Default)]
pub struct Deck {
    cards: Vec<CardInstance>,
}

impl Deck {
    /// Stamps one instance per template and shuffles the pile.
    pub fn build(
        templates: &[&CardTemplate],
        ids: &mut InstanceCounter,
        rng: &mut impl Rng,
    ) -> Self {
        let mut cards: Vec<CardInstance> = templates
            .iter()
            .map(|t| CardInstance::stamp(t, ids))
            .collect();
        cards.shuffle(rng);
        Self { cards }
    }

    pub fn draw(&mut self) -> Option<CardInstance> {
        self.cards.pop()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
