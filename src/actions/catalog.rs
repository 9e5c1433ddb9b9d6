//! Action catalog
//!
//! Six capability classes, each with its own concrete variants. Selection is
//! two independent uniform draws: first the class, then the variant.

use crate::session::Control;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canned chat lines
pub const CHAT_MESSAGES: [&str; 5] = [
    "Hello server!",
    "Anyone here?",
    "Cool server!",
    "Just chilling",
    "Bot life!",
];

/// Canned slash commands
pub const COMMANDS: [&str; 5] = ["/help", "/spawn", "/kit", "/balance", "/list"];

/// How far block interactions look for a target
pub const BLOCK_REACH: f64 = 5.0;

/// Capability class of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Toggle one movement control on
    Movement,
    /// Look at and walk towards a random nearby entity
    Explore,
    /// Look around, switch slot or drop an item
    WorldInteraction,
    /// Send a canned chat line
    Chat,
    /// Send a canned slash command
    Command,
    /// Dig or place a block
    BlockInteraction,
}

impl ActionKind {
    pub const ALL: [ActionKind; 6] = [
        ActionKind::Movement,
        ActionKind::Explore,
        ActionKind::WorldInteraction,
        ActionKind::Chat,
        ActionKind::Command,
        ActionKind::BlockInteraction,
    ];

    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movement => write!(f, "movement"),
            Self::Explore => write!(f, "explore"),
            Self::WorldInteraction => write!(f, "world-interaction"),
            Self::Chat => write!(f, "chat"),
            Self::Command => write!(f, "command"),
            Self::BlockInteraction => write!(f, "block-interaction"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldInteraction {
    LookAround,
    SelectSlot,
    DropItem,
}

impl WorldInteraction {
    pub const ALL: [WorldInteraction; 3] = [
        WorldInteraction::LookAround,
        WorldInteraction::SelectSlot,
        WorldInteraction::DropItem,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockInteraction {
    Dig,
    Place,
}

impl BlockInteraction {
    pub const ALL: [BlockInteraction; 2] = [BlockInteraction::Dig, BlockInteraction::Place];
}

/// One catalog entry with its variant chosen
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Movement(Control),
    Explore,
    World(WorldInteraction),
    Chat(String),
    Command(String),
    Block(BlockInteraction),
}

impl Action {
    /// Draw a class, then a variant within it
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        match ActionKind::sample(rng) {
            ActionKind::Movement => Self::Movement(pick(&Control::ALL, rng)),
            ActionKind::Explore => Self::Explore,
            ActionKind::WorldInteraction => Self::World(pick(&WorldInteraction::ALL, rng)),
            ActionKind::Chat => Self::Chat(pick(&CHAT_MESSAGES, rng).to_string()),
            ActionKind::Command => Self::Command(pick(&COMMANDS, rng).to_string()),
            ActionKind::BlockInteraction => Self::Block(pick(&BlockInteraction::ALL, rng)),
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Movement(_) => ActionKind::Movement,
            Self::Explore => ActionKind::Explore,
            Self::World(_) => ActionKind::WorldInteraction,
            Self::Chat(_) => ActionKind::Chat,
            Self::Command(_) => ActionKind::Command,
            Self::Block(_) => ActionKind::BlockInteraction,
        }
    }
}

fn pick<T: Copy, R: Rng + ?Sized>(options: &[T], rng: &mut R) -> T {
    // Catalog slices are constant and non-empty
    *options.choose(rng).unwrap_or(&options[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_every_kind_is_reachable() {
        let mut rng = StdRng::seed_from_u64(42);
        let kinds: HashSet<ActionKind> = (0..600).map(|_| Action::random(&mut rng).kind()).collect();
        assert_eq!(kinds.len(), ActionKind::ALL.len());
    }

    #[test]
    fn test_variants_come_from_catalog() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..300 {
            match Action::random(&mut rng) {
                Action::Chat(text) => assert!(CHAT_MESSAGES.contains(&text.as_str())),
                Action::Command(text) => {
                    assert!(COMMANDS.contains(&text.as_str()));
                    assert!(text.starts_with('/'));
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_selection_is_roughly_uniform() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut counts = std::collections::HashMap::new();
        for _ in 0..6000 {
            *counts.entry(ActionKind::sample(&mut rng)).or_insert(0usize) += 1;
        }
        for kind in ActionKind::ALL {
            let n = counts[&kind];
            assert!((800..1200).contains(&n), "{} drawn {} times", kind, n);
        }
    }
}
