use serde::Serialize;
use std::collections::btree_map::{BTreeMap, Entry};

use crate::world::person::Person;

/// Which side of a fight ended up with its age raised to the other's strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Combatant {
    Attacker,
    Defender,
}

/// A proposed cross-cell effect produced during the scan phase.
///
/// Intents are plain values computed against the frozen grid. Nothing is
/// mutated until the apply phase, after conflicts have been resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    /// Relocate the actor at `origin` into the empty cell `dest`.
    Move { origin: usize, dest: usize },
    /// Place `child` into the empty cell `dest`; the mother's cooldown becomes
    /// `mother_cooldown` only if the birth goes through.
    Spawn {
        origin: usize,
        dest: usize,
        child: Person,
        mother_cooldown: f32,
    },
    /// Pass the actor's remaining disease duration to a same-faction neighbor.
    Infect {
        origin: usize,
        dest: usize,
        duration: f32,
    },
    /// Audit record of a fight. When the defender lost, `loser_age` is written to it on apply.
    Fight {
        origin: usize,
        dest: usize,
        loser: Combatant,
        loser_age: f32,
    },
}

impl Intent {
    pub fn origin(&self) -> usize {
        match *self {
            Intent::Move { origin, .. }
            | Intent::Spawn { origin, .. }
            | Intent::Infect { origin, .. }
            | Intent::Fight { origin, .. } => origin,
        }
    }

    pub fn dest(&self) -> usize {
        match *self {
            Intent::Move { dest, .. }
            | Intent::Spawn { dest, .. }
            | Intent::Infect { dest, .. }
            | Intent::Fight { dest, .. } => dest,
        }
    }

    /// Move and Spawn change occupancy; Infect and Fight only touch the occupant.
    pub fn changes_occupancy(&self) -> bool {
        matches!(self, Intent::Move { .. } | Intent::Spawn { .. })
    }
}

/// Tally of intents by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IntentCounts {
    pub moves: u32,
    pub spawns: u32,
    pub infections: u32,
    pub fights: u32,
}

impl IntentCounts {
    pub fn add(&mut self, intent: &Intent) {
        match intent {
            Intent::Move { .. } => self.moves += 1,
            Intent::Spawn { .. } => self.spawns += 1,
            Intent::Infect { .. } => self.infections += 1,
            Intent::Fight { .. } => self.fights += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.moves + self.spawns + self.infections + self.fights
    }
}

/// Outcome of conflict resolution.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Surviving intents ordered by `(dest, origin)`: at most one Move or Spawn
    /// per destination, plus every Infect and Fight.
    pub winners: Vec<Intent>,
    pub discarded: Vec<Intent>,
}

/// Keep, for every destination cell, only the occupancy change with the lowest
/// origin index.
///
/// Infect and Fight never change who stands in a cell, so they cannot conflict
/// and all of them survive. Several effects on one target are applied in
/// ascending origin order. The result does not depend on the order intents
/// arrive in, so it is the same whichever partition produced them.
pub fn resolve_conflicts(intents: impl IntoIterator<Item = Intent>) -> Resolution {
    let mut placements: BTreeMap<usize, Intent> = BTreeMap::new();
    let mut effects = Vec::new();
    let mut discarded = Vec::new();

    for intent in intents {
        if !intent.changes_occupancy() {
            effects.push(intent);
            continue;
        }
        match placements.entry(intent.dest()) {
            Entry::Vacant(slot) => {
                slot.insert(intent);
            }
            Entry::Occupied(mut slot) => {
                if intent.origin() < slot.get().origin() {
                    discarded.push(slot.insert(intent));
                } else {
                    discarded.push(intent);
                }
            }
        }
    }

    // Each origin emits at most one intent, so the key is unique.
    let mut winners: Vec<Intent> = placements.into_values().chain(effects).collect();
    winners.sort_by_key(|i| (i.dest(), i.origin()));

    Resolution { winners, discarded }
}
