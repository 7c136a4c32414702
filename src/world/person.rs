use serde::{Deserialize, Serialize};

// === Enums ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Faction {
    Red,
    Yellow,
    Violet,
    Blue,
    Unaffiliated,
}

impl Faction {
    pub const COUNT: usize = 5;

    pub fn all() -> &'static [Faction] {
        &[
            Faction::Red,
            Faction::Yellow,
            Faction::Violet,
            Faction::Blue,
            Faction::Unaffiliated,
        ]
    }

    /// Dense index used by per-faction accumulators.
    pub fn index(self) -> usize {
        match self {
            Faction::Red => 0,
            Faction::Yellow => 1,
            Faction::Violet => 2,
            Faction::Blue => 3,
            Faction::Unaffiliated => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Faction::Red => "Red",
            Faction::Yellow => "Yellow",
            Faction::Violet => "Violet",
            Faction::Blue => "Blue",
            Faction::Unaffiliated => "Unaffiliated",
        }
    }

    /// Display color. Derived from the faction, never used to identify it.
    pub fn color(self) -> Rgb {
        match self {
            Faction::Red => Rgb(255, 0, 0),
            Faction::Yellow => Rgb(255, 200, 0),
            Faction::Violet => Rgb(128, 0, 255),
            Faction::Blue => Rgb(0, 128, 255),
            Faction::Unaffiliated => Rgb(255, 255, 255),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    Female,
    Male,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Darken toward black by `factor` in [0, 1].
    pub fn shade(self, factor: f32) -> Rgb {
        let f = factor.clamp(0.0, 1.0);
        Rgb(
            (self.0 as f32 * f) as u8,
            (self.1 as f32 * f) as u8,
            (self.2 as f32 * f) as u8,
        )
    }
}

// === Person ===

/// A single member of the population. Lives in exactly one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub faction: Faction,
    pub sex: Sex,
    /// Years lived, plus any extra aging from disease or lost fights.
    pub age: f32,
    pub strength: u32,
    /// Years until the next birth; `<= 0` means eligible. Only females count down.
    pub reproduction_cooldown: f32,
    /// Years of disease left; `0` is healthy.
    pub disease_remaining: f32,
    /// Set on the tick the person was born or moved into this cell.
    ///
    /// Placements are applied after the whole grid has been scanned, so the
    /// scan never meets a person placed in the same tick and does not need to
    /// skip on this flag. It is cleared when the person is next evaluated.
    pub recently_placed: bool,
}

impl Person {
    pub fn is_female(&self) -> bool {
        self.sex == Sex::Female
    }

    pub fn is_diseased(&self) -> bool {
        self.disease_remaining > 0.0
    }

    pub fn can_reproduce(&self) -> bool {
        self.is_female() && self.reproduction_cooldown <= 0.0
    }

    /// True when the person would not survive its next death check.
    pub fn is_past_lifespan(&self, max_lifespan: f32) -> bool {
        self.age >= self.strength as f32 || self.age >= max_lifespan
    }
}

// === Cell ===

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Occupied(Person),
}

impl Cell {
    pub fn person(&self) -> Option<&Person> {
        match self {
            Cell::Occupied(p) => Some(p),
            Cell::Empty => None,
        }
    }

    pub fn person_mut(&mut self) -> Option<&mut Person> {
        match self {
            Cell::Occupied(p) => Some(p),
            Cell::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl From<Option<Person>> for Cell {
    fn from(person: Option<Person>) -> Self {
        match person {
            Some(p) => Cell::Occupied(p),
            None => Cell::Empty,
        }
    }
}
