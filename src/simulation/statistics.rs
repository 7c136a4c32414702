use serde::Serialize;
use std::fmt;

use crate::world::person::{Faction, Person};
use crate::world::Grid;

/// Running sums for one faction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FactionStats {
    pub count_total: u64,
    pub count_diseased: u64,
    pub sum_strength: u64,
    pub sum_age: f64,
}

impl FactionStats {
    pub fn record(&mut self, person: &Person) {
        self.count_total += 1;
        if person.is_diseased() {
            self.count_diseased += 1;
        }
        self.sum_strength += person.strength as u64;
        self.sum_age += person.age as f64;
    }

    pub fn merge(&mut self, other: &FactionStats) {
        self.count_total += other.count_total;
        self.count_diseased += other.count_diseased;
        self.sum_strength += other.sum_strength;
        self.sum_age += other.sum_age;
    }

    /// A count of 0 divides by 1, so empty factions report 0.
    fn divisor(&self) -> f64 {
        self.count_total.max(1) as f64
    }

    pub fn avg_age(&self) -> f64 {
        self.sum_age / self.divisor()
    }

    pub fn avg_strength(&self) -> f64 {
        self.sum_strength as f64 / self.divisor()
    }
}

/// Per-faction accumulator filled during one tick's scan.
///
/// Each scan worker owns one; they are merged by summation after the join.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PopulationStats {
    factions: [FactionStats; Faction::COUNT],
}

impl PopulationStats {
    pub fn record(&mut self, person: &Person) {
        self.factions[person.faction.index()].record(person);
    }

    pub fn merge(&mut self, other: &PopulationStats) {
        for (mine, theirs) in self.factions.iter_mut().zip(other.factions.iter()) {
            mine.merge(theirs);
        }
    }

    pub fn faction(&self, faction: Faction) -> &FactionStats {
        &self.factions[faction.index()]
    }

    pub fn total_alive(&self) -> u64 {
        self.factions.iter().map(|f| f.count_total).sum()
    }

    pub fn total_diseased(&self) -> u64 {
        self.factions.iter().map(|f| f.count_diseased).sum()
    }

    /// Census of a grid at rest, counting every occupied cell.
    pub fn census(grid: &Grid) -> PopulationStats {
        let mut stats = PopulationStats::default();
        for (_, person) in grid.persons() {
            stats.record(person);
        }
        stats
    }

    pub fn rows(&self) -> Vec<FactionRow> {
        Faction::all()
            .iter()
            .filter(|&&f| f != Faction::Unaffiliated || self.faction(f).count_total > 0)
            .map(|&f| {
                let s = self.faction(f);
                FactionRow {
                    faction: f.name(),
                    alive: s.count_total,
                    diseased: s.count_diseased,
                    avg_age: s.avg_age(),
                    avg_strength: s.avg_strength(),
                }
            })
            .collect()
    }
}

/// One display line: faction name, alive, diseased, average age, average strength.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactionRow {
    pub faction: &'static str,
    pub alive: u64,
    pub diseased: u64,
    pub avg_age: f64,
    pub avg_strength: f64,
}

/// Read-only report handed to the stats display once per reporting interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub tick: u64,
    pub ticks_per_second: f32,
    pub factions: Vec<FactionRow>,
}

impl StatsSnapshot {
    pub fn new(tick: u64, ticks_per_second: f32, stats: &PopulationStats) -> Self {
        StatsSnapshot {
            tick,
            ticks_per_second,
            factions: stats.rows(),
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tick {} ~ {:.0} ticks/s", self.tick, self.ticks_per_second)?;
        for row in &self.factions {
            writeln!(
                f,
                "{:<13} Alive({}) Sick({}) AvgAge({}) AvgStr({})",
                format!("{}:", row.faction),
                row.alive,
                row.diseased,
                row.avg_age as u64,
                row.avg_strength as u64
            )?;
        }
        Ok(())
    }
}
