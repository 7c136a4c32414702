use crate::config::simulation::PopulationParams;
use crate::error::SimError;
use crate::simulation::intent::{Combatant, Intent};
use crate::simulation::rng::SimRng;
use crate::simulation::statistics::PopulationStats;
use crate::world::person::{Cell, Person, Sex};
use crate::world::terrain::TerrainOracle;
use crate::world::Grid;

/// Read-only environment shared by every cell evaluation in one tick.
pub struct RuleContext<'a, T: TerrainOracle> {
    pub grid: &'a Grid,
    pub terrain: &'a T,
    pub params: &'a PopulationParams,
    /// Years elapsed this tick.
    pub dt: f32,
}

/// The next state of one occupied cell plus at most one cross-cell effect.
#[derive(Debug, Clone, PartialEq)]
pub struct CellOutcome {
    /// Person left at the origin before intents are applied; `None` if they died.
    pub next: Option<Person>,
    pub intent: Option<Intent>,
}

impl CellOutcome {
    fn died() -> Self {
        CellOutcome {
            next: None,
            intent: None,
        }
    }

    fn stay(actor: Person) -> Self {
        CellOutcome {
            next: Some(actor),
            intent: None,
        }
    }
}

/// Evaluate the person living at `index` for one tick.
///
/// Steps run in a fixed order: stats, aging, death check, reproduction
/// cooldown, disease, movement target, terrain gate, destination resolution.
/// The grid is never written; cross-cell effects come back as an [`Intent`].
pub fn update_cell<T: TerrainOracle>(
    ctx: &RuleContext<'_, T>,
    index: usize,
    person: &Person,
    rng: &mut SimRng,
    stats: &mut PopulationStats,
) -> Result<CellOutcome, SimError> {
    stats.record(person);

    let params = ctx.params;
    let mut actor = *person;
    // Marks from the previous tick expire as soon as the person is evaluated again.
    actor.recently_placed = false;

    actor.age += ctx.dt;
    if actor.is_diseased() {
        actor.age += ctx.dt * params.diseased_aging_factor;
    }
    if actor.is_past_lifespan(params.max_lifespan) {
        return Ok(CellOutcome::died());
    }

    if actor.is_female() {
        actor.reproduction_cooldown -= ctx.dt;
    }

    progress_disease(&mut actor, params, ctx.dt, rng)?;

    let (x, y) = ctx.grid.coords(index);
    let (dx, dy) = pick_destination(ctx.grid, x, y, rng)?;
    if (dx, dy) == (x, y) || !ctx.terrain.is_habitable(dx, dy) {
        return Ok(CellOutcome::stay(actor));
    }
    let dest = ctx.grid.index(dx, dy)?;

    interact(ctx, index, dest, actor, rng)
}

/// Resolve what the actor does with the habitable neighbor `dest`.
pub(crate) fn interact<T: TerrainOracle>(
    ctx: &RuleContext<'_, T>,
    origin: usize,
    dest: usize,
    mut actor: Person,
    rng: &mut SimRng,
) -> Result<CellOutcome, SimError> {
    let params = ctx.params;

    let intent = match ctx.grid.cell(dest) {
        Cell::Empty if actor.can_reproduce() => {
            let mother_cooldown = draw_cooldown(rng, params)?;
            let child = bear_child(&actor, rng, params)?;
            Some(Intent::Spawn {
                origin,
                dest,
                child,
                mother_cooldown,
            })
        }
        Cell::Empty => Some(Intent::Move { origin, dest }),
        Cell::Occupied(target) if target.faction == actor.faction => {
            if actor.is_diseased() && rng.coin_flip() {
                Some(Intent::Infect {
                    origin,
                    dest,
                    duration: actor.disease_remaining,
                })
            } else {
                None
            }
        }
        Cell::Occupied(target) => {
            // Equal strength: the defender loses.
            if target.strength > actor.strength {
                actor.age = target.strength as f32;
                Some(Intent::Fight {
                    origin,
                    dest,
                    loser: Combatant::Attacker,
                    loser_age: actor.age,
                })
            } else {
                Some(Intent::Fight {
                    origin,
                    dest,
                    loser: Combatant::Defender,
                    loser_age: actor.strength as f32,
                })
            }
        }
    };

    Ok(CellOutcome {
        next: Some(actor),
        intent,
    })
}

fn progress_disease(
    actor: &mut Person,
    params: &PopulationParams,
    dt: f32,
    rng: &mut SimRng,
) -> Result<(), SimError> {
    if actor.is_diseased() {
        actor.disease_remaining -= dt;
        if actor.disease_remaining <= 0.0 {
            actor.disease_remaining = 0.0;
        }
    } else if rng.uniform_int(1, params.chance_for_disease as i64)? == 1 {
        actor.disease_remaining = rng.uniform_int(1, params.max_length_disease as i64)? as f32;
    }
    Ok(())
}

/// Pick one of the four neighbors; stepping off the grid keeps the origin.
fn pick_destination(
    grid: &Grid,
    x: u32,
    y: u32,
    rng: &mut SimRng,
) -> Result<(u32, u32), SimError> {
    let dest = match rng.uniform_int(0, 3)? {
        0 if x + 1 < grid.width() => (x + 1, y),
        1 if y + 1 < grid.height() => (x, y + 1),
        2 if x > 0 => (x - 1, y),
        3 if y > 0 => (x, y - 1),
        _ => (x, y),
    };
    Ok(dest)
}

fn draw_cooldown(rng: &mut SimRng, params: &PopulationParams) -> Result<f32, SimError> {
    Ok(rng.uniform_int(
        params.min_years_until_reproduce as i64,
        params.max_years_until_reproduce as i64,
    )? as f32)
}

fn bear_child(
    mother: &Person,
    rng: &mut SimRng,
    params: &PopulationParams,
) -> Result<Person, SimError> {
    let sex = if rng.coin_flip() { Sex::Male } else { Sex::Female };
    let reproduction_cooldown = draw_cooldown(rng, params)?;
    let min_strength = mother.strength.saturating_sub(15).max(15);
    let strength = rng.uniform_int(min_strength as i64, mother.strength as i64 + 30)? as u32;

    Ok(Person {
        faction: mother.faction,
        sex,
        age: 1.0,
        strength,
        reproduction_cooldown,
        disease_remaining: 0.0,
        recently_placed: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::person::Faction;
    use crate::world::terrain::{TerrainMap, TerrainType};

    fn quiet_params() -> PopulationParams {
        // Spontaneous disease practically never fires.
        PopulationParams {
            chance_for_disease: u32::MAX,
            ..PopulationParams::default()
        }
    }

    fn person(faction: Faction, sex: Sex, age: f32, strength: u32) -> Person {
        Person {
            faction,
            sex,
            age,
            strength,
            reproduction_cooldown: 10.0,
            disease_remaining: 0.0,
            recently_placed: false,
        }
    }

    fn open_terrain(w: u32, h: u32) -> TerrainMap {
        TerrainMap::uniform(w, h, TerrainType::Habitable)
    }

    fn run_at(
        grid: &Grid,
        terrain: &TerrainMap,
        params: &PopulationParams,
        dt: f32,
        x: u32,
        y: u32,
        seed: u64,
    ) -> (CellOutcome, PopulationStats) {
        let ctx = RuleContext {
            grid,
            terrain,
            params,
            dt,
        };
        let index = grid.index(x, y).unwrap();
        let p = *grid.cell(index).person().unwrap();
        let mut rng = SimRng::for_tick(seed, 0);
        rng.select_cell(index);
        let mut stats = PopulationStats::default();
        let outcome = update_cell(&ctx, index, &p, &mut rng, &mut stats).unwrap();
        (outcome, stats)
    }

    #[test]
    fn dies_when_reaching_max_lifespan() {
        let mut grid = Grid::new(3, 3);
        grid.set(1, 1, Cell::Occupied(person(Faction::Red, Sex::Male, 84.9, 90))).unwrap();
        let params = PopulationParams {
            max_lifespan: 85.0,
            ..quiet_params()
        };
        let (outcome, stats) = run_at(&grid, &open_terrain(3, 3), &params, 0.2, 1, 1, 1);
        assert_eq!(outcome, CellOutcome::died());
        // Stats still see the person as alive at the start of the tick.
        assert_eq!(stats.faction(Faction::Red).count_total, 1);
    }

    #[test]
    fn dies_when_age_reaches_strength() {
        let mut grid = Grid::new(3, 3);
        grid.set(1, 1, Cell::Occupied(person(Faction::Red, Sex::Male, 29.9, 30))).unwrap();
        let (outcome, _) = run_at(&grid, &open_terrain(3, 3), &quiet_params(), 0.2, 1, 1, 1);
        assert!(outcome.next.is_none());
        assert!(outcome.intent.is_none());
    }

    #[test]
    fn survivor_ages_by_at_least_dt() {
        let mut grid = Grid::new(3, 3);
        grid.set(1, 1, Cell::Occupied(person(Faction::Red, Sex::Male, 20.0, 80))).unwrap();
        for seed in 0..16 {
            let (outcome, _) = run_at(&grid, &open_terrain(3, 3), &quiet_params(), 0.5, 1, 1, seed);
            let next = outcome.next.unwrap();
            assert!(next.age >= 20.5, "age {} did not grow by dt", next.age);
        }
    }

    #[test]
    fn disease_accelerates_aging_and_counts_down() {
        let mut grid = Grid::new(1, 1);
        let mut p = person(Faction::Blue, Sex::Male, 10.0, 90);
        p.disease_remaining = 3.0;
        grid.set(0, 0, Cell::Occupied(p)).unwrap();
        let params = PopulationParams {
            diseased_aging_factor: 16.0,
            ..quiet_params()
        };
        let (outcome, stats) = run_at(&grid, &open_terrain(1, 1), &params, 0.5, 0, 0, 1);
        let next = outcome.next.unwrap();
        assert_eq!(next.age, 18.5);
        assert_eq!(next.disease_remaining, 2.5);
        assert_eq!(stats.faction(Faction::Blue).count_diseased, 1);
    }

    #[test]
    fn disease_clears_when_duration_runs_out() {
        let mut grid = Grid::new(1, 1);
        let mut p = person(Faction::Blue, Sex::Male, 10.0, 90);
        p.disease_remaining = 0.1;
        grid.set(0, 0, Cell::Occupied(p)).unwrap();
        let (outcome, _) = run_at(&grid, &open_terrain(1, 1), &quiet_params(), 0.2, 0, 0, 1);
        assert!(!outcome.next.unwrap().is_diseased());
    }

    #[test]
    fn certain_disease_chance_infects_healthy_person() {
        let mut grid = Grid::new(1, 1);
        grid.set(0, 0, Cell::Occupied(person(Faction::Blue, Sex::Male, 10.0, 90))).unwrap();
        let params = PopulationParams {
            chance_for_disease: 1,
            max_length_disease: 4,
            ..PopulationParams::default()
        };
        let (outcome, _) = run_at(&grid, &open_terrain(1, 1), &params, 0.2, 0, 0, 1);
        let next = outcome.next.unwrap();
        assert!((1.0..=4.0).contains(&next.disease_remaining));
    }

    #[test]
    fn only_females_count_down_cooldown() {
        let mut grid = Grid::new(1, 2);
        grid.set(0, 0, Cell::Occupied(person(Faction::Red, Sex::Female, 20.0, 80))).unwrap();
        grid.set(0, 1, Cell::Occupied(person(Faction::Red, Sex::Male, 20.0, 80))).unwrap();
        let terrain = TerrainMap::uniform(1, 2, TerrainType::Water);
        let (f, _) = run_at(&grid, &terrain, &quiet_params(), 0.5, 0, 0, 1);
        let (m, _) = run_at(&grid, &terrain, &quiet_params(), 0.5, 0, 1, 1);
        assert_eq!(f.next.unwrap().reproduction_cooldown, 9.5);
        assert_eq!(m.next.unwrap().reproduction_cooldown, 10.0);
    }

    #[test]
    fn eligible_female_spawns_child_into_empty_neighbor() {
        let mut grid = Grid::new(3, 3);
        let mut mother = person(Faction::Violet, Sex::Female, 25.0, 50);
        mother.reproduction_cooldown = -1.0;
        grid.set(1, 1, Cell::Occupied(mother)).unwrap();
        let params = quiet_params();

        let (outcome, _) = run_at(&grid, &open_terrain(3, 3), &params, 0.2, 1, 1, 3);
        match outcome.intent {
            Some(Intent::Spawn {
                origin,
                dest,
                child,
                mother_cooldown,
            }) => {
                assert_eq!(origin, 4);
                assert!([1, 3, 5, 7].contains(&dest));
                assert_eq!(child.faction, Faction::Violet);
                assert_eq!(child.age, 1.0);
                assert!((35..=80).contains(&child.strength));
                assert!(child.recently_placed);
                assert!(!child.is_diseased());
                let range = params.min_years_until_reproduce as f32
                    ..=params.max_years_until_reproduce as f32;
                assert!(range.contains(&child.reproduction_cooldown));
                assert!(range.contains(&mother_cooldown));
            }
            other => panic!("expected a spawn, got {:?}", other),
        }
        // The mother stays put; her cooldown is only reset when the birth is applied.
        let mother_next = outcome.next.unwrap();
        assert!(mother_next.reproduction_cooldown <= 0.0);
    }

    #[test]
    fn weak_mother_child_strength_floor_is_15() {
        let mut grid = Grid::new(3, 3);
        let mut mother = person(Faction::Red, Sex::Female, 2.0, 16);
        mother.reproduction_cooldown = -1.0;
        grid.set(1, 1, Cell::Occupied(mother)).unwrap();
        for seed in 0..16 {
            let (outcome, _) = run_at(&grid, &open_terrain(3, 3), &quiet_params(), 0.2, 1, 1, seed);
            if let Some(Intent::Spawn { child, .. }) = outcome.intent {
                assert!((15..=46).contains(&child.strength));
            }
        }
    }

    #[test]
    fn male_moves_into_empty_neighbor() {
        let mut grid = Grid::new(3, 3);
        grid.set(1, 1, Cell::Occupied(person(Faction::Red, Sex::Male, 20.0, 60))).unwrap();
        let (outcome, _) = run_at(&grid, &open_terrain(3, 3), &quiet_params(), 0.2, 1, 1, 1);
        match outcome.intent {
            Some(Intent::Move { origin: 4, dest }) => assert!([1, 3, 5, 7].contains(&dest)),
            other => panic!("expected a move, got {:?}", other),
        }
    }

    #[test]
    fn water_blocks_every_interaction() {
        let mut grid = Grid::new(3, 3);
        let mut mother = person(Faction::Red, Sex::Female, 20.0, 60);
        mother.reproduction_cooldown = -5.0;
        grid.set(1, 1, Cell::Occupied(mother)).unwrap();
        let terrain = TerrainMap::from_rows(&["~~~", "~.~", "~~~"]);
        for seed in 0..16 {
            let (outcome, _) = run_at(&grid, &terrain, &quiet_params(), 0.2, 1, 1, seed);
            assert!(outcome.intent.is_none());
            assert!(outcome.next.is_some());
        }
    }

    #[test]
    fn single_cell_grid_never_moves() {
        let mut grid = Grid::new(1, 1);
        grid.set(0, 0, Cell::Occupied(person(Faction::Red, Sex::Male, 20.0, 60))).unwrap();
        for seed in 0..16 {
            let (outcome, _) = run_at(&grid, &open_terrain(1, 1), &quiet_params(), 0.2, 0, 0, seed);
            assert!(outcome.intent.is_none());
        }
    }

    #[test]
    fn stronger_attacker_marks_defender() {
        let mut grid = Grid::new(3, 3);
        let attacker = person(Faction::Red, Sex::Male, 20.0, 50);
        let defender = person(Faction::Blue, Sex::Male, 10.0, 30);
        grid.set(1, 1, Cell::Occupied(attacker)).unwrap();
        grid.set(1, 2, Cell::Occupied(defender)).unwrap();
        let terrain = open_terrain(3, 3);
        let params = quiet_params();
        let ctx = RuleContext {
            grid: &grid,
            terrain: &terrain,
            params: &params,
            dt: 0.2,
        };
        let mut rng = SimRng::seed_from_u64(1);
        let outcome = interact(&ctx, 4, 7, attacker, &mut rng).unwrap();
        assert_eq!(
            outcome.intent,
            Some(Intent::Fight {
                origin: 4,
                dest: 7,
                loser: Combatant::Defender,
                loser_age: 50.0,
            })
        );
        assert_eq!(outcome.next, Some(attacker));
    }

    #[test]
    fn weaker_attacker_takes_the_loss() {
        let mut grid = Grid::new(3, 3);
        let attacker = person(Faction::Red, Sex::Male, 20.0, 30);
        grid.set(1, 1, Cell::Occupied(attacker)).unwrap();
        grid.set(1, 2, Cell::Occupied(person(Faction::Blue, Sex::Male, 10.0, 50))).unwrap();
        let terrain = open_terrain(3, 3);
        let params = quiet_params();
        let ctx = RuleContext {
            grid: &grid,
            terrain: &terrain,
            params: &params,
            dt: 0.2,
        };
        let mut rng = SimRng::seed_from_u64(1);
        let outcome = interact(&ctx, 4, 7, attacker, &mut rng).unwrap();
        let next = outcome.next.unwrap();
        assert_eq!(next.age, 50.0);
        assert!(next.is_past_lifespan(params.max_lifespan));
        assert!(matches!(
            outcome.intent,
            Some(Intent::Fight { loser: Combatant::Attacker, .. })
        ));
    }

    #[test]
    fn equal_strength_defender_loses() {
        let mut grid = Grid::new(3, 3);
        let attacker = person(Faction::Yellow, Sex::Male, 20.0, 45);
        grid.set(1, 1, Cell::Occupied(attacker)).unwrap();
        grid.set(2, 1, Cell::Occupied(person(Faction::Violet, Sex::Male, 10.0, 45))).unwrap();
        let terrain = open_terrain(3, 3);
        let params = quiet_params();
        let ctx = RuleContext {
            grid: &grid,
            terrain: &terrain,
            params: &params,
            dt: 0.2,
        };
        let mut rng = SimRng::seed_from_u64(1);
        let outcome = interact(&ctx, 4, 5, attacker, &mut rng).unwrap();
        assert!(matches!(
            outcome.intent,
            Some(Intent::Fight { loser: Combatant::Defender, loser_age, .. }) if loser_age == 45.0
        ));
    }

    #[test]
    fn diseased_actor_sometimes_infects_kin() {
        let mut grid = Grid::new(3, 3);
        let mut carrier = person(Faction::Red, Sex::Male, 20.0, 60);
        carrier.disease_remaining = 1.5;
        grid.set(1, 1, Cell::Occupied(carrier)).unwrap();
        grid.set(1, 0, Cell::Occupied(person(Faction::Red, Sex::Male, 20.0, 60))).unwrap();
        let terrain = open_terrain(3, 3);
        let params = quiet_params();
        let ctx = RuleContext {
            grid: &grid,
            terrain: &terrain,
            params: &params,
            dt: 0.2,
        };

        let mut infected = 0;
        let mut spared = 0;
        for seed in 0..64 {
            let mut rng = SimRng::seed_from_u64(seed);
            match interact(&ctx, 4, 1, carrier, &mut rng).unwrap().intent {
                Some(Intent::Infect { dest: 1, duration, .. }) => {
                    assert_eq!(duration, 1.5);
                    infected += 1;
                }
                None => spared += 1,
                other => panic!("unexpected intent {:?}", other),
            }
        }
        assert!(infected > 0 && spared > 0);
    }

    #[test]
    fn healthy_actor_leaves_kin_alone() {
        let mut grid = Grid::new(3, 3);
        let actor = person(Faction::Red, Sex::Female, 20.0, 60);
        grid.set(1, 1, Cell::Occupied(actor)).unwrap();
        grid.set(0, 1, Cell::Occupied(person(Faction::Red, Sex::Male, 20.0, 60))).unwrap();
        let terrain = open_terrain(3, 3);
        let params = quiet_params();
        let ctx = RuleContext {
            grid: &grid,
            terrain: &terrain,
            params: &params,
            dt: 0.2,
        };
        for seed in 0..16 {
            let mut rng = SimRng::seed_from_u64(seed);
            assert!(interact(&ctx, 4, 3, actor, &mut rng).unwrap().intent.is_none());
        }
    }

    #[test]
    fn evaluation_clears_placement_mark() {
        let mut grid = Grid::new(1, 1);
        let mut p = person(Faction::Red, Sex::Male, 20.0, 60);
        p.recently_placed = true;
        grid.set(0, 0, Cell::Occupied(p)).unwrap();
        let (outcome, _) = run_at(&grid, &open_terrain(1, 1), &quiet_params(), 0.2, 0, 0, 1);
        assert!(!outcome.next.unwrap().recently_placed);
    }
}
