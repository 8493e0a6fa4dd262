//! Survival challenges: end-of-generation selection and per-step hooks.

use biosim_core::{BioSimConfig, Challenge, Coord, Grid};
use rand::{Rng, RngCore};

use crate::SimError;
use crate::individual::Individual;
use crate::peeps::Peeps;

/// Radius within which a barrier center counts as visited.
const LOCATION_SEQUENCE_RADIUS: f32 = 9.0;

/// Result of applying a challenge to one agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurvivalOutcome {
    pub passed: bool,
    /// Fitness in `[0, 1]`; only meaningful when `passed`.
    pub score: f32,
}

impl SurvivalOutcome {
    pub const FAIL: SurvivalOutcome = SurvivalOutcome {
        passed: false,
        score: 0.0,
    };

    #[must_use]
    pub const fn pass(score: f32) -> Self {
        Self {
            passed: true,
            score,
        }
    }

    fn pass_if(condition: bool) -> Self {
        if condition { Self::pass(1.0) } else { Self::FAIL }
    }
}

/// Reject challenges that are catalogued but not implemented.
pub fn ensure_supported(challenge: Challenge) -> Result<(), SimError> {
    match challenge {
        Challenge::Altruism => Err(SimError::Unsupported("altruism challenge")),
        Challenge::AltruismSacrifice => Err(SimError::Unsupported("altruism-sacrifice challenge")),
        _ => Ok(()),
    }
}

fn within_radius(loc: Coord, center: Coord, radius: f32) -> Option<f32> {
    let distance = (center - loc).length() as f32;
    (distance <= radius).then_some(distance)
}

fn count_occupied(grid: &Grid, loc: Coord, radius: f32) -> u32 {
    let mut count = 0;
    grid.visit_neighborhood(loc, radius, |tloc| {
        if grid.is_occupied_at(tloc) {
            count += 1;
        }
    });
    count
}

fn occupied_neighbours(grid: &Grid, loc: Coord) -> impl Iterator<Item = Coord> + '_ {
    (-1..=1)
        .flat_map(move |dx| (-1..=1).map(move |dy| Coord::new(loc.x + dx, loc.y + dy)))
        .filter(move |tloc| *tloc != loc && grid.is_occupied_at(*tloc))
}

/// Score `indiv` against `challenge` using the end-of-generation world.
pub fn passed_survival_criterion(
    indiv: &Individual,
    challenge: Challenge,
    grid: &Grid,
) -> Result<SurvivalOutcome, SimError> {
    ensure_supported(challenge)?;
    if !indiv.alive {
        return Ok(SurvivalOutcome::FAIL);
    }
    let (sx, sy) = (grid.width() as i32, grid.height() as i32);
    let loc = indiv.loc;

    let outcome = match challenge {
        Challenge::Circle => {
            let center = Coord::new(sx / 4, sy / 4);
            let radius = sx as f32 / 4.0;
            within_radius(loc, center, radius)
                .map_or(SurvivalOutcome::FAIL, |d| SurvivalOutcome::pass((radius - d) / radius))
        }
        Challenge::RightHalf => SurvivalOutcome::pass_if(loc.x > sx / 2),
        Challenge::RightQuarter => SurvivalOutcome::pass_if(loc.x > sx / 2 + sx / 4),
        Challenge::LeftEighth => SurvivalOutcome::pass_if(loc.x < sx / 8),
        Challenge::String => {
            // Bounds kept as configured: no count can satisfy both.
            const MIN_NEIGHBORS: u32 = 22;
            const MAX_NEIGHBORS: u32 = 2;
            if grid.is_border(loc) {
                SurvivalOutcome::FAIL
            } else {
                let count = count_occupied(grid, loc, 1.5);
                SurvivalOutcome::pass_if(count >= MIN_NEIGHBORS && count <= MAX_NEIGHBORS)
            }
        }
        Challenge::CenterWeighted => {
            let center = Coord::new(sx / 2, sy / 2);
            let radius = sx as f32 / 3.0;
            within_radius(loc, center, radius)
                .map_or(SurvivalOutcome::FAIL, |d| SurvivalOutcome::pass((radius - d) / radius))
        }
        Challenge::CenterUnweighted => {
            let center = Coord::new(sx / 2, sy / 2);
            SurvivalOutcome::pass_if(within_radius(loc, center, sx as f32 / 3.0).is_some())
        }
        Challenge::CenterSparse => {
            let center = Coord::new(sx / 2, sy / 2);
            let outer_radius = sx as f32 / 4.0;
            if within_radius(loc, center, outer_radius).is_some() {
                let count = count_occupied(grid, loc, 1.5);
                SurvivalOutcome::pass_if((5..=8).contains(&count))
            } else {
                SurvivalOutcome::FAIL
            }
        }
        Challenge::Corner | Challenge::CornerWeighted => {
            let radius = sx as f32 / 8.0;
            let corners = [
                Coord::new(0, 0),
                Coord::new(0, sy - 1),
                Coord::new(sx - 1, 0),
                Coord::new(sx - 1, sy - 1),
            ];
            match corners.iter().find_map(|c| within_radius(loc, *c, radius)) {
                Some(d) if challenge == Challenge::CornerWeighted => {
                    SurvivalOutcome::pass((radius - d) / radius)
                }
                Some(_) => SurvivalOutcome::pass(1.0),
                None => SurvivalOutcome::FAIL,
            }
        }
        Challenge::MigrateDistance => {
            let distance = (loc - indiv.birth_loc).length() as f32;
            SurvivalOutcome::pass(distance / sx.max(sy) as f32)
        }
        Challenge::RadioactiveWalls => SurvivalOutcome::pass(1.0),
        Challenge::AgainstAnyWall => SurvivalOutcome::pass_if(grid.is_border(loc)),
        Challenge::TouchAnyWall => SurvivalOutcome::pass_if(indiv.challenge_bits != 0),
        Challenge::EastWestEighths => {
            SurvivalOutcome::pass_if(loc.x < sx / 8 || loc.x >= sx - sx / 8)
        }
        Challenge::NearBarrier => {
            let radius = (sx / 2) as f32;
            let min_distance = grid
                .barrier_centers()
                .iter()
                .map(|center| (loc - *center).length() as f32)
                .fold(f32::INFINITY, f32::min);
            if min_distance <= radius {
                SurvivalOutcome::pass(1.0 - min_distance / radius)
            } else {
                SurvivalOutcome::FAIL
            }
        }
        Challenge::Pairs => {
            if grid.is_border(loc) {
                SurvivalOutcome::FAIL
            } else {
                let mut neighbours = occupied_neighbours(grid, loc);
                match (neighbours.next(), neighbours.next()) {
                    (Some(partner), None) => SurvivalOutcome::pass_if(
                        occupied_neighbours(grid, partner).all(|other| other == loc),
                    ),
                    _ => SurvivalOutcome::FAIL,
                }
            }
        }
        Challenge::LocationSequence => {
            let bits = indiv.challenge_bits.count_ones();
            if bits > 0 {
                SurvivalOutcome::pass(bits as f32 / u32::BITS as f32)
            } else {
                SurvivalOutcome::FAIL
            }
        }
        Challenge::Altruism | Challenge::AltruismSacrifice => SurvivalOutcome::FAIL,
    };
    Ok(outcome)
}

/// Run the per-step side effects some challenges need, before queues are drained.
///
/// Radioactive walls queue probabilistic deaths near the active wall, which
/// is the west edge for the first half of a generation and the east edge
/// afterwards. Touching any wall sets a challenge bit. Location sequences
/// record visits to barrier centers, which must be reached in order.
pub fn apply_end_of_step_hooks(
    challenge: Challenge,
    step: u32,
    peeps: &mut Peeps,
    grid: &Grid,
    config: &BioSimConfig,
    rng: &mut dyn RngCore,
) {
    let sx = grid.width() as i32;
    match challenge {
        Challenge::RadioactiveWalls => {
            let radioactive_x = if step < config.steps_per_generation / 2 {
                0
            } else {
                sx - 1
            };
            let doomed: Vec<usize> = peeps
                .iter()
                .filter(|indiv| indiv.alive)
                .filter(|indiv| {
                    let distance = (indiv.loc.x - radioactive_x).abs();
                    if distance >= sx / 2 {
                        return false;
                    }
                    let chance_of_death = 1.0 / distance as f32;
                    rng.random::<f32>() < chance_of_death
                })
                .map(|indiv| indiv.index)
                .collect();
            for index in doomed {
                peeps.queue_for_death(index);
            }
        }
        Challenge::TouchAnyWall => {
            for indiv in peeps.iter_mut() {
                if grid.is_border(indiv.loc) {
                    indiv.challenge_bits = 1;
                }
            }
        }
        Challenge::LocationSequence => {
            let centers = grid.barrier_centers();
            for indiv in peeps.iter_mut() {
                for (n, center) in centers.iter().enumerate().take(u32::BITS as usize) {
                    let bit = 1u32 << n;
                    if indiv.challenge_bits & bit == 0 {
                        if (indiv.loc - *center).length() as f32 <= LOCATION_SEQUENCE_RADIUS {
                            indiv.challenge_bits |= bit;
                        }
                        break;
                    }
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biosim_brain::{Gene, Genome, SinkKind, SourceKind};
    use biosim_core::BarrierType;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn setup(size: u32, locs: &[Coord]) -> (Grid, Peeps, BioSimConfig) {
        let config = BioSimConfig {
            size_x: size,
            size_y: size,
            ..BioSimConfig::default()
        };
        let mut grid = Grid::new(size, size).expect("grid");
        let mut rng = SmallRng::seed_from_u64(6);
        let genome = Genome::new(vec![Gene::new(SourceKind::Sensor, 0, SinkKind::Action, 0, 1)]);
        let mut peeps = Peeps::new();
        for (index, loc) in locs.iter().enumerate() {
            let indiv = Individual::new(index, *loc, genome.clone(), &config, &mut rng);
            grid.set(*loc, indiv.grid_value());
            peeps.push(indiv);
        }
        (grid, peeps, config)
    }

    fn outcome(
        peeps: &Peeps,
        index: usize,
        challenge: Challenge,
        grid: &Grid,
    ) -> SurvivalOutcome {
        passed_survival_criterion(peeps.get(index).expect("indiv"), challenge, grid)
            .expect("supported")
    }

    #[test]
    fn circle_scores_by_distance() {
        let (grid, peeps, _) = setup(40, &[Coord::new(10, 10), Coord::new(15, 10), Coord::new(30, 30)]);
        assert_eq!(outcome(&peeps, 0, Challenge::Circle, &grid), SurvivalOutcome::pass(1.0));
        let mid = outcome(&peeps, 1, Challenge::Circle, &grid);
        assert!(mid.passed);
        assert!((mid.score - 0.5).abs() < 1e-6);
        assert!(!outcome(&peeps, 2, Challenge::Circle, &grid).passed);
    }

    #[test]
    fn half_and_eighth_boundaries() {
        let (grid, peeps, _) = setup(16, &[Coord::new(9, 3), Coord::new(8, 3), Coord::new(1, 3), Coord::new(14, 3)]);
        assert!(outcome(&peeps, 0, Challenge::RightHalf, &grid).passed);
        assert!(!outcome(&peeps, 1, Challenge::RightHalf, &grid).passed);
        assert!(outcome(&peeps, 2, Challenge::LeftEighth, &grid).passed);
        assert!(outcome(&peeps, 2, Challenge::EastWestEighths, &grid).passed);
        assert!(outcome(&peeps, 3, Challenge::EastWestEighths, &grid).passed);
        assert!(!outcome(&peeps, 0, Challenge::EastWestEighths, &grid).passed);
    }

    #[test]
    fn dead_agents_never_pass() {
        let (grid, mut peeps, _) = setup(16, &[Coord::new(15, 3)]);
        if let Some(indiv) = peeps.get_mut(0) {
            indiv.alive = false;
        }
        assert_eq!(outcome(&peeps, 0, Challenge::RightHalf, &grid), SurvivalOutcome::FAIL);
    }

    #[test]
    fn pairs_require_exactly_one_isolated_partner() {
        let (grid, peeps, _) = setup(
            12,
            &[Coord::new(3, 3), Coord::new(4, 4), Coord::new(8, 8), Coord::new(9, 8), Coord::new(10, 8)],
        );
        assert!(outcome(&peeps, 0, Challenge::Pairs, &grid).passed);
        assert!(outcome(&peeps, 1, Challenge::Pairs, &grid).passed);
        // 9,8 has two neighbours; 8,8's only neighbour is not isolated.
        assert!(!outcome(&peeps, 2, Challenge::Pairs, &grid).passed);
        assert!(!outcome(&peeps, 3, Challenge::Pairs, &grid).passed);
    }

    #[test]
    fn string_challenge_never_passes() {
        let (grid, peeps, _) = setup(12, &[Coord::new(5, 5), Coord::new(6, 5)]);
        assert!(!outcome(&peeps, 0, Challenge::String, &grid).passed);
    }

    #[test]
    fn migrate_distance_always_passes() {
        let (grid, mut peeps, _) = setup(20, &[Coord::new(2, 2)]);
        if let Some(indiv) = peeps.get_mut(0) {
            indiv.loc = Coord::new(12, 2);
        }
        let result = outcome(&peeps, 0, Challenge::MigrateDistance, &grid);
        assert!(result.passed);
        assert!((result.score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn altruism_is_unsupported() {
        let (grid, peeps, _) = setup(8, &[Coord::new(2, 2)]);
        let err = passed_survival_criterion(
            peeps.get(0).expect("indiv"),
            Challenge::Altruism,
            &grid,
        )
        .expect_err("unsupported");
        assert!(err.is_unsupported());
    }

    #[test]
    fn touch_any_wall_hook_sets_bits() {
        let (grid, mut peeps, config) = setup(10, &[Coord::new(0, 4), Coord::new(4, 4)]);
        let mut rng = SmallRng::seed_from_u64(1);
        apply_end_of_step_hooks(Challenge::TouchAnyWall, 0, &mut peeps, &grid, &config, &mut rng);
        assert!(outcome(&peeps, 0, Challenge::TouchAnyWall, &grid).passed);
        assert!(!outcome(&peeps, 1, Challenge::TouchAnyWall, &grid).passed);
    }

    #[test]
    fn radioactive_wall_kills_adjacent_agents() {
        let (grid, mut peeps, config) = setup(20, &[Coord::new(1, 5), Coord::new(15, 5)]);
        let mut rng = SmallRng::seed_from_u64(1);
        apply_end_of_step_hooks(Challenge::RadioactiveWalls, 0, &mut peeps, &grid, &config, &mut rng);
        // Distance 1 means certain death; distance 15 is beyond half the width.
        assert_eq!(peeps.death_queue_len(), 1);
    }

    #[test]
    fn location_sequence_visits_centers_in_order() {
        let mut rng = SmallRng::seed_from_u64(1);
        let (mut grid, mut peeps, config) = setup(60, &[Coord::new(5, 5)]);
        grid.create_barrier(BarrierType::Spots, &mut rng).expect("spots");
        // Centers are (30, 10), (30, 20), ...; standing near the second first does nothing.
        if let Some(indiv) = peeps.get_mut(0) {
            indiv.loc = Coord::new(40, 25);
        }
        apply_end_of_step_hooks(Challenge::LocationSequence, 0, &mut peeps, &grid, &config, &mut rng);
        assert_eq!(peeps.get(0).map(|i| i.challenge_bits), Some(0));

        if let Some(indiv) = peeps.get_mut(0) {
            indiv.loc = Coord::new(36, 10);
        }
        apply_end_of_step_hooks(Challenge::LocationSequence, 1, &mut peeps, &grid, &config, &mut rng);
        assert_eq!(peeps.get(0).map(|i| i.challenge_bits), Some(1));

        if let Some(indiv) = peeps.get_mut(0) {
            indiv.loc = Coord::new(36, 20);
        }
        apply_end_of_step_hooks(Challenge::LocationSequence, 2, &mut peeps, &grid, &config, &mut rng);
        assert_eq!(peeps.get(0).map(|i| i.challenge_bits), Some(0b11));
        let result = outcome(&peeps, 0, Challenge::LocationSequence, &grid);
        assert!((result.score - 2.0 / 32.0).abs() < 1e-6);
    }
}
