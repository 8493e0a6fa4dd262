//! Sensor readings, each normalized into `[0, 1]`.

use biosim_brain::genome_similarity;
use biosim_core::{
    BioSimConfig, Coord, Dir, Grid, SENSOR_MAX, SENSOR_MIN, SIGNAL_MAX, Sensor, Signals,
};
use rand::{Rng, RngCore};

use crate::SimError;
use crate::individual::Individual;
use crate::peeps::Peeps;

/// Readings slightly outside `[0, 1]` are tolerated as rounding noise.
const SENSOR_TOLERANCE: f32 = 0.01;

/// Read-only view of the world at the start of a step.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub grid: &'a Grid,
    pub signals: &'a Signals,
    pub peeps: &'a Peeps,
    pub config: &'a BioSimConfig,
    /// Step index within the current generation.
    pub step: u32,
}

fn ratio(num: f32, den: f32) -> f32 {
    if den > 0.0 { num / den } else { 0.0 }
}

fn axis_unit(dir: Dir) -> (f32, f32) {
    let v = dir.as_normalized_coord();
    let len = ((v.x * v.x + v.y * v.y) as f32).sqrt();
    (v.x as f32 / len, v.y as f32 / len)
}

/// Directional population density along `dir`, mapped to `[0, 1]` with 0.5 neutral.
///
/// Each occupied neighbour contributes its projection onto `dir` divided by
/// its squared distance.
#[must_use]
pub fn population_density_along_axis(grid: &Grid, loc: Coord, dir: Dir, radius: f32) -> f32 {
    if dir.is_center() {
        return 0.0;
    }
    let (ux, uy) = axis_unit(dir);
    let mut sum = 0.0f32;
    grid.visit_neighborhood(loc, radius, |tloc| {
        if tloc != loc && grid.is_occupied_at(tloc) {
            let offset = tloc - loc;
            let proj = ux * offset.x as f32 + uy * offset.y as f32;
            sum += proj / (offset.x * offset.x + offset.y * offset.y) as f32;
        }
    });
    let max_sum_mag = 6.0 * radius;
    (sum / max_sum_mag + 1.0) / 2.0
}

/// Barrier distance ahead versus behind along `dir`, within `probe_distance` cells.
///
/// Hitting the grid edge before the probe is exhausted counts as a clear run.
#[must_use]
pub fn short_probe_barrier_distance(grid: &Grid, loc0: Coord, dir: Dir, probe_distance: u32) -> f32 {
    let probe = |step: Coord| -> u32 {
        let mut count = 0;
        let mut loc = loc0 + step;
        let mut remaining = probe_distance;
        while remaining > 0 && grid.is_in_bounds(loc) && !grid.is_barrier_at(loc) {
            count += 1;
            loc = loc + step;
            remaining -= 1;
        }
        if remaining > 0 && !grid.is_in_bounds(loc) {
            count = probe_distance;
        }
        count
    };
    let step = dir.as_normalized_coord();
    let fwd = probe(step) as f32;
    let rev = probe(-step) as f32;
    let d = probe_distance as f32;
    ratio(((fwd - rev) + d) / 2.0, d)
}

/// Mean intensity of `layer` within the signal sensor radius.
#[must_use]
pub fn signal_density(signals: &Signals, grid: &Grid, layer: usize, loc: Coord, radius: f32) -> f32 {
    let mut count = 0u32;
    let mut sum = 0u32;
    grid.visit_neighborhood(loc, radius, |tloc| {
        count += 1;
        sum += u32::from(signals.magnitude(layer, tloc));
    });
    ratio(sum as f32, (count * u32::from(SIGNAL_MAX)) as f32)
}

/// Directional signal gradient along `dir`, mapped to `[0, 1]` with 0.5 neutral.
#[must_use]
pub fn signal_density_along_axis(
    signals: &Signals,
    grid: &Grid,
    layer: usize,
    loc: Coord,
    dir: Dir,
    radius: f32,
) -> f32 {
    if dir.is_center() {
        return 0.0;
    }
    let (ux, uy) = axis_unit(dir);
    let mut sum = 0.0f32;
    grid.visit_neighborhood(loc, radius, |tloc| {
        if tloc != loc {
            let offset = tloc - loc;
            let proj = ux * offset.x as f32 + uy * offset.y as f32;
            let magnitude = f32::from(signals.magnitude(layer, tloc));
            sum += proj * magnitude / (offset.x * offset.x + offset.y * offset.y) as f32;
        }
    });
    let max_sum_mag = 6.0 * radius * f32::from(SIGNAL_MAX);
    (sum / max_sum_mag + 1.0) / 2.0
}

/// Count of empty cells straight ahead before another agent is seen.
///
/// Running into the edge or a barrier first reports the full distance.
#[must_use]
pub fn long_probe_population_fwd(grid: &Grid, loc: Coord, dir: Dir, distance: u32) -> u32 {
    let mut count = 0;
    let mut loc = loc + dir;
    let mut remaining = distance;
    while remaining > 0 && grid.is_in_bounds(loc) && grid.is_empty_at(loc) {
        count += 1;
        loc = loc + dir;
        remaining -= 1;
    }
    if remaining > 0 && (!grid.is_in_bounds(loc) || grid.is_barrier_at(loc)) {
        count = distance;
    }
    count
}

/// Count of non-barrier cells straight ahead; the edge reports the full distance.
#[must_use]
pub fn long_probe_barrier_fwd(grid: &Grid, loc: Coord, dir: Dir, distance: u32) -> u32 {
    let mut count = 0;
    let mut loc = loc + dir;
    let mut remaining = distance;
    while remaining > 0 && grid.is_in_bounds(loc) && !grid.is_barrier_at(loc) {
        count += 1;
        loc = loc + dir;
        remaining -= 1;
    }
    if remaining > 0 && !grid.is_in_bounds(loc) {
        count = distance;
    }
    count
}

fn last_move_component(component: i32) -> f32 {
    match component {
        0 => 0.5,
        c if c < 0 => 0.0,
        _ => 1.0,
    }
}

/// Read one sensor for `indiv` against the step-start world.
pub fn get_sensor(
    indiv: &Individual,
    sensor: Sensor,
    ctx: &StepContext<'_>,
    rng: &mut dyn RngCore,
) -> Result<f32, SimError> {
    let grid = ctx.grid;
    let config = ctx.config;
    let (size_x, size_y) = (grid.width() as f32, grid.height() as f32);
    let loc = indiv.loc;
    let dist_x = loc.x.min(grid.width() as i32 - loc.x - 1) as f32;
    let dist_y = loc.y.min(grid.height() as i32 - loc.y - 1) as f32;

    let value = match sensor {
        Sensor::LocX => ratio(loc.x as f32, size_x - 1.0),
        Sensor::LocY => ratio(loc.y as f32, size_y - 1.0),
        Sensor::BoundaryDistX => ratio(dist_x, size_x / 2.0),
        Sensor::BoundaryDistY => ratio(dist_y, size_y / 2.0),
        Sensor::BoundaryDist => {
            let max_possible = (size_x / 2.0 - 1.0).max(size_y / 2.0 - 1.0);
            ratio(dist_x.min(dist_y), max_possible)
        }
        Sensor::GeneticSimFwd => {
            let ahead = loc + indiv.last_move_dir;
            match ctx.peeps.individual_at(grid, ahead) {
                Some(other) if other.alive => {
                    genome_similarity(config.genome_comparison_method, &indiv.genome, &other.genome)?
                }
                _ => 0.0,
            }
        }
        Sensor::LastMoveDirX => last_move_component(indiv.last_move_dir.as_normalized_coord().x),
        Sensor::LastMoveDirY => last_move_component(indiv.last_move_dir.as_normalized_coord().y),
        Sensor::LongProbePopFwd => ratio(
            long_probe_population_fwd(grid, loc, indiv.last_move_dir, indiv.long_probe_dist) as f32,
            indiv.long_probe_dist as f32,
        ),
        Sensor::LongProbeBarFwd => ratio(
            long_probe_barrier_fwd(grid, loc, indiv.last_move_dir, indiv.long_probe_dist) as f32,
            indiv.long_probe_dist as f32,
        ),
        Sensor::Population => {
            let mut count_locs = 0u32;
            let mut count_occupied = 0u32;
            grid.visit_neighborhood(loc, config.population_sensor_radius, |tloc| {
                count_locs += 1;
                if grid.is_occupied_at(tloc) {
                    count_occupied += 1;
                }
            });
            ratio(count_occupied as f32, count_locs as f32)
        }
        Sensor::PopulationFwd => population_density_along_axis(
            grid,
            loc,
            indiv.last_move_dir,
            config.population_sensor_radius,
        ),
        Sensor::PopulationLr => population_density_along_axis(
            grid,
            loc,
            indiv.last_move_dir.rotate_90_cw(),
            config.population_sensor_radius,
        ),
        Sensor::Osc1 => {
            let period = indiv.osc_period.max(1);
            let phase = (ctx.step % period) as f32 / period as f32;
            let factor = -(phase * std::f32::consts::TAU).cos();
            ((factor + 1.0) / 2.0).clamp(0.0, 1.0)
        }
        Sensor::Age => ratio(indiv.age as f32, config.steps_per_generation as f32),
        Sensor::BarrierFwd => short_probe_barrier_distance(
            grid,
            loc,
            indiv.last_move_dir,
            config.short_probe_barrier_distance,
        ),
        Sensor::BarrierLr => short_probe_barrier_distance(
            grid,
            loc,
            indiv.last_move_dir.rotate_90_cw(),
            config.short_probe_barrier_distance,
        ),
        Sensor::Random => rng.random::<f32>(),
        Sensor::Signal0 => signal_density(ctx.signals, grid, 0, loc, config.signal_sensor_radius),
        Sensor::Signal0Fwd => signal_density_along_axis(
            ctx.signals,
            grid,
            0,
            loc,
            indiv.last_move_dir,
            config.signal_sensor_radius,
        ),
        Sensor::Signal0Lr => signal_density_along_axis(
            ctx.signals,
            grid,
            0,
            loc,
            indiv.last_move_dir.rotate_90_cw(),
            config.signal_sensor_radius,
        ),
    };

    normalize_reading(sensor, value)
}

fn normalize_reading(sensor: Sensor, value: f32) -> Result<f32, SimError> {
    let lo = SENSOR_MIN - SENSOR_TOLERANCE;
    let hi = SENSOR_MAX + SENSOR_TOLERANCE;
    let value = if value.is_nan() || value < lo || value > hi {
        value.clamp(SENSOR_MIN, SENSOR_MAX)
    } else {
        value
    };
    if value.is_nan() || value < lo || value > hi {
        return Err(SimError::Contract(format!(
            "sensor {} produced {value}",
            sensor.name()
        )));
    }
    Ok(value)
}
