//! Turning action levels into behavioural updates and queued world changes.

use biosim_brain::NeuralNet;
use biosim_core::{Action, Coord, Dir, Grid, HiddenNeuronUpdate, NUM_ACTIONS};
use rand::{Rng, RngCore};

use crate::SimError;
use crate::individual::Individual;
use crate::sensors::{StepContext, get_sensor};

const EMIT_THRESHOLD: f32 = 0.5;
const MAX_LONG_PROBE_DISTANCE: f32 = 32.0;

/// Everything one agent decided during a step.
///
/// Produced against the step-start world and applied during commit.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub index: usize,
    pub responsiveness: f32,
    pub osc_period: u32,
    pub long_probe_dist: u32,
    /// Destination that was in bounds and empty at step start.
    pub move_to: Option<Coord>,
    /// Location to deposit a layer-0 emission at.
    pub emit_at: Option<Coord>,
    /// Updated hidden-neuron state, when the net carries state between steps.
    pub nnet: Option<NeuralNet>,
}

/// Map responsiveness in `[0, 1]` through `(r - 2)^(-2k) - 2^(-2k) * (1 - r)`.
///
/// The curve passes through `(0, 0)` and `(1, 1)`; larger `k` bends it further.
#[must_use]
pub fn response_curve(r: f32, k: u32) -> f32 {
    let exp = -2 * k as i32;
    (r - 2.0).powi(exp) - 2.0f32.powi(exp) * (1.0 - r)
}

fn squash(level: f32) -> f32 {
    (level.tanh() + 1.0) / 2.0
}

fn random_bool(rng: &mut dyn RngCore, probability: f32) -> bool {
    rng.random::<f32>() < probability
}

/// Interpret `levels` for `indiv` and produce its decision.
pub fn execute_actions(
    indiv: &Individual,
    levels: &[f32; NUM_ACTIONS],
    grid: &Grid,
    k_factor: u32,
    rng: &mut dyn RngCore,
) -> Decision {
    let level = |action: Action| levels[action.index()];

    let responsiveness = squash(level(Action::SetResponsiveness));
    let responsiveness_adjusted = response_curve(responsiveness, k_factor);

    let period = squash(level(Action::SetOscillatorPeriod));
    let osc_period = (1.0 + (1.5 + (7.0 * period).exp())).round() as u32;
    debug_assert!((2..=2048).contains(&osc_period));

    let probe = squash(level(Action::SetLongProbeDist));
    let long_probe_dist = (1.0 + probe * MAX_LONG_PROBE_DISTANCE) as u32;

    let emit_level = squash(level(Action::EmitSignal0)) * responsiveness_adjusted;
    let emit_at = (emit_level > EMIT_THRESHOLD && random_bool(rng, emit_level)).then_some(indiv.loc);

    // KillForward is deliberately inert.

    let last = indiv.last_move_dir.as_normalized_coord();
    let (last_x, last_y) = (last.x as f32, last.y as f32);
    let mut move_x = level(Action::MoveX);
    let mut move_y = level(Action::MoveY);

    move_x += level(Action::MoveEast);
    move_x -= level(Action::MoveWest);
    move_y += level(Action::MoveNorth);
    move_y -= level(Action::MoveSouth);

    let forward = level(Action::MoveForward);
    move_x += last_x * forward;
    move_y += last_y * forward;

    let reverse = level(Action::MoveReverse);
    move_x -= last_x * reverse;
    move_y -= last_y * reverse;

    let mut add_offset = |dir: Dir, amount: f32| {
        let offset = dir.as_normalized_coord();
        move_x += offset.x as f32 * amount;
        move_y += offset.y as f32 * amount;
    };
    add_offset(indiv.last_move_dir.rotate_90_ccw(), level(Action::MoveLeft));
    add_offset(indiv.last_move_dir.rotate_90_cw(), level(Action::MoveRight));
    add_offset(indiv.last_move_dir.rotate_90_cw(), level(Action::MoveRl));
    add_offset(Dir::random8(rng), level(Action::MoveRandom));

    let move_x = move_x.tanh() * responsiveness_adjusted;
    let move_y = move_y.tanh() * responsiveness_adjusted;

    let step_x = i32::from(random_bool(rng, move_x.abs()));
    let step_y = i32::from(random_bool(rng, move_y.abs()));
    let sign_x = if move_x < 0.0 { -1 } else { 1 };
    let sign_y = if move_y < 0.0 { -1 } else { 1 };

    let new_loc = indiv.loc + Coord::new(step_x * sign_x, step_y * sign_y);
    let move_to = (grid.is_in_bounds(new_loc) && grid.is_empty_at(new_loc)).then_some(new_loc);

    Decision {
        index: indiv.index,
        responsiveness,
        osc_period,
        long_probe_dist,
        move_to,
        emit_at,
        nnet: None,
    }
}

/// Sense, think and act for one live agent against the step-start world.
pub fn decide(
    indiv: &Individual,
    ctx: &StepContext<'_>,
    rng: &mut dyn RngCore,
) -> Result<Decision, SimError> {
    let update = ctx.config.hidden_neuron_update;
    let mut nnet = indiv.nnet.clone();
    let levels = nnet.feed_forward(update, |sensor| get_sensor(indiv, sensor, ctx, rng))?;
    let mut decision = execute_actions(
        indiv,
        &levels,
        ctx.grid,
        ctx.config.responsiveness_curve_k_factor,
        rng,
    );
    if update == HiddenNeuronUpdate::Tanh {
        decision.nnet = Some(nnet);
    }
    Ok(decision)
}
