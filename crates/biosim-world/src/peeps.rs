//! Agent registry plus the deferred move, death and emission queues.
//!
//! The decide phase only ever appends to the queues; the world changes when
//! the queues are drained during the single-threaded commit.

use biosim_core::{Coord, EMPTY, Grid, Signals};

use crate::individual::Individual;

#[derive(Debug, Clone, Default)]
pub struct Peeps {
    individuals: Vec<Individual>,
    death_queue: Vec<usize>,
    move_queue: Vec<(usize, Coord)>,
    emission_queue: Vec<(usize, Coord)>,
}

impl Peeps {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `indiv`; its index must equal the current population size.
    pub fn push(&mut self, indiv: Individual) {
        debug_assert_eq!(indiv.index, self.individuals.len());
        self.individuals.push(indiv);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Individual> {
        self.individuals.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Individual> {
        self.individuals.get_mut(index)
    }

    #[must_use]
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn iter(&self) -> impl Iterator<Item = &Individual> {
        self.individuals.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Individual> {
        self.individuals.iter_mut()
    }

    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.individuals.iter().filter(|indiv| indiv.alive).count()
    }

    /// Agent standing at `loc` according to `grid`.
    #[must_use]
    pub fn individual_at(&self, grid: &Grid, loc: Coord) -> Option<&Individual> {
        grid.occupant_at(loc).and_then(|idx| self.individuals.get(idx))
    }

    pub fn queue_for_death(&mut self, index: usize) {
        self.death_queue.push(index);
    }

    pub fn queue_for_move(&mut self, index: usize, new_loc: Coord) {
        self.move_queue.push((index, new_loc));
    }

    pub fn queue_emission(&mut self, layer: usize, loc: Coord) {
        self.emission_queue.push((layer, loc));
    }

    #[must_use]
    pub fn death_queue_len(&self) -> usize {
        self.death_queue.len()
    }

    #[must_use]
    pub fn move_queue_len(&self) -> usize {
        self.move_queue.len()
    }

    /// Mark queued agents dead and clear their cells. Returns how many died.
    pub fn drain_death_queue(&mut self, grid: &mut Grid) -> usize {
        let mut died = 0;
        for index in self.death_queue.drain(..) {
            let Some(indiv) = self.individuals.get_mut(index) else {
                continue;
            };
            if !indiv.alive {
                continue;
            }
            grid.set(indiv.loc, EMPTY);
            indiv.alive = false;
            died += 1;
        }
        died
    }

    /// Apply queued moves in queue order. Returns how many succeeded.
    ///
    /// Dead movers are skipped, and a move whose destination has been taken
    /// by an earlier move in the same drain is dropped.
    pub fn drain_move_queue(&mut self, grid: &mut Grid) -> usize {
        let mut moved = 0;
        for (index, new_loc) in self.move_queue.drain(..) {
            let Some(indiv) = self.individuals.get_mut(index) else {
                continue;
            };
            if !indiv.alive || !grid.is_empty_at(new_loc) {
                continue;
            }
            let move_dir = (new_loc - indiv.loc).as_dir();
            grid.set(indiv.loc, EMPTY);
            grid.set(new_loc, indiv.grid_value());
            indiv.loc = new_loc;
            indiv.last_move_dir = move_dir;
            moved += 1;
        }
        moved
    }

    /// Deposit queued emissions into `signals`. Returns how many were applied.
    pub fn drain_emission_queue(&mut self, signals: &mut Signals) -> usize {
        let count = self.emission_queue.len();
        for (layer, loc) in self.emission_queue.drain(..) {
            signals.increment(layer, loc);
        }
        count
    }
}
