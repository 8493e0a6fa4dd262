//! Pheromone-like signal layers laid over the grid.

use serde::{Deserialize, Serialize};

use crate::coord::Coord;
use crate::grid::{GridError, visit_neighborhood};

pub const SIGNAL_MIN: u8 = 0;
pub const SIGNAL_MAX: u8 = u8::MAX;

/// Radius reached by a single emission.
const EMISSION_RADIUS: f32 = 1.5;
const NEIGHBOR_INCREASE: u8 = 1;
const CENTER_INCREASE: u8 = 2;
const FADE_AMOUNT: u8 = 1;

/// One channel of saturating `u8` intensities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalLayer {
    width: u32,
    height: u32,
    cells: Vec<u8>,
}

impl SignalLayer {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![SIGNAL_MIN; (width as usize) * (height as usize)],
        }
    }

    #[inline]
    fn offset(&self, loc: Coord) -> Option<usize> {
        if loc.x < 0 || loc.y < 0 || loc.x >= self.width as i32 || loc.y >= self.height as i32 {
            return None;
        }
        Some(loc.y as usize * self.width as usize + loc.x as usize)
    }

    /// Intensity at `loc`; zero outside the layer.
    #[must_use]
    pub fn get(&self, loc: Coord) -> u8 {
        self.offset(loc).map_or(SIGNAL_MIN, |idx| self.cells[idx])
    }

    fn add_saturating(&mut self, loc: Coord, amount: u8) {
        if let Some(idx) = self.offset(loc) {
            self.cells[idx] = self.cells[idx].saturating_add(amount);
        }
    }

    /// Lower every cell by one, stopping at zero.
    pub fn fade(&mut self) {
        for cell in &mut self.cells {
            *cell = cell.saturating_sub(FADE_AMOUNT);
        }
    }

    pub fn zero_fill(&mut self) {
        self.cells.fill(SIGNAL_MIN);
    }
}

/// Stack of signal layers sharing the grid's dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signals {
    width: u32,
    height: u32,
    layers: Vec<SignalLayer>,
}

impl Signals {
    pub fn new(num_layers: usize, width: u32, height: u32) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::InvalidDimensions);
        }
        Ok(Self {
            width,
            height,
            layers: (0..num_layers)
                .map(|_| SignalLayer::new(width, height))
                .collect(),
        })
    }

    /// Intensity of `layer` at `loc`; zero for unknown layers or out-of-bounds cells.
    #[must_use]
    pub fn magnitude(&self, layer: usize, loc: Coord) -> u8 {
        self.layers.get(layer).map_or(SIGNAL_MIN, |l| l.get(loc))
    }

    /// Deposit one emission centred on `loc`.
    ///
    /// Every cell within radius 1.5 (the centre included) gains 1, then the
    /// centre gains a further 2; all additions saturate at 255.
    pub fn increment(&mut self, layer: usize, loc: Coord) {
        let (width, height) = (self.width, self.height);
        let Some(target) = self.layers.get_mut(layer) else {
            return;
        };
        visit_neighborhood(width, height, loc, EMISSION_RADIUS, |cell| {
            target.add_saturating(cell, NEIGHBOR_INCREASE);
        });
        target.add_saturating(loc, CENTER_INCREASE);
    }

    pub fn fade_all(&mut self) {
        self.layers.iter_mut().for_each(SignalLayer::fade);
    }

    pub fn zero_fill(&mut self) {
        self.layers.iter_mut().for_each(SignalLayer::zero_fill);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fade_floors_at_zero() {
        let mut signals = Signals::new(2, 4, 4).expect("signals");
        let center = Coord::new(1, 1);
        for _ in 0..200 {
            signals.increment(0, center);
        }
        signals.fade_all();
        assert_eq!(signals.magnitude(0, center), 254);
        assert_eq!(signals.magnitude(0, Coord::new(0, 0)), 199);
        assert_eq!(signals.magnitude(0, Coord::new(3, 3)), 0);
        assert_eq!(signals.magnitude(1, center), 0);
    }

    #[test]
    fn increment_spreads_and_weights_center() {
        let mut signals = Signals::new(2, 8, 8).expect("signals");
        let center = Coord::new(4, 4);
        signals.increment(0, center);
        assert_eq!(signals.magnitude(0, center), 3);
        assert_eq!(signals.magnitude(0, Coord::new(5, 5)), 1);
        assert_eq!(signals.magnitude(0, Coord::new(6, 4)), 0);
        assert_eq!(signals.magnitude(1, center), 0);
    }

    #[test]
    fn increment_saturates() {
        let mut signals = Signals::new(1, 3, 3).expect("signals");
        let center = Coord::new(1, 1);
        for _ in 0..200 {
            signals.increment(0, center);
        }
        assert_eq!(signals.magnitude(0, center), SIGNAL_MAX);
        assert_eq!(signals.magnitude(0, Coord::new(0, 0)), 200);
    }

    #[test]
    fn zero_fill_clears_all_layers() {
        let mut signals = Signals::new(2, 3, 3).expect("signals");
        signals.increment(0, Coord::new(1, 1));
        signals.increment(1, Coord::new(1, 1));
        signals.zero_fill();
        assert_eq!(signals.magnitude(0, Coord::new(1, 1)), 0);
        assert_eq!(signals.magnitude(1, Coord::new(1, 1)), 0);
    }
}
