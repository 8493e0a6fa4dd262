//! Occupancy grid: who (or what) sits in every cell of the world.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BarrierType;
use crate::coord::Coord;

/// Cell value of an unoccupied cell.
pub const EMPTY: u16 = 0;
/// Cell value of an impassable barrier.
pub const BARRIER: u16 = 0xFFFF;

/// Errors produced while building a grid.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GridError {
    #[error("grid dimensions must be non-zero and fit in 16 bits")]
    InvalidDimensions,
    #[error("barrier type {0:?} is not supported")]
    UnsupportedBarrier(BarrierType),
}

/// Visit every in-bounds cell within `radius` of `loc` on a `width` x `height` grid.
///
/// The radius is truncated for the horizontal sweep; each column then spans
/// `trunc(sqrt(radius^2 - dx^2))` cells above and below `loc.y`.
pub fn visit_neighborhood(
    width: u32,
    height: u32,
    loc: Coord,
    radius: f32,
    mut visit: impl FnMut(Coord),
) {
    let (w, h) = (width as i32, height as i32);
    let r = radius as i32;
    let dx_min = -r.min(loc.x);
    let dx_max = r.min(w - loc.x - 1);
    for dx in dx_min..=dx_max {
        let x = loc.x + dx;
        let extent_y = (radius * radius - (dx * dx) as f32).max(0.0).sqrt() as i32;
        let dy_min = -extent_y.min(loc.y);
        let dy_max = extent_y.min(h - loc.y - 1);
        for dy in dy_min..=dy_max {
            visit(Coord::new(x, loc.y + dy));
        }
    }
}

/// Row-major grid of `u16` cells.
///
/// `0` is empty, `0xFFFF` is a barrier and any other value is `1 + index` of
/// the agent standing there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<u16>,
    barrier_locations: Vec<Coord>,
    barrier_centers: Vec<Coord>,
}

impl Grid {
    /// Create an empty grid.
    pub fn new(width: u32, height: u32) -> Result<Self, GridError> {
        if width == 0 || height == 0 || width > u32::from(u16::MAX) || height > u32::from(u16::MAX)
        {
            return Err(GridError::InvalidDimensions);
        }
        Ok(Self {
            width,
            height,
            cells: vec![EMPTY; (width as usize) * (height as usize)],
            barrier_locations: Vec::new(),
            barrier_centers: Vec::new(),
        })
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Raw cell value, or `None` outside the grid.
    #[must_use]
    pub fn cell_at(&self, x: i32, y: i32) -> Option<u16> {
        self.offset(x, y).map(|idx| self.cells[idx])
    }

    /// Overwrite a cell; returns `false` (and changes nothing) outside the grid.
    pub fn set_cell(&mut self, x: i32, y: i32, value: u16) -> bool {
        match self.offset(x, y) {
            Some(idx) => {
                self.cells[idx] = value;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn at(&self, loc: Coord) -> Option<u16> {
        self.cell_at(loc.x, loc.y)
    }

    pub fn set(&mut self, loc: Coord, value: u16) -> bool {
        self.set_cell(loc.x, loc.y, value)
    }

    #[must_use]
    pub fn is_in_bounds(&self, loc: Coord) -> bool {
        self.offset(loc.x, loc.y).is_some()
    }

    #[must_use]
    pub fn is_empty_at(&self, loc: Coord) -> bool {
        self.at(loc) == Some(EMPTY)
    }

    #[must_use]
    pub fn is_barrier_at(&self, loc: Coord) -> bool {
        self.at(loc) == Some(BARRIER)
    }

    #[must_use]
    pub fn is_occupied_at(&self, loc: Coord) -> bool {
        matches!(self.at(loc), Some(v) if v != EMPTY && v != BARRIER)
    }

    /// Index of the agent standing at `loc`, if any.
    #[must_use]
    pub fn occupant_at(&self, loc: Coord) -> Option<usize> {
        match self.at(loc) {
            Some(v) if v != EMPTY && v != BARRIER => Some(usize::from(v) - 1),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_border(&self, loc: Coord) -> bool {
        loc.x == 0
            || loc.x == self.width as i32 - 1
            || loc.y == 0
            || loc.y == self.height as i32 - 1
    }

    /// Sample random cells until an empty one is found.
    ///
    /// Returns `None` when the grid has no empty cell at all.
    pub fn find_empty_location(&self, rng: &mut dyn RngCore) -> Option<Coord> {
        if !self.cells.contains(&EMPTY) {
            return None;
        }
        loop {
            let loc = Coord::new(
                rng.random_range(0..self.width as i32),
                rng.random_range(0..self.height as i32),
            );
            if self.is_empty_at(loc) {
                return Some(loc);
            }
        }
    }

    /// Clear every cell and forget recorded barriers.
    pub fn zero_fill(&mut self) {
        self.cells.fill(EMPTY);
        self.barrier_locations.clear();
        self.barrier_centers.clear();
    }

    /// Iterate over all cells as `(location, value)`.
    pub fn iter(&self) -> impl Iterator<Item = (Coord, u16)> + '_ {
        let width = self.width as usize;
        self.cells
            .iter()
            .enumerate()
            .map(move |(idx, value)| (Coord::new((idx % width) as i32, (idx / width) as i32), *value))
    }

    pub fn visit_neighborhood(&self, loc: Coord, radius: f32, visit: impl FnMut(Coord)) {
        visit_neighborhood(self.width, self.height, loc, radius, visit);
    }

    #[must_use]
    pub fn barrier_locations(&self) -> &[Coord] {
        &self.barrier_locations
    }

    #[must_use]
    pub fn barrier_centers(&self) -> &[Coord] {
        &self.barrier_centers
    }

    fn place_barrier(&mut self, loc: Coord) {
        if self.set(loc, BARRIER) {
            self.barrier_locations.push(loc);
        }
    }

    fn draw_box(&mut self, min: Coord, max: Coord) {
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                self.place_barrier(Coord::new(x, y));
            }
        }
    }

    /// Write the barrier layout for `kind` into the grid.
    ///
    /// Previously recorded barrier locations and centers are discarded first.
    pub fn create_barrier(
        &mut self,
        kind: BarrierType,
        rng: &mut dyn RngCore,
    ) -> Result<(), GridError> {
        self.barrier_locations.clear();
        self.barrier_centers.clear();
        let (sx, sy) = (self.width as i32, self.height as i32);
        match kind {
            BarrierType::None => {}
            BarrierType::VerticalBarConstant => {
                let min = Coord::new(sx / 2, sy / 4);
                self.draw_box(min, Coord::new(min.x + 1, min.y + sy / 2));
            }
            BarrierType::VerticalBarRandom => {
                let min_x = random_between(rng, 20, sx - 20);
                let min_y = random_between(rng, 20, sy / 2 - 20);
                self.draw_box(
                    Coord::new(min_x, min_y),
                    Coord::new(min_x + 1, min_y + sy / 2),
                );
            }
            BarrierType::FiveBlocksStaggered => {
                let block_w = 2;
                let block_h = sx / 3;
                let mut x0 = sx / 4 - block_w / 2;
                let mut y0 = sy / 4 - block_h / 2;
                self.draw_box(Coord::new(x0, y0), Coord::new(x0 + block_w, y0 + block_h));
                x0 += sx / 2;
                self.draw_box(Coord::new(x0, y0), Coord::new(x0 + block_w, y0 + block_h));
                y0 += sy / 2;
                self.draw_box(Coord::new(x0, y0), Coord::new(x0 + block_w, y0 + block_h));
                x0 -= sx / 2;
                self.draw_box(Coord::new(x0, y0), Coord::new(x0 + block_w, y0 + block_h));
                x0 = sx / 2 - block_w / 2;
                y0 = sy / 2 - block_h / 2;
                self.draw_box(Coord::new(x0, y0), Coord::new(x0 + block_w, y0 + block_h));
            }
            BarrierType::HorizontalBarConstant => {
                let min = Coord::new(sx / 4, sy / 2 + sy / 4);
                self.draw_box(min, Coord::new(min.x + sx / 2, min.y + 2));
            }
            BarrierType::Spots => {
                const SPOTS: i32 = 5;
                const SPOT_RADIUS: f32 = 5.0;
                let slice = sy / (SPOTS + 1);
                for n in 1..=SPOTS {
                    let center = Coord::new(sx / 2, n * slice);
                    let mut cells = Vec::new();
                    self.visit_neighborhood(center, SPOT_RADIUS, |loc| cells.push(loc));
                    for loc in cells {
                        self.place_barrier(loc);
                    }
                    self.barrier_centers.push(center);
                }
            }
            BarrierType::FloatingIslands => return Err(GridError::UnsupportedBarrier(kind)),
        }
        Ok(())
    }
}

/// Uniform integer in `[lo, hi]`, collapsing to `lo` on grids too small for the range.
fn random_between(rng: &mut dyn RngCore, lo: i32, hi: i32) -> i32 {
    if hi <= lo {
        return lo.min(hi).max(0);
    }
    rng.random_range(lo..=hi)
}
