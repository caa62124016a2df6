//! Arena Grid
//!
//! Seeded 10×10 minesweeper layout and the mapping from continuous world
//! positions to grid cells. Pure function of the seed; immutable once built.

use serde::{Deserialize, Serialize};

use crate::core::rng::DeterministicRng;
use crate::core::vec3::Vec3;
use crate::game::state::STATE_NEUTRAL;

/// Cells per grid axis.
pub const GRID_SIZE: usize = 10;

/// World-unit width of one grid cell.
pub const CELL_SIZE: f32 = 4.0;

/// Mines placed per grid.
pub const MINE_COUNT: usize = 10;

/// World position of the grid's (row 9, col 0) corner.
pub const GRID_ORIGIN: Vec3 = Vec3::new(-20.0, -20.0, 0.0);

/// Cell value marking a mine. Identical to the lose sentinel on purpose:
/// standing on a mine is read back as an immediate loss.
pub const MINE: i16 = -1;

/// The 10×10 arena layout: `MINE` or the count of adjacent mines (0-8).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaGrid {
    cells: [[i16; GRID_SIZE]; GRID_SIZE],
}

impl ArenaGrid {
    /// Generate a grid from a seed. Deterministic: the same seed always
    /// yields the same layout.
    ///
    /// Draws uniformly random cells until [`MINE_COUNT`] distinct mines are
    /// placed, re-rolling on duplicates and on the two reserved corners
    /// (0,0) and (9,9). There is no retry bound; at least 88 of 100 cells
    /// are acceptable on every draw, so termination is immediate in
    /// practice.
    pub fn generate(seed: u64) -> Self {
        let mut rng = DeterministicRng::new(seed);
        let mut cells = [[0i16; GRID_SIZE]; GRID_SIZE];

        let mut remaining = MINE_COUNT;
        while remaining > 0 {
            let row = rng.next_int(GRID_SIZE as u32) as usize;
            let col = rng.next_int(GRID_SIZE as u32) as usize;

            // never mine the reserved corners
            if row == 0 && col == 0 {
                continue;
            }
            if row == GRID_SIZE - 1 && col == GRID_SIZE - 1 {
                continue;
            }

            if cells[row][col] == 0 {
                cells[row][col] = MINE;
                remaining -= 1;
            }
        }

        // out-of-bounds neighbors count as non-mine
        let is_mine = |r: i32, c: i32| -> i16 {
            if r >= 0 && r < GRID_SIZE as i32 && c >= 0 && c < GRID_SIZE as i32 {
                (cells[r as usize][c as usize] == MINE) as i16
            } else {
                0
            }
        };

        let mut counted = cells;
        for r in 0..GRID_SIZE as i32 {
            for c in 0..GRID_SIZE as i32 {
                if cells[r as usize][c as usize] == MINE {
                    continue;
                }
                counted[r as usize][c as usize] = is_mine(r - 1, c - 1)
                    + is_mine(r - 1, c)
                    + is_mine(r - 1, c + 1)
                    + is_mine(r, c - 1)
                    + is_mine(r, c + 1)
                    + is_mine(r + 1, c - 1)
                    + is_mine(r + 1, c)
                    + is_mine(r + 1, c + 1);
            }
        }

        Self { cells: counted }
    }

    /// Map a continuous world position to its cell value.
    ///
    /// Quantizes `(position - origin) / CELL_SIZE` per axis, clamps
    /// overflow down to the last cell (never wraps), and flips the row axis
    /// so increasing world-y decreases grid row (row 0 is the top). Returns
    /// [`STATE_NEUTRAL`] when an axis lands outside the grid after the
    /// clamp, which only happens on the negative side of the origin.
    pub fn cell_of(&self, position: Vec3) -> i16 {
        let offset = position - GRID_ORIGIN;

        let quantize = |v: f32| -> i32 {
            let q = (v / CELL_SIZE).floor() as i64;
            // clamp overflow to the far edge, never wrap
            if q >= GRID_SIZE as i64 {
                (GRID_SIZE - 1) as i32
            } else {
                q as i32
            }
        };

        let qx = quantize(offset.x);
        let qy = quantize(offset.y);

        let row = (GRID_SIZE as i32 - 1) - qy;
        let col = qx;

        let in_range = |i: i32| i >= 0 && i < GRID_SIZE as i32;
        if !in_range(row) || !in_range(col) {
            return STATE_NEUTRAL;
        }

        self.cells[row as usize][col as usize]
    }

    /// Value of a cell by (row, col).
    #[inline]
    pub fn cell(&self, row: usize, col: usize) -> i16 {
        self.cells[row][col]
    }

    /// Whether a cell holds a mine.
    #[inline]
    pub fn is_mine(&self, row: usize, col: usize) -> bool {
        self.cells[row][col] == MINE
    }

    /// Total mines in the layout.
    pub fn mine_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|&&c| c == MINE)
            .count()
    }
}

// =============================================================================
// TESTS
// =============================================================================
