//! Game Logic
//!
//! Deterministic arena state: the mined grid, the player registry with
//! its two spawn slots and match clock, and the per-tick simulation step.

pub mod grid;
pub mod state;
pub mod tick;

pub use grid::{ArenaGrid, CELL_SIZE, GRID_SIZE, MINE_COUNT};
pub use state::{
    complement, is_terminal, JoinError, MatchClock, Player, PlayerId, PlayerRegistry, Role,
    STATE_LOSE, STATE_NEUTRAL, STATE_WIN,
};
pub use tick::{step, StepConfig, StepOutcome};
