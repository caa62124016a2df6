//! Game State Definitions
//!
//! Players, the two fixed spawn slots, the authoritative registry, and the
//! match clock. The registry's iteration order is join order and the
//! simulation step depends on it, so players live in a `Vec`, never a map.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::core::vec3::Vec3;
use crate::game::grid::ArenaGrid;

// =============================================================================
// CELL-STATE SENTINELS
// =============================================================================

/// Terminal loss (also the raw value of a mined cell).
pub const STATE_LOSE: i16 = -1;

/// Neutral / off-grid: nothing to display.
pub const STATE_NEUTRAL: i16 = -2;

/// Terminal win.
pub const STATE_WIN: i16 = -3;

/// Whether a cell state ends the round for its player.
#[inline]
pub fn is_terminal(state: i16) -> bool {
    state == STATE_LOSE || state == STATE_WIN
}

/// The terminal sentinel complementary to the given one.
#[inline]
pub fn complement(state: i16) -> i16 {
    debug_assert!(is_terminal(state));
    if state == STATE_LOSE {
        STATE_WIN
    } else {
        STATE_LOSE
    }
}

// =============================================================================
// ROLES
// =============================================================================

/// A player's side, fixed at spawn for the lifetime of the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Role {
    /// Evades the hunter until the match clock runs out.
    Prey = 1,
    /// Wins by closing within the collision threshold of the prey.
    Hunter = 2,
}

impl Role {
    /// Role implied by a spawn slot: positive x is the hunter's side.
    #[inline]
    pub fn of_spawn(start_position: Vec3) -> Self {
        if start_position.x > 0.0 {
            Role::Hunter
        } else {
            Role::Prey
        }
    }

    /// Wire byte for this role.
    #[inline]
    pub fn to_wire(self) -> u8 {
        self as u8
    }

    /// Parse a wire byte; `None` for anything but 1 or 2.
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Role::Prey),
            2 => Some(Role::Hunter),
            _ => None,
        }
    }
}

// =============================================================================
// PLAYER
// =============================================================================

/// Registry-unique player identifier.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PlayerId(pub u32);

/// State of one player in the arena.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    /// Identifier assigned at join.
    pub id: PlayerId,
    /// Current position; authoritative here, predicted on clients.
    pub position: Vec3,
    /// Spawn point; immutable, identifies the reserved slot.
    pub start_position: Vec3,
    /// Cell value or sentinel; written only by the simulation step
    /// (and once at spawn).
    pub current_state: i16,
    /// Fixed at spawn from the slot's x sign.
    pub role: Role,
}

// =============================================================================
// SPAWN SLOTS
// =============================================================================

/// The two fixed spawn points. Index 0 is the prey corner.
pub const SPAWN_POSITIONS: [Vec3; 2] = [
    Vec3::new(-20.0, -20.0, 0.0),
    Vec3::new(20.0, 20.0, 0.0),
];

#[derive(Clone, Copy, Debug)]
struct SpawnSlot {
    position: Vec3,
    reserved: bool,
}

// =============================================================================
// MATCH CLOCK
// =============================================================================

/// Wall-clock seconds since the arena last filled to two players.
///
/// Starts when the registry first reaches two players, and is cleared (not
/// paused) whenever it drops back below two; the next threshold crossing
/// restarts from zero.
#[derive(Clone, Debug, Default)]
pub struct MatchClock {
    started: Option<Instant>,
}

impl MatchClock {
    /// Start the clock if it is not already running.
    pub fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    /// Stop and reset.
    pub fn clear(&mut self) {
        self.started = None;
    }

    /// Whether the clock is running.
    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    /// Whole seconds elapsed; 0 while stopped.
    pub fn elapsed_secs(&self) -> u32 {
        self.started
            .map(|t| t.elapsed().as_secs() as u32)
            .unwrap_or(0)
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Why a join was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    /// Both spawn slots are reserved. Recoverable: reject the join, the
    /// session continues.
    #[error("arena full: both spawn slots are reserved")]
    ArenaFull,
}

// =============================================================================
// PLAYER REGISTRY
// =============================================================================

/// The authoritative set of active players, owned by the server session.
///
/// At most two players, each holding one of the two spawn slots. Iteration
/// order is join order; the simulation step's collision propagation depends
/// on it (see [`crate::game::tick`]).
#[derive(Debug)]
pub struct PlayerRegistry {
    players: Vec<Player>,
    slots: [SpawnSlot; 2],
    next_player_id: u32,
    clock: MatchClock,
}

impl PlayerRegistry {
    /// Create an empty registry with both slots free.
    pub fn new() -> Self {
        Self {
            players: Vec::with_capacity(SPAWN_POSITIONS.len()),
            slots: SPAWN_POSITIONS.map(|position| SpawnSlot {
                position,
                reserved: false,
            }),
            next_player_id: 1,
            clock: MatchClock::default(),
        }
    }

    /// Reserve the first free spawn slot and add a player there.
    ///
    /// The role comes from the slot's x sign, the initial cell state from
    /// the grid under the spawn point. Starts the match clock the moment
    /// the registry reaches two players. Fails with [`JoinError::ArenaFull`]
    /// without mutating anything when both slots are taken.
    pub fn join(&mut self, grid: &ArenaGrid) -> Result<PlayerId, JoinError> {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| !s.reserved)
            .ok_or(JoinError::ArenaFull)?;
        slot.reserved = true;
        let start_position = slot.position;

        let id = PlayerId(self.next_player_id);
        self.next_player_id += 1;

        self.players.push(Player {
            id,
            position: start_position,
            start_position,
            current_state: grid.cell_of(start_position),
            role: Role::of_spawn(start_position),
        });

        if self.players.len() >= 2 {
            self.clock.start();
        }

        Ok(id)
    }

    /// Remove a player and release its spawn slot.
    ///
    /// # Panics
    ///
    /// Panics when `id` is untracked or its slot is not reserved. Either
    /// means the caller broke the registry contract; this is not a runtime
    /// condition to recover from.
    pub fn leave(&mut self, id: PlayerId) {
        let index = self
            .players
            .iter()
            .position(|p| p.id == id)
            .unwrap_or_else(|| panic!("leave() called for untracked player {id:?}"));
        let player = self.players.remove(index);

        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.reserved && s.position.bits_eq(player.start_position))
            .unwrap_or_else(|| {
                panic!("no reserved spawn slot matches {:?}", player.start_position)
            });
        slot.reserved = false;

        if self.players.len() < 2 {
            self.clock.clear();
        }
    }

    /// All players in join order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// All players, mutable, in join order.
    pub(crate) fn players_mut(&mut self) -> &mut [Player] {
        &mut self.players
    }

    /// Look up a player.
    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Look up a player mutably.
    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Active player count.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// The match clock.
    pub fn clock(&self) -> &MatchClock {
        &self.clock
    }
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
