//! # Gridhunt Server
//!
//! Authoritative core for a two-player hunter/prey arena played on a
//! 10×10 minesweeper-style grid.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     GRIDHUNT SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── vec3.rs     - float32×3 position vector                 │
//! │  └── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │                                                              │
//! │  game/           - Authoritative simulation                  │
//! │  ├── grid.rs     - Seeded mine layout + cell mapping         │
//! │  ├── state.rs    - Players, spawn slots, match clock         │
//! │  └── tick.rs     - Per-tick state derivation                 │
//! │                                                              │
//! │  network/        - Wire protocol (socket I/O lives outside)  │
//! │  ├── protocol.rs - Binary message framing                    │
//! │  └── session.rs  - Server/client byte-buffer adapters        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The transport is deliberately absent: sessions consume and produce raw
//! byte buffers, and whatever owns the sockets shuttles those bytes between
//! endpoints. Given the same grid seed and the same inbound bytes, a session
//! produces identical snapshots on any platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use crate::core::rng::DeterministicRng;
pub use crate::core::vec3::Vec3;
pub use crate::game::grid::ArenaGrid;
pub use crate::game::state::{MatchClock, Player, PlayerId, PlayerRegistry, Role};
pub use crate::network::protocol::{FrameError, Message, PlayerRecord};
pub use crate::network::session::{ClientSession, ServerSession, SessionConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server simulation tick rate (Hz)
pub const TICK_RATE: u32 = 30;

/// Match timeout in seconds: a round that lasts this long resolves in the
/// prey's favor regardless of positions.
pub const MATCH_TIMEOUT_SECS: u32 = 20;
