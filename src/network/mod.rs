//! Network Layer
//!
//! The framed wire codec and the byte-buffer session endpoints. No
//! sockets live here; a transport feeds bytes in and drains bytes out.

pub mod protocol;
pub mod session;

pub use protocol::{FrameError, Message, PlayerRecord};
pub use session::{ClientSession, ConnectionId, ServerSession, SessionConfig, SessionId};
