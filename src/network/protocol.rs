//! Protocol Framing
//!
//! Binary wire format shared with the reference client: a 4-byte header
//! (`type: u8`, `length: u24` little-endian) followed by `length` payload
//! bytes. Two message types exist. Clients send position updates, the
//! server sends full state snapshots. Any malformed frame is fatal to the
//! connection that produced it; only "not enough bytes yet" is benign.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::vec3::{Vec3, VEC3_WIRE_SIZE};
use crate::game::state::{Player, Role};

// =============================================================================
// WIRE CONSTANTS
// =============================================================================

/// Header bytes preceding every payload.
pub const HEADER_SIZE: usize = 4;

/// Client -> server position update.
pub const MSG_POSITION_UPDATE: u8 = 1;

/// Server -> client state snapshot.
pub const MSG_SNAPSHOT: u8 = 2;

/// A position update payload is exactly one encoded vector.
pub const POSITION_PAYLOAD_SIZE: usize = VEC3_WIRE_SIZE;

/// Per-player bytes inside a snapshot payload: position, start position,
/// state (i16 LE), role (u8), match clock seconds (u32 LE).
pub const PLAYER_RECORD_SIZE: usize = 2 * VEC3_WIRE_SIZE + 2 + 1 + 4;

// =============================================================================
// ERRORS
// =============================================================================

/// Framing violations. Every variant is fatal: the peer is not speaking
/// this protocol (or this direction of it) and the connection must go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Type byte is not the one this direction accepts.
    #[error("unexpected message type {found:#04x} (expected {expected:#04x})")]
    UnexpectedType {
        /// The type byte on the wire.
        found: u8,
        /// The only type byte valid for this direction.
        expected: u8,
    },

    /// Declared payload length contradicts the message type.
    #[error("declared length {found} does not match required {expected}")]
    LengthMismatch {
        /// Length the message type requires.
        expected: usize,
        /// Length the header declared.
        found: usize,
    },

    /// Payload ended mid-field or mid-record.
    #[error("payload truncated: wanted {wanted} more byte(s)")]
    UnexpectedEnd {
        /// Bytes missing at the point parsing stopped.
        wanted: usize,
    },

    /// Bytes left over after the declared player count was consumed.
    #[error("{extra} trailing byte(s) after last player record")]
    TrailingData {
        /// Count of unconsumed payload bytes.
        extra: usize,
    },

    /// Role byte is neither prey (1) nor hunter (2).
    #[error("invalid role byte {byte:#04x}")]
    BadRole {
        /// The offending byte.
        byte: u8,
    },
}

// =============================================================================
// MESSAGES
// =============================================================================

/// One player's entry in a snapshot.
///
/// The match clock rides along in every record even though it is
/// per-session state. The reference client reads it from each record, so
/// the redundancy stays.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Current world position.
    pub position: Vec3,
    /// Spawn position (identifies the player's slot to the client).
    pub start_position: Vec3,
    /// Cell state sentinel or adjacent-mine count.
    pub current_state: i16,
    /// Prey or hunter.
    pub role: Role,
    /// Whole seconds since the match clock started.
    pub clock_secs: u32,
}

impl PlayerRecord {
    /// Snapshot one registry entry.
    pub fn of_player(player: &Player, clock_secs: u32) -> Self {
        Self {
            position: player.position,
            start_position: player.start_position,
            current_state: player.current_state,
            role: player.role,
            clock_secs,
        }
    }
}

/// A decoded wire message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Client reporting where its player moved.
    PositionUpdate(Vec3),
    /// Server broadcasting every player's state.
    Snapshot(Vec<PlayerRecord>),
}

impl Message {
    /// Append this message (header + payload) to an outbound buffer.
    ///
    /// Snapshot lengths are patched into the header after the payload is
    /// written, so the encoder never walks the record list twice.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Message::PositionUpdate(position) => {
                buf.push(MSG_POSITION_UPDATE);
                write_len(buf, POSITION_PAYLOAD_SIZE);
                buf.extend_from_slice(&position.to_wire());
            }
            Message::Snapshot(records) => {
                buf.push(MSG_SNAPSHOT);
                let len_at = buf.len();
                write_len(buf, 0); // placeholder, patched below
                let payload_start = buf.len();

                buf.push(records.len() as u8);
                for record in records {
                    buf.extend_from_slice(&record.position.to_wire());
                    buf.extend_from_slice(&record.start_position.to_wire());
                    buf.extend_from_slice(&record.current_state.to_le_bytes());
                    buf.push(record.role.to_wire());
                    buf.extend_from_slice(&record.clock_secs.to_le_bytes());
                }

                let payload_len = buf.len() - payload_start;
                buf[len_at] = (payload_len & 0xFF) as u8;
                buf[len_at + 1] = ((payload_len >> 8) & 0xFF) as u8;
                buf[len_at + 2] = ((payload_len >> 16) & 0xFF) as u8;
            }
        }
    }

    /// Decode the next client -> server message (position updates only).
    ///
    /// `Ok(None)` means the buffer holds an incomplete frame and is left
    /// untouched; a complete frame is consumed from the front.
    pub fn try_decode_from_client(buf: &mut Vec<u8>) -> Result<Option<Message>, FrameError> {
        let (length, payload_at) = match read_header(buf, MSG_POSITION_UPDATE)? {
            Some(header) => header,
            None => return Ok(None),
        };
        if length != POSITION_PAYLOAD_SIZE {
            return Err(FrameError::LengthMismatch {
                expected: POSITION_PAYLOAD_SIZE,
                found: length,
            });
        }
        if buf.len() < payload_at + length {
            return Ok(None);
        }

        let mut wire = [0u8; VEC3_WIRE_SIZE];
        wire.copy_from_slice(&buf[payload_at..payload_at + VEC3_WIRE_SIZE]);
        buf.drain(..payload_at + length);
        Ok(Some(Message::PositionUpdate(Vec3::from_wire(&wire))))
    }

    /// Decode the next server -> client message (snapshots only).
    ///
    /// Same incompleteness contract as [`Message::try_decode_from_client`].
    pub fn try_decode_from_server(buf: &mut Vec<u8>) -> Result<Option<Message>, FrameError> {
        let (length, payload_at) = match read_header(buf, MSG_SNAPSHOT)? {
            Some(header) => header,
            None => return Ok(None),
        };
        if buf.len() < payload_at + length {
            return Ok(None);
        }

        let payload: Vec<u8> = buf[payload_at..payload_at + length].to_vec();
        buf.drain(..payload_at + length);

        let records = parse_snapshot_payload(&payload)?;
        Ok(Some(Message::Snapshot(records)))
    }
}

// =============================================================================
// INTERNALS
// =============================================================================

/// Append a 24-bit little-endian length.
fn write_len(buf: &mut Vec<u8>, len: usize) {
    buf.push((len & 0xFF) as u8);
    buf.push(((len >> 8) & 0xFF) as u8);
    buf.push(((len >> 16) & 0xFF) as u8);
}

/// Read and validate the frame header. `Ok(None)` when fewer than
/// [`HEADER_SIZE`] bytes are buffered; otherwise the declared payload
/// length and the payload's start offset.
fn read_header(buf: &[u8], expected_type: u8) -> Result<Option<(usize, usize)>, FrameError> {
    if buf.len() < HEADER_SIZE {
        return Ok(None);
    }
    if buf[0] != expected_type {
        return Err(FrameError::UnexpectedType {
            found: buf[0],
            expected: expected_type,
        });
    }
    let length = buf[1] as usize | (buf[2] as usize) << 8 | (buf[3] as usize) << 16;
    Ok(Some((length, HEADER_SIZE)))
}

fn parse_snapshot_payload(payload: &[u8]) -> Result<Vec<PlayerRecord>, FrameError> {
    let mut cursor = Cursor::new(payload);
    let count = cursor.take_u8()? as usize;

    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        let position = Vec3::from_wire(&cursor.take_array()?);
        let start_position = Vec3::from_wire(&cursor.take_array()?);
        let current_state = i16::from_le_bytes(cursor.take_array()?);
        let role_byte = cursor.take_u8()?;
        let role = Role::from_wire(role_byte).ok_or(FrameError::BadRole { byte: role_byte })?;
        let clock_secs = u32::from_le_bytes(cursor.take_array()?);
        records.push(PlayerRecord {
            position,
            start_position,
            current_state,
            role,
            clock_secs,
        });
    }

    let extra = cursor.remaining();
    if extra > 0 {
        return Err(FrameError::TrailingData { extra });
    }
    Ok(records)
}

/// Bounds-checked forward reader over a payload slice.
struct Cursor<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, at: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.at
    }

    fn take_u8(&mut self) -> Result<u8, FrameError> {
        if self.remaining() < 1 {
            return Err(FrameError::UnexpectedEnd { wanted: 1 });
        }
        let byte = self.bytes[self.at];
        self.at += 1;
        Ok(byte)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], FrameError> {
        if self.remaining() < N {
            return Err(FrameError::UnexpectedEnd {
                wanted: N - self.remaining(),
            });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.at..self.at + N]);
        self.at += N;
        Ok(out)
    }
}

// =============================================================================
// TESTS
// =============================================================================
