//! Match Session Adapters
//!
//! Byte-buffer endpoints for one match: `ServerSession` owns the
//! authoritative registry, grid, and clock and speaks to each connection
//! through inbound/outbound `Vec<u8>` buffers; `ClientSession` mirrors the
//! server's snapshots into a local player list for a presentation layer.
//! The transport that moves the bytes lives outside this module.

use tracing::{debug, info, warn};

use crate::core::rng::derive_session_seed;
use crate::game::grid::ArenaGrid;
use crate::game::state::{is_terminal, JoinError, PlayerId, PlayerRegistry};
use crate::game::tick::{step, StepConfig, StepOutcome};
use crate::network::protocol::{FrameError, Message, PlayerRecord};
use crate::{MATCH_TIMEOUT_SECS, TICK_RATE};

/// Unique session identifier (UUID bytes).
pub type SessionId = [u8; 16];

/// Handle for one connected client within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u32);

/// Configuration for one match session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Simulation ticks per second (informational; the driver owns timing).
    pub tick_rate: u32,
    /// Seconds until the round resolves in the prey's favor.
    pub timeout_secs: u32,
    /// Collision distance in world units.
    pub collision_threshold: f32,
    /// Fixed grid seed; `None` derives one from the session id.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            timeout_secs: MATCH_TIMEOUT_SECS,
            collision_threshold: 1.0,
            seed: None,
        }
    }
}

/// Per-connection byte buffers plus the player the connection controls.
#[derive(Debug)]
struct Connection {
    id: ConnectionId,
    player: PlayerId,
    inbound: Vec<u8>,
    outbound: Vec<u8>,
}

// =============================================================================
// SERVER SESSION
// =============================================================================

/// The authoritative end of one match.
pub struct ServerSession {
    /// Session identifier.
    id: SessionId,
    config: SessionConfig,
    grid: ArenaGrid,
    registry: PlayerRegistry,
    step_config: StepConfig,
    connections: Vec<Connection>,
    next_connection_id: u32,
    tick_count: u64,
}

impl ServerSession {
    /// Create a session with a freshly generated arena.
    pub fn new(config: SessionConfig) -> Self {
        let id = uuid::Uuid::new_v4().into_bytes();
        let seed = config.seed.unwrap_or_else(|| derive_session_seed(&id));
        let grid = ArenaGrid::generate(seed);
        let step_config = StepConfig {
            timeout_secs: config.timeout_secs,
            collision_threshold: config.collision_threshold,
        };

        info!(
            session_id = %hex::encode(id),
            seed,
            mines = grid.mine_count(),
            "session created"
        );

        Self {
            id,
            config,
            grid,
            registry: PlayerRegistry::new(),
            step_config,
            connections: Vec::new(),
            next_connection_id: 0,
            tick_count: 0,
        }
    }

    /// Session identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The session's arena.
    pub fn grid(&self) -> &ArenaGrid {
        &self.grid
    }

    /// The authoritative player registry.
    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    /// Ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Admit a client: join the registry and open its buffers.
    pub fn connect(&mut self) -> Result<ConnectionId, JoinError> {
        let player = self.registry.join(&self.grid)?;
        let id = ConnectionId(self.next_connection_id);
        self.next_connection_id += 1;
        self.connections.push(Connection {
            id,
            player,
            inbound: Vec::new(),
            outbound: Vec::new(),
        });

        let joined = self.registry.get(player);
        info!(
            session_id = %hex::encode(self.id),
            connection = id.0,
            role = ?joined.map(|p| p.role),
            players = self.registry.len(),
            "client connected"
        );
        Ok(id)
    }

    /// Drop a connection: leave the registry and discard its buffers.
    /// Returns false for an unknown connection id.
    pub fn disconnect(&mut self, conn: ConnectionId) -> bool {
        let Some(index) = self.connections.iter().position(|c| c.id == conn) else {
            return false;
        };
        let connection = self.connections.remove(index);
        self.registry.leave(connection.player);

        info!(
            session_id = %hex::encode(self.id),
            connection = conn.0,
            players = self.registry.len(),
            "client disconnected"
        );
        true
    }

    /// Feed bytes from a connection and apply every complete position
    /// update. Returns the number of updates applied.
    ///
    /// A `FrameError` means the connection is not speaking the protocol;
    /// the caller must `disconnect` it. Other connections are unaffected.
    pub fn receive(&mut self, conn: ConnectionId, bytes: &[u8]) -> Result<usize, FrameError> {
        let Some(connection) = self.connections.iter_mut().find(|c| c.id == conn) else {
            warn!(connection = conn.0, "receive for unknown connection");
            return Ok(0);
        };
        connection.inbound.extend_from_slice(bytes);

        let mut applied = 0;
        loop {
            match Message::try_decode_from_client(&mut connection.inbound) {
                Ok(Some(Message::PositionUpdate(position))) => {
                    if let Some(player) = self.registry.get_mut(connection.player) {
                        player.position = position;
                    }
                    applied += 1;
                }
                Ok(Some(_)) => unreachable!("client decoder only yields position updates"),
                Ok(None) => return Ok(applied),
                Err(err) => {
                    let prefix = &connection.inbound[..connection.inbound.len().min(16)];
                    warn!(
                        session_id = %hex::encode(self.id),
                        connection = conn.0,
                        %err,
                        buffer_prefix = %hex::encode(prefix),
                        "framing error, connection must be dropped"
                    );
                    return Err(err);
                }
            }
        }
    }

    /// Run one simulation step and queue a snapshot for every connection.
    ///
    /// Each connection's snapshot lists its own player first; the rest
    /// follow in registry order.
    pub fn tick(&mut self) -> StepOutcome {
        let elapsed = self.registry.clock().elapsed_secs();
        let outcome = step(&mut self.registry, &self.grid, elapsed, &self.step_config);
        self.tick_count += 1;

        if outcome.terminal {
            info!(
                session_id = %hex::encode(self.id),
                tick = self.tick_count,
                timed_out = outcome.timed_out,
                states = ?self.registry.players().iter().map(|p| p.current_state).collect::<Vec<_>>(),
                "round reached a terminal state"
            );
        }

        for connection in &mut self.connections {
            let mut records = Vec::with_capacity(self.registry.len());
            if let Some(own) = self.registry.get(connection.player) {
                records.push(PlayerRecord::of_player(own, elapsed));
            }
            for player in self.registry.players() {
                if player.id != connection.player {
                    records.push(PlayerRecord::of_player(player, elapsed));
                }
            }
            Message::Snapshot(records).encode(&mut connection.outbound);
        }

        debug!(tick = self.tick_count, elapsed, "tick complete");
        outcome
    }

    /// Bytes queued for a connection, without consuming them.
    pub fn outbound(&self, conn: ConnectionId) -> &[u8] {
        self.connections
            .iter()
            .find(|c| c.id == conn)
            .map(|c| c.outbound.as_slice())
            .unwrap_or(&[])
    }

    /// Drain the bytes queued for a connection.
    pub fn take_outbound(&mut self, conn: ConnectionId) -> Vec<u8> {
        self.connections
            .iter_mut()
            .find(|c| c.id == conn)
            .map(|c| std::mem::take(&mut c.outbound))
            .unwrap_or_default()
    }
}

// =============================================================================
// CLIENT SESSION
// =============================================================================

/// The mirroring end of one match: keeps the last snapshot's player list.
#[derive(Debug, Default)]
pub struct ClientSession {
    inbound: Vec<u8>,
    outbound: Vec<u8>,
    players: Vec<PlayerRecord>,
    clock_secs: u32,
}

impl ClientSession {
    /// Create an empty mirror.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes from the server and apply every complete snapshot.
    /// Each snapshot replaces the whole local list. Returns how many
    /// snapshots were applied.
    pub fn receive(&mut self, bytes: &[u8]) -> Result<usize, FrameError> {
        self.inbound.extend_from_slice(bytes);

        let mut applied = 0;
        loop {
            match Message::try_decode_from_server(&mut self.inbound) {
                Ok(Some(Message::Snapshot(records))) => {
                    self.clock_secs = records.first().map(|r| r.clock_secs).unwrap_or(0);
                    self.players = records;
                    applied += 1;
                }
                Ok(Some(_)) => unreachable!("server decoder only yields snapshots"),
                Ok(None) => return Ok(applied),
                Err(err) => {
                    let prefix = &self.inbound[..self.inbound.len().min(16)];
                    warn!(
                        %err,
                        buffer_prefix = %hex::encode(prefix),
                        "framing error from server"
                    );
                    return Err(err);
                }
            }
        }
    }

    /// Queue one position report for the server.
    pub fn send_position(&mut self, position: crate::core::vec3::Vec3) {
        Message::PositionUpdate(position).encode(&mut self.outbound);
    }

    /// Drain the bytes queued for the server.
    pub fn take_outbound(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbound)
    }

    /// Players from the most recent snapshot, own player first.
    pub fn snapshot(&self) -> &[PlayerRecord] {
        &self.players
    }

    /// Match clock from the most recent snapshot.
    pub fn clock_secs(&self) -> u32 {
        self.clock_secs
    }

    /// True once any player in the mirror holds a win or loss sentinel.
    pub fn round_over(&self) -> bool {
        self.players.iter().any(|p| is_terminal(p.current_state))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec3::Vec3;
    use crate::game::state::Role;
    use crate::network::protocol::MSG_SNAPSHOT;

    // Seed 1 keeps both spawn cells mine-free.
    fn test_config() -> SessionConfig {
        SessionConfig {
            seed: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn test_connect_assigns_roles_in_slot_order() {
        let mut server = ServerSession::new(test_config());
        let first = server.connect().unwrap();
        let second = server.connect().unwrap();
        assert_ne!(first, second);

        let roles: Vec<Role> = server.registry().players().iter().map(|p| p.role).collect();
        assert_eq!(roles, vec![Role::Prey, Role::Hunter]);
    }

    #[test]
    fn test_third_connect_rejected() {
        let mut server = ServerSession::new(test_config());
        server.connect().unwrap();
        server.connect().unwrap();
        assert!(matches!(server.connect(), Err(JoinError::ArenaFull)));
        assert_eq!(server.registry().len(), 2);
    }

    #[test]
    fn test_disconnect_frees_the_slot() {
        let mut server = ServerSession::new(test_config());
        let first = server.connect().unwrap();
        server.connect().unwrap();

        assert!(server.disconnect(first));
        assert!(!server.disconnect(first));
        assert_eq!(server.registry().len(), 1);

        // the freed prey slot is handed to the next client
        server.connect().unwrap();
        assert_eq!(server.registry().players()[1].role, Role::Prey);
    }

    #[test]
    fn test_receive_moves_the_player() {
        let mut server = ServerSession::new(test_config());
        let conn = server.connect().unwrap();

        let mut client = ClientSession::new();
        client.send_position(Vec3::new(-18.0, -17.5, 0.0));
        let applied = server.receive(conn, &client.take_outbound()).unwrap();

        assert_eq!(applied, 1);
        let player = &server.registry().players()[0];
        assert_eq!(player.position, Vec3::new(-18.0, -17.5, 0.0));
    }

    #[test]
    fn test_receive_handles_split_delivery() {
        let mut server = ServerSession::new(test_config());
        let conn = server.connect().unwrap();

        let mut client = ClientSession::new();
        client.send_position(Vec3::new(1.0, 2.0, 3.0));
        let bytes = client.take_outbound();

        // one byte at a time; the update lands only with the final byte
        let mut applied = 0;
        for byte in &bytes {
            applied += server.receive(conn, std::slice::from_ref(byte)).unwrap();
        }
        assert_eq!(applied, 1);
    }

    #[test]
    fn test_framing_error_is_scoped_to_one_connection() {
        let mut server = ServerSession::new(test_config());
        let bad = server.connect().unwrap();
        let good = server.connect().unwrap();

        // a snapshot type byte is never valid client -> server
        let err = server.receive(bad, &[MSG_SNAPSHOT, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, FrameError::UnexpectedType { .. }));
        assert!(server.disconnect(bad));

        let mut client = ClientSession::new();
        client.send_position(Vec3::new(5.0, 5.0, 0.0));
        assert_eq!(server.receive(good, &client.take_outbound()).unwrap(), 1);
    }

    #[test]
    fn test_tick_queues_own_player_first() {
        let mut server = ServerSession::new(test_config());
        let prey_conn = server.connect().unwrap();
        let hunter_conn = server.connect().unwrap();
        server.tick();

        let mut prey_client = ClientSession::new();
        prey_client.receive(&server.take_outbound(prey_conn)).unwrap();
        assert_eq!(prey_client.snapshot()[0].role, Role::Prey);
        assert_eq!(prey_client.snapshot()[1].role, Role::Hunter);

        let mut hunter_client = ClientSession::new();
        hunter_client.receive(&server.take_outbound(hunter_conn)).unwrap();
        assert_eq!(hunter_client.snapshot()[0].role, Role::Hunter);
        assert_eq!(hunter_client.snapshot()[1].role, Role::Prey);
    }

    #[test]
    fn test_snapshot_replaces_not_merges() {
        let mut server = ServerSession::new(test_config());
        let conn = server.connect().unwrap();
        server.connect().unwrap();

        // two ticks, both snapshots buffered before the client reads
        server.tick();
        server.tick();

        let mut client = ClientSession::new();
        let applied = client.receive(&server.take_outbound(conn)).unwrap();
        assert_eq!(applied, 2);
        assert_eq!(client.snapshot().len(), 2);
    }

    #[test]
    fn test_loopback_round() {
        let mut server = ServerSession::new(test_config());
        let prey_conn = server.connect().unwrap();
        let hunter_conn = server.connect().unwrap();

        let mut prey = ClientSession::new();
        let mut hunter = ClientSession::new();

        for _ in 0..5 {
            prey.send_position(Vec3::new(-18.0, -18.0, 0.0));
            hunter.send_position(Vec3::new(18.0, 18.0, 0.0));
            server.receive(prey_conn, &prey.take_outbound()).unwrap();
            server.receive(hunter_conn, &hunter.take_outbound()).unwrap();
            server.tick();
            prey.receive(&server.take_outbound(prey_conn)).unwrap();
            hunter.receive(&server.take_outbound(hunter_conn)).unwrap();
        }

        assert_eq!(prey.snapshot().len(), 2);
        assert_eq!(prey.snapshot()[0].position, Vec3::new(-18.0, -18.0, 0.0));
        assert_eq!(hunter.snapshot()[0].position, Vec3::new(18.0, 18.0, 0.0));
        assert!(!prey.round_over());
        assert!(prey.clock_secs() < 20);
    }

    #[test]
    fn test_collision_surfaces_in_snapshots() {
        let mut server = ServerSession::new(test_config());
        let prey_conn = server.connect().unwrap();
        let hunter_conn = server.connect().unwrap();

        let mut prey = ClientSession::new();
        let mut hunter = ClientSession::new();

        // hunter walks onto the prey's spawn
        let meet = Vec3::new(-20.0, -20.0, 0.0);
        hunter.send_position(meet + Vec3::new(0.25, 0.0, 0.0));
        server.receive(hunter_conn, &hunter.take_outbound()).unwrap();
        server.tick();

        prey.receive(&server.take_outbound(prey_conn)).unwrap();
        assert!(prey.round_over());
        assert_eq!(prey.snapshot()[0].current_state, -1);
        assert_eq!(prey.snapshot()[1].current_state, -3);
    }
}
