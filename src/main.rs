//! Gridhunt Game Server
//!
//! Authoritative server for the two-player hunter/prey arena.
//! Runs a loopback demo match: two in-process clients exchange bytes
//! with a server session exactly as a socket transport would.

use anyhow::Context;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use gridhunt::{
    ClientSession, SessionConfig, ServerSession, Vec3, MATCH_TIMEOUT_SECS, TICK_RATE, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Gridhunt Server v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);
    info!("Match Timeout: {} s", MATCH_TIMEOUT_SECS);

    demo_match().await
}

/// Run a scripted chase over in-memory buffers: the hunter pursues the
/// prey while the prey runs for the opposite corner.
async fn demo_match() -> anyhow::Result<()> {
    info!("=== Starting Demo Match ===");

    let mut server = ServerSession::new(SessionConfig::default());
    let prey_conn = server.connect().context("prey failed to join")?;
    let hunter_conn = server.connect().context("hunter failed to join")?;

    let mut prey = ClientSession::new();
    let mut hunter = ClientSession::new();

    let mut prey_pos = Vec3::new(-20.0, -20.0, 0.0);
    let mut hunter_pos = Vec3::new(20.0, 20.0, 0.0);
    let dt = 1.0 / TICK_RATE as f32;

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / TICK_RATE as f64));
    let max_ticks = (MATCH_TIMEOUT_SECS + 5) * TICK_RATE;

    for tick in 0..max_ticks {
        ticker.tick().await;

        // prey flees toward the hunter's corner along the diagonal
        prey_pos = prey_pos + Vec3::new(2.5 * dt, 2.5 * dt, 0.0);

        // hunter steers at the prey's last reported position
        let target = prey
            .snapshot()
            .iter()
            .find(|r| r.role == gridhunt::Role::Prey)
            .map(|r| r.position)
            .unwrap_or(prey_pos);
        let to_target = target - hunter_pos;
        let dist = to_target.distance(Vec3::ZERO);
        if dist > f32::EPSILON {
            let speed = 5.0 * dt / dist;
            hunter_pos = hunter_pos + Vec3::new(to_target.x * speed, to_target.y * speed, 0.0);
        }

        prey.send_position(prey_pos);
        hunter.send_position(hunter_pos);
        server.receive(prey_conn, &prey.take_outbound())?;
        server.receive(hunter_conn, &hunter.take_outbound())?;

        let outcome = server.tick();

        prey.receive(&server.take_outbound(prey_conn))?;
        hunter.receive(&server.take_outbound(hunter_conn))?;

        if tick % TICK_RATE == 0 {
            info!(
                "t={:>2}s prey=({:.1}, {:.1}) hunter=({:.1}, {:.1}) gap={:.1}",
                prey.clock_secs(),
                prey_pos.x,
                prey_pos.y,
                hunter_pos.x,
                hunter_pos.y,
                prey_pos.distance(hunter_pos),
            );
        }

        if outcome.terminal {
            info!("Round over at tick {} (timed_out: {})", tick, outcome.timed_out);
            break;
        }
    }

    info!("=== Match Results ===");
    for record in prey.snapshot() {
        info!(
            "{:?}: state {} at ({:.1}, {:.1})",
            record.role, record.current_state, record.position.x, record.position.y,
        );
    }

    let report = serde_json::to_string_pretty(prey.snapshot())
        .context("failed to serialize final snapshot")?;
    println!("{report}");
    Ok(())
}
