//! footstep-sim binary
//!
//! Runs several footstep clients against an in-process host. Client 0 walks
//! in a straight line; the others stand still and render its footsteps from
//! the loopback peer bus.
//!
//! ## Configuration (env / TOML via `config` crate)
//!
//! | Key                            | Default  | Description                      |
//! |--------------------------------|----------|----------------------------------|
//! | `FOOTSTEPS_POLL_INTERVAL_MS`   | `100`    | Position sampling cadence        |
//! | `FOOTSTEPS_STEP_THRESHOLD`     | `1.2`    | Horizontal distance per step     |
//! | `FOOTSTEPS_SOUND_ASSETS`       | `drip1.mp3,…,drip4.mp3` | Candidate sounds  |
//! | `FOOTSTEPS_ASSET_BASE`         | *(empty)*| Asset root prepended to sounds   |
//! | `FOOTSTEPS_RIPPLE_DURATION_MS` | `1000`   | Ripple lifetime                  |
//! | `FOOTSTEPS_RIPPLE_FPS`         | `30`     | Ripple update rate               |

use anyhow::{Context, Result};
use clap::Parser;
use footstep_effects::{
    sim::{LoopbackBus, SimClient, StandingAvatar, WalkingAvatar},
    FootstepConfig, FootstepController, Position, PositionService,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "footstep-sim", about = "Footstep effects simulator", version)]
struct Args {
    /// Optional TOML/JSON config file
    #[arg(long, env = "FOOTSTEPS_CONFIG")]
    config: Option<PathBuf>,

    /// Number of simulated clients (client 0 walks)
    #[arg(long, env = "FOOTSTEPS_CLIENTS", default_value_t = 2)]
    clients: usize,

    /// Walking speed of client 0 in units/second
    #[arg(long, env = "FOOTSTEPS_SPEED", default_value_t = 3.0)]
    speed: f64,

    /// How long to run, in seconds
    #[arg(long, env = "FOOTSTEPS_DURATION_SECS", default_value_t = 5.0)]
    duration_secs: f64,

    /// Seed for session ids and sound choice (random if omitted)
    #[arg(long, env = "FOOTSTEPS_SEED")]
    seed: Option<u64>,
}

/// `--duration-secs` as a `Duration`; negatives clamp to zero.
fn run_duration(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs.max(0.0))
        .with_context(|| format!("Invalid --duration-secs {secs}"))
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("footstep_effects=debug".parse()?),
        )
        .init();

    let args = Args::parse();
    let run_for = run_duration(args.duration_secs)?;
    let config = FootstepConfig::load(args.config.as_deref())
        .context("Failed to load footstep configuration")?;

    tracing::info!(
        clients = args.clients,
        speed = args.speed,
        duration_secs = args.duration_secs,
        "Starting footstep-sim"
    );

    let bus = LoopbackBus::new();
    let mut controllers = Vec::with_capacity(args.clients);
    let mut tasks = Vec::new();

    for i in 0..args.clients.max(1) {
        let position: Arc<dyn PositionService> = if i == 0 {
            Arc::new(WalkingAvatar::new(Position::zero(), args.speed, 0.0))
        } else {
            Arc::new(StandingAvatar(Position::new(0.0, 0.0, 4.0 * i as f64)))
        };

        let mut client = SimClient::attach(&bus, position);
        let rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(i as u64)),
            None => StdRng::from_entropy(),
        };

        let controller = FootstepController::initialize(config.clone(), client.services(), rng)
            .await
            .with_context(|| format!("Failed to start client {i}"))?;

        if let Some(inbox) = client.take_inbox() {
            tasks.push(controller.spawn_receiver(inbox));
        }
        tasks.push(tokio::spawn(controller.clone().run()));
        controllers.push((controller, client));
    }

    // Run until the duration elapses or SIGINT
    tokio::select! {
        _ = tokio::time::sleep(run_for) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("footstep-sim interrupted (SIGINT)");
        }
    }

    for task in &tasks {
        task.abort();
    }

    for (controller, client) in &controllers {
        let stats = controller.stats();
        tracing::info!(
            session = %controller.session_id(),
            steps = stats.steps,
            broadcasts = stats.broadcasts,
            peer_effects = stats.peer_effects,
            echoes_ignored = stats.echoes_ignored,
            sounds_played = client.audio.played().len(),
            ripples_spawned = client.objects.created().len(),
            "Client summary"
        );
    }
    tracing::info!(payloads = bus.sent().len(), "Bus summary");

    Ok(())
}
