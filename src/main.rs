//! Debt Defier headless runner
//!
//! Drives a session with synthetic 60 Hz timestamps and the autopilot, logs
//! gameplay events, and prints a JSON summary of the final state.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec2;

use debt_defier::Tuning;
use debt_defier::sim::{GameEvent, Session, TickInput, spawn_enemy_by_name};

const FRAME_MS: f64 = 1000.0 / 60.0;

#[derive(Parser, Debug)]
#[command(name = "debt-defier")]
#[command(about = "Run the Debt Defier simulation headless with the autopilot at the controls")]
struct Cli {
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Frames to run (60 per simulated second)
    #[arg(long, default_value_t = 3_600)]
    frames: u64,
    /// JSON tuning file; omitted fields keep their defaults
    #[arg(long)]
    tuning: Option<PathBuf>,
    /// Extra enemy to spawn at the top of the arena once the run starts
    #[arg(long)]
    spawn: Option<String>,
    /// Log usage of this pool every simulated second
    #[arg(long)]
    report_pool: Option<String>,
    /// Inject a two-second host stall before this frame
    #[arg(long)]
    stall_at: Option<u64>,
    /// Pause for one simulated second starting at this frame
    #[arg(long)]
    pause_at: Option<u64>,
    /// Keep restarting after game over until the frame budget runs out
    #[arg(long, default_value_t = false)]
    restart: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let tuning = match &cli.tuning {
        Some(path) => Tuning::load(path)
            .with_context(|| format!("loading tuning from {}", path.display()))?,
        None => Tuning::default(),
    };
    log::info!("Debt Defier starting with seed {}", cli.seed);

    let mut session = Session::new(Arc::new(tuning), cli.seed);
    let mut now_ms = 0.0;
    let mut pause_until = None;
    let mut runs = 1;

    let start = TickInput {
        start: true,
        autopilot: true,
        ..Default::default()
    };
    session.frame(now_ms, &start);

    if let Some(name) = &cli.spawn {
        let top = Vec2::new(session.state.arena().x / 2.0, 40.0);
        if let Some(id) = spawn_enemy_by_name(&mut session.state, name, top) {
            log::info!("Spawned {} as enemy {}", name, id);
        }
    }

    let demo = TickInput {
        autopilot: true,
        ..Default::default()
    };

    for frame in 1..=cli.frames {
        now_ms += FRAME_MS;
        if cli.stall_at == Some(frame) {
            log::warn!("Injecting host stall at frame {}", frame);
            now_ms += 2_000.0;
        }
        if cli.pause_at == Some(frame) {
            session.pause();
            pause_until = Some(frame + 60);
        }
        if pause_until == Some(frame) {
            session.resume();
            pause_until = None;
        }

        let input = if session.state.is_over() && cli.restart {
            runs += 1;
            &start
        } else {
            &demo
        };
        let Some(events) = session.frame(now_ms, input) else {
            continue;
        };
        for event in &events {
            log_event(event);
        }

        if frame % 60 == 0 {
            if let Some(name) = &cli.report_pool {
                if let Some(usage) = session.state.pools.usage_by_name(name) {
                    log::info!("Pool {}: {}/{} active", name, usage.active, usage.capacity);
                }
            }
        }
        if session.state.is_over() && !cli.restart {
            break;
        }
    }

    log::info!("Finished after {} run(s)", runs);
    let summary = serde_json::to_string_pretty(&session.state.snapshot())?;
    println!("{summary}");
    Ok(())
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::EnemyDestroyed { archetype, score, .. } => {
            log::debug!("{} destroyed, score {}", archetype.as_str(), score)
        }
        GameEvent::PowerUpCollected(kind) => log::info!("Collected {}", kind.as_str()),
        GameEvent::PlayerHit { damage } => log::info!("Player hit for {}", damage),
        GameEvent::BombDetonated { cleared } => log::info!("Bomb cleared {} enemies", cleared),
        GameEvent::LevelStarted(level) => log::info!("Level {} started", level),
        GameEvent::GameOver { score, level } => {
            log::info!("Game over on level {} with score {}", level, score)
        }
        _ => log::trace!("{:?}", event),
    }
}
