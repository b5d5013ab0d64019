//! Grid Arena entry point
//!
//! Headless driver: runs the simulation on a simulated host clock with the
//! autopilot at the controls, logs what happens and prints the final
//! leaderboard as JSON.
//!
//! Usage: `grid-arena [--seed N] [--ticks N] [--config settings.json] [key=value ...]`

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use grid_arena::consts::{MAX_SUBSTEPS, SIM_DT};
use grid_arena::settings::{parse_pairs, to_map};
use grid_arena::sim::{ArcadePhysics, Arena, EventSink, GameEvent, TickInput, tick};
use grid_arena::{Rect, Settings};

/// Host frame length fed to the accumulator (ms)
const FRAME_MS: u64 = 16;
/// Ticks between status lines
const STATUS_EVERY: u64 = 60 * 30;
const PILOT_NAME: &str = "pilot";

#[derive(Parser, Debug)]
#[command(name = "grid-arena")]
#[command(about = "Run the grid arena headless with a scripted pilot and print the leaderboard")]
struct Cli {
    /// Seed for a reproducible run (random when omitted)
    #[arg(long)]
    seed: Option<u64>,
    /// Simulation ticks to run at 60 Hz (default: six minutes, one reset)
    #[arg(long, default_value_t = 60 * 60 * 6)]
    ticks: u64,
    /// JSON settings document applied before the overrides
    #[arg(long)]
    config: Option<PathBuf>,
    /// Setting overrides as key=value, e.g. enemyCount=20 scIncludeSonar=false
    overrides: Vec<String>,
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => {
            let json = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
            Settings::from_json(&json).with_context(|| format!("bad settings in {}", path.display()))?
        }
        None => Settings::default(),
    };

    let pairs = parse_pairs(cli.overrides.iter().map(String::as_str));
    let rejected = settings.apply_overrides(pairs);
    if !rejected.is_empty() {
        log::warn!("{} override(s) rejected", rejected.len());
    }
    Ok(settings.finalized())
}

/// Logs the interesting facts and keeps a tally
#[derive(Debug, Default)]
struct LogSink {
    kills: u32,
    explosions: u32,
    pings: u32,
    deaths: u32,
    resets: u32,
}

impl EventSink for LogSink {
    fn emit(&mut self, event: &GameEvent) {
        match event {
            GameEvent::EnemyKilled {
                target_id,
                dealer_name,
                score_award,
                ..
            } => {
                self.kills += 1;
                log::info!("{} destroyed enemy {} (+{})", dealer_name, target_id, score_award);
            }
            GameEvent::ExplosionOccurred { .. } => self.explosions += 1,
            GameEvent::SonarPing { cell, blips, .. } => {
                self.pings += 1;
                log::debug!("Sonar {} found {} enemies", cell, blips.len());
            }
            GameEvent::PlayerDied { name, .. } => {
                self.deaths += 1;
                log::info!("{} was destroyed", name);
            }
            GameEvent::ArenaReset { epoch } => {
                self.resets += 1;
                log::info!("Epoch {} begins", epoch);
            }
            GameEvent::EnemyDamaged { .. } | GameEvent::PlayerDamaged { .. } => {
                log::trace!("{:?}", event);
            }
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    log::debug!("Settings: {}", serde_json::Value::Object(to_map(&settings)));

    let mut physics = ArcadePhysics::new(Rect::default());
    let mut arena = Arena::new(settings, cli.seed, 0, &mut physics);
    arena.join(PILOT_NAME);

    let input = TickInput {
        autopilot: true,
        ..Default::default()
    };
    let mut sink = LogSink::default();
    let mut now: u64 = 0;
    let mut accumulator = 0.0f32;
    let mut ticks = 0u64;

    while ticks < cli.ticks {
        now += FRAME_MS;
        accumulator += FRAME_MS as f32 / 1000.0;

        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS && ticks < cli.ticks {
            tick(&mut arena, &input, now, SIM_DT, &mut physics, &mut sink);
            accumulator -= SIM_DT;
            substeps += 1;
            ticks += 1;

            if ticks % STATUS_EVERY == 0 {
                log::info!(
                    "{} | enemies {} | {} | hull {:.0}%",
                    arena.countdown_label(now),
                    arena.enemies.len(),
                    arena
                        .ledger
                        .get(PILOT_NAME)
                        .map_or_else(|| "no pilot".to_string(), |s| format!("score {s}")),
                    arena.player.as_ref().map_or(0.0, |p| p.health_pct() * 100.0)
                );
            }
        }

        if arena.player.is_none() {
            arena.join(PILOT_NAME);
        }
    }

    log::info!(
        "Ran {} ticks: {} kills, {} explosions, {} sonar pings, {} deaths, {} resets",
        ticks,
        sink.kills,
        sink.explosions,
        sink.pings,
        sink.deaths,
        sink.resets
    );

    let board = serde_json::to_string_pretty(&arena.leaderboard())?;
    println!("{board}");
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    log::info!("Grid Arena (headless) starting...");

    let cli = Cli::parse();
    run(&cli)
}
