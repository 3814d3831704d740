//! Skirmish headless simulation.
//!
//! Loads stat profiles, spawns a scripted player and runs enemy waves at a
//! fixed tick rate, then prints a JSON report.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;
mod pilot;

use anyhow::{Context, Result};
use glam::Vec3;
use serde::Serialize;
use skirmish_gameplay::{
    CombatEvent, Faction, KillStreakTracker, ProfileLoader, WaveDirector, World,
};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{SimConfig, CONFIG_FILE};
use crate::pilot::Autopilot;

/// Totals printed at the end of a run.
#[derive(Debug, Default, Serialize)]
struct RunReport {
    seed: u64,
    waves_started: u32,
    waves_cleared: u32,
    kills: u32,
    best_streak: u32,
    damage_dealt: f32,
    damage_taken: f32,
    evasions: u32,
    critical_hits: u32,
    player_alive: bool,
    ticks: u64,
    seconds: f32,
}

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("skirmish=info".parse()?))
        .init();

    info!("Skirmish starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_FILE.to_string());
    let config = SimConfig::load_from(&config_path);

    let report = run(&config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run(config: &SimConfig) -> Result<RunReport> {
    let mut loader = ProfileLoader::new(&config.profile_dir);
    let loaded = loader
        .load_all()
        .with_context(|| format!("loading profiles from {}", config.profile_dir.display()))?;
    info!("Loaded {} profiles", loaded);
    let profiles = loader.into_registry();

    let mut world = World::new(config.seed).with_cues(config.cues);
    let player_profile = profiles.require(&config.player_archetype)?;
    let player = world.spawn(Faction::Player, Some(player_profile), Vec3::ZERO, None);
    let player_id = world
        .get(player)
        .map(skirmish_gameplay::Entity::id)
        .context("player vanished right after spawning")?;

    let streak = KillStreakTracker::new(player_id);
    world.subscribe_health(player, streak.player_listener())?;

    let mut director = WaveDirector::new(config.wave.clone());
    let mut pilot = Autopilot::new();
    let mut report = RunReport {
        seed: config.seed,
        ..RunReport::default()
    };
    let dt = config.tick_seconds();
    let ticks_per_wave = (config.wave_time_limit * config.tick_rate as f32).ceil() as u64;

    'waves: for _ in 0..config.waves {
        let archetype = config.enemy_archetype_for(director.wave() + 1);
        let enemy_profile = profiles.require(archetype)?;
        let members = director.start_next_wave(&mut world, &enemy_profile, Vec3::ZERO, Some(player));
        for handle in members {
            world.subscribe_health(handle, streak.victim_listener())?;
        }
        report.waves_started = director.wave();

        for _ in 0..ticks_per_wave {
            let intent = pilot.decide(&world, player);
            world.set_player_intent(player, intent);
            let summary = world.tick(dt, &mut director);
            tally(&mut report, &world.drain_events(), player_id);

            if summary.players_alive == 0 {
                warn!("Player fell in wave {} at {:.1}s", director.wave(), summary.time);
                break 'waves;
            }
            if director.is_cleared() {
                break;
            }
        }
        if !director.is_cleared() {
            warn!(
                "Wave {} not cleared within {}s, {} enemies left",
                director.wave(),
                config.wave_time_limit,
                director.remaining()
            );
            break;
        }
    }

    report.waves_cleared = director.cleared_total();
    report.kills = streak.kills();
    report.best_streak = streak.best();
    report.player_alive = world.is_alive(player);
    report.ticks = world.tick_count();
    report.seconds = world.time();
    info!(
        "Run finished: {} of {} waves cleared, {} kills",
        report.waves_cleared, config.waves, report.kills
    );
    Ok(report)
}

fn tally(report: &mut RunReport, events: &[CombatEvent], player: skirmish_common::EntityId) {
    for event in events {
        match event {
            CombatEvent::Damaged {
                entity,
                amount,
                source,
                critical,
                ..
            } => {
                if *entity == player {
                    report.damage_taken += amount;
                } else if *source == Some(player) {
                    report.damage_dealt += amount;
                    if *critical {
                        report.critical_hits += 1;
                    }
                }
            },
            CombatEvent::Evaded { entity, .. } if *entity == player => report.evasions += 1,
            CombatEvent::Died { entity, killer, .. } => {
                debug!("{} died, killed by {:?}", entity, killer);
            },
            _ => {},
        }
    }
}
