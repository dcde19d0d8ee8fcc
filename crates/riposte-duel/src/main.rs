//! Headless duel runner.
//!
//! Pits two archetypes against each other on an open floor and prints a
//! JSON or text summary. Archetypes with a decision policy fight on their
//! own; the others follow a simple script.

mod script;
mod stage;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use glam::Vec2;
use riposte_core::{
    Archetype, ArchetypeProfile, CombatState, CombatantId, Control, Encounter, HitReport,
    TablePolicy, Team,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::stage::Stage;

/// Headless duel runner for the Riposte combat core
#[derive(Parser, Debug)]
#[command(name = "riposte-duel")]
#[command(about = "Run a headless duel between two combat archetypes")]
struct Args {
    /// Player-side archetype (knight, hero, enemy, mirror-knight, legacy)
    #[arg(long, default_value = "knight")]
    player: String,

    /// Enemy-side archetype
    #[arg(long, default_value = "enemy")]
    enemy: String,

    /// JSON profile replacing the player archetype's tuning
    #[arg(long)]
    player_profile: Option<PathBuf>,

    /// JSON profile replacing the enemy archetype's tuning
    #[arg(long)]
    enemy_profile: Option<PathBuf>,

    /// JSON decision table replacing the enemy archetype's policy
    #[arg(long)]
    enemy_policy: Option<PathBuf>,

    /// Starting distance between the two
    #[arg(long, default_value_t = 8.0)]
    distance: f32,

    /// Simulation ticks per second
    #[arg(long, default_value_t = 60)]
    tick_rate: u32,

    /// Duel length limit in seconds (draw)
    #[arg(long, default_value_t = 120.0)]
    max_seconds: f32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Log every delivered strike
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// Final state of one side.
#[derive(Debug, Serialize)]
struct Fighter {
    archetype: Archetype,
    control: Control,
    health: f32,
    stamina: Option<f32>,
    state: CombatState,
    strikes_dealt: usize,
    strikes_landed: usize,
}

/// JSON output structure.
#[derive(Debug, Serialize)]
struct DuelResult {
    seed: u64,
    ticks: u64,
    seconds: f32,
    winner: Option<Team>,
    player: Fighter,
    enemy: Fighter,
    hits: Vec<HitReport>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.format != "json" && args.format != "text" {
        bail!("unknown output format `{}` (expected json or text)", args.format);
    }
    if args.tick_rate == 0 {
        bail!("tick rate must be at least 1");
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    let player_profile = load_profile(&args.player, args.player_profile.as_deref())?;
    let enemy_profile = load_profile(&args.enemy, args.enemy_profile.as_deref())?;

    let mut encounter = Encounter::new(seed);
    if let Some(path) = &args.enemy_policy {
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading policy {}", path.display()))?;
        let policy = TablePolicy::from_json(&json)
            .with_context(|| format!("loading policy {}", path.display()))?;
        encounter
            .policies_mut()
            .register(enemy_profile.archetype, Arc::new(policy));
    }

    let player_control = control_for(&encounter, player_profile.archetype);
    let enemy_control = control_for(&encounter, enemy_profile.archetype);
    let player = encounter.spawn(Team::Player, player_control, player_profile, Vec2::ZERO);
    let enemy = encounter.spawn(
        Team::Enemy,
        enemy_control,
        enemy_profile,
        Vec2::new(0.0, args.distance),
    );
    encounter.set_facing(enemy, Vec2::NEG_Y);
    encounter.assign_opponents();

    info!(
        seed,
        player = %args.player,
        enemy = %args.enemy,
        ?player_control,
        ?enemy_control,
        "duel started"
    );

    #[allow(clippy::cast_precision_loss)]
    let dt = 1.0 / args.tick_rate as f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let max_ticks = (args.max_seconds.max(0.0) * args.tick_rate as f32).ceil() as u64;

    let mut stage = Stage::new();
    let mut log: Vec<HitReport> = Vec::new();
    while encounter.tick() < max_ticks
        && !encounter.is_defeated(Team::Player)
        && !encounter.is_defeated(Team::Enemy)
    {
        let mut intents = BTreeMap::new();
        for (id, control) in [(player, player_control), (enemy, enemy_control)] {
            if control == Control::Player {
                Stage::lock_on(&mut encounter, id);
                intents.insert(id, script::intent_for(&encounter, id));
            }
        }

        let reports = stage.step(&mut encounter, dt, &intents);
        for report in &reports {
            if args.verbose {
                info!(
                    tick = report.tick,
                    attacker = %report.attacker,
                    target = %report.target,
                    attack = %report.attack_type,
                    outcome = ?report.outcome,
                    "strike"
                );
            }
        }
        log.extend(reports);
    }
    debug!(writes = stage.conditional_writes(), "presentation conditionals");

    let winner = if encounter.is_defeated(Team::Enemy) && !encounter.is_defeated(Team::Player) {
        Some(Team::Player)
    } else if encounter.is_defeated(Team::Player) && !encounter.is_defeated(Team::Enemy) {
        Some(Team::Enemy)
    } else {
        None
    };

    #[allow(clippy::cast_precision_loss)]
    let result = DuelResult {
        seed,
        ticks: encounter.tick(),
        seconds: encounter.tick() as f32 * dt,
        winner,
        player: fighter(&encounter, player, &log)?,
        enemy: fighter(&encounter, enemy, &log)?,
        hits: log,
    };
    info!(ticks = result.ticks, winner = ?result.winner, "duel finished");

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_text(&result);
    }
    Ok(())
}

/// Resolves a profile from an archetype name, or from a JSON file when one
/// is given.
fn load_profile(name: &str, path: Option<&Path>) -> Result<ArchetypeProfile> {
    let Some(path) = path else {
        let archetype: Archetype = name.parse()?;
        return Ok(ArchetypeProfile::for_archetype(archetype));
    };
    let json =
        fs::read_to_string(path).with_context(|| format!("reading profile {}", path.display()))?;
    ArchetypeProfile::from_json(&json)
        .with_context(|| format!("loading profile {}", path.display()))
}

/// Archetypes with a registered policy fight on their own.
fn control_for(encounter: &Encounter, archetype: Archetype) -> Control {
    if encounter.policies().policy_for(archetype).is_some() {
        Control::Ai
    } else {
        Control::Player
    }
}

fn fighter(encounter: &Encounter, id: CombatantId, log: &[HitReport]) -> Result<Fighter> {
    let Some(c) = encounter.get(id) else {
        bail!("combatant {id} left the duel");
    };
    let dealt = log.iter().filter(|r| r.attacker == id);
    Ok(Fighter {
        archetype: c.archetype(),
        control: c.control(),
        health: c.health().get(),
        stamina: c.stamina().map(|s| s.get()),
        state: c.state(),
        strikes_dealt: dealt.clone().count(),
        strikes_landed: dealt.filter(|r| r.outcome.landed()).count(),
    })
}

fn print_text(result: &DuelResult) {
    println!("seed {}  ticks {}  ({:.1}s)", result.seed, result.ticks, result.seconds);
    for (side, f) in [("player", &result.player), ("enemy", &result.enemy)] {
        let stamina = f
            .stamina
            .map_or_else(|| "-".to_string(), |s| format!("{s:.0}"));
        println!(
            "{side:>6}: {:<12} {:<7} health {:>5.0}  stamina {:>4}  {:<13} strikes {} ({} landed)",
            f.archetype.to_string(),
            format!("{:?}", f.control),
            f.health,
            stamina,
            f.state.to_string(),
            f.strikes_dealt,
            f.strikes_landed,
        );
    }
    match result.winner {
        Some(team) => println!("winner: {team}"),
        None => println!("draw"),
    }
}
