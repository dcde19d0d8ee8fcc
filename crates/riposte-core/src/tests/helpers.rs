//! Test helper functions and fake ports.
//!
//! Two rigs are provided:
//! - [`Rig`] ticks a single combatant against fixed perception answers
//! - [`Field`] drives a whole [`Encounter`] on an open plane, moving
//!   combatants by their movement requests

use std::collections::{BTreeMap, BTreeSet, HashMap};

use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::combatant::{
    CombatState, Combatant, CombatantId, Control, Strike, TargetSnapshot, Team, TickEnv,
};
use crate::encounter::{Encounter, HitReport};
use crate::intent::Intent;
use crate::policy::DecisionPolicy;
use crate::ports::{Conditional, MovementPort, PerceptionPort, Ports, PresentationPort, StateTag};
use crate::profile::ArchetypeProfile;

/// Walking speed used by [`Field`], in units per second.
pub const WALK_SPEED: f32 = 3.0;

// =============================================================================
// Fake Ports
// =============================================================================

/// Perception that gives the same answer for every pair.
#[derive(Debug, Clone, Copy)]
pub struct FixedPerception {
    /// Answer to `can_see`.
    pub visible: bool,
    /// Answer to `distance_to`.
    pub distance: Option<f32>,
    /// Answer to `angle_to`.
    pub angle: Option<f32>,
}

impl PerceptionPort for FixedPerception {
    fn can_see(&self, _: CombatantId, _: CombatantId) -> bool {
        self.visible
    }

    fn distance_to(&self, _: CombatantId, _: CombatantId) -> Option<f32> {
        self.distance
    }

    fn angle_to(&self, _: CombatantId, _: CombatantId) -> Option<f32> {
        self.angle
    }
}

/// Movement sink that remembers every request.
#[derive(Debug, Default)]
pub struct RecordingMovement {
    /// Requests in arrival order.
    pub requests: Vec<(CombatantId, Vec2, f32)>,
}

impl RecordingMovement {
    /// Last request made by `id`.
    pub fn last(&self, id: CombatantId) -> Option<(Vec2, f32)> {
        self.requests
            .iter()
            .rev()
            .find(|(who, _, _)| *who == id)
            .map(|(_, planar, scale)| (*planar, *scale))
    }
}

impl MovementPort for RecordingMovement {
    fn apply_movement(&mut self, combatant: CombatantId, planar: Vec2, speed_scale: f32) {
        self.requests.push((combatant, planar, speed_scale));
    }
}

/// Animator fake keeping the latest value of every conditional.
#[derive(Debug, Default)]
pub struct RecordingPresentation {
    values: HashMap<(CombatantId, &'static str), Conditional>,
    finished: BTreeSet<u8>,
    /// Number of `set_conditional` calls seen.
    pub writes: usize,
}

impl RecordingPresentation {
    /// Latest boolean conditional.
    pub fn flag(&self, id: CombatantId, name: &str) -> Option<bool> {
        match self.lookup(id, name)? {
            Conditional::Bool(value) => Some(value),
            Conditional::Float(_) => None,
        }
    }

    /// Latest scalar conditional.
    pub fn scalar(&self, id: CombatantId, name: &str) -> Option<f32> {
        match self.lookup(id, name)? {
            Conditional::Float(value) => Some(value),
            Conditional::Bool(_) => None,
        }
    }

    /// Marks the animation for `tag` as finished for everyone.
    pub fn finish(&mut self, tag: StateTag) {
        self.finished.insert(tag as u8);
    }

    fn lookup(&self, id: CombatantId, name: &str) -> Option<Conditional> {
        self.values
            .iter()
            .find(|((who, key), _)| *who == id && *key == name)
            .map(|(_, value)| *value)
    }
}

impl PresentationPort for RecordingPresentation {
    fn set_conditional(&mut self, combatant: CombatantId, name: &'static str, value: Conditional) {
        self.writes += 1;
        self.values.insert((combatant, name), value);
    }

    fn is_animation_finished(&self, _: CombatantId, tag: StateTag) -> bool {
        self.finished.contains(&(tag as u8))
    }
}

/// Perception over true positions on an open plane.
#[derive(Debug, Default)]
pub struct OpenField {
    poses: BTreeMap<CombatantId, (Vec2, Vec2)>,
    /// Combatants nobody can see.
    pub hidden: BTreeSet<CombatantId>,
}

impl OpenField {
    /// Copies every combatant's position and facing.
    pub fn sync(&mut self, encounter: &Encounter) {
        self.poses = encounter
            .iter()
            .map(|c| (c.id(), (c.position(), c.facing())))
            .collect();
    }
}

impl PerceptionPort for OpenField {
    fn can_see(&self, observer: CombatantId, target: CombatantId) -> bool {
        self.poses.contains_key(&observer)
            && self.poses.contains_key(&target)
            && !self.hidden.contains(&target)
    }

    fn distance_to(&self, observer: CombatantId, target: CombatantId) -> Option<f32> {
        let (from, _) = self.poses.get(&observer)?;
        let (to, _) = self.poses.get(&target)?;
        Some(from.distance(*to))
    }

    fn angle_to(&self, observer: CombatantId, target: CombatantId) -> Option<f32> {
        let (from, facing) = self.poses.get(&observer)?;
        let (to, _) = self.poses.get(&target)?;
        let direction = *to - *from;
        if direction == Vec2::ZERO {
            return Some(0.0);
        }
        Some(facing.perp_dot(direction).atan2(facing.dot(direction)).to_degrees())
    }
}

// =============================================================================
// Rigs
// =============================================================================

/// Ticks one combatant against fixed perception.
pub struct Rig {
    /// Perception answers.
    pub perception: FixedPerception,
    /// Recorded movement requests.
    pub movement: RecordingMovement,
    /// Recorded presentation.
    pub presentation: RecordingPresentation,
    /// AI random source.
    pub rng: ChaCha8Rng,
}

impl Rig {
    /// A rig where no target is known.
    pub fn new() -> Self {
        Self {
            perception: FixedPerception {
                visible: false,
                distance: None,
                angle: None,
            },
            movement: RecordingMovement::default(),
            presentation: RecordingPresentation::default(),
            rng: ChaCha8Rng::seed_from_u64(0),
        }
    }

    /// A rig with a visible target straight ahead at `distance`.
    pub fn at_distance(distance: f32) -> Self {
        let mut rig = Self::new();
        rig.perception = FixedPerception {
            visible: true,
            distance: Some(distance),
            angle: Some(0.0),
        };
        rig
    }

    /// Runs one update.
    pub fn tick(
        &mut self,
        combatant: &mut Combatant,
        dt: f32,
        intent: &Intent,
        target: Option<TargetSnapshot>,
        policy: Option<&dyn DecisionPolicy>,
    ) -> Option<Strike> {
        let mut ports = Ports {
            perception: &self.perception,
            movement: &mut self.movement,
            presentation: &mut self.presentation,
        };
        let mut env = TickEnv {
            target,
            policy,
            ports: &mut ports,
            rng: &mut self.rng,
        };
        combatant.update(dt, intent, &mut env)
    }

    /// Runs updates for `seconds` with the same inputs, collecting strikes.
    pub fn run(
        &mut self,
        combatant: &mut Combatant,
        seconds: f32,
        dt: f32,
        intent: &Intent,
        target: Option<TargetSnapshot>,
        policy: Option<&dyn DecisionPolicy>,
    ) -> Vec<Strike> {
        let mut strikes = Vec::new();
        let mut elapsed = 0.0;
        while elapsed + dt * 0.5 < seconds {
            strikes.extend(self.tick(combatant, dt, intent, target, policy));
            elapsed += dt;
        }
        strikes
    }
}

/// Drives an encounter on an open plane.
#[derive(Debug, Default)]
pub struct Field {
    /// Perception over synced positions.
    pub perception: OpenField,
    /// Movement requests of the current step.
    pub movement: RecordingMovement,
    /// Recorded presentation.
    pub presentation: RecordingPresentation,
}

impl Field {
    /// Creates an empty field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one encounter step, then moves every combatant by its request
    /// in its own frame (`x` strafes right, `y` follows the facing).
    pub fn step(
        &mut self,
        encounter: &mut Encounter,
        dt: f32,
        intents: &BTreeMap<CombatantId, Intent>,
    ) -> Vec<HitReport> {
        self.perception.sync(encounter);
        self.movement.requests.clear();
        let mut ports = Ports {
            perception: &self.perception,
            movement: &mut self.movement,
            presentation: &mut self.presentation,
        };
        let reports = encounter.step(dt, intents, &mut ports);

        for &(id, planar, scale) in &self.movement.requests {
            let Some(c) = encounter.get_mut(id) else {
                continue;
            };
            let forward = c.facing();
            let right = -forward.perp();
            let world = right * planar.x + forward * planar.y;
            c.set_position(c.position() + world * WALK_SPEED * scale * dt);
        }
        reports
    }

    /// Runs steps for `seconds` without player input.
    pub fn run(&mut self, encounter: &mut Encounter, seconds: f32, dt: f32) -> Vec<HitReport> {
        let intents = BTreeMap::new();
        let mut reports = Vec::new();
        let mut elapsed = 0.0;
        while elapsed + dt * 0.5 < seconds {
            reports.extend(self.step(encounter, dt, &intents));
            elapsed += dt;
        }
        reports
    }
}

// =============================================================================
// Factories
// =============================================================================

/// Creates a player-controlled combatant with id 1 at the origin.
pub fn spawn_player(profile: ArchetypeProfile) -> Combatant {
    Combatant::new(
        CombatantId::new(1),
        Team::Player,
        Control::Player,
        profile,
        Vec2::ZERO,
    )
}

/// Creates an AI-controlled enemy with id 2 at the origin.
pub fn spawn_ai(profile: ArchetypeProfile) -> Combatant {
    Combatant::new(
        CombatantId::new(2),
        Team::Enemy,
        Control::Ai,
        profile,
        Vec2::ZERO,
    )
}

/// Builds a target snapshot at `(0, 2)`.
pub fn target_snapshot(id: u64, state: CombatState, guarding: bool) -> TargetSnapshot {
    TargetSnapshot {
        id: CombatantId::new(id),
        state,
        guarding,
        position: Vec2::new(0.0, 2.0),
    }
}

/// Sets up a duel: a combatant on each team, `distance` apart on the y
/// axis, facing each other and targeting each other.
///
/// # Arguments
///
/// * `encounter` - The encounter to populate
/// * `player` - Profile and control of the player-team combatant at the origin
/// * `enemy` - Profile of the AI enemy placed ahead of it
/// * `distance` - Separation
///
/// # Returns
///
/// A tuple of (`player_id`, `enemy_id`).
pub fn setup_duel(
    encounter: &mut Encounter,
    player: (ArchetypeProfile, Control),
    enemy: ArchetypeProfile,
    distance: f32,
) -> (CombatantId, CombatantId) {
    let (profile, control) = player;
    let a = encounter.spawn(Team::Player, control, profile, Vec2::ZERO);
    let b = encounter.spawn(Team::Enemy, Control::Ai, enemy, Vec2::new(0.0, distance));
    encounter.set_facing(b, Vec2::NEG_Y);
    encounter.assign_opponents();
    (a, b)
}
