//! Stand-in spatial and animation layer for headless duels.
//!
//! The combat core never moves anything itself. A [`Stage`] plays the part
//! of the game engine: it answers perception queries from true positions,
//! integrates movement requests along each combatant's facing, and runs a
//! clock per animation clip so animation-driven archetypes can recover.

use std::collections::{BTreeMap, HashMap};

use glam::Vec2;
use riposte_core::{
    CombatantId, Conditional, Encounter, HitReport, Intent, MovementPort, PerceptionPort, Ports,
    PresentationPort, StateTag,
};
use tracing::trace;

/// Walking speed in units per second, before any sprint or dodge scale.
pub const WALK_SPEED: f32 = 3.0;

/// Length of each animation clip in seconds.
fn clip_length(tag: StateTag) -> f32 {
    match tag {
        StateTag::BasicAttack => 0.6,
        StateTag::HeavyAttack => 0.85,
        StateTag::Dodge => 0.5,
        StateTag::Flinch => 1.1,
        StateTag::Dying => 2.0,
    }
}

/// Perception over a snapshot of true positions and facings.
#[derive(Debug, Default)]
struct Floor {
    poses: BTreeMap<CombatantId, (Vec2, Vec2)>,
}

impl PerceptionPort for Floor {
    fn can_see(&self, observer: CombatantId, target: CombatantId) -> bool {
        self.poses.contains_key(&observer) && self.poses.contains_key(&target)
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

/// Movement requests of the current step.
#[derive(Debug, Default)]
struct Footwork {
    requests: Vec<(CombatantId, Vec2, f32)>,
}

impl MovementPort for Footwork {
    fn apply_movement(&mut self, combatant: CombatantId, planar: Vec2, speed_scale: f32) {
        self.requests.push((combatant, planar, speed_scale));
    }
}

/// Animator that plays each clip for a fixed time.
#[derive(Debug, Default)]
struct Animator {
    clips: HashMap<CombatantId, (StateTag, f32)>,
    writes: u64,
}

impl Animator {
    fn advance(&mut self, encounter: &Encounter, dt: f32) {
        for c in encounter.iter() {
            match c.state().tag(c.attack_type()) {
                Some(tag) => {
                    let clip = self.clips.entry(c.id()).or_insert((tag, 0.0));
                    if clip.0 == tag {
                        clip.1 += dt;
                    } else {
                        *clip = (tag, dt);
                    }
                }
                None => {
                    self.clips.remove(&c.id());
                }
            }
        }
    }
}

impl PresentationPort for Animator {
    fn set_conditional(&mut self, combatant: CombatantId, name: &'static str, value: Conditional) {
        self.writes += 1;
        trace!(%combatant, name, ?value, "conditional");
    }

    fn is_animation_finished(&self, combatant: CombatantId, tag: StateTag) -> bool {
        self.clips
            .get(&combatant)
            .is_some_and(|(playing, elapsed)| *playing == tag && *elapsed >= clip_length(tag))
    }
}

/// The host side of a duel.
#[derive(Debug, Default)]
pub struct Stage {
    floor: Floor,
    footwork: Footwork,
    animator: Animator,
}

impl Stage {
    /// Creates an empty stage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Distance between two combatants, if both exist.
    pub fn distance(encounter: &Encounter, a: CombatantId, b: CombatantId) -> Option<f32> {
        Some(encounter.get(a)?.position().distance(encounter.get(b)?.position()))
    }

    /// Turns a player-driven combatant to face its target, like a camera
    /// lock-on.
    pub fn lock_on(encounter: &mut Encounter, id: CombatantId) {
        let Some(target) = encounter.get(id).and_then(|c| c.target()) else {
            return;
        };
        let (Some(me), Some(them)) = (encounter.get(id), encounter.get(target)) else {
            return;
        };
        if me.is_dead() {
            return;
        }
        let facing = them.position() - me.position();
        encounter.set_facing(id, facing);
    }

    /// Runs one encounter step and applies its movement.
    pub fn step(
        &mut self,
        encounter: &mut Encounter,
        dt: f32,
        intents: &BTreeMap<CombatantId, Intent>,
    ) -> Vec<HitReport> {
        self.floor.poses = encounter
            .iter()
            .map(|c| (c.id(), (c.position(), c.facing())))
            .collect();
        self.footwork.requests.clear();

        let mut ports = Ports {
            perception: &self.floor,
            movement: &mut self.footwork,
            presentation: &mut self.animator,
        };
        let reports = encounter.step(dt, intents, &mut ports);

        for &(id, planar, scale) in &self.footwork.requests {
            let Some(c) = encounter.get_mut(id) else {
                continue;
            };
            let forward = c.facing();
            let right = -forward.perp();
            let world = right * planar.x + forward * planar.y;
            c.set_position(c.position() + world * WALK_SPEED * scale * dt);
        }
        self.animator.advance(encounter, dt);
        reports
    }

    /// Number of presentation conditionals written so far.
    pub fn conditional_writes(&self) -> u64 {
        self.animator.writes
    }
}
