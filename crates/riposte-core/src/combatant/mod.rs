//! Combatants and the shared combat state machine.
//!
//! This module provides:
//! - [`CombatantId`]: Unique, ordered identifier for combatants
//! - [`Team`] and [`Control`]: Allegiance and who drives the combatant
//! - [`Combatant`]: Resources, state, timers and the public control surface
//! - [`TargetSnapshot`] and [`Strike`]: Copied values exchanged between
//!   combatants during a tick
//!
//! The per-tick update lives in the `machine` submodule.
//!
//! # Example
//!
//! ```
//! use riposte_core::combatant::{Combatant, CombatantId, CombatState, Control, Team};
//! use riposte_core::hit::{AttackEvent, AttackType};
//! use riposte_core::profile::ArchetypeProfile;
//! use glam::Vec2;
//!
//! let mut knight = Combatant::new(
//!     CombatantId::new(1),
//!     Team::Player,
//!     Control::Player,
//!     ArchetypeProfile::knight(),
//!     Vec2::ZERO,
//! );
//!
//! knight.take_hit(AttackEvent::new(Vec2::new(0.0, 2.0), 30.0, AttackType::Basic));
//! assert_eq!(knight.state(), CombatState::Flinching);
//! assert_eq!(knight.health().get(), 70.0);
//! ```

mod machine;
pub mod state;

use std::fmt;

use glam::Vec2;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::hit::{AttackEvent, AttackType, HitOutcome, HitResolver};
use crate::policy::DecisionPolicy;
use crate::ports::{Ports, Presentation};
use crate::profile::{Archetype, ArchetypeProfile, BlockStyle};
use crate::resource::ResourcePool;

pub use state::{CombatState, Steering, Timers};

// =============================================================================
// Identity
// =============================================================================

/// Unique identifier for a combatant.
///
/// Ordered by numeric value; encounters update combatants in this order.
///
/// # Example
///
/// ```
/// use riposte_core::combatant::CombatantId;
///
/// let a = CombatantId::new(1);
/// let b = CombatantId::new(2);
/// assert!(a < b);
/// assert_eq!(b.as_u64(), 2);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CombatantId(u64);

impl CombatantId {
    /// Creates a new `CombatantId` from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CombatantId({})", self.0)
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CombatantId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<CombatantId> for u64 {
    fn from(id: CombatantId) -> Self {
        id.0
    }
}

/// Allegiance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    /// The player's side.
    Player,
    /// The opposing side.
    Enemy,
}

impl Team {
    /// The opposing team.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => write!(f, "Player"),
            Self::Enemy => write!(f, "Enemy"),
        }
    }
}

/// Who drives a combatant each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Control {
    /// Driven by an [`Intent`](crate::intent::Intent) snapshot.
    Player,
    /// Driven by the archetype's [`DecisionPolicy`].
    Ai,
}

// =============================================================================
// Exchanged values
// =============================================================================

/// Observable state of a combatant, copied before another combatant reads it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetSnapshot {
    /// Who this is.
    pub id: CombatantId,
    /// Combat state at snapshot time.
    pub state: CombatState,
    /// Whether the combatant is blocking (stance or guard flag).
    pub guarding: bool,
    /// Planar position.
    pub position: Vec2,
}

/// An attack that connected at its registration moment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Strike {
    /// Who swung.
    pub attacker: CombatantId,
    /// Who gets hit.
    pub target: CombatantId,
    /// The hit to deliver through [`Combatant::take_hit`].
    pub event: AttackEvent,
}

/// Everything a combatant borrows for one update.
pub struct TickEnv<'a, 'p> {
    /// Snapshot of the current target, if it still exists.
    pub target: Option<TargetSnapshot>,
    /// Decision policy for AI-controlled combatants.
    pub policy: Option<&'a dyn DecisionPolicy>,
    /// Host collaborators.
    pub ports: &'a mut Ports<'p>,
    /// Random source for AI decisions.
    pub rng: &'a mut dyn RngCore,
}

impl fmt::Debug for TickEnv<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickEnv")
            .field("target", &self.target)
            .field("policy", &self.policy.is_some())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Combatant
// =============================================================================

/// A participant in combat.
///
/// Owns its resource pools and timers exclusively. Other systems interact
/// with it through [`take_hit`](Self::take_hit) and the `can_*` queries; the
/// host keeps its position and facing in sync with the spatial layer.
#[derive(Debug, Clone)]
pub struct Combatant {
    id: CombatantId,
    team: Team,
    control: Control,
    profile: ArchetypeProfile,
    health: ResourcePool,
    stamina: Option<ResourcePool>,
    state: CombatState,
    state_ticks: u32,
    timers: Timers,
    movement: Vec2,
    speed_scale: f32,
    position: Vec2,
    facing: Vec2,
    target: Option<CombatantId>,
    active: bool,
    attack_type: AttackType,
    attack_registered: bool,
    combo_queued: Option<AttackType>,
    attack_after_dodge: Option<AttackType>,
    dodge_direction: Vec2,
    blocked_attack: bool,
    guarding: bool,
    sprinting: bool,
    dying: bool,
    steering: Steering,
    presentation: Presentation,
}

impl Combatant {
    /// Creates a combatant in `Free` with full pools, facing `+y`.
    #[must_use]
    pub fn new(
        id: CombatantId,
        team: Team,
        control: Control,
        profile: ArchetypeProfile,
        position: Vec2,
    ) -> Self {
        let health = ResourcePool::new(profile.max_health);
        let stamina = profile.max_stamina.map(ResourcePool::new);
        Self {
            id,
            team,
            control,
            profile,
            health,
            stamina,
            state: CombatState::Free,
            state_ticks: 0,
            timers: Timers::default(),
            movement: Vec2::ZERO,
            speed_scale: 1.0,
            position,
            facing: Vec2::Y,
            target: None,
            active: false,
            attack_type: AttackType::Basic,
            attack_registered: false,
            combo_queued: None,
            attack_after_dodge: None,
            dodge_direction: Vec2::ZERO,
            blocked_attack: false,
            guarding: false,
            sprinting: false,
            dying: false,
            steering: Steering::Hold,
            presentation: Presentation::default(),
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Returns the combatant's id.
    #[must_use]
    pub fn id(&self) -> CombatantId {
        self.id
    }

    /// Returns the combatant's team.
    #[must_use]
    pub fn team(&self) -> Team {
        self.team
    }

    /// Returns who drives this combatant.
    #[must_use]
    pub fn control(&self) -> Control {
        self.control
    }

    /// Returns the archetype.
    #[must_use]
    pub fn archetype(&self) -> Archetype {
        self.profile.archetype
    }

    /// Returns the tuning profile.
    #[must_use]
    pub fn profile(&self) -> &ArchetypeProfile {
        &self.profile
    }

    /// Returns the health pool.
    #[must_use]
    pub fn health(&self) -> &ResourcePool {
        &self.health
    }

    /// Returns the stamina pool, if this combatant has one.
    #[must_use]
    pub fn stamina(&self) -> Option<&ResourcePool> {
        self.stamina.as_ref()
    }

    /// Returns the current combat state.
    #[must_use]
    pub fn state(&self) -> CombatState {
        self.state
    }

    /// Returns the per-state timers.
    #[must_use]
    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    /// Returns the attack type locked by the current or last attack.
    #[must_use]
    pub fn attack_type(&self) -> AttackType {
        self.attack_type
    }

    /// Returns the planar position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Returns the unit facing direction.
    #[must_use]
    pub fn facing(&self) -> Vec2 {
        self.facing
    }

    /// Returns the current target handle.
    #[must_use]
    pub fn target(&self) -> Option<CombatantId> {
        self.target
    }

    /// Whether an AI combatant has woken up.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the combatant is blocking, by stance or guard flag.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.state == CombatState::Blocking || (self.state == CombatState::Free && self.guarding)
    }

    /// Whether the combatant is in the stall that follows a blocked hit.
    #[must_use]
    pub fn blocked_attack(&self) -> bool {
        self.blocked_attack
    }

    /// Whether the combatant sprinted this tick.
    #[must_use]
    pub fn is_sprinting(&self) -> bool {
        self.sprinting
    }

    /// Whether the current attack has already registered.
    #[must_use]
    pub fn attack_registered(&self) -> bool {
        self.attack_registered
    }

    /// Returns the AI steering.
    #[must_use]
    pub fn steering(&self) -> Steering {
        self.steering
    }

    /// Whether the combatant is dead.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.state == CombatState::Dead
    }

    /// Returns the last presentation snapshot emitted.
    #[must_use]
    pub fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    /// Copies the observable state for another combatant to read.
    #[must_use]
    pub fn snapshot(&self) -> TargetSnapshot {
        TargetSnapshot {
            id: self.id,
            state: self.state,
            guarding: self.is_blocking(),
            position: self.position,
        }
    }

    // -------------------------------------------------------------------------
    // Setup
    // -------------------------------------------------------------------------

    /// Points the combatant at an opponent, or clears its target.
    pub fn set_target(&mut self, target: Option<CombatantId>) {
        self.target = target;
    }

    /// Syncs the position from the spatial layer.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Syncs the facing from the spatial layer. Zero vectors are ignored.
    pub fn set_facing(&mut self, facing: Vec2) {
        let facing = facing.normalize_or_zero();
        if facing != Vec2::ZERO {
            self.facing = facing;
        }
    }

    /// Sets maximum health, clamping current health.
    pub fn set_max_health(&mut self, max: f32) {
        self.health.set_max(max);
    }

    /// Sets maximum stamina, clamping current stamina. No-op without a pool.
    pub fn set_max_stamina(&mut self, max: f32) {
        if let Some(stamina) = self.stamina.as_mut() {
            stamina.set_max(max);
        }
    }

    /// Sets current health, clamped.
    pub fn set_health(&mut self, value: f32) {
        self.health.set(value);
    }

    /// Sets current stamina, clamped. No-op without a pool.
    pub fn set_stamina(&mut self, value: f32) {
        if let Some(stamina) = self.stamina.as_mut() {
            stamina.set(value);
        }
    }

    // -------------------------------------------------------------------------
    // Control surface
    // -------------------------------------------------------------------------

    /// Delivers an incoming attack. The only way other systems mutate a
    /// combatant.
    pub fn take_hit(&mut self, attack: AttackEvent) -> HitOutcome {
        HitResolver::resolve(self, &attack)
    }

    /// Whether an attack may start now.
    #[must_use]
    pub fn can_attack(&self) -> bool {
        self.state.is_waiting() && self.has_stamina() && !self.blocked_attack
    }

    /// Whether a player dodge may start now: free, moving, not backward.
    #[must_use]
    pub fn can_dodge(&self) -> bool {
        self.state == CombatState::Free
            && self.movement != Vec2::ZERO
            && self.movement.y >= 0.0
            && self.has_stamina()
            && !self.blocked_attack
    }

    /// Whether an attack from `origin` lands inside the block cone.
    #[must_use]
    pub fn can_block(&self, origin: Vec2) -> bool {
        if self.profile.block_style == BlockStyle::Unavailable {
            return false;
        }
        let to_origin = origin - self.position;
        if to_origin.length_squared() <= f32::EPSILON {
            return true;
        }
        angle_between(self.facing, to_origin) < self.profile.reach.block_angle * 0.5
    }

    /// Whether an AI combatant may turn to face its target this tick.
    #[must_use]
    pub fn can_rotate(&self) -> bool {
        match self.state {
            CombatState::Free | CombatState::Dodging | CombatState::RunningAttack => true,
            CombatState::Blocking => !self.blocked_attack,
            CombatState::Attacking => {
                self.timers.attack <= self.profile.timings.turn_window(self.attack_type)
            }
            CombatState::Flinching | CombatState::Dead => false,
        }
    }

    // -------------------------------------------------------------------------
    // Hit resolution hooks
    // -------------------------------------------------------------------------

    pub(crate) fn has_stamina(&self) -> bool {
        self.stamina.as_ref().map_or(true, |s| !s.is_depleted())
    }

    pub(crate) fn spend_stamina(&mut self, amount: f32) {
        if let Some(stamina) = self.stamina.as_mut() {
            stamina.spend(amount);
        }
    }

    pub(crate) fn activate(&mut self) {
        if !self.active && self.control == Control::Ai {
            tracing::debug!(combatant = %self.id, "AI activated");
        }
        self.active = true;
    }

    /// Removes `amount` health; moves to Dead when nothing is left.
    pub(crate) fn apply_damage(&mut self, amount: f32) -> bool {
        self.health.spend(amount);
        if self.health.is_depleted() {
            self.enter(CombatState::Dead);
            true
        } else {
            false
        }
    }

    pub(crate) fn interrupt(&mut self) {
        self.enter(CombatState::Flinching);
    }

    pub(crate) fn start_block_stall(&mut self) {
        self.blocked_attack = true;
        self.timers.block = 0.0;
    }

    pub(crate) fn break_guard(&mut self) {
        self.guarding = false;
        self.blocked_attack = false;
        if self.state == CombatState::Blocking {
            self.enter(CombatState::Free);
        }
    }
}

/// Unsigned angle in degrees between two planar vectors.
pub(crate) fn angle_between(a: Vec2, b: Vec2) -> f32 {
    a.perp_dot(b).atan2(a.dot(b)).abs().to_degrees()
}
