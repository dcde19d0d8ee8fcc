//! AI decision layer.
//!
//! An AI-controlled combatant does not poll input. At each decision point
//! it hands a [`DecisionContext`] and a random source to its archetype's
//! [`DecisionPolicy`], which answers with one [`Action`]. The state machine
//! then applies the action if the combatant is able to.
//!
//! # Decision points
//!
//! - [`DecisionPoint::Waiting`]: every tick while Free or Blocking; policies
//!   may defer gated choices until the decision timer reaches the cadence,
//!   and every gated draw restarts the timer
//! - [`DecisionPoint::AttackFinished`], [`DecisionPoint::DodgeFinished`],
//!   [`DecisionPoint::FlinchFinished`]: once, when the state ends
//!
//! # Policy Registry
//!
//! The [`PolicyRegistry`] maps archetypes to policies so that different
//! enemy kinds plug different tables into the same state machine.
//!
//! # Example
//!
//! ```
//! use riposte_core::policy::{Action, DecisionContext, DecisionPolicy, PolicyRegistry};
//! use riposte_core::profile::Archetype;
//! use rand::RngCore;
//! use std::sync::Arc;
//!
//! struct AlwaysBlock;
//!
//! impl DecisionPolicy for AlwaysBlock {
//!     fn decide(&self, _ctx: &DecisionContext, _rng: &mut dyn RngCore) -> Action {
//!         Action::Block
//!     }
//! }
//!
//! let mut registry = PolicyRegistry::new();
//! registry.register(Archetype::Enemy, Arc::new(AlwaysBlock));
//! assert!(registry.policy_for(Archetype::Enemy).is_some());
//! assert!(registry.policy_for(Archetype::Legacy).is_none());
//! ```

pub mod archetypes;
pub mod table;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use glam::Vec2;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::combatant::{CombatState, TargetSnapshot};
use crate::hit::AttackType;
use crate::profile::Archetype;

pub use table::{Bands, Postures, Reserves, Rule, Stances, TablePolicy, Thresholds, WeightedTable};

// =============================================================================
// Actions
// =============================================================================

/// Direction of an AI dodge, in the combatant's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DodgeDirection {
    /// Strafe left.
    Left,
    /// Strafe right.
    Right,
    /// Roll backward.
    Back,
    /// Roll forward.
    Forward,
}

impl DodgeDirection {
    /// Unit vector (`x` strafe, `y` forward).
    #[must_use]
    pub const fn vector(self) -> Vec2 {
        match self {
            Self::Left => Vec2::new(-1.0, 0.0),
            Self::Right => Vec2::new(1.0, 0.0),
            Self::Back => Vec2::new(0.0, -1.0),
            Self::Forward => Vec2::new(0.0, 1.0),
        }
    }
}

/// What an AI wants to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Keep doing what it is doing.
    Stay,
    /// Start an attack.
    Attack(AttackType),
    /// Raise the guard or enter the blocking stance.
    Block,
    /// Roll in a direction.
    Dodge(DodgeDirection),
    /// Sprint at the target: a running attack, or a charge for archetypes
    /// without one.
    SprintApproach,
    /// Walk toward the target.
    Advance,
    /// Walk away from the target.
    Retreat,
    /// Stand still with the guard down so stamina can recover.
    Rest,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stay => write!(f, "Stay"),
            Self::Attack(t) => write!(f, "Attack({t})"),
            Self::Block => write!(f, "Block"),
            Self::Dodge(d) => write!(f, "Dodge({d:?})"),
            Self::SprintApproach => write!(f, "SprintApproach"),
            Self::Advance => write!(f, "Advance"),
            Self::Retreat => write!(f, "Retreat"),
            Self::Rest => write!(f, "Rest"),
        }
    }
}

// =============================================================================
// Context
// =============================================================================

/// When a policy is being asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionPoint {
    /// Idling in Free or Blocking.
    Waiting,
    /// An attack just ended.
    AttackFinished,
    /// A dodge just ended.
    DodgeFinished,
    /// A flinch just ended.
    FlinchFinished,
}

/// What the target is doing, as far as a policy cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetStance {
    /// No target, or the spatial layer does not know it.
    Absent,
    /// Free with the guard down.
    Open,
    /// Blocking by stance or guard flag.
    Guarding,
    /// Attacking or running in to attack.
    Striking,
    /// Dodging.
    Evading,
    /// Flinching.
    Staggered,
    /// Dead.
    Down,
}

impl TargetStance {
    /// Classifies a target snapshot.
    #[must_use]
    pub fn of(target: Option<&TargetSnapshot>) -> Self {
        let Some(target) = target else {
            return Self::Absent;
        };
        match target.state {
            CombatState::Free if target.guarding => Self::Guarding,
            CombatState::Free => Self::Open,
            CombatState::Blocking => Self::Guarding,
            CombatState::Attacking | CombatState::RunningAttack => Self::Striking,
            CombatState::Dodging => Self::Evading,
            CombatState::Flinching => Self::Staggered,
            CombatState::Dead => Self::Down,
        }
    }
}

/// What the deciding combatant is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Posture {
    /// Free and standing still.
    Holding,
    /// Blocking.
    Guarding,
    /// Free and walking in.
    Advancing,
    /// Free and backing off.
    Retreating,
    /// Free and sprinting in.
    Charging,
    /// In any other state.
    Busy,
}

/// Inputs to a decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionContext {
    /// Why the policy is being asked.
    pub point: DecisionPoint,
    /// Own combat state.
    pub state: CombatState,
    /// Own posture.
    pub posture: Posture,
    /// Own stamina; `None` when the combatant has no pool.
    pub stamina: Option<f32>,
    /// Distance to the target, when known.
    pub distance: Option<f32>,
    /// What the target is doing.
    pub target: TargetStance,
    /// Whether the decision timer has reached the archetype's cadence.
    pub ready: bool,
}

// =============================================================================
// Policy
// =============================================================================

/// Chooses actions for an AI-controlled combatant.
///
/// Policies are shared between all combatants of an archetype, so they must
/// be stateless with respect to any single combatant. All randomness comes
/// from `rng`.
pub trait DecisionPolicy: Send + Sync {
    /// Picks the next action.
    fn decide(&self, ctx: &DecisionContext, rng: &mut dyn RngCore) -> Action;

    /// Whether answering `ctx` spends the decision cadence.
    ///
    /// When this is `true` the combatant restarts its decision timer after
    /// the draw, even if the drawn action changed nothing.
    fn paces(&self, ctx: &DecisionContext) -> bool {
        let _ = ctx;
        false
    }
}

/// Registry of decision policies keyed by archetype.
#[derive(Default, Clone)]
pub struct PolicyRegistry {
    policies: HashMap<Archetype, Arc<dyn DecisionPolicy>>,
}

impl fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut archetypes: Vec<_> = self.policies.keys().collect();
        archetypes.sort();
        f.debug_struct("PolicyRegistry")
            .field("archetypes", &archetypes)
            .finish()
    }
}

impl PolicyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in tables for every enemy
    /// archetype.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for archetype in [Archetype::Enemy, Archetype::MirrorKnight, Archetype::Legacy] {
            if let Some(policy) = TablePolicy::for_archetype(archetype) {
                registry.register(archetype, Arc::new(policy));
            }
        }
        registry
    }

    /// Registers a policy, replacing any previous one for the archetype.
    pub fn register(&mut self, archetype: Archetype, policy: Arc<dyn DecisionPolicy>) {
        self.policies.insert(archetype, policy);
    }

    /// Returns the policy for an archetype.
    #[must_use]
    pub fn policy_for(&self, archetype: Archetype) -> Option<&Arc<dyn DecisionPolicy>> {
        self.policies.get(&archetype)
    }

    /// Number of registered archetypes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Whether no policy is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
