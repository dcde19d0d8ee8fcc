//! Combat states, timers and AI steering.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hit::AttackType;
use crate::ports::StateTag;

/// Discrete combat state of a combatant.
///
/// `Free` is initial, `Dead` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatState {
    /// Moving freely; may guard when the archetype blocks with a flag.
    Free,
    /// Swinging; movement locked until the attack ends.
    Attacking,
    /// Sprinting at the target to open with an attack.
    RunningAttack,
    /// Holding a blocking stance.
    Blocking,
    /// Recovering from a hit; no control.
    Flinching,
    /// Rolling; briefly invincible.
    Dodging,
    /// Terminal.
    Dead,
}

impl CombatState {
    /// States in which the rest timer accumulates.
    #[must_use]
    pub const fn is_rest_eligible(self) -> bool {
        matches!(self, Self::Free | Self::Flinching)
    }

    /// States an AI re-evaluates in on its decision cadence.
    #[must_use]
    pub const fn is_waiting(self) -> bool {
        matches!(self, Self::Free | Self::Blocking)
    }

    /// Animation tag the presentation layer plays for this state.
    #[must_use]
    pub const fn tag(self, attack_type: AttackType) -> Option<StateTag> {
        match self {
            Self::Attacking => Some(match attack_type {
                AttackType::Basic => StateTag::BasicAttack,
                AttackType::Heavy => StateTag::HeavyAttack,
            }),
            Self::Dodging => Some(StateTag::Dodge),
            Self::Flinching => Some(StateTag::Flinch),
            Self::Dead => Some(StateTag::Dying),
            Self::Free | Self::RunningAttack | Self::Blocking => None,
        }
    }
}

impl fmt::Display for CombatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => write!(f, "Free"),
            Self::Attacking => write!(f, "Attacking"),
            Self::RunningAttack => write!(f, "RunningAttack"),
            Self::Blocking => write!(f, "Blocking"),
            Self::Flinching => write!(f, "Flinching"),
            Self::Dodging => write!(f, "Dodging"),
            Self::Dead => write!(f, "Dead"),
        }
    }
}

/// Per-state timers in seconds. Each resets to 0 when its state is entered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Timers {
    /// Continuous time in Free or Flinching.
    pub rest: f32,
    /// Time since the current attack started.
    pub attack: f32,
    /// Time since the current dodge started.
    pub dodge: f32,
    /// Time since the current block stall started.
    pub block: f32,
    /// Time since the current flinch started.
    pub flinch: f32,
    /// Time since the AI last changed course.
    pub decision: f32,
}

/// Persistent movement intent an AI keeps between decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Steering {
    /// Stand still.
    #[default]
    Hold,
    /// Walk toward the target until within engage distance.
    Advance,
    /// Walk away from the target.
    Retreat,
    /// Sprint at the target and attack on arrival.
    Charge,
}
