//! Abstract input snapshot for player-controlled combatants.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::hit::AttackType;

/// One tick of player input, already translated from raw devices.
///
/// Axes are clamped into `[-1, 1]` when read. `vertical` is the forward axis:
/// positive moves toward the combatant's facing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Strafe axis.
    pub horizontal: f32,
    /// Forward axis.
    pub vertical: f32,
    /// Attack pressed this tick.
    pub attack: Option<AttackType>,
    /// Block held.
    pub block: bool,
    /// Sprint held.
    pub sprint: bool,
    /// Dodge pressed this tick.
    pub dodge: bool,
}

impl Intent {
    /// An intent with no input at all.
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }

    /// Walk along the given axes.
    #[must_use]
    pub fn walk(horizontal: f32, vertical: f32) -> Self {
        Self {
            horizontal,
            vertical,
            ..Self::default()
        }
    }

    /// Press attack.
    #[must_use]
    pub fn attack(attack_type: AttackType) -> Self {
        Self {
            attack: Some(attack_type),
            ..Self::default()
        }
    }

    /// Hold block.
    #[must_use]
    pub fn block() -> Self {
        Self {
            block: true,
            ..Self::default()
        }
    }

    /// Press dodge while moving along the given axes.
    #[must_use]
    pub fn dodge(horizontal: f32, vertical: f32) -> Self {
        Self {
            horizontal,
            vertical,
            dodge: true,
            ..Self::default()
        }
    }

    /// Returns a copy with sprint held.
    #[must_use]
    pub fn sprinting(mut self) -> Self {
        self.sprint = true;
        self
    }

    /// Movement axes clamped into `[-1, 1]`.
    #[must_use]
    pub fn axes(&self) -> Vec2 {
        Vec2::new(clamp_axis(self.horizontal), clamp_axis(self.vertical))
    }
}

fn clamp_axis(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}
