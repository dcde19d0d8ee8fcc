//! Hit resolution.
//!
//! [`HitResolver::resolve`] decides what an incoming [`AttackEvent`] does to
//! a combatant, based on the combatant's state and facing:
//!
//! | Target state | Outcome |
//! |---|---|
//! | Free, guard down | damage, flinch |
//! | Free guarding / Blocking, inside block cone | stamina cost, stall |
//! | Free guarding / Blocking, outside block cone | damage, flinch |
//! | Attacking / RunningAttack | damage, interrupted into flinch |
//! | Dodging, invincible window | nothing |
//! | Dodging, after the window | damage, dodge continues |
//! | Flinching / Dead | nothing |
//!
//! Any damage that empties health moves the target to Dead at once. Any hit
//! wakes a dormant AI.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::combatant::{CombatState, Combatant};

/// Attack variety. Governs damage and windup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackType {
    /// Quick attack.
    Basic,
    /// Slow, hard-hitting attack.
    Heavy,
}

impl fmt::Display for AttackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => write!(f, "Basic"),
            Self::Heavy => write!(f, "Heavy"),
        }
    }
}

/// An incoming hit, passed by value and never retained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackEvent {
    /// Where the attack came from.
    pub origin: Vec2,
    /// Health removed if the hit lands.
    pub damage: f32,
    /// Attack variety.
    pub attack_type: AttackType,
}

impl AttackEvent {
    /// Creates an attack event.
    #[must_use]
    pub fn new(origin: Vec2, damage: f32, attack_type: AttackType) -> Self {
        Self {
            origin,
            damage,
            attack_type,
        }
    }

    /// Creates a basic attack event.
    #[must_use]
    pub fn basic(origin: Vec2, damage: f32) -> Self {
        Self::new(origin, damage, AttackType::Basic)
    }
}

/// What a hit did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HitOutcome {
    /// Health was removed.
    Damaged {
        /// Health removed.
        amount: f32,
        /// Whether the target was knocked into Flinching.
        flinched: bool,
        /// Whether the target died.
        killed: bool,
    },
    /// The hit was blocked.
    Blocked {
        /// Whether the block cost exhausted stamina and dropped the guard.
        guard_broken: bool,
    },
    /// The target was inside its dodge's invincible window.
    Evaded,
    /// The target was flinching or dead.
    Ignored,
}

impl HitOutcome {
    /// Whether health was removed.
    #[must_use]
    pub fn landed(&self) -> bool {
        matches!(self, Self::Damaged { .. })
    }
}

/// Resolves incoming attacks against a combatant.
///
/// # Example
///
/// ```
/// use riposte_core::combatant::{Combatant, CombatantId, CombatState, Control, Team};
/// use riposte_core::hit::{AttackEvent, HitOutcome, HitResolver};
/// use riposte_core::profile::ArchetypeProfile;
/// use glam::Vec2;
///
/// let mut c = Combatant::new(
///     CombatantId::new(1),
///     Team::Enemy,
///     Control::Ai,
///     ArchetypeProfile::enemy(),
///     Vec2::ZERO,
/// );
///
/// let outcome = HitResolver::resolve(&mut c, &AttackEvent::basic(Vec2::Y, 25.0));
/// assert!(outcome.landed());
/// assert_eq!(c.state(), CombatState::Flinching);
/// assert!(c.is_active());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct HitResolver;

impl HitResolver {
    /// Applies `attack` to `target` and reports the outcome.
    pub fn resolve(target: &mut Combatant, attack: &AttackEvent) -> HitOutcome {
        if target.state() == CombatState::Dead {
            return HitOutcome::Ignored;
        }
        target.activate();

        let outcome = match target.state() {
            CombatState::Flinching | CombatState::Dead => HitOutcome::Ignored,
            CombatState::Dodging => {
                if target.timers().dodge < target.profile().timings.invincible_window {
                    HitOutcome::Evaded
                } else {
                    Self::damage(target, attack, false)
                }
            }
            CombatState::Free | CombatState::Blocking if target.is_blocking() => {
                if target.can_block(attack.origin) {
                    Self::block(target)
                } else {
                    Self::damage(target, attack, true)
                }
            }
            CombatState::Free
            | CombatState::Blocking
            | CombatState::Attacking
            | CombatState::RunningAttack => Self::damage(target, attack, true),
        };

        trace!(
            combatant = %target.id(),
            attack = %attack.attack_type,
            ?outcome,
            "hit resolved"
        );
        outcome
    }

    fn damage(target: &mut Combatant, attack: &AttackEvent, interrupt: bool) -> HitOutcome {
        let amount = attack.damage.max(0.0);
        let before = target.health().get();
        let killed = target.apply_damage(amount);
        let flinched = !killed && interrupt;
        if flinched {
            target.interrupt();
        }
        HitOutcome::Damaged {
            amount: before - target.health().get(),
            flinched,
            killed,
        }
    }

    fn block(target: &mut Combatant) -> HitOutcome {
        target.spend_stamina(target.profile().costs.block);
        if target.has_stamina() {
            target.start_block_stall();
            HitOutcome::Blocked {
                guard_broken: false,
            }
        } else {
            target.break_guard();
            HitOutcome::Blocked { guard_broken: true }
        }
    }
}
