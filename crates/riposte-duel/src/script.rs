//! Scripted input for player-side archetypes that have no AI policy.

use riposte_core::{AttackType, CombatState, CombatantId, Encounter, Intent};

use crate::stage::Stage;

/// Distance the script closes to before swinging.
const SWING_DISTANCE: f32 = 2.5;
/// Distance beyond which the script sprints.
const SPRINT_DISTANCE: f32 = 6.0;
/// Stamina kept in reserve for blocking.
const GUARD_RESERVE: f32 = 20.0;

/// A plain duelist: close in, guard against swings, trade basics and open
/// guards with heavies.
pub fn intent_for(encounter: &Encounter, id: CombatantId) -> Intent {
    let Some(me) = encounter.get(id) else {
        return Intent::idle();
    };
    let Some(target) = me.target().and_then(|t| encounter.get(t)) else {
        return Intent::idle();
    };
    if target.is_dead() {
        return Intent::idle();
    }
    let Some(distance) = Stage::distance(encounter, id, target.id()) else {
        return Intent::idle();
    };
    let stamina = me.stamina().map_or(f32::INFINITY, |s| s.get());

    let threatened = matches!(
        target.state(),
        CombatState::Attacking | CombatState::RunningAttack
    );
    if threatened && distance < SPRINT_DISTANCE {
        return if stamina > GUARD_RESERVE {
            Intent::block()
        } else {
            Intent::dodge(1.0, 0.0)
        };
    }

    if distance > SWING_DISTANCE {
        let walk = Intent::walk(0.0, 1.0);
        return if distance > SPRINT_DISTANCE {
            walk.sprinting()
        } else {
            walk
        };
    }

    if target.is_blocking() {
        Intent::attack(AttackType::Heavy)
    } else {
        Intent::attack(AttackType::Basic)
    }
}
