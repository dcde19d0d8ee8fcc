//! Built-in decision tables for the enemy archetypes.
//!
//! Band shorthand used below: *striking* is closer than 3 units, *closing*
//! is closer than 7, *distant* is anything further or unknown.

use super::table::{Bands, Postures, Reserves, Rule, Stances, TablePolicy, Thresholds};
use super::{Action, DecisionPoint, DodgeDirection};
use crate::hit::AttackType;
use crate::profile::Archetype;

const BASIC: Action = Action::Attack(AttackType::Basic);
const HEAVY: Action = Action::Attack(AttackType::Heavy);
const FAR: Bands = Bands::CLOSING.union(Bands::DISTANT);
const VULNERABLE: Stances = Stances::OPEN.union(Stances::STAGGERED);
const NOBODY: Stances = Stances::DOWN.union(Stances::ABSENT);
const NOT_SPENT: Reserves = Reserves::RESTED.union(Reserves::WINDED);

impl TablePolicy {
    /// The built-in policy for an archetype, or `None` for player-side
    /// archetypes.
    #[must_use]
    pub fn for_archetype(archetype: Archetype) -> Option<Self> {
        match archetype {
            Archetype::Enemy => Some(enemy()),
            Archetype::MirrorKnight => Some(mirror_knight()),
            Archetype::Legacy => Some(legacy()),
            Archetype::Knight | Archetype::Hero => None,
        }
    }
}

/// Stance blocker with a running attack. Punishes open targets, waits out
/// guards, and backs off when winded.
#[must_use]
pub fn enemy() -> TablePolicy {
    use DecisionPoint::{AttackFinished, DodgeFinished, FlinchFinished, Waiting};

    let rules = vec![
        Rule::at(Waiting).stances(NOBODY).then(Action::Rest),
        Rule::at(Waiting).reserves(Reserves::SPENT).then(Action::Rest),
        // Open target.
        Rule::at(Waiting)
            .stances(VULNERABLE)
            .bands(Bands::STRIKING)
            .gated()
            .choose([(BASIC, 1), (Action::Block, 2)]),
        Rule::at(Waiting)
            .stances(VULNERABLE)
            .bands(FAR)
            .reserves(Reserves::RESTED)
            .then(Action::SprintApproach),
        Rule::at(Waiting)
            .stances(VULNERABLE)
            .bands(FAR)
            .then(Action::Rest),
        // Guarding target.
        Rule::at(Waiting)
            .stances(Stances::GUARDING)
            .bands(Bands::STRIKING)
            .gated()
            .choose([
                (Action::Block, 2),
                (BASIC, 1),
                (Action::Dodge(DodgeDirection::Back), 1),
            ]),
        Rule::at(Waiting)
            .stances(Stances::GUARDING)
            .reserves(Reserves::RESTED)
            .gated()
            .choose([(Action::Rest, 1), (Action::SprintApproach, 1)]),
        Rule::at(Waiting)
            .stances(Stances::GUARDING)
            .gated()
            .then(Action::Rest),
        // Attacking target.
        Rule::at(Waiting)
            .stances(Stances::STRIKING)
            .bands(Bands::STRIKING)
            .reserves(Reserves::RESTED)
            .gated()
            .choose([(Action::Block, 1), (Action::Dodge(DodgeDirection::Back), 1)]),
        Rule::at(Waiting)
            .stances(Stances::STRIKING)
            .bands(Bands::STRIKING)
            .gated()
            .choose([(Action::Block, 1), (Action::Dodge(DodgeDirection::Back), 2)]),
        Rule::at(Waiting)
            .stances(Stances::STRIKING)
            .gated()
            .then(Action::Rest),
        // Dodging target.
        Rule::at(Waiting)
            .stances(Stances::EVADING)
            .bands(Bands::STRIKING)
            .gated()
            .choose([(Action::Block, 1), (BASIC, 1)]),
        Rule::at(Waiting)
            .stances(Stances::EVADING)
            .reserves(Reserves::RESTED)
            .gated()
            .choose([(Action::SprintApproach, 1), (Action::Rest, 1)]),
        Rule::at(Waiting)
            .stances(Stances::EVADING)
            .gated()
            .then(Action::Rest),
        // Follow-ups.
        Rule::at(DodgeFinished)
            .reserves(Reserves::SPENT)
            .then(Action::Rest),
        Rule::at(DodgeFinished)
            .stances(!NOBODY)
            .bands(Bands::STRIKING)
            .choose([(BASIC, 2), (Action::Block, 1), (Action::Rest, 1)]),
        Rule::at(DodgeFinished)
            .stances(!NOBODY)
            .choose([(Action::SprintApproach, 2), (Action::Rest, 1)]),
        Rule::at(AttackFinished)
            .reserves(NOT_SPENT)
            .then(Action::Block),
        Rule::at(FlinchFinished)
            .reserves(NOT_SPENT)
            .then(Action::Block),
    ];
    TablePolicy::new(Thresholds::default(), rules)
}

/// Duelist with long reach and all-round sight. Walks in, trades blows,
/// sidesteps attacks and answers dodges with a quick strike.
#[must_use]
pub fn mirror_knight() -> TablePolicy {
    use DecisionPoint::{AttackFinished, DodgeFinished, FlinchFinished, Waiting};

    let rules = vec![
        Rule::at(Waiting).stances(NOBODY).then(Action::Rest),
        Rule::at(Waiting).reserves(Reserves::SPENT).then(Action::Rest),
        Rule::at(Waiting).bands(FAR).then(Action::Advance),
        Rule::at(Waiting)
            .stances(VULNERABLE)
            .gated()
            .choose([(BASIC, 2), (HEAVY, 1), (Action::Block, 1)]),
        Rule::at(Waiting)
            .stances(Stances::STRIKING)
            .postures(Postures::GUARDING)
            .then(Action::Stay),
        Rule::at(Waiting).stances(Stances::STRIKING).choose([
            (Action::Block, 1),
            (Action::Dodge(DodgeDirection::Left), 1),
            (Action::Dodge(DodgeDirection::Right), 1),
        ]),
        Rule::at(Waiting)
            .stances(Stances::GUARDING)
            .gated()
            .choose([(HEAVY, 1), (Action::Stay, 1)]),
        Rule::at(Waiting)
            .stances(Stances::EVADING)
            .gated()
            .choose([(Action::Block, 1), (Action::Stay, 1)]),
        Rule::at(AttackFinished)
            .stances(!NOBODY)
            .bands(Bands::STRIKING)
            .reserves(NOT_SPENT)
            .choose([(BASIC, 1), (Action::Block, 1), (Action::Stay, 1)]),
        Rule::at(DodgeFinished)
            .stances(!NOBODY)
            .bands(Bands::STRIKING)
            .reserves(NOT_SPENT)
            .then(BASIC),
        Rule::at(FlinchFinished)
            .reserves(NOT_SPENT)
            .choose([(Action::Block, 1), (Action::Dodge(DodgeDirection::Back), 1)]),
    ];
    TablePolicy::new(Thresholds::default(), rules)
}

/// Guard-flag fighter that walks rather than runs, keeps its guard up at
/// close range and retreats to recover when spent.
#[must_use]
pub fn legacy() -> TablePolicy {
    use DecisionPoint::{DodgeFinished, FlinchFinished, Waiting};

    let close = Bands::STRIKING.union(Bands::CLOSING);
    let rules = vec![
        Rule::at(Waiting).stances(NOBODY).then(Action::Rest),
        // A charge runs until it arrives or runs dry.
        Rule::at(Waiting)
            .postures(Postures::CHARGING)
            .then(Action::Stay),
        Rule::at(Waiting)
            .reserves(Reserves::SPENT)
            .bands(close)
            .then(Action::Retreat),
        Rule::at(Waiting)
            .reserves(Reserves::SPENT)
            .then(Action::Rest),
        Rule::at(Waiting)
            .bands(Bands::DISTANT)
            .gated()
            .choose([(Action::SprintApproach, 2), (Action::Advance, 3)]),
        Rule::at(Waiting)
            .bands(Bands::CLOSING)
            .then(Action::Advance),
        Rule::at(Waiting)
            .stances(VULNERABLE)
            .gated()
            .choose([(BASIC, 2), (Action::Block, 8)]),
        Rule::at(Waiting).then(Action::Block),
        Rule::at(FlinchFinished)
            .reserves(Reserves::SPENT)
            .then(Action::Rest),
        Rule::at(FlinchFinished).choose([
            (Action::Block, 2),
            (Action::Rest, 1),
            (Action::Dodge(DodgeDirection::Right), 1),
            (Action::Dodge(DodgeDirection::Left), 1),
        ]),
        Rule::at(DodgeFinished)
            .bands(Bands::STRIKING)
            .choose([(BASIC, 1), (Action::Block, 1)]),
        Rule::at(DodgeFinished).choose([(Action::SprintApproach, 1), (Action::Rest, 1)]),
    ];
    TablePolicy::new(Thresholds::default(), rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::CombatState;
    use crate::policy::{DecisionContext, DecisionPolicy, Posture, TargetStance};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::BTreeSet;

    fn ctx(
        point: DecisionPoint,
        target: TargetStance,
        distance: f32,
        stamina: f32,
    ) -> DecisionContext {
        DecisionContext {
            point,
            state: CombatState::Free,
            posture: Posture::Holding,
            stamina: Some(stamina),
            distance: Some(distance),
            target,
            ready: true,
        }
    }

    /// Every distinct action the policy can answer over many draws.
    fn outcomes(policy: &TablePolicy, ctx: &DecisionContext) -> BTreeSet<String> {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        (0..400)
            .map(|_| policy.decide(ctx, &mut rng).to_string())
            .collect()
    }

    fn set(actions: &[Action]) -> BTreeSet<String> {
        actions.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn built_in_tables_validate() {
        for archetype in [Archetype::Enemy, Archetype::MirrorKnight, Archetype::Legacy] {
            let policy = TablePolicy::for_archetype(archetype).unwrap();
            assert!(policy.validate().is_ok(), "{archetype}");
        }
        assert!(TablePolicy::for_archetype(Archetype::Knight).is_none());
        assert!(TablePolicy::for_archetype(Archetype::Hero).is_none());
    }

    mod enemy_tests {
        use super::*;

        #[test]
        fn rests_with_nobody_to_fight() {
            let p = enemy();
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            let c = ctx(DecisionPoint::Waiting, TargetStance::Down, 2.0, 100.0);
            assert_eq!(p.decide(&c, &mut rng), Action::Rest);
            let c = ctx(DecisionPoint::Waiting, TargetStance::Absent, 2.0, 100.0);
            assert_eq!(p.decide(&c, &mut rng), Action::Rest);
        }

        #[test]
        fn spent_enemy_rests() {
            let p = enemy();
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            let c = ctx(DecisionPoint::Waiting, TargetStance::Open, 2.0, 0.0);
            assert_eq!(p.decide(&c, &mut rng), Action::Rest);
        }

        #[test]
        fn open_target_in_range() {
            let c = ctx(DecisionPoint::Waiting, TargetStance::Open, 2.0, 100.0);
            assert_eq!(outcomes(&enemy(), &c), set(&[BASIC, Action::Block]));
        }

        #[test]
        fn open_target_far_away() {
            let p = enemy();
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            let rested = ctx(DecisionPoint::Waiting, TargetStance::Open, 8.0, 100.0);
            assert_eq!(p.decide(&rested, &mut rng), Action::SprintApproach);
            let winded = ctx(DecisionPoint::Waiting, TargetStance::Open, 8.0, 20.0);
            assert_eq!(p.decide(&winded, &mut rng), Action::Rest);
        }

        #[test]
        fn attacking_target_draws_defence() {
            let c = ctx(DecisionPoint::Waiting, TargetStance::Striking, 2.0, 100.0);
            assert_eq!(
                outcomes(&enemy(), &c),
                set(&[Action::Block, Action::Dodge(DodgeDirection::Back)])
            );
        }

        #[test]
        fn gated_rules_wait_for_cadence() {
            let mut c = ctx(DecisionPoint::Waiting, TargetStance::Guarding, 2.0, 100.0);
            c.ready = false;
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            assert_eq!(enemy().decide(&c, &mut rng), Action::Stay);
        }

        #[test]
        fn follow_ups() {
            let p = enemy();
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            let c = ctx(DecisionPoint::AttackFinished, TargetStance::Open, 2.0, 50.0);
            assert_eq!(p.decide(&c, &mut rng), Action::Block);
            let c = ctx(DecisionPoint::AttackFinished, TargetStance::Open, 2.0, 0.0);
            assert_eq!(p.decide(&c, &mut rng), Action::Stay);

            let c = ctx(DecisionPoint::DodgeFinished, TargetStance::Open, 8.0, 50.0);
            assert_eq!(
                outcomes(&p, &c),
                set(&[Action::SprintApproach, Action::Rest])
            );
        }
    }

    mod mirror_knight_tests {
        use super::*;

        #[test]
        fn walks_in_from_range() {
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            let c = ctx(DecisionPoint::Waiting, TargetStance::Guarding, 9.0, 100.0);
            assert_eq!(mirror_knight().decide(&c, &mut rng), Action::Advance);
        }

        #[test]
        fn sidesteps_or_blocks_attacks() {
            let c = ctx(DecisionPoint::Waiting, TargetStance::Striking, 2.0, 100.0);
            assert_eq!(
                outcomes(&mirror_knight(), &c),
                set(&[
                    Action::Block,
                    Action::Dodge(DodgeDirection::Left),
                    Action::Dodge(DodgeDirection::Right),
                ])
            );
        }

        #[test]
        fn keeps_guard_while_blocking() {
            let mut c = ctx(DecisionPoint::Waiting, TargetStance::Striking, 2.0, 100.0);
            c.posture = Posture::Guarding;
            c.state = CombatState::Blocking;
            assert_eq!(outcomes(&mirror_knight(), &c), set(&[Action::Stay]));
        }

        #[test]
        fn counters_after_dodge() {
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            let c = ctx(DecisionPoint::DodgeFinished, TargetStance::Open, 2.0, 40.0);
            assert_eq!(mirror_knight().decide(&c, &mut rng), BASIC);
        }
    }

    mod legacy_tests {
        use super::*;

        #[test]
        fn blocks_at_close_range_by_default() {
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            let c = ctx(DecisionPoint::Waiting, TargetStance::Guarding, 2.0, 100.0);
            assert_eq!(legacy().decide(&c, &mut rng), Action::Block);
        }

        #[test]
        fn retreats_when_spent_up_close() {
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            let c = ctx(DecisionPoint::Waiting, TargetStance::Open, 2.0, 0.0);
            assert_eq!(legacy().decide(&c, &mut rng), Action::Retreat);
            let c = ctx(DecisionPoint::Waiting, TargetStance::Open, 9.0, 0.0);
            assert_eq!(legacy().decide(&c, &mut rng), Action::Rest);
        }

        #[test]
        fn charge_is_not_interrupted() {
            let mut c = ctx(DecisionPoint::Waiting, TargetStance::Open, 5.0, 100.0);
            c.posture = Posture::Charging;
            assert_eq!(outcomes(&legacy(), &c), set(&[Action::Stay]));
        }

        #[test]
        fn distant_target_draws_approach() {
            let c = ctx(DecisionPoint::Waiting, TargetStance::Open, 12.0, 100.0);
            assert_eq!(
                outcomes(&legacy(), &c),
                set(&[Action::SprintApproach, Action::Advance])
            );
        }
    }
}
