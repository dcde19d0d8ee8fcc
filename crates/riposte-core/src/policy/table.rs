//! Weighted decision tables.
//!
//! A [`TablePolicy`] is an ordered list of [`Rule`]s. Each rule matches a
//! decision point plus sets of target stances, distance bands, stamina
//! reserves and own postures, and owns a [`WeightedTable`]: a draw from
//! `[0, total)` lands in exactly one bucket. The first matching rule wins;
//! when nothing matches the answer is [`Action::Stay`].

use bitflags::bitflags;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use super::{Action, DecisionContext, DecisionPoint, DecisionPolicy, Posture, TargetStance};
use crate::error::{ConfigError, Result};

// =============================================================================
// Match sets
// =============================================================================

bitflags! {
    /// Set of target stances a rule applies to.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Stances: u8 {
        const ABSENT    = 1 << 0;
        const OPEN      = 1 << 1;
        const GUARDING  = 1 << 2;
        const STRIKING  = 1 << 3;
        const EVADING   = 1 << 4;
        const STAGGERED = 1 << 5;
        const DOWN      = 1 << 6;
    }
}

bitflags! {
    /// Set of distance bands a rule applies to.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Bands: u8 {
        /// Closer than the strike distance.
        const STRIKING = 1 << 0;
        /// Closer than the chase distance.
        const CLOSING  = 1 << 1;
        /// Anything further, or unknown.
        const DISTANT  = 1 << 2;
    }
}

bitflags! {
    /// Set of stamina reserves a rule applies to.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Reserves: u8 {
        /// Above the rested threshold, or no stamina pool.
        const RESTED = 1 << 0;
        /// Some stamina left.
        const WINDED = 1 << 1;
        /// Nothing left.
        const SPENT  = 1 << 2;
    }
}

bitflags! {
    /// Set of own postures a rule applies to.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Postures: u8 {
        const HOLDING    = 1 << 0;
        const GUARDING   = 1 << 1;
        const ADVANCING  = 1 << 2;
        const RETREATING = 1 << 3;
        const CHARGING   = 1 << 4;
        const BUSY       = 1 << 5;
    }
}

impl From<TargetStance> for Stances {
    fn from(stance: TargetStance) -> Self {
        match stance {
            TargetStance::Absent => Self::ABSENT,
            TargetStance::Open => Self::OPEN,
            TargetStance::Guarding => Self::GUARDING,
            TargetStance::Striking => Self::STRIKING,
            TargetStance::Evading => Self::EVADING,
            TargetStance::Staggered => Self::STAGGERED,
            TargetStance::Down => Self::DOWN,
        }
    }
}

impl From<Posture> for Postures {
    fn from(posture: Posture) -> Self {
        match posture {
            Posture::Holding => Self::HOLDING,
            Posture::Guarding => Self::GUARDING,
            Posture::Advancing => Self::ADVANCING,
            Posture::Retreating => Self::RETREATING,
            Posture::Charging => Self::CHARGING,
            Posture::Busy => Self::BUSY,
        }
    }
}

/// Distance and stamina cut-offs used to classify a context.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Below this distance the target is in striking range.
    pub strike_distance: f32,
    /// Below this distance the target is worth walking to.
    pub chase_distance: f32,
    /// Above this stamina the combatant counts as rested.
    pub rested_stamina: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            strike_distance: 3.0,
            chase_distance: 7.0,
            rested_stamina: 40.0,
        }
    }
}

impl Thresholds {
    /// Band for a distance; unknown distances are distant.
    #[must_use]
    pub fn band(&self, distance: Option<f32>) -> Bands {
        match distance {
            Some(d) if d < self.strike_distance => Bands::STRIKING,
            Some(d) if d < self.chase_distance => Bands::CLOSING,
            _ => Bands::DISTANT,
        }
    }

    /// Reserve for a stamina value; no pool counts as rested.
    #[must_use]
    pub fn reserve(&self, stamina: Option<f32>) -> Reserves {
        match stamina {
            None => Reserves::RESTED,
            Some(s) if s <= 0.0 => Reserves::SPENT,
            Some(s) if s > self.rested_stamina => Reserves::RESTED,
            Some(_) => Reserves::WINDED,
        }
    }
}

// =============================================================================
// Weighted table
// =============================================================================

/// One outcome and its share of the draw range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Outcome.
    pub action: Action,
    /// Width of the bucket.
    pub weight: u32,
}

/// Discrete outcome table. Buckets occupy consecutive ranges of
/// `[0, total)` in declaration order.
///
/// # Example
///
/// ```
/// use riposte_core::policy::{Action, WeightedTable};
/// use riposte_core::hit::AttackType;
///
/// let table = WeightedTable::new([(Action::Attack(AttackType::Basic), 1), (Action::Block, 2)]);
/// assert_eq!(table.total(), 3);
/// assert_eq!(table.pick(0), Some(Action::Attack(AttackType::Basic)));
/// assert_eq!(table.pick(1), Some(Action::Block));
/// assert_eq!(table.pick(2), Some(Action::Block));
/// assert_eq!(table.pick(3), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightedTable {
    buckets: Vec<Bucket>,
}

impl WeightedTable {
    /// Builds a table from `(action, weight)` pairs.
    pub fn new(entries: impl IntoIterator<Item = (Action, u32)>) -> Self {
        Self {
            buckets: entries
                .into_iter()
                .map(|(action, weight)| Bucket { action, weight })
                .collect(),
        }
    }

    /// A table with a single certain outcome.
    #[must_use]
    pub fn single(action: Action) -> Self {
        Self::new([(action, 1)])
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|b| u64::from(b.weight)).sum()
    }

    /// The buckets in draw order.
    #[must_use]
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Maps a roll in `[0, total)` to its bucket.
    #[must_use]
    pub fn pick(&self, roll: u64) -> Option<Action> {
        let mut upper = 0;
        for bucket in &self.buckets {
            upper += u64::from(bucket.weight);
            if roll < upper {
                return Some(bucket.action);
            }
        }
        None
    }

    /// Draws an outcome uniformly over the total weight.
    pub fn draw(&self, rng: &mut dyn RngCore) -> Option<Action> {
        match self.total() {
            0 => None,
            1 => self.pick(0),
            total => self.pick(rng.gen_range(0..total)),
        }
    }
}

// =============================================================================
// Rules
// =============================================================================

/// One row of a decision table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Decision point this rule answers.
    pub point: DecisionPoint,
    /// Target stances it applies to.
    #[serde(default = "Stances::all")]
    pub stances: Stances,
    /// Distance bands it applies to.
    #[serde(default = "Bands::all")]
    pub bands: Bands,
    /// Stamina reserves it applies to.
    #[serde(default = "Reserves::all")]
    pub reserves: Reserves,
    /// Own postures it applies to.
    #[serde(default = "Postures::all")]
    pub postures: Postures,
    /// Whether the rule waits for the decision cadence.
    #[serde(default)]
    pub gated: bool,
    /// Outcomes.
    pub table: WeightedTable,
}

impl Rule {
    /// A rule for `point` matching everything, answering `Stay`.
    #[must_use]
    pub fn at(point: DecisionPoint) -> Self {
        Self {
            point,
            stances: Stances::all(),
            bands: Bands::all(),
            reserves: Reserves::all(),
            postures: Postures::all(),
            gated: false,
            table: WeightedTable::single(Action::Stay),
        }
    }

    /// Restricts the target stances.
    #[must_use]
    pub fn stances(mut self, stances: Stances) -> Self {
        self.stances = stances;
        self
    }

    /// Restricts the distance bands.
    #[must_use]
    pub fn bands(mut self, bands: Bands) -> Self {
        self.bands = bands;
        self
    }

    /// Restricts the stamina reserves.
    #[must_use]
    pub fn reserves(mut self, reserves: Reserves) -> Self {
        self.reserves = reserves;
        self
    }

    /// Restricts the own postures.
    #[must_use]
    pub fn postures(mut self, postures: Postures) -> Self {
        self.postures = postures;
        self
    }

    /// Waits for the decision cadence.
    #[must_use]
    pub fn gated(mut self) -> Self {
        self.gated = true;
        self
    }

    /// Answers with a single action.
    #[must_use]
    pub fn then(mut self, action: Action) -> Self {
        self.table = WeightedTable::single(action);
        self
    }

    /// Answers with a weighted draw.
    #[must_use]
    pub fn choose(mut self, entries: impl IntoIterator<Item = (Action, u32)>) -> Self {
        self.table = WeightedTable::new(entries);
        self
    }

    fn matches(&self, ctx: &DecisionContext, band: Bands, reserve: Reserves) -> bool {
        self.point == ctx.point
            && self.stances.contains(Stances::from(ctx.target))
            && self.bands.contains(band)
            && self.reserves.contains(reserve)
            && self.postures.contains(Postures::from(ctx.posture))
    }
}

// =============================================================================
// Table policy
// =============================================================================

/// Decision policy driven by an ordered rule table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablePolicy {
    /// Classification cut-offs.
    #[serde(default)]
    pub thresholds: Thresholds,
    /// Rules in priority order.
    pub rules: Vec<Rule>,
}

impl TablePolicy {
    /// Creates a policy from thresholds and rules.
    #[must_use]
    pub fn new(thresholds: Thresholds, rules: Vec<Rule>) -> Self {
        Self { thresholds, rules }
    }

    /// Parses a policy from JSON and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and the matching
    /// validation error otherwise.
    pub fn from_json(json: &str) -> Result<Self> {
        let policy: Self = serde_json::from_str(json)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Checks thresholds are usable and every table can produce an outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyTable`] or [`ConfigError::InvalidValue`].
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("thresholds.strike_distance", self.thresholds.strike_distance),
            ("thresholds.chase_distance", self.thresholds.chase_distance),
            ("thresholds.rested_stamina", self.thresholds.rested_stamina),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidValue { name, value });
            }
        }
        if self.rules.iter().any(|rule| rule.table.total() == 0) {
            return Err(ConfigError::EmptyTable);
        }
        Ok(())
    }

    /// First rule answering `ctx`.
    fn rule_for(&self, ctx: &DecisionContext) -> Option<&Rule> {
        let band = self.thresholds.band(ctx.distance);
        let reserve = self.thresholds.reserve(ctx.stamina);
        self.rules.iter().find(|r| r.matches(ctx, band, reserve))
    }
}

impl DecisionPolicy for TablePolicy {
    fn decide(&self, ctx: &DecisionContext, rng: &mut dyn RngCore) -> Action {
        let Some(rule) = self.rule_for(ctx) else {
            return Action::Stay;
        };
        if rule.gated && !ctx.ready {
            return Action::Stay;
        }
        rule.table.draw(rng).unwrap_or(Action::Stay)
    }

    fn paces(&self, ctx: &DecisionContext) -> bool {
        ctx.ready && self.rule_for(ctx).is_some_and(|rule| rule.gated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::CombatState;
    use crate::hit::AttackType;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ctx(target: TargetStance, distance: f32, stamina: f32, ready: bool) -> DecisionContext {
        DecisionContext {
            point: DecisionPoint::Waiting,
            state: CombatState::Free,
            posture: Posture::Holding,
            stamina: Some(stamina),
            distance: Some(distance),
            target,
            ready,
        }
    }

    mod table_tests {
        use super::*;

        #[test]
        fn buckets_cover_cumulative_ranges() {
            let table = WeightedTable::new([
                (Action::Block, 2),
                (Action::Attack(AttackType::Basic), 1),
                (Action::Rest, 3),
            ]);
            let picks: Vec<_> = (0..6).map(|roll| table.pick(roll)).collect();
            assert_eq!(
                picks,
                vec![
                    Some(Action::Block),
                    Some(Action::Block),
                    Some(Action::Attack(AttackType::Basic)),
                    Some(Action::Rest),
                    Some(Action::Rest),
                    Some(Action::Rest),
                ]
            );
            assert_eq!(table.pick(6), None);
        }

        #[test]
        fn zero_weight_buckets_are_never_drawn() {
            let table = WeightedTable::new([(Action::Block, 0), (Action::Rest, 1)]);
            let mut rng = ChaCha8Rng::seed_from_u64(3);
            for _ in 0..50 {
                assert_eq!(table.draw(&mut rng), Some(Action::Rest));
            }
        }

        #[test]
        fn empty_table_draws_nothing() {
            let table = WeightedTable::new(Vec::<(Action, u32)>::new());
            let mut rng = ChaCha8Rng::seed_from_u64(3);
            assert_eq!(table.draw(&mut rng), None);
        }

        #[test]
        fn draws_follow_weights() {
            let table = WeightedTable::new([(Action::Block, 1), (Action::Rest, 3)]);
            let mut rng = ChaCha8Rng::seed_from_u64(11);
            let rests = (0..4000)
                .filter(|_| table.draw(&mut rng) == Some(Action::Rest))
                .count();
            assert!((2700..3300).contains(&rests), "rests = {rests}");
        }
    }

    mod classification_tests {
        use super::*;

        #[test]
        fn bands() {
            let t = Thresholds::default();
            assert_eq!(t.band(Some(1.0)), Bands::STRIKING);
            assert_eq!(t.band(Some(3.0)), Bands::CLOSING);
            assert_eq!(t.band(Some(7.0)), Bands::DISTANT);
            assert_eq!(t.band(None), Bands::DISTANT);
        }

        #[test]
        fn reserves() {
            let t = Thresholds::default();
            assert_eq!(t.reserve(None), Reserves::RESTED);
            assert_eq!(t.reserve(Some(41.0)), Reserves::RESTED);
            assert_eq!(t.reserve(Some(40.0)), Reserves::WINDED);
            assert_eq!(t.reserve(Some(0.0)), Reserves::SPENT);
        }
    }

    mod policy_tests {
        use super::*;

        fn policy() -> TablePolicy {
            TablePolicy::new(
                Thresholds::default(),
                vec![
                    Rule::at(DecisionPoint::Waiting)
                        .reserves(Reserves::SPENT)
                        .then(Action::Rest),
                    Rule::at(DecisionPoint::Waiting)
                        .stances(Stances::OPEN)
                        .bands(Bands::STRIKING)
                        .gated()
                        .then(Action::Attack(AttackType::Heavy)),
                ],
            )
        }

        #[test]
        fn first_matching_rule_wins() {
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            let action = policy().decide(&ctx(TargetStance::Open, 1.0, 0.0, true), &mut rng);
            assert_eq!(action, Action::Rest);
        }

        #[test]
        fn gated_rules_wait_for_cadence() {
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            let p = policy();
            assert_eq!(
                p.decide(&ctx(TargetStance::Open, 1.0, 50.0, false), &mut rng),
                Action::Stay
            );
            assert_eq!(
                p.decide(&ctx(TargetStance::Open, 1.0, 50.0, true), &mut rng),
                Action::Attack(AttackType::Heavy)
            );
        }

        #[test]
        fn unmatched_context_stays() {
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            let action = policy().decide(&ctx(TargetStance::Guarding, 1.0, 50.0, true), &mut rng);
            assert_eq!(action, Action::Stay);
        }

        #[test]
        fn json_round_trip() {
            let p = policy();
            let json = serde_json::to_string(&p).unwrap();
            assert_eq!(TablePolicy::from_json(&json).unwrap(), p);
        }

        #[test]
        fn json_with_sparse_rules() {
            let json = r#"{
                "rules": [
                    { "point": "Waiting", "stances": "OPEN | STAGGERED", "gated": true,
                      "table": [ { "action": "Block", "weight": 2 },
                                 { "action": { "Attack": "Basic" }, "weight": 1 } ] }
                ]
            }"#;
            let p = TablePolicy::from_json(json).unwrap();
            assert_eq!(p.rules[0].stances, Stances::OPEN | Stances::STAGGERED);
            assert_eq!(p.rules[0].bands, Bands::all());
            assert_eq!(p.rules[0].table.total(), 3);
            assert_eq!(p.thresholds, Thresholds::default());
        }

        #[test]
        fn extreme_weights_load_without_overflow() {
            let json = r#"{
                "rules": [
                    { "point": "Waiting",
                      "table": [ { "action": "Block", "weight": 4294967295 },
                                 { "action": "Rest", "weight": 1 } ] }
                ]
            }"#;
            let p = TablePolicy::from_json(json).unwrap();
            let table = &p.rules[0].table;
            assert_eq!(table.total(), 1 << 32);
            assert_eq!(table.pick(u64::from(u32::MAX) - 1), Some(Action::Block));
            assert_eq!(table.pick(u64::from(u32::MAX)), Some(Action::Rest));
            assert_eq!(table.pick(1 << 32), None);

            let mut rng = ChaCha8Rng::seed_from_u64(9);
            assert!(table.draw(&mut rng).is_some());
        }

        #[test]
        fn gated_rules_pace_only_when_ready() {
            let p = policy();
            let open = |ready| ctx(TargetStance::Open, 1.0, 50.0, ready);
            assert!(p.paces(&open(true)));
            assert!(!p.paces(&open(false)));
            // The spent rule is ungated and answers first.
            assert!(!p.paces(&ctx(TargetStance::Open, 1.0, 0.0, true)));
        }

        #[test]
        fn empty_tables_are_rejected() {
            let json = r#"{ "rules": [ { "point": "Waiting", "table": [] } ] }"#;
            assert!(matches!(
                TablePolicy::from_json(json),
                Err(ConfigError::EmptyTable)
            ));
        }
    }
}
