//! Per-archetype tuning for the shared combat state machine.
//!
//! Every combatant runs the same state machine; an [`ArchetypeProfile`]
//! supplies the numbers (timings, stamina costs, damage, reach, sight) and
//! switches optional behavior on or off (running attacks, combos, chaining a
//! dodge into an attack, animation-driven recovery).
//!
//! Profiles are plain serde data. [`ArchetypeProfile::from_json`] parses and
//! validates a profile in one step.
//!
//! # Example
//!
//! ```
//! use riposte_core::profile::{Archetype, ArchetypeProfile, BlockStyle};
//!
//! let enemy = ArchetypeProfile::for_archetype(Archetype::Enemy);
//! assert_eq!(enemy.block_style, BlockStyle::Stance);
//! assert!(enemy.running_attack);
//! assert!(enemy.validate().is_ok());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::hit::AttackType;

// =============================================================================
// Archetype
// =============================================================================

/// Combatant archetype. Selects the default profile and, for AI-controlled
/// combatants, the decision policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Archetype {
    /// Player knight with stamina and a held guard.
    Knight,
    /// Player hero whose recoveries follow the animation clock.
    Hero,
    /// Basic enemy with a blocking stance and running attacks.
    Enemy,
    /// Enemy that mirrors its target, chains combos and dodge attacks.
    MirrorKnight,
    /// Older enemy controller: guard flag only, charges while free.
    Legacy,
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Knight => write!(f, "Knight"),
            Self::Hero => write!(f, "Hero"),
            Self::Enemy => write!(f, "Enemy"),
            Self::MirrorKnight => write!(f, "MirrorKnight"),
            Self::Legacy => write!(f, "Legacy"),
        }
    }
}

impl FromStr for Archetype {
    type Err = ConfigError;

    /// Parses a name case-insensitively, ignoring `-` and `_`.
    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "knight" => Ok(Self::Knight),
            "hero" => Ok(Self::Hero),
            "enemy" => Ok(Self::Enemy),
            "mirrorknight" => Ok(Self::MirrorKnight),
            "legacy" => Ok(Self::Legacy),
            _ => Err(ConfigError::UnknownArchetype(s.to_string())),
        }
    }
}

/// How an archetype blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockStyle {
    /// Blocking is a dedicated `Blocking` state.
    Stance,
    /// Blocking is a guard flag held while `Free`.
    Guard,
    /// Cannot block.
    Unavailable,
}

/// What ends the Flinching and Dodging states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitRule {
    /// Fixed durations from [`Timings`].
    Timed,
    /// The presentation layer reports the animation finished.
    AnimationFinished,
}

// =============================================================================
// Tables
// =============================================================================

/// State durations in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Time from entering Attacking to a Basic attack registering.
    pub basic_windup: f32,
    /// Time from entering Attacking to a Heavy attack registering.
    pub heavy_windup: f32,
    /// Extra time spent in Attacking after registration.
    pub attack_recovery: f32,
    /// Early part of a Basic attack during which an AI may still turn.
    pub basic_turn_window: f32,
    /// Early part of a Heavy attack during which an AI may still turn.
    pub heavy_turn_window: f32,
    /// Early part of a dodge that carries the impulse.
    pub dodge_impulse_window: f32,
    /// Total dodge length under [`ExitRule::Timed`].
    pub dodge_duration: f32,
    /// Early part of a dodge that ignores damage.
    pub invincible_window: f32,
    /// Flinch length under [`ExitRule::Timed`].
    pub flinch: f32,
    /// Extra flinch time before control returns.
    pub flinch_tail: f32,
    /// Length of the stall after a successful block.
    pub blocked_stall: f32,
    /// Continuous rest needed before stamina regenerates.
    pub rest_threshold: f32,
    /// Cadence of gated AI decisions.
    pub decision_interval: f32,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            basic_windup: 0.6,
            heavy_windup: 0.85,
            attack_recovery: 0.0,
            basic_turn_window: 0.3,
            heavy_turn_window: 0.5,
            dodge_impulse_window: 0.5,
            dodge_duration: 0.5,
            invincible_window: 0.3,
            flinch: 0.8,
            flinch_tail: 0.3,
            blocked_stall: 0.3,
            rest_threshold: 3.0,
            decision_interval: 0.75,
        }
    }
}

impl Timings {
    /// Windup for the given attack type.
    #[must_use]
    pub fn windup(&self, attack_type: AttackType) -> f32 {
        match attack_type {
            AttackType::Basic => self.basic_windup,
            AttackType::Heavy => self.heavy_windup,
        }
    }

    /// Turn window for the given attack type.
    #[must_use]
    pub fn turn_window(&self, attack_type: AttackType) -> f32 {
        match attack_type {
            AttackType::Basic => self.basic_turn_window,
            AttackType::Heavy => self.heavy_turn_window,
        }
    }
}

/// Stamina costs and regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaminaCosts {
    /// Charged on entering Attacking.
    pub attack: f32,
    /// Charged on entering Dodging.
    pub dodge: f32,
    /// Charged for every blocked hit.
    pub block: f32,
    /// Drained per second while sprinting.
    pub sprint_per_second: f32,
    /// Regenerated per second once rested.
    pub regen_per_second: f32,
}

impl Default for StaminaCosts {
    fn default() -> Self {
        Self {
            attack: 15.0,
            dodge: 20.0,
            block: 20.0,
            sprint_per_second: 30.0,
            regen_per_second: 30.0,
        }
    }
}

/// Damage dealt per attack type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageTable {
    /// Basic attack damage.
    pub basic: f32,
    /// Heavy attack damage.
    pub heavy: f32,
}

impl Default for DamageTable {
    fn default() -> Self {
        Self {
            basic: 25.0,
            heavy: 40.0,
        }
    }
}

impl DamageTable {
    /// Damage for the given attack type.
    #[must_use]
    pub fn for_attack(&self, attack_type: AttackType) -> f32 {
        match attack_type {
            AttackType::Basic => self.basic,
            AttackType::Heavy => self.heavy,
        }
    }
}

/// Distances in world units and full cone angles in degrees.
///
/// Cones are compared at half their width: a 90 degree block cone accepts
/// attacks up to 45 degrees off the facing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reach {
    /// Maximum distance at which an attack connects.
    pub attack_range: f32,
    /// Cone in front of the attacker in which an attack connects.
    pub attack_angle: f32,
    /// Cone in front of the defender in which a block succeeds.
    pub block_angle: f32,
    /// Distance at which an advancing AI stops walking.
    pub engage_distance: f32,
}

impl Default for Reach {
    fn default() -> Self {
        Self {
            attack_range: 3.0,
            attack_angle: 90.0,
            block_angle: 120.0,
            engage_distance: 2.0,
        }
    }
}

/// Perception limits used to wake a dormant AI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sight {
    /// Maximum sighting distance.
    pub radius: f32,
    /// Full field-of-view cone in degrees.
    pub field_of_view: f32,
}

impl Default for Sight {
    fn default() -> Self {
        Self {
            radius: 10.0,
            field_of_view: 120.0,
        }
    }
}

// =============================================================================
// Profile
// =============================================================================

/// Complete tuning for one archetype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeProfile {
    /// Archetype this profile tunes.
    pub archetype: Archetype,
    /// Starting and maximum health.
    #[serde(default = "default_pool")]
    pub max_health: f32,
    /// Starting and maximum stamina; `None` means unlimited.
    #[serde(default)]
    pub max_stamina: Option<f32>,
    /// State durations.
    #[serde(default)]
    pub timings: Timings,
    /// Stamina economy.
    #[serde(default)]
    pub costs: StaminaCosts,
    /// Damage per attack type.
    #[serde(default)]
    pub damage: DamageTable,
    /// Attack and block geometry.
    #[serde(default)]
    pub reach: Reach,
    /// AI wake-up limits.
    #[serde(default)]
    pub sight: Sight,
    /// How this archetype blocks.
    #[serde(default = "default_block_style")]
    pub block_style: BlockStyle,
    /// Speed multiplier while sprinting.
    #[serde(default = "default_sprint")]
    pub sprint_multiplier: f32,
    /// Speed multiplier during the dodge impulse.
    #[serde(default = "default_dodge_impulse")]
    pub dodge_impulse: f32,
    /// Whether the RunningAttack state is available.
    #[serde(default)]
    pub running_attack: bool,
    /// Whether an attack can be queued during an attack.
    #[serde(default)]
    pub combo: bool,
    /// Whether an attack pressed mid-dodge fires when the dodge ends.
    #[serde(default)]
    pub dodge_into_attack: bool,
    /// What ends Flinching and Dodging.
    #[serde(default = "default_exit_rule")]
    pub recovery_exit: ExitRule,
}

fn default_pool() -> f32 {
    100.0
}

fn default_block_style() -> BlockStyle {
    BlockStyle::Guard
}

fn default_sprint() -> f32 {
    2.5
}

fn default_dodge_impulse() -> f32 {
    4.0
}

fn default_exit_rule() -> ExitRule {
    ExitRule::Timed
}

impl ArchetypeProfile {
    /// Player knight: stamina economy, held guard, sprint ×2.5.
    #[must_use]
    pub fn knight() -> Self {
        Self {
            archetype: Archetype::Knight,
            max_health: 100.0,
            max_stamina: Some(100.0),
            timings: Timings::default(),
            costs: StaminaCosts::default(),
            damage: DamageTable::default(),
            reach: Reach::default(),
            sight: Sight::default(),
            block_style: BlockStyle::Guard,
            sprint_multiplier: 2.5,
            dodge_impulse: 4.0,
            running_attack: false,
            combo: false,
            dodge_into_attack: false,
            recovery_exit: ExitRule::Timed,
        }
    }

    /// Player hero: no stamina pool, sprint ×3, animation-driven recovery.
    #[must_use]
    pub fn hero() -> Self {
        Self {
            archetype: Archetype::Hero,
            max_stamina: None,
            sprint_multiplier: 3.0,
            recovery_exit: ExitRule::AnimationFinished,
            ..Self::knight()
        }
    }

    /// Basic enemy: blocking stance, running attacks, 200 health.
    #[must_use]
    pub fn enemy() -> Self {
        Self {
            archetype: Archetype::Enemy,
            max_health: 200.0,
            block_style: BlockStyle::Stance,
            running_attack: true,
            ..Self::knight()
        }
    }

    /// Mirror knight: quick basics with a recovery tail, combos, dodge
    /// attacks and all-round sight.
    #[must_use]
    pub fn mirror_knight() -> Self {
        Self {
            archetype: Archetype::MirrorKnight,
            max_health: 200.0,
            timings: Timings {
                basic_windup: 0.5,
                attack_recovery: 0.3,
                dodge_impulse_window: 0.4,
                dodge_duration: 0.55,
                ..Timings::default()
            },
            reach: Reach {
                attack_range: 6.0,
                attack_angle: 60.0,
                block_angle: 90.0,
                engage_distance: 2.0,
            },
            sight: Sight {
                radius: 20.0,
                field_of_view: 360.0,
            },
            block_style: BlockStyle::Stance,
            sprint_multiplier: 2.0,
            combo: true,
            dodge_into_attack: true,
            ..Self::knight()
        }
    }

    /// Legacy enemy: guard flag only, charges while free.
    #[must_use]
    pub fn legacy() -> Self {
        Self {
            archetype: Archetype::Legacy,
            max_health: 200.0,
            ..Self::knight()
        }
    }

    /// Default profile for an archetype.
    #[must_use]
    pub fn for_archetype(archetype: Archetype) -> Self {
        match archetype {
            Archetype::Knight => Self::knight(),
            Archetype::Hero => Self::hero(),
            Archetype::Enemy => Self::enemy(),
            Archetype::MirrorKnight => Self::mirror_knight(),
            Archetype::Legacy => Self::legacy(),
        }
    }

    /// Parses a profile from JSON and validates it.
    ///
    /// Omitted fields take the knight defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and the matching
    /// validation error for out-of-range values.
    pub fn from_json(json: &str) -> Result<Self> {
        let profile: Self = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Checks every value is usable by the state machine.
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<()> {
        let t = &self.timings;
        for (name, value) in [
            ("basic_windup", t.basic_windup),
            ("heavy_windup", t.heavy_windup),
            ("dodge_impulse_window", t.dodge_impulse_window),
            ("dodge_duration", t.dodge_duration),
            ("flinch", t.flinch),
            ("blocked_stall", t.blocked_stall),
            ("decision_interval", t.decision_interval),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidTiming { name, value });
            }
        }
        for (name, value) in [
            ("attack_recovery", t.attack_recovery),
            ("basic_turn_window", t.basic_turn_window),
            ("heavy_turn_window", t.heavy_turn_window),
            ("invincible_window", t.invincible_window),
            ("flinch_tail", t.flinch_tail),
            ("rest_threshold", t.rest_threshold),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidTiming { name, value });
            }
        }

        let c = &self.costs;
        for (name, value) in [
            ("costs.attack", c.attack),
            ("costs.dodge", c.dodge),
            ("costs.block", c.block),
            ("costs.sprint_per_second", c.sprint_per_second),
            ("costs.regen_per_second", c.regen_per_second),
            ("damage.basic", self.damage.basic),
            ("damage.heavy", self.damage.heavy),
            ("reach.engage_distance", self.reach.engage_distance),
            ("dodge_impulse", self.dodge_impulse),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidValue { name, value });
            }
        }

        for (name, value) in [
            ("max_health", self.max_health),
            ("reach.attack_range", self.reach.attack_range),
            ("sight.radius", self.sight.radius),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidValue { name, value });
            }
        }
        if let Some(value) = self.max_stamina {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidValue {
                    name: "max_stamina",
                    value,
                });
            }
        }
        if !(self.sprint_multiplier.is_finite() && self.sprint_multiplier >= 1.0) {
            return Err(ConfigError::InvalidValue {
                name: "sprint_multiplier",
                value: self.sprint_multiplier,
            });
        }

        for (name, value) in [
            ("reach.attack_angle", self.reach.attack_angle),
            ("reach.block_angle", self.reach.block_angle),
            ("sight.field_of_view", self.sight.field_of_view),
        ] {
            if !(value > 0.0 && value <= 360.0) {
                return Err(ConfigError::InvalidAngle { name, value });
            }
        }

        Ok(())
    }
}

impl Default for ArchetypeProfile {
    fn default() -> Self {
        Self::knight()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod preset_tests {
        use super::*;

        #[test]
        fn archetype_names_parse() {
            assert_eq!("knight".parse::<Archetype>().unwrap(), Archetype::Knight);
            assert_eq!("Mirror-Knight".parse::<Archetype>().unwrap(), Archetype::MirrorKnight);
            assert_eq!("mirror_knight".parse::<Archetype>().unwrap(), Archetype::MirrorKnight);
            assert_eq!("LEGACY".parse::<Archetype>().unwrap(), Archetype::Legacy);
            assert!(matches!(
                "dragon".parse::<Archetype>(),
                Err(ConfigError::UnknownArchetype(name)) if name == "dragon"
            ));
        }

        #[test]
        fn all_presets_validate() {
            for archetype in [
                Archetype::Knight,
                Archetype::Hero,
                Archetype::Enemy,
                Archetype::MirrorKnight,
                Archetype::Legacy,
            ] {
                let profile = ArchetypeProfile::for_archetype(archetype);
                assert_eq!(profile.archetype, archetype);
                assert!(profile.validate().is_ok(), "{archetype} preset invalid");
            }
        }

        #[test]
        fn sprint_multipliers_follow_archetype() {
            assert_eq!(ArchetypeProfile::knight().sprint_multiplier, 2.5);
            assert_eq!(ArchetypeProfile::hero().sprint_multiplier, 3.0);
            assert_eq!(ArchetypeProfile::mirror_knight().sprint_multiplier, 2.0);
        }

        #[test]
        fn hero_has_no_stamina_and_waits_on_animations() {
            let hero = ArchetypeProfile::hero();
            assert!(hero.max_stamina.is_none());
            assert_eq!(hero.recovery_exit, ExitRule::AnimationFinished);
        }

        #[test]
        fn mirror_knight_timings() {
            let t = ArchetypeProfile::mirror_knight().timings;
            assert_eq!(t.basic_windup, 0.5);
            assert_eq!(t.attack_recovery, 0.3);
            assert_eq!(t.dodge_impulse_window, 0.4);
            assert_eq!(t.windup(AttackType::Heavy), 0.85);
        }

        #[test]
        fn damage_by_attack_type() {
            let damage = DamageTable::default();
            assert_eq!(damage.for_attack(AttackType::Basic), 25.0);
            assert_eq!(damage.for_attack(AttackType::Heavy), 40.0);
        }
    }

    mod validation_tests {
        use super::*;

        #[test]
        fn rejects_negative_windup() {
            let mut profile = ArchetypeProfile::knight();
            profile.timings.basic_windup = -0.1;
            assert!(matches!(
                profile.validate(),
                Err(ConfigError::InvalidTiming {
                    name: "basic_windup",
                    ..
                })
            ));
        }

        #[test]
        fn rejects_wide_cone() {
            let mut profile = ArchetypeProfile::knight();
            profile.reach.block_angle = 400.0;
            assert!(matches!(
                profile.validate(),
                Err(ConfigError::InvalidAngle { .. })
            ));
        }

        #[test]
        fn rejects_slow_sprint() {
            let mut profile = ArchetypeProfile::knight();
            profile.sprint_multiplier = 0.5;
            assert!(matches!(
                profile.validate(),
                Err(ConfigError::InvalidValue {
                    name: "sprint_multiplier",
                    ..
                })
            ));
        }

        #[test]
        fn rejects_zero_stamina_pool() {
            let mut profile = ArchetypeProfile::knight();
            profile.max_stamina = Some(0.0);
            assert!(profile.validate().is_err());
        }
    }

    mod json_tests {
        use super::*;

        #[test]
        fn round_trips_through_json() {
            let profile = ArchetypeProfile::mirror_knight();
            let json = serde_json::to_string(&profile).unwrap();
            let parsed = ArchetypeProfile::from_json(&json).unwrap();
            assert_eq!(parsed, profile);
        }

        #[test]
        fn omitted_fields_take_defaults() {
            let json = r#"{
                "archetype": "Enemy",
                "max_health": 150.0,
                "timings": { "flinch": 1.0 },
                "block_style": "Stance"
            }"#;
            let profile = ArchetypeProfile::from_json(json).unwrap();
            assert_eq!(profile.max_health, 150.0);
            assert_eq!(profile.timings.flinch, 1.0);
            assert_eq!(profile.timings.basic_windup, 0.6);
            assert_eq!(profile.costs.block, 20.0);
            assert!(profile.max_stamina.is_none());
        }

        #[test]
        fn invalid_json_values_are_rejected() {
            let json = r#"{ "archetype": "Knight", "reach": { "attack_angle": 0.0 } }"#;
            assert!(matches!(
                ArchetypeProfile::from_json(json),
                Err(ConfigError::InvalidAngle { .. })
            ));
        }

        #[test]
        fn malformed_json_is_a_parse_error() {
            assert!(matches!(
                ArchetypeProfile::from_json("{ archetype"),
                Err(ConfigError::Parse(_))
            ));
        }
    }
}
