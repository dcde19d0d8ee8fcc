//! Encounter driver.
//!
//! An [`Encounter`] owns a set of combatants and advances them together:
//!
//! 1. **SNAPSHOT**: each combatant reads a copy of its target taken just
//!    before its own update
//! 2. **UPDATE**: combatants update one at a time in id order
//! 3. **DELIVER**: a strike registered during an update is delivered to its
//!    target immediately, so combatants later in the order see the result
//!    this tick
//!
//! # Determinism
//!
//! - Combatants are stored in a `BTreeMap` and always updated in id order
//! - All AI randomness comes from one `ChaCha8Rng` seeded at construction
//!
//! Given the same seed, spawns, intents and port answers, two encounters
//! produce identical hit logs.
//!
//! # Example
//!
//! ```
//! use riposte_core::{ArchetypeProfile, Control, Encounter, Team};
//! use glam::Vec2;
//!
//! let mut encounter = Encounter::new(7);
//! let a = encounter.spawn(Team::Player, Control::Player, ArchetypeProfile::knight(), Vec2::ZERO);
//! let b = encounter.spawn(Team::Enemy, Control::Ai, ArchetypeProfile::enemy(), Vec2::Y * 5.0);
//!
//! encounter.assign_opponents();
//! assert_eq!(encounter.get(a).unwrap().target(), Some(b));
//! assert_eq!(encounter.get(b).unwrap().target(), Some(a));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::combatant::{Combatant, CombatantId, Control, Team, TickEnv};
use crate::hit::{AttackType, HitOutcome};
use crate::intent::Intent;
use crate::policy::{DecisionPolicy, PolicyRegistry};
use crate::ports::Ports;
use crate::profile::ArchetypeProfile;

/// One delivered strike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitReport {
    /// Tick the strike registered on.
    pub tick: u64,
    /// Who swung.
    pub attacker: CombatantId,
    /// Who was hit.
    pub target: CombatantId,
    /// Attack variety.
    pub attack_type: AttackType,
    /// What the hit did.
    pub outcome: HitOutcome,
}

/// A group of combatants fighting in one space.
pub struct Encounter {
    combatants: BTreeMap<CombatantId, Combatant>,
    policies: PolicyRegistry,
    rng: ChaCha8Rng,
    seed: u64,
    tick: u64,
    next_id: u64,
}

impl fmt::Debug for Encounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encounter")
            .field("combatants", &self.combatants.len())
            .field("policies", &self.policies)
            .field("seed", &self.seed)
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

impl Encounter {
    /// Creates an empty encounter with the built-in AI policies.
    ///
    /// # Arguments
    ///
    /// * `seed` - Seed for every AI decision in this encounter
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_policies(seed, PolicyRegistry::with_defaults())
    }

    /// Creates an empty encounter with a custom policy registry.
    #[must_use]
    pub fn with_policies(seed: u64, policies: PolicyRegistry) -> Self {
        Self {
            combatants: BTreeMap::new(),
            policies,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            tick: 0,
            next_id: 1,
        }
    }

    /// Adds a combatant and returns its id. Ids are handed out in
    /// increasing order starting at 1.
    pub fn spawn(
        &mut self,
        team: Team,
        control: Control,
        profile: ArchetypeProfile,
        position: Vec2,
    ) -> CombatantId {
        let id = CombatantId::new(self.next_id);
        self.next_id += 1;
        debug!(combatant = %id, %team, archetype = %profile.archetype, "spawned");
        self.combatants
            .insert(id, Combatant::new(id, team, control, profile, position));
        id
    }

    /// Removes a combatant. Others targeting it see an absent target.
    pub fn despawn(&mut self, id: CombatantId) -> Option<Combatant> {
        self.combatants.remove(&id)
    }

    /// Returns a combatant.
    #[must_use]
    pub fn get(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.get(&id)
    }

    /// Returns a combatant mutably.
    pub fn get_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.combatants.get_mut(&id)
    }

    /// Iterates combatants in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.values()
    }

    /// Number of combatants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    /// Whether the encounter is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    /// Points a combatant at another, or clears its target.
    pub fn set_target(&mut self, id: CombatantId, target: Option<CombatantId>) {
        if let Some(c) = self.combatants.get_mut(&id) {
            c.set_target(target);
        }
    }

    /// Syncs a combatant's position from the spatial layer.
    pub fn set_position(&mut self, id: CombatantId, position: Vec2) {
        if let Some(c) = self.combatants.get_mut(&id) {
            c.set_position(position);
        }
    }

    /// Syncs a combatant's facing from the spatial layer.
    pub fn set_facing(&mut self, id: CombatantId, facing: Vec2) {
        if let Some(c) = self.combatants.get_mut(&id) {
            c.set_facing(facing);
        }
    }

    /// Gives every living combatant without a living target the
    /// lowest-id living member of the opposing team.
    pub fn assign_opponents(&mut self) {
        let living: Vec<(CombatantId, Team)> = self
            .combatants
            .values()
            .filter(|c| !c.is_dead())
            .map(|c| (c.id(), c.team()))
            .collect();
        let is_living = |id: CombatantId| living.iter().any(|(other, _)| *other == id);

        for combatant in self.combatants.values_mut() {
            if combatant.is_dead() || combatant.target().is_some_and(is_living) {
                continue;
            }
            let opponent = combatant.team().opponent();
            let pick = living
                .iter()
                .find(|(_, team)| *team == opponent)
                .map(|(id, _)| *id);
            combatant.set_target(pick);
        }
    }

    /// Returns the policy registry.
    #[must_use]
    pub fn policies(&self) -> &PolicyRegistry {
        &self.policies
    }

    /// Returns the policy registry for customization.
    pub fn policies_mut(&mut self) -> &mut PolicyRegistry {
        &mut self.policies
    }

    /// Returns the seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the number of completed steps.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Whether every combatant of `team` is dead. An absent team counts as
    /// defeated.
    #[must_use]
    pub fn is_defeated(&self, team: Team) -> bool {
        self.combatants
            .values()
            .filter(|c| c.team() == team)
            .all(Combatant::is_dead)
    }

    /// Advances every combatant by `dt` seconds.
    ///
    /// Player-controlled combatants read their entry in `intents`; a missing
    /// entry means no input. Returns the strikes delivered this step.
    pub fn step(
        &mut self,
        dt: f32,
        intents: &BTreeMap<CombatantId, Intent>,
        ports: &mut Ports<'_>,
    ) -> Vec<HitReport> {
        let idle = Intent::idle();
        let ids: Vec<CombatantId> = self.combatants.keys().copied().collect();
        let mut reports = Vec::new();

        for id in ids {
            let target = self
                .combatants
                .get(&id)
                .and_then(Combatant::target)
                .and_then(|t| self.combatants.get(&t))
                .map(Combatant::snapshot);
            let Some(combatant) = self.combatants.get_mut(&id) else {
                continue;
            };
            let policy = match combatant.control() {
                Control::Ai => self
                    .policies
                    .policy_for(combatant.archetype())
                    .map(|p| &**p as &dyn DecisionPolicy),
                Control::Player => None,
            };
            let intent = intents.get(&id).unwrap_or(&idle);

            let mut env = TickEnv {
                target,
                policy,
                ports: &mut *ports,
                rng: &mut self.rng,
            };
            let Some(strike) = combatant.update(dt, intent, &mut env) else {
                continue;
            };

            let Some(victim) = self.combatants.get_mut(&strike.target) else {
                continue;
            };
            let outcome = victim.take_hit(strike.event);
            debug!(
                tick = self.tick,
                attacker = %strike.attacker,
                target = %strike.target,
                ?outcome,
                "strike delivered"
            );
            reports.push(HitReport {
                tick: self.tick,
                attacker: strike.attacker,
                target: strike.target,
                attack_type: strike.event.attack_type,
                outcome,
            });
        }

        trace!(tick = self.tick, hits = reports.len(), "step complete");
        self.tick += 1;
        reports
    }
}
