//! # Riposte Core
//!
//! Combat state machine and enemy AI core for Riposte.
//!
//! This crate provides a deterministic, tick-driven melee combat simulation:
//! one parameterized state machine shared by every combatant archetype, a hit
//! resolver for blocks, dodges and damage, and table-driven AI policies that
//! steer enemy combatants through the same state machine as the player.
//!
//! ## Architecture
//!
//! - **Combatants**: health/stamina pools, combat state, timers
//! - **Profiles**: per-archetype timings, costs, reach and optional features
//! - **Policies**: weighted decision tables keyed by archetype
//! - **Ports**: perception, movement and presentation collaborators supplied
//!   by the host runtime
//! - **Encounter**: the tick driver that updates combatants in id order and
//!   delivers strikes between them
//!
//! ## Usage
//!
//! ```
//! use riposte_core::{Archetype, ArchetypeProfile, Control, Encounter, Team};
//! use glam::Vec2;
//!
//! let mut encounter = Encounter::new(42);
//! let knight = encounter.spawn(
//!     Team::Player,
//!     Control::Player,
//!     ArchetypeProfile::knight(),
//!     Vec2::ZERO,
//! );
//! let enemy = encounter.spawn(
//!     Team::Enemy,
//!     Control::Ai,
//!     ArchetypeProfile::for_archetype(Archetype::Enemy),
//!     Vec2::new(0.0, 8.0),
//! );
//! encounter.set_target(enemy, Some(knight));
//!
//! assert_eq!(encounter.len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod combatant;
pub mod encounter;
pub mod error;
pub mod hit;
pub mod intent;
pub mod policy;
pub mod ports;
pub mod profile;
pub mod resource;

#[cfg(test)]
mod tests;

pub use combatant::{
    CombatState, Combatant, CombatantId, Control, Strike, TargetSnapshot, Team, TickEnv,
};
pub use encounter::{Encounter, HitReport};
pub use error::{ConfigError, Result};
pub use hit::{AttackEvent, AttackType, HitOutcome, HitResolver};
pub use intent::Intent;
pub use policy::{
    Action, DecisionContext, DecisionPoint, DecisionPolicy, PolicyRegistry, TablePolicy,
};
pub use ports::{
    Conditional, MovementPort, PerceptionPort, Ports, PresentationFlags, PresentationPort,
    StateTag,
};
pub use profile::{Archetype, ArchetypeProfile, BlockStyle, ExitRule};
pub use resource::ResourcePool;
