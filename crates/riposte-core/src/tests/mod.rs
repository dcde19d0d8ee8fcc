//! Crate-level tests.
//!
//! - `determinism.rs`: same seed and inputs give the same fight
//! - `integration.rs`: end-to-end scenarios through an [`Encounter`](crate::Encounter)
//! - `helpers.rs`: fake ports, rigs and factory functions shared with the
//!   unit tests

mod helpers;

pub use helpers::*;
