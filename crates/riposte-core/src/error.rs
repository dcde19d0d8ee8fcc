//! Error types for configuration loading.
//!
//! The simulation itself never fails: resources clamp, hits on immune states
//! are no-ops and missing targets degrade to idle behavior. Only building an
//! [`ArchetypeProfile`](crate::profile::ArchetypeProfile) or a
//! [`TablePolicy`](crate::policy::TablePolicy) from external data can be
//! rejected.

use thiserror::Error;

/// Errors raised while loading or validating combat configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A duration was zero, negative or not finite.
    #[error("timing `{name}` must be a finite, positive number of seconds (got {value})")]
    InvalidTiming {
        /// Field name.
        name: &'static str,
        /// Rejected value.
        value: f32,
    },

    /// A cost, damage value, distance or multiplier was out of range.
    #[error("`{name}` is out of range (got {value})")]
    InvalidValue {
        /// Field name.
        name: &'static str,
        /// Rejected value.
        value: f32,
    },

    /// A cone angle was outside `(0, 360]` degrees.
    #[error("angle `{name}` must be within (0, 360] degrees (got {value})")]
    InvalidAngle {
        /// Field name.
        name: &'static str,
        /// Rejected value.
        value: f32,
    },

    /// An archetype name was not recognised.
    #[error("unknown archetype `{0}`")]
    UnknownArchetype(String),

    /// A weighted table had no outcome with a non-zero weight.
    #[error("weighted table has no outcome with a non-zero weight")]
    EmptyTable,

    /// The JSON document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
