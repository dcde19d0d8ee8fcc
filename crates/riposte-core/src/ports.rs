//! Narrow interfaces to the host runtime.
//!
//! The core never performs spatial queries, integrates positions or plays
//! animations. It calls out through three ports instead:
//!
//! - [`PerceptionPort`]: visibility, distance and angle to a target
//! - [`MovementPort`]: the desired planar movement for this tick
//! - [`PresentationPort`]: named animator conditionals and animation
//!   completion queries
//!
//! The conditional names emitted every tick are a wire format shared with
//! existing presentation layers and must not change.

use std::fmt;

use bitflags::bitflags;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::combatant::CombatantId;

// =============================================================================
// Perception
// =============================================================================

/// Spatial and visibility queries answered by the host.
///
/// `None` means the spatial layer does not know the target; the core then
/// treats it as absent.
pub trait PerceptionPort {
    /// Whether `observer` has an unobstructed line of sight to `target`.
    fn can_see(&self, observer: CombatantId, target: CombatantId) -> bool;

    /// Straight-line planar distance from `observer` to `target`.
    fn distance_to(&self, observer: CombatantId, target: CombatantId) -> Option<f32>;

    /// Signed angle in degrees from the observer's facing to the direction
    /// of `target`. Counter-clockwise is positive; the magnitude is at most
    /// 180.
    fn angle_to(&self, observer: CombatantId, target: CombatantId) -> Option<f32>;
}

// =============================================================================
// Movement
// =============================================================================

/// Receives one movement request per combatant per tick.
pub trait MovementPort {
    /// `planar` is in the combatant's local frame (`x` strafe, `y` forward)
    /// with each axis in `[-1, 1]`, so a diagonal may be longer than 1.
    /// `speed_scale` multiplies the
    /// host's base speed (sprint or dodge impulse).
    fn apply_movement(&mut self, combatant: CombatantId, planar: Vec2, speed_scale: f32);
}

// =============================================================================
// Presentation
// =============================================================================

/// Value of a named animator conditional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Conditional {
    /// Boolean flag.
    Bool(bool),
    /// Scalar parameter.
    Float(f32),
}

/// Opaque identifier for an animation state the core may wait on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum StateTag {
    /// Basic attack swing.
    BasicAttack = 0,
    /// Heavy attack swing.
    HeavyAttack = 1,
    /// Dodge roll.
    Dodge = 2,
    /// Flinch reaction.
    Flinch = 3,
    /// Death animation.
    Dying = 4,
}

impl fmt::Display for StateTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BasicAttack => write!(f, "BasicAttack"),
            Self::HeavyAttack => write!(f, "HeavyAttack"),
            Self::Dodge => write!(f, "Dodge"),
            Self::Flinch => write!(f, "Flinch"),
            Self::Dying => write!(f, "Dying"),
        }
    }
}

/// Animator surface of the host.
pub trait PresentationPort {
    /// Sets a named conditional for `combatant`.
    fn set_conditional(&mut self, combatant: CombatantId, name: &'static str, value: Conditional);

    /// Whether the animation for `tag` has finished playing for `combatant`.
    fn is_animation_finished(&self, combatant: CombatantId, tag: StateTag) -> bool;
}

bitflags! {
    /// Boolean conditionals emitted to the presentation layer each tick.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PresentationFlags: u16 {
        const IDLE            = 1 << 0;
        const MOVING_FORWARD  = 1 << 1;
        const ATTACKING       = 1 << 2;
        const DODGING         = 1 << 3;
        const SPRINTING       = 1 << 4;
        const FLINCHING       = 1 << 5;
        const BLOCKING        = 1 << 6;
        const DEAD            = 1 << 7;
        const DYING           = 1 << 8;
        const BLOCKED_ATTACK  = 1 << 9;
        const CONTINUE_ATTACK = 1 << 10;
    }
}

impl PresentationFlags {
    /// Conditional name for each flag, in emission order.
    pub const NAMES: [(PresentationFlags, &'static str); 11] = [
        (Self::IDLE, "isIdle"),
        (Self::MOVING_FORWARD, "movingForward"),
        (Self::ATTACKING, "isAttacking"),
        (Self::DODGING, "isDodging"),
        (Self::SPRINTING, "isSprinting"),
        (Self::FLINCHING, "isFlinching"),
        (Self::BLOCKING, "isBlocking"),
        (Self::DEAD, "isDead"),
        (Self::DYING, "isDying"),
        (Self::BLOCKED_ATTACK, "blockedAttack"),
        (Self::CONTINUE_ATTACK, "continueAttack"),
    ];
}

/// Scalar conditional carrying the strafe axis.
pub const X_VELOCITY: &str = "xVelocity";
/// Scalar conditional carrying the forward axis.
pub const Z_VELOCITY: &str = "zVelocity";

/// One tick's presentation state for a combatant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    /// Boolean conditionals.
    pub flags: PresentationFlags,
    /// Strafe axis.
    pub x_velocity: f32,
    /// Forward axis.
    pub z_velocity: f32,
    /// Whether `continueAttack` is part of this archetype's vocabulary.
    pub combo: bool,
}

impl Presentation {
    /// Writes every conditional to `port`.
    pub fn emit(&self, combatant: CombatantId, port: &mut dyn PresentationPort) {
        for (flag, name) in PresentationFlags::NAMES {
            if flag == PresentationFlags::CONTINUE_ATTACK && !self.combo {
                continue;
            }
            port.set_conditional(combatant, name, Conditional::Bool(self.flags.contains(flag)));
        }
        port.set_conditional(combatant, X_VELOCITY, Conditional::Float(self.x_velocity));
        port.set_conditional(combatant, Z_VELOCITY, Conditional::Float(self.z_velocity));
    }
}

// =============================================================================
// Bundle
// =============================================================================

/// The three ports borrowed for one tick.
pub struct Ports<'a> {
    /// Spatial queries.
    pub perception: &'a dyn PerceptionPort,
    /// Movement sink.
    pub movement: &'a mut dyn MovementPort,
    /// Animator surface.
    pub presentation: &'a mut dyn PresentationPort,
}

impl fmt::Debug for Ports<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ports").finish_non_exhaustive()
    }
}
