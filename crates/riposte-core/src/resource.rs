//! Clamped resource pools for health and stamina.
//!
//! A [`ResourcePool`] never reports a value outside `[0, max]` and never has
//! a maximum below 1. Every input is accepted and clamped; there are no error
//! conditions.

use serde::{Deserialize, Serialize};

/// Smallest maximum a pool may have.
pub const MIN_MAX: f32 = 1.0;

/// A current/max value pair with clamped accessors.
///
/// # Example
///
/// ```
/// use riposte_core::ResourcePool;
///
/// let mut health = ResourcePool::new(100.0);
/// health.set(130.0);
/// assert_eq!(health.get(), 100.0);
///
/// health.set_max(50.0);
/// assert_eq!(health.get(), 50.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourcePool {
    current: f32,
    max: f32,
}

impl ResourcePool {
    /// Creates a full pool with the given maximum.
    ///
    /// A maximum below 1 is raised to 1.
    #[must_use]
    pub fn new(max: f32) -> Self {
        let max = sanitize_max(max);
        Self { current: max, max }
    }

    /// Returns the current value.
    #[must_use]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Sets the current value, clamped into `[0, max]`.
    pub fn set(&mut self, value: f32) {
        let value = if value.is_nan() { 0.0 } else { value };
        self.current = value.clamp(0.0, self.max);
    }

    /// Returns the maximum.
    #[must_use]
    pub fn get_max(&self) -> f32 {
        self.max
    }

    /// Sets the maximum, forcing it to at least 1, then re-clamps the
    /// current value.
    pub fn set_max(&mut self, value: f32) {
        self.max = sanitize_max(value);
        self.current = self.current.min(self.max);
    }

    /// Removes `amount` from the pool.
    pub fn spend(&mut self, amount: f32) {
        self.set(self.current - amount);
    }

    /// Adds `amount` to the pool.
    pub fn restore(&mut self, amount: f32) {
        self.set(self.current + amount);
    }

    /// Returns `true` when nothing is left.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.current <= 0.0
    }

    /// Returns the current value as a fraction of the maximum.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        self.current / self.max
    }
}

fn sanitize_max(value: f32) -> f32 {
    if value.is_nan() || value < MIN_MAX {
        MIN_MAX
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_pool_is_full() {
        let pool = ResourcePool::new(100.0);
        assert_eq!(pool.get(), 100.0);
        assert_eq!(pool.get_max(), 100.0);
    }

    #[test]
    fn new_pool_raises_tiny_max() {
        let pool = ResourcePool::new(0.2);
        assert_eq!(pool.get_max(), 1.0);
        assert_eq!(pool.get(), 1.0);
    }

    #[test]
    fn set_max_below_current_clamps_current() {
        let mut health = ResourcePool::new(100.0);
        health.set(80.0);
        health.set_max(50.0);
        assert_eq!(health.get(), 50.0);
        assert_eq!(health.get_max(), 50.0);
    }

    #[test]
    fn set_max_above_current_keeps_current() {
        let mut health = ResourcePool::new(100.0);
        health.set(40.0);
        health.set_max(200.0);
        assert_eq!(health.get(), 40.0);
    }

    #[test]
    fn spend_and_restore_clamp() {
        let mut stamina = ResourcePool::new(100.0);
        stamina.spend(120.0);
        assert!(stamina.is_depleted());
        stamina.restore(30.0);
        assert_eq!(stamina.get(), 30.0);
        stamina.restore(500.0);
        assert_eq!(stamina.get(), 100.0);
    }

    #[test]
    fn nan_is_treated_as_zero() {
        let mut pool = ResourcePool::new(10.0);
        pool.set(f32::NAN);
        assert_eq!(pool.get(), 0.0);
        pool.set_max(f32::NAN);
        assert_eq!(pool.get_max(), 1.0);
    }

    proptest! {
        #[test]
        fn set_then_get_is_clamped(max in 1.0f32..1000.0, value in -2000.0f32..2000.0) {
            let mut pool = ResourcePool::new(max);
            pool.set(value);
            prop_assert_eq!(pool.get(), value.clamp(0.0, max));
        }

        #[test]
        fn set_max_never_drops_below_one(start in 1.0f32..500.0, m in -100.0f32..500.0) {
            let mut pool = ResourcePool::new(start);
            pool.set_max(m);
            let expected = if m < 1.0 { 1.0 } else { m };
            prop_assert_eq!(pool.get_max(), expected);
            prop_assert!(pool.get() <= pool.get_max());
            prop_assert!(pool.get() >= 0.0);
        }
    }
}
