//! Buffable stats.
//!
//! An [`Attribute`] keeps its base value and the list of increases applied to
//! it. The current value is `base * (1 + sum(increases))`, with the sum taken
//! in application order. Revoking an increase removes that exact entry and
//! recomputes from scratch, so apply-then-revoke restores the previous value
//! bit for bit.

use crate::units::{Distance, Speed, Time};

/// Values an [`Attribute`] can scale.
pub trait Scalable: Copy {
    /// Multiply by a plain factor.
    #[must_use]
    fn scale(self, factor: f64) -> Self;
}

impl Scalable for f64 {
    fn scale(self, factor: f64) -> Self {
        self * factor
    }
}

impl Scalable for Distance {
    fn scale(self, factor: f64) -> Self {
        self * factor
    }
}

impl Scalable for Time {
    fn scale(self, factor: f64) -> Self {
        self * factor
    }
}

impl Scalable for Speed {
    fn scale(self, factor: f64) -> Self {
        self * factor
    }
}

/// A stat with a base value and a stack of multiplicative increases.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute<T> {
    base: T,
    increases: Vec<f64>,
    value: T,
}

impl<T: Scalable> Attribute<T> {
    /// Create an unbuffed attribute.
    #[must_use]
    pub fn new(base: T) -> Self {
        Self {
            base,
            increases: Vec::new(),
            value: base,
        }
    }

    /// Current value including increases.
    #[must_use]
    pub fn value(&self) -> T {
        self.value
    }

    /// Value before any increase.
    #[must_use]
    pub fn base(&self) -> T {
        self.base
    }

    /// Sum of active increases.
    #[must_use]
    pub fn increase(&self) -> f64 {
        self.increases.iter().fold(0.0, |acc, x| acc + x)
    }

    /// Add an increase, e.g. `0.2` for +20%.
    pub fn apply(&mut self, increase: f64) {
        self.increases.push(increase);
        self.recompute();
    }

    /// Remove the most recent increase equal to `increase`.
    ///
    /// Returns `false` when no such increase is active.
    pub fn revoke(&mut self, increase: f64) -> bool {
        let bits = increase.to_bits();
        let Some(index) = self.increases.iter().rposition(|x| x.to_bits() == bits) else {
            return false;
        };
        self.increases.remove(index);
        self.recompute();
        true
    }

    fn recompute(&mut self) {
        self.value = self.base.scale(1.0 + self.increase());
    }
}

impl<T: Scalable + Default> Default for Attribute<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UnitExt;

    #[test]
    fn test_unbuffed_value_is_base() {
        let attr = Attribute::new(10.0);
        assert_eq!(attr.value(), 10.0);
        assert_eq!(attr.increase(), 0.0);
    }

    #[test]
    fn test_increases_add_before_multiplying() {
        let mut attr = Attribute::new(10.0);
        attr.apply(0.2);
        attr.apply(0.3);
        assert!((attr.value() - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_revoke_restores_exactly() {
        let mut attr = Attribute::new(35.0.cells());
        attr.apply(0.1);
        let before = attr.value();
        attr.apply(0.37);
        attr.revoke(0.37);
        assert_eq!(attr.value().as_cells().to_bits(), before.as_cells().to_bits());
    }

    #[test]
    fn test_revoke_out_of_order() {
        let mut attr = Attribute::new(3.333);
        attr.apply(0.1);
        attr.apply(0.2);
        attr.apply(0.3);
        assert!(attr.revoke(0.2));
        let mut expected = Attribute::new(3.333);
        expected.apply(0.1);
        expected.apply(0.3);
        assert_eq!(attr.value().to_bits(), expected.value().to_bits());
    }

    #[test]
    fn test_revoke_unknown_is_noop() {
        let mut attr = Attribute::new(1.0);
        attr.apply(0.5);
        assert!(!attr.revoke(0.25));
        assert_eq!(attr.value(), 1.5);
    }
}
