//! Numeric constraints enforced at construction time.
//!
//! A [`Constrained<T, C>`] wraps a value that has been checked against the
//! marker constraint `C` and carries no runtime cost afterwards. APIs that
//! accept a constrained value can rely on the invariant without re-checking.
//!
//! Provided markers:
//!
//! - [`NonNegative`]: zero or greater
//! - [`StrictlyPositive`]: greater than zero
//! - [`UnitIntervalLeftOpen`]: `0 < x ≤ 1`, used for damping multipliers
//!   that may pass a flow through unchanged but must never null it entirely

use std::{cmp::Ordering, marker::PhantomData};

use thiserror::Error;

/// A marker type that checks a numeric invariant.
pub trait Constraint<T> {
    /// Checks that `value` satisfies this constraint.
    ///
    /// # Errors
    ///
    /// Returns a [`ConstraintError`] describing the violation.
    fn check(value: &T) -> Result<(), ConstraintError>;
}

/// An error returned when a [`Constraint`] is violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConstraintError {
    #[error("value must not be negative")]
    Negative,
    #[error("value must be greater than zero")]
    NotPositive,
    #[error("value must lie in the half-open interval (0, 1]")]
    OutsideUnitInterval,
    #[error("value is not a number")]
    NotANumber,
}

/// A value known to satisfy the constraint `C`.
///
/// # Example
///
/// ```
/// use plenum_core::constraint::{Constrained, StrictlyPositive};
///
/// let dt = Constrained::<f64, StrictlyPositive>::new(0.02).unwrap();
/// assert_eq!(dt.into_inner(), 0.02);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Constrained<T, C: Constraint<T>> {
    value: T,
    _marker: PhantomData<C>,
}

impl<T, C: Constraint<T>> Constrained<T, C> {
    /// Constructs a new constrained value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not satisfy the constraint.
    pub fn new(value: T) -> Result<Self, ConstraintError> {
        C::check(&value)?;
        Ok(Self {
            value,
            _marker: PhantomData,
        })
    }

    /// Consumes the wrapper and returns the inner value.
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: Copy, C: Constraint<T>> Constrained<T, C> {
    /// Returns a copy of the inner value.
    pub fn get(&self) -> T {
        self.value
    }
}

impl<T, C: Constraint<T>> AsRef<T> for Constrained<T, C> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

/// Marker constraint: zero or greater.
///
/// `T::default()` is taken as zero, which holds for the primitive floats and
/// every `uom` quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NonNegative;

impl<T: PartialOrd + Default> Constraint<T> for NonNegative {
    fn check(value: &T) -> Result<(), ConstraintError> {
        match value.partial_cmp(&T::default()) {
            None => Err(ConstraintError::NotANumber),
            Some(Ordering::Less) => Err(ConstraintError::Negative),
            _ => Ok(()),
        }
    }
}

/// Marker constraint: strictly greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StrictlyPositive;

impl<T: PartialOrd + Default> Constraint<T> for StrictlyPositive {
    fn check(value: &T) -> Result<(), ConstraintError> {
        match value.partial_cmp(&T::default()) {
            None => Err(ConstraintError::NotANumber),
            Some(Ordering::Less | Ordering::Equal) => Err(ConstraintError::NotPositive),
            Some(Ordering::Greater) => Ok(()),
        }
    }
}

/// Marker constraint: the left-open unit interval `0 < x ≤ 1`.
///
/// One is a valid member (a multiplier that changes nothing), zero is not
/// (a multiplier that would extinguish its operand entirely).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct UnitIntervalLeftOpen;

impl UnitIntervalLeftOpen {
    /// Constructs `Constrained<f64, UnitIntervalLeftOpen>` if `0 < value ≤ 1`.
    ///
    /// # Errors
    ///
    /// Fails with [`ConstraintError::OutsideUnitInterval`] for values outside
    /// the interval and [`ConstraintError::NotANumber`] for NaN.
    pub fn new(value: f64) -> Result<Constrained<f64, UnitIntervalLeftOpen>, ConstraintError> {
        Constrained::new(value)
    }

    /// Returns the upper endpoint (one) as a constrained value.
    #[must_use]
    pub fn one() -> Constrained<f64, UnitIntervalLeftOpen> {
        Constrained {
            value: 1.0,
            _marker: PhantomData,
        }
    }
}

impl Constraint<f64> for UnitIntervalLeftOpen {
    fn check(value: &f64) -> Result<(), ConstraintError> {
        if value.is_nan() {
            Err(ConstraintError::NotANumber)
        } else if *value > 0.0 && *value <= 1.0 {
            Ok(())
        } else {
            Err(ConstraintError::OutsideUnitInterval)
        }
    }
}
