use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum PercentageError {
    #[error("percentage must be a finite number, got {0}")]
    NotFinite(f64),

    #[error("percentage must be within 0..=100, got {0}")]
    OutOfRange(f64),
}

/// A whole-number completion percentage in `0..=100`.
///
/// Serialized as a bare JSON number. Deserialization accepts any finite number in
/// range and rounds it, so ledgers that stored fractional values stay readable. A
/// fractional value never rounds up to 100: only an exact 100 is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "u8")]
pub struct Percentage(u8);

impl Percentage {
    pub const ZERO: Self = Self(0);
    pub const COMPLETE: Self = Self(100);

    /// Creates a percentage from a whole number.
    ///
    /// # Errors
    ///
    /// Returns `PercentageError::OutOfRange` when `value > 100`.
    pub fn new(value: u8) -> Result<Self, PercentageError> {
        if value > 100 {
            return Err(PercentageError::OutOfRange(f64::from(value)));
        }
        Ok(Self(value))
    }

    /// `round(100 * checked / total)`, or `None` for an empty scope.
    ///
    /// `checked` is clamped to `total`.
    #[must_use]
    pub fn from_counts(checked: usize, total: usize) -> Option<Self> {
        if total == 0 {
            return None;
        }
        let checked = checked.min(total);
        // Integer form of round-half-up on 100 * checked / total.
        let scaled = (200 * checked + total) / (2 * total);
        u8::try_from(scaled).ok().map(Self)
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_complete(self) -> bool {
        self.0 == 100
    }
}

impl TryFrom<f64> for Percentage {
    type Error = PercentageError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(PercentageError::NotFinite(value));
        }
        if !(0.0..=100.0).contains(&value) {
            return Err(PercentageError::OutOfRange(value));
        }
        let rounded = if value < 100.0 {
            value.round().min(99.0)
        } else {
            value
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(Self(rounded as u8))
    }
}

impl From<Percentage> for u8 {
    fn from(value: Percentage) -> Self {
        value.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
