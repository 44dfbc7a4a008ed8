// ============================================================================
// Quantity
// Validated unit counts for line items and stock movements
// ============================================================================

use super::errors::{NumericError, NumericResult};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A count of physical units.
///
/// Always at least one: a line item for zero units and a reservation of zero
/// units are both meaningless, so they are unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Quantity(u32);

impl Quantity {
    /// One unit
    pub const ONE: Self = Self(1);

    /// Create a quantity from a unit count.
    ///
    /// # Errors
    /// Returns `InvalidQuantity` for zero.
    #[inline]
    pub fn new(units: u32) -> NumericResult<Self> {
        if units == 0 {
            Err(NumericError::InvalidQuantity)
        } else {
            Ok(Self(units))
        }
    }

    /// Get the unit count.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Checked addition of two quantities.
    #[inline]
    pub fn checked_add(self, rhs: Self) -> NumericResult<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(NumericError::InvalidQuantity)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = NumericError;

    /// Convert from a signed count, rejecting zero and negative values.
    fn try_from(value: i64) -> NumericResult<Self> {
        let units = u32::try_from(value).map_err(|_| NumericError::InvalidQuantity)?;
        Self::new(units)
    }
}

impl TryFrom<i32> for Quantity {
    type Error = NumericError;

    fn try_from(value: i32) -> NumericResult<Self> {
        Self::try_from(i64::from(value))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero() {
        assert_eq!(Quantity::new(0), Err(NumericError::InvalidQuantity));
        assert_eq!(Quantity::new(1), Ok(Quantity::ONE));
    }

    #[test]
    fn test_rejects_negative_conversions() {
        assert_eq!(Quantity::try_from(-3i64), Err(NumericError::InvalidQuantity));
        assert_eq!(Quantity::try_from(0i32), Err(NumericError::InvalidQuantity));
        assert_eq!(Quantity::try_from(5i32).unwrap().get(), 5);
    }

    #[test]
    fn test_checked_add() {
        let a = Quantity::new(3).unwrap();
        let b = Quantity::new(5).unwrap();
        assert_eq!(a.checked_add(b).unwrap().get(), 8);

        let max = Quantity::new(u32::MAX).unwrap();
        assert_eq!(max.checked_add(Quantity::ONE), Err(NumericError::InvalidQuantity));
    }

    #[test]
    fn test_ordering() {
        assert!(Quantity::new(2).unwrap() < Quantity::new(3).unwrap());
        assert_eq!(Quantity::new(4).unwrap().to_string(), "4");
    }
}
