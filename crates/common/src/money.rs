use serde::{Deserialize, Serialize};

/// Amount of money in whole currency units.
///
/// The storefront prices everything in a currency without minor units, so
/// there is no cents part to track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a money amount.
    pub fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the raw amount.
    pub fn amount(&self) -> i64 {
        self.0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a quantity, clamping at the `i64` range.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money(self.0.saturating_mul(i64::from(quantity)))
    }

    /// Multiplies by a quantity. Returns None on overflow.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(i64::from(quantity)).map(Money)
    }

    /// Subtracts `other`, never going below zero.
    pub fn saturating_sub(&self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0).max(0))
    }

    /// Applies a percentage reduction, truncating toward zero.
    ///
    /// `percent_off(20)` on 9000 yields 7200.
    pub fn percent_off(&self, percent: u8) -> Money {
        let keep = 100 - i64::from(percent.min(100));
        Money(self.0 * keep / 100)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 < 0 {
            write!(f, "-${}", self.0.abs())
        } else {
            write!(f, "${}", self.0)
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl From<i64> for Money {
    fn from(amount: i64) -> Self {
        Self(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_display() {
        assert_eq!(Money::new(5990).to_string(), "$5990");
        assert_eq!(Money::new(-1000).to_string(), "-$1000");
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::new(1000);
        let b = Money::new(500);

        assert_eq!((a + b).amount(), 1500);
        assert_eq!((a - b).amount(), 500);
        assert_eq!(a.multiply(3).amount(), 3000);
    }

    #[test]
    fn test_multiply_overflow() {
        let price = Money::new(i64::MAX / 2);
        assert_eq!(price.checked_multiply(3), None);
        assert_eq!(price.multiply(3).amount(), i64::MAX);
        let most = Money::new(5990).checked_multiply(u32::MAX).unwrap();
        assert_eq!(most.amount(), 5990 * i64::from(u32::MAX));
        assert_eq!((Money::new(i64::MAX) + Money::new(1)).amount(), i64::MAX);
    }

    #[test]
    fn test_saturating_sub_clamps_at_zero() {
        assert_eq!(Money::new(800).saturating_sub(Money::new(1000)), Money::zero());
        assert_eq!(Money::new(10000).saturating_sub(Money::new(1000)).amount(), 9000);
    }

    #[test]
    fn test_percent_off_truncates() {
        assert_eq!(Money::new(9000).percent_off(20).amount(), 7200);
        assert_eq!(Money::new(5999).percent_off(20).amount(), 4799);
        assert_eq!(Money::new(5990).percent_off(0).amount(), 5990);
        assert_eq!(Money::new(5990).percent_off(150).amount(), 0);
    }

    #[test]
    fn test_money_sum() {
        let total: Money = [Money::new(1), Money::new(2), Money::new(3)].into_iter().sum();
        assert_eq!(total.amount(), 6);
    }
}
