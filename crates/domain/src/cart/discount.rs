use common::Money;
use serde::{Deserialize, Serialize};

/// Discount rules applied to cart totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountPolicy {
    /// Coupon code, matched case-insensitively.
    pub coupon_code: String,
    /// Flat amount taken off when the coupon is applied.
    pub flat_amount: Money,
    /// Email domains that earn the institutional discount.
    pub institutional_domains: Vec<String>,
    /// Institutional discount, in percent.
    pub institutional_percent: u8,
}

impl DiscountPolicy {
    /// Returns true if `code` is the coupon code.
    pub fn matches_coupon(&self, code: &str) -> bool {
        code.trim().eq_ignore_ascii_case(&self.coupon_code)
    }

    /// Returns true if `email` belongs to an institutional domain.
    pub fn is_institutional(&self, email: &str) -> bool {
        self.institutional_domains
            .iter()
            .any(|domain| email.ends_with(domain.as_str()))
    }
}

impl Default for DiscountPolicy {
    fn default() -> Self {
        Self {
            coupon_code: "SV1000".to_string(),
            flat_amount: Money::new(1000),
            institutional_domains: vec!["@duoc.cl".to_string(), "@profesor.duoc.cl".to_string()],
            institutional_percent: 20,
        }
    }
}

/// Result of entering a coupon code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CouponOutcome {
    /// The coupon is active (entering it again changes nothing).
    Applied,
    /// Unknown code; the cart is unchanged.
    Rejected,
}
