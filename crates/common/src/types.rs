use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for one shopping session.
///
/// Cart holds in the stock ledger are keyed by session, so two carts for
/// the same product never mix their quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a session ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Product code, also what a barcode scan resolves to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductCode(String);

impl ProductCode {
    /// Creates a product code from a string.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProductCode {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProductCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ProductCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// National identity number (RUN) of an account holder.
///
/// Always held in normalised form: separators (`.` and `-`) stripped and the
/// check digit upper-cased, so `12.345.678-k` and `12345678K` are the same
/// key. Construction never validates; use [`Run::is_valid`] for that.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Run(String);

impl Run {
    /// Creates a normalised identity number from user input.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let cleaned: String = raw
            .as_ref()
            .trim()
            .chars()
            .filter(|c| *c != '.' && *c != '-')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        Self(cleaned)
    }

    /// Returns the normalised identity number.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the body (everything but the check digit).
    pub fn body(&self) -> &str {
        let split = self.0.len().saturating_sub(1);
        self.0.get(..split).unwrap_or_default()
    }

    /// Returns the check digit, if any.
    pub fn check_digit(&self) -> Option<char> {
        self.0.chars().last()
    }

    /// Computes the modulus-11 check digit for a numeric body.
    ///
    /// Digits are weighted 2, 3, 4, 5, 6, 7 (repeating) from the right.
    /// A remainder mapping to 11 yields `0`, one mapping to 10 yields `K`.
    pub fn compute_check_digit(body: u32) -> char {
        let mut sum = 0u32;
        let mut weight = 2u32;
        let mut rest = body;
        while rest > 0 {
            sum += (rest % 10) * weight;
            rest /= 10;
            weight = if weight == 7 { 2 } else { weight + 1 };
        }
        match 11 - (sum % 11) {
            11 => '0',
            10 => 'K',
            digit => char::from_digit(digit, 10).unwrap_or('0'),
        }
    }

    /// Returns true if the identity number is well formed and its check
    /// digit matches the body.
    pub fn is_valid(&self) -> bool {
        if !(8..=9).contains(&self.0.len()) {
            return false;
        }
        if !self.body().chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        let Ok(body) = self.body().parse::<u32>() else {
            return false;
        };
        self.check_digit() == Some(Self::compute_check_digit(body))
    }
}

impl std::fmt::Display for Run {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Run {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Run {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Human-readable order number, `SO<N>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Fixed prefix of every order number.
    pub const PREFIX: &'static str = "SO";

    /// Sequence value of the very first order.
    pub const FIRST_SEQUENCE: u64 = 1001;

    /// Sequence assumed when the previous number cannot be parsed.
    pub const FALLBACK_FLOOR: u64 = 1000;

    /// Wraps an order number read from storage, without checking it.
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// Builds the order number for a sequence value.
    pub fn from_sequence(sequence: u64) -> Self {
        Self(format!("{}{sequence}", Self::PREFIX))
    }

    /// Returns the first order number, `SO1001`.
    pub fn first() -> Self {
        Self::from_sequence(Self::FIRST_SEQUENCE)
    }

    /// Returns the order number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the numeric suffix. Returns None if the prefix is missing or
    /// the remainder is not a number.
    pub fn sequence(&self) -> Option<u64> {
        self.0.strip_prefix(Self::PREFIX)?.parse().ok()
    }

    /// Returns true if the number has the `SO<digits>` shape.
    pub fn is_well_formed(&self) -> bool {
        self.sequence().is_some()
    }

    /// Computes the number that follows `last`.
    ///
    /// With no previous order the sequence starts at `SO1001`. A previous
    /// number whose suffix does not parse is treated as the fallback floor,
    /// so the successor is deterministic rather than an error.
    pub fn next_after(last: Option<&OrderNumber>) -> Self {
        match last {
            None => Self::first(),
            Some(last) => {
                let previous = last.sequence().unwrap_or(Self::FALLBACK_FLOOR);
                Self::from_sequence(previous.saturating_add(1))
            }
        }
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrderNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}
