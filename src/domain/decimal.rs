//! Lossless decimal numeric type backed by rust_decimal.
//!
//! Token amounts arrive as integers in the token's smallest unit; this module
//! owns the conversion into human units and the float boundary used by the
//! statistics code.
//!
//! The `+` and `-` operators saturate at the representable bounds instead of
//! panicking; callers that must notice overflow use the `checked_*` methods.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest scale rust_decimal can represent.
const MAX_SCALE: u32 = 28;

/// Largest mantissa rust_decimal can represent (2^96 - 1).
const MAX_MANTISSA: u128 = 79_228_162_514_264_337_593_543_950_335;

/// Decimal amount or price.
///
/// Serializes to a JSON number (not string).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Decimal {
    /// Largest representable value, `2^96 - 1`.
    pub const MAX: Decimal = Decimal(RustDecimal::MAX);
    pub const MIN: Decimal = Decimal(RustDecimal::MIN);

    pub fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// Parse a Decimal from a string losslessly.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s).map(Decimal)
    }

    /// Convert an integer amount in a token's smallest unit into token units,
    /// i.e. `raw * 10^-decimals`.
    ///
    /// Scales beyond 28 and mantissas beyond 96 bits are brought into range by
    /// truncating the lowest-order digits. Returns `None` only when the whole
    /// part itself does not fit.
    pub fn from_raw_units(raw: u128, decimals: u32) -> Option<Self> {
        let mut raw = raw;
        let mut scale = decimals;
        while scale > MAX_SCALE {
            raw /= 10;
            scale -= 1;
        }
        while raw > MAX_MANTISSA && scale > 0 {
            raw /= 10;
            scale -= 1;
        }
        if raw > MAX_MANTISSA {
            return None;
        }
        RustDecimal::try_from_i128_with_scale(raw as i128, scale)
            .ok()
            .map(Decimal)
    }

    /// Build from a float quote (price feeds publish JSON floats).
    pub fn from_f64(value: f64) -> Option<Self> {
        RustDecimal::from_f64(value).map(Decimal)
    }

    /// Lossy conversion for ratio and moment computations.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }

    /// Format the Decimal as a canonical string (no exponent notation).
    pub fn to_canonical_string(&self) -> String {
        format!("{}", self.0.normalize())
    }

    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    pub fn abs(&self) -> Self {
        Decimal(self.0.abs())
    }

    pub fn checked_add(&self, rhs: Decimal) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Decimal)
    }

    pub fn checked_sub(&self, rhs: Decimal) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Decimal)
    }

    pub fn saturating_add(&self, rhs: Decimal) -> Self {
        Decimal(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_sub(&self, rhs: Decimal) -> Self {
        Decimal(self.0.saturating_sub(rhs.0))
    }

    pub fn checked_mul(&self, rhs: Decimal) -> Option<Self> {
        self.0.checked_mul(rhs.0).map(Decimal)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        self.saturating_add(rhs)
    }
}

impl std::ops::AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Decimal) {
        *self = self.saturating_add(rhs);
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        self.saturating_sub(rhs)
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

impl std::iter::Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Decimal {
        iter.fold(Decimal::zero(), |acc, d| acc + d)
    }
}
