//! Fixed-precision token quantities
//!
//! Quantities are written `"<integer>.<fraction> <CODE>"`; the number of
//! fraction digits is the symbol's precision and is preserved exactly when an
//! asset is parsed and rendered again.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::common::{Error, Result};

/// Largest precision a symbol may declare
pub const MAX_PRECISION: u8 = 18;

/// A token ticker, 1 to 7 uppercase letters
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SymbolCode(String);

impl SymbolCode {
    pub fn new(s: &str) -> Result<Self> {
        if s.is_empty() || s.len() > 7 {
            return Err(Error::invalid_symbol(s, "symbol code must be 1 to 7 characters"));
        }
        if !s.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(Error::invalid_symbol(s, "symbol code must be uppercase A-Z"));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SymbolCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for SymbolCode {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(&s)
    }
}

impl From<SymbolCode> for String {
    fn from(code: SymbolCode) -> Self {
        code.0
    }
}

impl fmt::Display for SymbolCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A ticker plus its decimal precision, written `"<precision>,<CODE>"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol {
    pub precision: u8,
    pub code: SymbolCode,
}

impl Symbol {
    pub fn new(precision: u8, code: SymbolCode) -> Result<Self> {
        if precision > MAX_PRECISION {
            return Err(Error::invalid_symbol(
                &format!("{},{}", precision, code),
                "precision exceeds 18",
            ));
        }
        Ok(Self { precision, code })
    }
}

impl FromStr for Symbol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (precision, code) = s
            .split_once(',')
            .ok_or_else(|| Error::invalid_symbol(s, "expected '<precision>,<CODE>'"))?;
        let precision: u8 = precision
            .trim()
            .parse()
            .map_err(|_| Error::invalid_symbol(s, "precision is not a number"))?;
        Self::new(precision, SymbolCode::new(code.trim())?)
    }
}

impl TryFrom<String> for Symbol {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.to_string()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.precision, self.code)
    }
}

/// A signed fixed-point quantity of a symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Asset {
    /// Amount in the smallest unit (`value * 10^precision`)
    pub amount: i64,
    pub symbol: Symbol,
}

impl Asset {
    pub fn new(amount: i64, symbol: Symbol) -> Self {
        Self { amount, symbol }
    }

    /// Zero of the given symbol
    pub fn zero(symbol: Symbol) -> Self {
        Self { amount: 0, symbol }
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// Add two assets of the same symbol, `None` on symbol mismatch or overflow
    pub fn checked_add(&self, other: &Asset) -> Option<Asset> {
        if self.symbol != other.symbol {
            return None;
        }
        let amount = self.amount.checked_add(other.amount)?;
        Some(Asset::new(amount, self.symbol.clone()))
    }

    /// Subtract an asset of the same symbol, `None` on symbol mismatch or overflow
    pub fn checked_sub(&self, other: &Asset) -> Option<Asset> {
        if self.symbol != other.symbol {
            return None;
        }
        let amount = self.amount.checked_sub(other.amount)?;
        Some(Asset::new(amount, self.symbol.clone()))
    }
}

impl FromStr for Asset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (number, code) = s
            .trim()
            .split_once(' ')
            .ok_or_else(|| Error::invalid_asset(s, "expected '<amount> <SYMBOL>'"))?;
        let code = SymbolCode::new(code.trim())
            .map_err(|_| Error::invalid_asset(s, "invalid symbol code"))?;

        let (negative, digits) = match number.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, number),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty() || !int_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::invalid_asset(s, "integer part is not a number"));
        }
        if digits.contains('.') && frac_part.is_empty() {
            return Err(Error::invalid_asset(s, "missing fraction digits after '.'"));
        }
        if !frac_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::invalid_asset(s, "fraction part is not a number"));
        }
        if frac_part.len() > MAX_PRECISION as usize {
            return Err(Error::invalid_asset(s, "precision exceeds 18"));
        }

        let precision = frac_part.len() as u8;
        let overflow = || Error::invalid_asset(s, "amount overflows a 64-bit integer");
        let scale = 10i64.checked_pow(precision as u32).ok_or_else(overflow)?;
        let int_value: i64 = int_part.parse().map_err(|_| overflow())?;
        let frac_value: i64 = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse().map_err(|_| overflow())?
        };
        let magnitude = int_value
            .checked_mul(scale)
            .and_then(|v| v.checked_add(frac_value))
            .ok_or_else(overflow)?;

        let amount = if negative { -magnitude } else { magnitude };
        Ok(Self::new(amount, Symbol::new(precision, code)?))
    }
}

impl TryFrom<String> for Asset {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Asset> for String {
    fn from(asset: Asset) -> Self {
        asset.to_string()
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let magnitude = self.amount.unsigned_abs();
        let precision = self.symbol.precision as u32;
        if precision == 0 {
            return write!(f, "{}{} {}", sign, magnitude, self.symbol.code);
        }
        let scale = 10u64.pow(precision);
        write!(
            f,
            "{}{}.{:0width$} {}",
            sign,
            magnitude / scale,
            magnitude % scale,
            self.symbol.code,
            width = precision as usize
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_precision() {
        let asset: Asset = "1000000000.0000 ENTU".parse().unwrap();
        assert_eq!(asset.amount, 10_000_000_000_000);
        assert_eq!(asset.symbol.precision, 4);
        assert_eq!(asset.symbol.code.as_str(), "ENTU");
        assert_eq!(asset.to_string(), "1000000000.0000 ENTU");

        let musdt: Asset = "6.000000 MUSDT".parse().unwrap();
        assert_eq!(musdt.symbol.to_string(), "6,MUSDT");
        assert_eq!(musdt.to_string(), "6.000000 MUSDT");
    }

    #[test]
    fn test_precision_is_part_of_identity() {
        let a: Asset = "1.0000 ENTU".parse().unwrap();
        let b: Asset = "1.00 ENTU".parse().unwrap();
        assert_ne!(a.symbol, b.symbol);
        assert!(a.checked_add(&b).is_none());
    }

    #[test]
    fn test_zero_precision_and_negative() {
        let a: Asset = "42 NFT".parse().unwrap();
        assert_eq!(a.symbol.precision, 0);
        assert_eq!(a.to_string(), "42 NFT");

        let b: Asset = "-0.5000 ENTU".parse().unwrap();
        assert_eq!(b.amount, -5000);
        assert_eq!(b.to_string(), "-0.5000 ENTU");
    }

    #[test]
    fn test_rejects_malformed_quantities() {
        for input in ["", "1.0000", "abc ENTU", "1. ENTU", "1.0000 entu", "1.00x0 ENTU"] {
            assert!(input.parse::<Asset>().is_err(), "{:?} should fail", input);
        }
        assert!("99999999999999999999.0000 ENTU".parse::<Asset>().is_err());
    }

    #[test]
    fn test_checked_arithmetic() {
        let a: Asset = "10.000000 MUSDT".parse().unwrap();
        let b: Asset = "4.500000 MUSDT".parse().unwrap();
        assert_eq!(a.checked_sub(&b).unwrap().to_string(), "5.500000 MUSDT");
        assert_eq!(a.checked_add(&b).unwrap().to_string(), "14.500000 MUSDT");
    }

    #[test]
    fn test_symbol_round_trip_through_serde() {
        let symbol: Symbol = serde_json::from_str("\"6,MUSDT\"").unwrap();
        assert_eq!(symbol.precision, 6);
        assert_eq!(serde_json::to_string(&symbol).unwrap(), "\"6,MUSDT\"");
        assert!("19,BIG".parse::<Symbol>().is_err());
        assert!("MUSDT".parse::<Symbol>().is_err());
    }
}
