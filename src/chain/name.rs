//! Account, permission, and action names
//!
//! Names follow the chain's base-32 alphabet: up to 12 characters from
//! `.12345abcdefghijklmnopqrstuvwxyz`, optionally followed by a 13th
//! character from `.12345abcdefghij`, never ending in a dot.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::common::{Error, Result};

/// Characters encoded in the full 5-bit alphabet
const MAX_LEN: usize = 12;
/// The 13th character only has 4 bits left
const MAX_LEN_EXTENDED: usize = 13;

/// A validated chain name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

impl Name {
    /// Parse and validate a name
    pub fn new(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::invalid_name(s, "name is empty"));
        }
        if s.chars().count() > MAX_LEN_EXTENDED {
            return Err(Error::invalid_name(s, "name is longer than 13 characters"));
        }
        if let Some(c) = s.chars().take(MAX_LEN).find(|c| !is_name_char(*c)) {
            return Err(Error::invalid_name(
                s,
                &format!("character '{}' is not in [.1-5a-z]", c),
            ));
        }
        if let Some(c) = s.chars().nth(MAX_LEN) {
            if !is_last_name_char(c) {
                return Err(Error::invalid_name(
                    s,
                    &format!("13th character '{}' is not in [.1-5a-j]", c),
                ));
            }
        }
        if s.ends_with('.') {
            return Err(Error::invalid_name(s, "name cannot end with '.'"));
        }
        Ok(Self(s.to_string()))
    }

    /// Name from a literal known to be valid, such as `active` or `eosio`
    pub(crate) fn from_static(s: &'static str) -> Self {
        debug_assert!(Self::new(s).is_ok(), "invalid static name {}", s);
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_name_char(c: char) -> bool {
    matches!(c, '.' | '1'..='5' | 'a'..='z')
}

fn is_last_name_char(c: char) -> bool {
    matches!(c, '.' | '1'..='5' | 'a'..='j')
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Name {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(&s)
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.0
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<Name> for Name {
    fn as_ref(&self) -> &Name {
        self
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Alphabet used when encoding counters into names (no dot)
const COUNTER_ALPHABET: &[u8] = b"12345abcdefghijklmnopqrstuvwxyz";

/// Build a name from a prefix and a counter
///
/// The counter is written in base 31 over the name alphabet and left-padded so
/// generated names sort in creation order.
pub fn counter_name(prefix: &str, counter: u64) -> Result<Name> {
    let width = MAX_LEN.saturating_sub(prefix.len());
    if width == 0 {
        return Err(Error::invalid_name(prefix, "prefix leaves no room for a counter"));
    }

    let base = COUNTER_ALPHABET.len() as u64;
    let mut digits = Vec::with_capacity(width);
    let mut n = counter;
    while n > 0 {
        digits.push(COUNTER_ALPHABET[(n % base) as usize]);
        n /= base;
    }
    if digits.len() > width {
        return Err(Error::invalid_name(prefix, "counter overflowed the name width"));
    }
    digits.resize(width, COUNTER_ALPHABET[0]);
    digits.reverse();

    let suffix = String::from_utf8(digits).map_err(|e| Error::Internal(e.to_string()))?;
    Name::new(&format!("{}{}", prefix, suffix))
}
