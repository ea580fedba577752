//! Ticker symbol newtype.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Opaque identifier of a tradable instrument (e.g. `AAPL`, `ZOMATO.NS`).
///
/// The only rule enforced locally is "non-empty after trimming"; whether the
/// symbol actually exists is for the provider to decide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TickerSymbol(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ticker symbol must not be empty")]
pub struct EmptyTicker;

impl TickerSymbol {
    pub fn new(raw: &str) -> Result<Self, EmptyTicker> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(EmptyTicker);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TickerSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TickerSymbol {
    type Error = EmptyTicker;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<TickerSymbol> for String {
    fn from(value: TickerSymbol) -> Self {
        value.0
    }
}

impl std::str::FromStr for TickerSymbol {
    type Err = EmptyTicker;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for TickerSymbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
