use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Minor-unit exponents for ISO currencies that do not use two decimals.
static ISO_EXPONENTS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    HashMap::from([
        ("BIF", 0),
        ("CLP", 0),
        ("ISK", 0),
        ("JPY", 0),
        ("KRW", 0),
        ("PYG", 0),
        ("UGX", 0),
        ("VND", 0),
        ("XAF", 0),
        ("XOF", 0),
        ("BHD", 3),
        ("IQD", 3),
        ("JOD", 3),
        ("KWD", 3),
        ("LYD", 3),
        ("OMR", 3),
        ("TND", 3),
    ])
});

const DEFAULT_EXPONENT: u32 = 2;

/// Largest scale a decimal amount can carry.
pub const MAX_EXPONENT: u32 = 28;

/// Opaque currency tag. Amounts in different currencies are never combined.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    /// Build a currency tag, normalizing the code to upper case.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    pub fn usd() -> Self {
        Self::new("USD")
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::usd()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Currency {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Resolves the smallest representable unit of each currency.
///
/// Built-in ISO exponents can be overridden per code, which is how
/// deployments describe in-house or otherwise unknown tags.
#[derive(Clone, Debug, Default)]
pub struct CurrencyUnits {
    overrides: HashMap<Currency, u32>,
}

impl CurrencyUnits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the minor-unit exponent for a currency.
    /// Exponents above [`MAX_EXPONENT`] are clamped to it.
    pub fn with_exponent(mut self, currency: Currency, exponent: u32) -> Self {
        self.overrides.insert(currency, exponent.min(MAX_EXPONENT));
        self
    }

    pub fn from_overrides<I, S>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: AsRef<str>,
    {
        Self {
            overrides: overrides
                .into_iter()
                .map(|(code, exponent)| (Currency::new(code), exponent.min(MAX_EXPONENT)))
                .collect(),
        }
    }

    pub fn exponent(&self, currency: &Currency) -> u32 {
        if let Some(exponent) = self.overrides.get(currency) {
            return *exponent;
        }
        ISO_EXPONENTS
            .get(currency.code())
            .copied()
            .unwrap_or(DEFAULT_EXPONENT)
    }

    /// Smallest amount expressible in the currency, e.g. `0.01` for USD.
    pub fn minor_unit(&self, currency: &Currency) -> Decimal {
        Decimal::new(1, self.exponent(currency))
    }
}
