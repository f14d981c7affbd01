//! Token lifetime specifications such as `"60m"`, `"2hours"` or `"120days"`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Lifetime used when the configured specification is rejected.
pub const DEFAULT_EXPIRATION: &str = "60m";

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
/// 365.25 days
const YEAR: u64 = 31_557_600;

/// Recognised unit spellings and their length in seconds.
const UNITS: &[(&str, u64)] = &[
    ("sec", 1),
    ("secs", 1),
    ("second", 1),
    ("seconds", 1),
    ("s", 1),
    ("minute", MINUTE),
    ("minutes", MINUTE),
    ("min", MINUTE),
    ("mins", MINUTE),
    ("m", MINUTE),
    ("hour", HOUR),
    ("hours", HOUR),
    ("hr", HOUR),
    ("hrs", HOUR),
    ("h", HOUR),
    ("day", DAY),
    ("days", DAY),
    ("d", DAY),
    ("week", WEEK),
    ("weeks", WEEK),
    ("w", WEEK),
    ("year", YEAR),
    ("years", YEAR),
    ("yr", YEAR),
    ("yrs", YEAR),
    ("y", YEAR),
];

/// A validated `<integer><unit>` lifetime.
///
/// Keeps the original spelling for display alongside the resolved duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpirationSpec {
    raw: String,
    duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid expiration time: {0:?}")]
pub struct InvalidExpiration(pub String);

impl ExpirationSpec {
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The built-in `60m` lifetime.
    pub fn default_spec() -> Self {
        Self {
            raw: DEFAULT_EXPIRATION.to_string(),
            duration: Duration::from_secs(60 * MINUTE),
        }
    }
}

impl Default for ExpirationSpec {
    fn default() -> Self {
        Self::default_spec()
    }
}

impl fmt::Display for ExpirationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ExpirationSpec {
    type Err = InvalidExpiration;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_expiration_time(s).ok_or_else(|| InvalidExpiration(s.to_string()))
    }
}

/// Validate an expiration specification.
///
/// The input must be a run of ASCII digits followed by one of the unit
/// spellings in [`UNITS`], with nothing else around them. Returns `None` for
/// anything else, including fractional amounts (`"120.1days"`) and amounts
/// whose total overflows.
pub fn validate_expiration_time(time: &str) -> Option<ExpirationSpec> {
    let digits_end = time
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(time.len());
    let (amount, unit) = time.split_at(digits_end);

    let amount: u64 = amount.parse().ok()?;
    let (_, unit_secs) = UNITS.iter().find(|(name, _)| *name == unit)?;
    let secs = amount.checked_mul(*unit_secs)?;

    Some(ExpirationSpec {
        raw: time.to_string(),
        duration: Duration::from_secs(secs),
    })
}
