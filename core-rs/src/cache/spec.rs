//! Cache policy strings
//!
//! Policies are written the way Guava/Caffeine `CacheBuilderSpec` strings
//! are: comma separated `key=value` pairs.
//!
//! ```text
//! maximumSize=1000,expireAfterWrite=10m
//! expireAfterAccess=30s
//! none
//! ```
//!
//! `none` disables caching for a service entirely.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::LookupError;

/// Sentinel disabling the cache
pub const NO_CACHE: &str = "none";

/// Policy used when a service configures none
pub const DEFAULT_CACHE_SPEC: &str = "maximumSize=1000,expireAfterWrite=24h";

/// Longest expiry moka accepts (1000 years)
pub const MAX_EXPIRY: Duration = Duration::from_secs(1000 * 365 * 24 * 60 * 60);

/// Eviction rules for an enabled cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachePolicy {
    pub maximum_size: Option<u64>,
    pub initial_capacity: Option<usize>,
    pub expire_after_write: Option<Duration>,
    pub expire_after_access: Option<Duration>,
}

/// Parsed cache policy string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheSpec {
    Disabled,
    Enabled(CachePolicy),
}

impl CacheSpec {
    pub fn parse(spec: &str) -> Result<Self, LookupError> {
        spec.parse()
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, CacheSpec::Enabled(_))
    }

    pub fn policy(&self) -> Option<&CachePolicy> {
        match self {
            CacheSpec::Enabled(policy) => Some(policy),
            CacheSpec::Disabled => None,
        }
    }
}

impl Default for CacheSpec {
    fn default() -> Self {
        // DEFAULT_CACHE_SPEC is a constant known to parse
        CacheSpec::Enabled(CachePolicy {
            maximum_size: Some(1000),
            expire_after_write: Some(Duration::from_secs(24 * 60 * 60)),
            ..CachePolicy::default()
        })
    }
}

fn parse_duration(key: &str, value: &str) -> Result<Duration, LookupError> {
    let invalid = || {
        LookupError::Config(format!(
            "{} requires a duration like 30s, 10m, 2h or 1d, got '{}'",
            key, value
        ))
    };

    let unit = value.chars().last().ok_or_else(invalid)?;
    let amount: u64 = value[..value.len() - unit.len_utf8()].parse().map_err(|_| invalid())?;

    let unit_seconds: u64 = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        _ => return Err(invalid()),
    };

    let duration = amount
        .checked_mul(unit_seconds)
        .map(Duration::from_secs)
        .filter(|d| *d <= MAX_EXPIRY)
        .ok_or_else(|| {
            LookupError::Config(format!(
                "{} must not exceed {} days, got '{}'",
                key,
                MAX_EXPIRY.as_secs() / 86_400,
                value
            ))
        })?;
    Ok(duration)
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, LookupError> {
    value
        .parse()
        .map_err(|_| LookupError::Config(format!("{} requires a number, got '{}'", key, value)))
}

impl FromStr for CacheSpec {
    type Err = LookupError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let spec = spec.trim();
        if spec.eq_ignore_ascii_case(NO_CACHE) {
            return Ok(CacheSpec::Disabled);
        }

        let mut policy = CachePolicy::default();

        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, value) = entry
                .split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .ok_or_else(|| LookupError::Config(format!("Cache spec entry '{}' is not key=value", entry)))?;

            let duplicate = || LookupError::Config(format!("Cache spec key '{}' given twice", key));

            match key {
                "maximumSize" => {
                    if policy.maximum_size.replace(parse_number(key, value)?).is_some() {
                        return Err(duplicate());
                    }
                }
                "initialCapacity" => {
                    if policy.initial_capacity.replace(parse_number(key, value)?).is_some() {
                        return Err(duplicate());
                    }
                }
                "expireAfterWrite" => {
                    if policy.expire_after_write.replace(parse_duration(key, value)?).is_some() {
                        return Err(duplicate());
                    }
                }
                "expireAfterAccess" => {
                    if policy.expire_after_access.replace(parse_duration(key, value)?).is_some() {
                        return Err(duplicate());
                    }
                }
                other => {
                    return Err(LookupError::Config(format!("Unknown cache spec key '{}'", other)));
                }
            }
        }

        Ok(CacheSpec::Enabled(policy))
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs > 0 && secs % 86_400 == 0 {
        format!("{}d", secs / 86_400)
    } else if secs > 0 && secs % 3_600 == 0 {
        format!("{}h", secs / 3_600)
    } else if secs > 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

impl fmt::Display for CacheSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let policy = match self {
            CacheSpec::Disabled => return f.write_str(NO_CACHE),
            CacheSpec::Enabled(policy) => policy,
        };

        let mut parts = Vec::new();
        if let Some(size) = policy.maximum_size {
            parts.push(format!("maximumSize={}", size));
        }
        if let Some(capacity) = policy.initial_capacity {
            parts.push(format!("initialCapacity={}", capacity));
        }
        if let Some(d) = policy.expire_after_write {
            parts.push(format!("expireAfterWrite={}", format_duration(d)));
        }
        if let Some(d) = policy.expire_after_access {
            parts.push(format!("expireAfterAccess={}", format_duration(d)));
        }
        f.write_str(&parts.join(","))
    }
}
