//! Configuration types for cf-ddns
//!
//! The binary builds a [`DdnsConfig`] from flags and environment variables and
//! hands it to the engine. Validation happens here so that a missing value is
//! reported before any network activity.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cloudflare API base URL
pub const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default period between reconciliation cycles in loop mode
pub const DEFAULT_LOOP_PERIOD: Duration = Duration::from_secs(300);

/// Main cf-ddns configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// URL returning the caller's public IP as plain text
    pub resolver: String,

    /// Target DNS zone identifier
    pub zone_id: String,

    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Record identifiers to manage, in processing order
    pub records: Vec<String>,

    /// Run once or keep reconciling
    #[serde(default)]
    pub mode: RunMode,
}

impl DdnsConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            resolver: String::new(),
            zone_id: String::new(),
            provider: ProviderConfig::default(),
            records: Vec::new(),
            mode: RunMode::default(),
        }
    }

    /// Validate the configuration
    ///
    /// Checks run in a fixed order: resolver, zone, token, records.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.resolver.trim().is_empty() {
            return Err(crate::Error::config("resolver endpoint must be specified"));
        }

        if self.zone_id.trim().is_empty() {
            return Err(crate::Error::config("zone id must be specified"));
        }

        self.provider.validate()?;

        if self.records.iter().all(|r| r.trim().is_empty()) {
            return Err(crate::Error::config("at least one record must be specified"));
        }

        if let RunMode::Loop { period } = self.mode
            && period.is_zero()
        {
            return Err(crate::Error::config("loop period must be greater than zero"));
        }

        Ok(())
    }

    /// Record identifiers with blank entries dropped, order preserved
    pub fn record_ids(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for DdnsConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// How the engine schedules reconciliation cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunMode {
    /// One cycle, then exit
    #[default]
    Once,

    /// First cycle, then one more every `period` until cancelled
    Loop {
        /// Time between cycles
        #[serde(with = "duration_secs")]
        period: Duration,
    },
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// API base URL
        #[serde(default = "default_api_base")]
        api_base: String,
        /// Log intended updates instead of submitting them
        #[serde(default)]
        dry_run: bool,
    },
}

impl ProviderConfig {
    /// Create a Cloudflare provider configuration against the public API
    pub fn cloudflare(api_token: impl Into<String>) -> Self {
        ProviderConfig::Cloudflare {
            api_token: api_token.into(),
            api_base: default_api_base(),
            dry_run: false,
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare {
                api_token,
                api_base,
                ..
            } => {
                if api_token.trim().is_empty() {
                    return Err(crate::Error::config("api token must be specified"));
                }
                if !api_base.starts_with("https://") && !api_base.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "API base must use HTTP or HTTPS scheme. Got: {}",
                        api_base
                    )));
                }
                Ok(())
            }
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::cloudflare(String::new())
    }
}

// Token stays out of logs.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Cloudflare {
                api_base, dry_run, ..
            } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<REDACTED>")
                .field("api_base", api_base)
                .field("dry_run", dry_run)
                .finish(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3600;
const SECONDS_PER_DAY: u64 = 86400;

/// Parse a Go-style duration string such as `"90s"`, `"5m"` or `"1h30m"`.
///
/// Supported units are `s`, `m`, `h` and `d`. Segments are summed, so
/// `"1h30m"` is 5400 seconds. A bare number without a unit is rejected.
///
/// ```
/// use cf_ddns_core::config::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
/// assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
/// assert!(parse_duration("10").is_err());
/// ```
pub fn parse_duration(duration_str: &str) -> Result<Duration, crate::Error> {
    let input = duration_str.trim();
    if input.is_empty() {
        return Err(crate::Error::config("Duration string cannot be empty"));
    }

    let mut total: u64 = 0;
    let mut rest = input;

    while !rest.is_empty() {
        let split_pos = rest
            .chars()
            .position(|c| !c.is_ascii_digit())
            .ok_or_else(|| {
                crate::Error::config(format!(
                    "Duration '{}' must end with a unit (s, m, h, or d)",
                    input
                ))
            })?;

        let (value_str, tail) = rest.split_at(split_pos);
        let value: u64 = value_str.parse().map_err(|_| {
            crate::Error::config(format!(
                "Duration '{}' must start each segment with a positive integer",
                input
            ))
        })?;

        let unit_len = tail
            .chars()
            .position(|c| c.is_ascii_digit())
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);

        let multiplier = match unit {
            "s" => 1,
            "m" => SECONDS_PER_MINUTE,
            "h" => SECONDS_PER_HOUR,
            "d" => SECONDS_PER_DAY,
            _ => {
                return Err(crate::Error::config(format!(
                    "Unsupported duration unit '{}'. Use 's', 'm', 'h', or 'd'",
                    unit
                )));
            }
        };

        let seconds = value
            .checked_mul(multiplier)
            .and_then(|s| total.checked_add(s))
            .ok_or_else(|| crate::Error::config("Duration value too large (overflow)"))?;
        total = seconds;
        rest = next;
    }

    Ok(Duration::from_secs(total))
}
