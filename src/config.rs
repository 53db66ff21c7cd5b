//! Configuration Module
//!
//! Loads the JSON configuration file once at startup and validates it into an
//! immutable [`Config`].

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Default lookup query, one bound parameter returning `(account, email)`.
pub const DEFAULT_QUERY: &str =
    "SELECT display AS `account`, email FROM anope_db_NickCore WHERE display = ? LIMIT 0,1;";

// == Config Error ==
/// Fatal startup errors. The service does not begin serving when one occurs.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config read error: {0}")]
    Read(#[from] std::io::Error),

    #[error("config unmarshal error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config missing salt")]
    MissingSalt,

    #[error("config {field} parse error: {reason}")]
    Duration { field: &'static str, reason: String },

    #[error("config gravatar_url parse error: {0}")]
    BaseUrl(String),
}

// == File Form ==
/// On-disk shape of the configuration file. Absent keys take the defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawConfig {
    dsn: String,
    query: String,
    salt: String,
    gravatar_url: String,
    cache_life: String,
    cache_interval: String,
    lookup_timeout: String,
    listen_addr: String,
    allow_origins: Vec<String>,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            dsn: "mysql://root@127.0.0.1:3306/anope".to_string(),
            query: DEFAULT_QUERY.to_string(),
            salt: String::new(),
            gravatar_url: "//www.gravatar.com/avatar".to_string(),
            cache_life: "6h".to_string(),
            cache_interval: "15m".to_string(),
            lookup_timeout: "5s".to_string(),
            listen_addr: "127.0.0.1:8080".to_string(),
            allow_origins: vec!["*".to_string()],
        }
    }
}

// == Config ==
/// Validated, process-wide configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Lookup connection string
    pub dsn: String,
    /// Lookup query template
    pub query: String,
    /// Salt appended to unknown accounts before hashing
    pub salt: String,
    /// Avatar base URL, tokens are appended as the last path segment
    pub gravatar_url: String,
    /// How long a resolution stays fresh
    pub cache_life: Duration,
    /// How often the reclaimer scans the cache
    pub cache_interval: Duration,
    /// Upper bound on a single lookup query
    pub lookup_timeout: Duration,
    /// Standalone listen address
    pub listen_addr: String,
    /// Allowed origin glob patterns, empty allows every origin
    pub allow_origins: Vec<String>,
}

impl Config {
    /// Reads and validates the configuration file at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Parses and validates a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json)?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> Result<Self, ConfigError> {
        if raw.salt.is_empty() {
            return Err(ConfigError::MissingSalt);
        }

        let cache_life = positive_duration("cache_life", &raw.cache_life)?;
        let cache_interval = positive_duration("cache_interval", &raw.cache_interval)?;
        let lookup_timeout = positive_duration("lookup_timeout", &raw.lookup_timeout)?;
        check_base_url(&raw.gravatar_url)?;

        Ok(Self {
            dsn: raw.dsn,
            query: raw.query,
            salt: raw.salt,
            gravatar_url: raw.gravatar_url,
            cache_life,
            cache_interval,
            lookup_timeout,
            listen_addr: raw.listen_addr,
            allow_origins: raw.allow_origins,
        })
    }

    /// Configuration with defaults and the given salt, used by tests and
    /// embedders that build their config in code.
    pub fn with_salt(salt: impl Into<String>) -> Self {
        let raw = RawConfig {
            salt: salt.into(),
            ..RawConfig::default()
        };
        Self {
            dsn: raw.dsn,
            query: raw.query,
            salt: raw.salt,
            gravatar_url: raw.gravatar_url,
            cache_life: Duration::from_secs(6 * 3600),
            cache_interval: Duration::from_secs(15 * 60),
            lookup_timeout: Duration::from_secs(5),
            listen_addr: raw.listen_addr,
            allow_origins: raw.allow_origins,
        }
    }
}

fn positive_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let parsed = parse_duration(value).map_err(|reason| ConfigError::Duration { field, reason })?;
    if parsed.is_zero() {
        return Err(ConfigError::Duration {
            field,
            reason: format!("duration must be positive: {:?}", value),
        });
    }
    Ok(parsed)
}

// Protocol-relative URLs are valid bases; they are checked as https.
fn check_base_url(base: &str) -> Result<(), ConfigError> {
    let candidate = if base.starts_with("//") {
        format!("https:{}", base)
    } else {
        base.to_string()
    };
    let url = Url::parse(&candidate).map_err(|e| ConfigError::BaseUrl(e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::BaseUrl(format!("not a base url: {:?}", base)));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::BaseUrl(format!(
            "base url must not carry a query or fragment: {:?}",
            base
        )));
    }
    Ok(())
}

// == Duration Parsing ==
/// Parses durations such as `300ms`, `1.5h` or `2h45m`.
///
/// Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A bare `0`
/// is accepted. Negative durations are rejected.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.strip_prefix('+').unwrap_or(input);
    if s.starts_with('-') {
        return Err(format!("negative duration {:?}", input));
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(format!("invalid duration {:?}", input));
    }

    let mut total_nanos: f64 = 0.0;
    let mut rest = s;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..number_end];
        if number.is_empty() || number == "." {
            return Err(format!("invalid duration {:?}", input));
        }
        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid duration {:?}", input))?;
        rest = &rest[number_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        let scale = match unit {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(format!("missing unit in duration {:?}", input)),
            other => return Err(format!("unknown unit {:?} in duration {:?}", other, input)),
        };
        rest = &rest[unit_end..];
        total_nanos += value * scale;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return Err(format!("invalid duration {:?}", input));
    }
    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::from_json(r#"{"salt": "xyz"}"#).unwrap();
        assert_eq!(config.salt, "xyz");
        assert_eq!(config.query, DEFAULT_QUERY);
        assert_eq!(config.gravatar_url, "//www.gravatar.com/avatar");
        assert_eq!(config.cache_life, Duration::from_secs(6 * 3600));
        assert_eq!(config.cache_interval, Duration::from_secs(15 * 60));
        assert_eq!(config.lookup_timeout, Duration::from_secs(5));
        assert_eq!(config.allow_origins, vec!["*".to_string()]);
    }

    #[test]
    fn test_with_salt_matches_file_defaults() {
        let from_json = Config::from_json(r#"{"salt": "xyz"}"#).unwrap();
        let in_code = Config::with_salt("xyz");
        assert_eq!(from_json.cache_life, in_code.cache_life);
        assert_eq!(from_json.cache_interval, in_code.cache_interval);
        assert_eq!(from_json.lookup_timeout, in_code.lookup_timeout);
        assert_eq!(from_json.dsn, in_code.dsn);
    }

    #[test]
    fn test_config_overrides() {
        let config = Config::from_json(
            r#"{
                "salt": "pepper",
                "gravatar_url": "https://grav.example/avatar",
                "cache_life": "90s",
                "cache_interval": "1m30s",
                "allow_origins": []
            }"#,
        )
        .unwrap();
        assert_eq!(config.cache_life, Duration::from_secs(90));
        assert_eq!(config.cache_interval, Duration::from_secs(90));
        assert!(config.allow_origins.is_empty());
    }

    #[test]
    fn test_missing_salt_is_fatal() {
        let result = Config::from_json("{}");
        assert!(matches!(result, Err(ConfigError::MissingSalt)));
    }

    #[test]
    fn test_bad_duration_is_fatal() {
        let result = Config::from_json(r#"{"salt": "x", "cache_life": "six hours"}"#);
        assert!(matches!(
            result,
            Err(ConfigError::Duration { field: "cache_life", .. })
        ));

        let result = Config::from_json(r#"{"salt": "x", "cache_interval": "0"}"#);
        assert!(matches!(
            result,
            Err(ConfigError::Duration { field: "cache_interval", .. })
        ));
    }

    #[test]
    fn test_bad_base_url_is_fatal() {
        let result = Config::from_json(r#"{"salt": "x", "gravatar_url": "not a url"}"#);
        assert!(matches!(result, Err(ConfigError::BaseUrl(_))));

        let result = Config::from_json(r#"{"salt": "x", "gravatar_url": "https://g.example/a?d=1"}"#);
        assert!(matches!(result, Err(ConfigError::BaseUrl(_))));
    }

    #[test]
    fn test_malformed_json_is_fatal() {
        let result = Config::from_json(r#"{"salt": "#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = Config::from_file("/nonexistent/gravatar.config.json");
        assert!(matches!(result, Err(ConfigError::Read(_))));
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("300ms").unwrap(), Duration::from_millis(300));
        assert_eq!(parse_duration("15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(
            parse_duration("2h45m").unwrap(),
            Duration::from_secs(2 * 3600 + 45 * 60)
        );
        assert_eq!(parse_duration("10us").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_duration("7ns").unwrap(), Duration::from_nanos(7));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("15").is_err());
        assert!(parse_duration("-5m").is_err());
        assert!(parse_duration("5d").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration(".m").is_err());
    }
}
