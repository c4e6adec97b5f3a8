//! Configuration validation utilities.

use std::time::Duration;

use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Parse duration string using humantime.
///
/// Supports various formats: `30s`, `1m`, `5m30s`, `1h`, `2h30m`, `1d`, `100ms`, etc.
///
/// # Examples
///
/// ```
/// use adengine::config::parse_duration;
///
/// assert_eq!(parse_duration("30s").unwrap().as_secs(), 30);
/// assert_eq!(parse_duration("1m").unwrap().as_secs(), 60);
/// assert_eq!(parse_duration("2h").unwrap().as_secs(), 7200);
/// assert_eq!(parse_duration("1500ms").unwrap().as_millis(), 1500);
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration string is empty".to_string());
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Check that `value` is an absolute http(s) URL. `field` names it in errors.
pub fn require_http_url(field: &str, value: &str) -> Result<url::Url, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!("{field} is required")));
    }
    let parsed = url::Url::parse(value).map_err(|e| {
        ConfigError::ValidationError(format!("{field} '{value}' is invalid: {e}"))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::ValidationError(format!(
            "{field} '{value}' must use http or https"
        )));
    }
    Ok(parsed)
}

/// Reject a zero duration for `field`.
pub fn require_positive(field: &str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::ValidationError(format!(
            "{field} must be positive"
        )));
    }
    Ok(())
}

/// Expand environment variables in a string.
/// Supports ${VAR} and ${VAR:-default} syntax. Unset variables without a
/// default expand to the empty string.
pub fn expand_env_vars(input: &str) -> String {
    static ENV_VAR_REGEX: std::sync::OnceLock<Option<regex::Regex>> = std::sync::OnceLock::new();

    let Some(regex) = ENV_VAR_REGEX
        .get_or_init(|| regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").ok())
    else {
        return input.to_string();
    };

    regex
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var_name).unwrap_or_else(|_| default_value.to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_valid() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("30x").is_err());
        assert!(parse_duration("30").is_err());
    }

    #[test]
    fn test_parse_duration_extended_formats() {
        assert_eq!(parse_duration("100ms").unwrap(), Duration::from_millis(100));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_duration("2h 30m").unwrap(), Duration::from_secs(9000));
    }

    #[test]
    fn test_require_http_url() {
        assert!(require_http_url("feed url", "https://ads.example.com/feed.xml").is_ok());
        assert!(require_http_url("feed url", "http://127.0.0.1:8080/a").is_ok());

        let err = require_http_url("feed url", "").unwrap_err();
        assert!(err.to_string().contains("feed url is required"));
        let err = require_http_url("sink url", "ftp://example.com").unwrap_err();
        assert!(err.to_string().contains("must use http or https"));
        assert!(require_http_url("sink url", "not a url").is_err());
    }

    #[test]
    fn test_require_positive() {
        assert!(require_positive("feed timeout", Duration::from_millis(1)).is_ok());
        let err = require_positive("feed timeout", Duration::ZERO).unwrap_err();
        assert_eq!(
            err.to_string(),
            "config validation error: feed timeout must be positive"
        );
    }

    #[test]
    fn test_expand_env_vars_missing_without_default() {
        assert_eq!(expand_env_vars("k=${ADENGINE_TEST_UNSET_98765}"), "k=");
    }

    #[test]
    fn test_expand_env_vars_no_vars() {
        assert_eq!(expand_env_vars("hello world"), "hello world");
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        // Use a variable that definitely doesn't exist
        let result = expand_env_vars("Bearer ${NONEXISTENT_TOKEN_12345:-default_token}");
        assert_eq!(result, "Bearer default_token");
    }

    #[test]
    fn test_expand_env_vars_from_env() {
        // SAFETY: This test runs in isolation and only modifies a test-specific variable.
        unsafe {
            std::env::set_var("ADENGINE_TEST_SINK_KEY", "secret_value");
        }
        let result = expand_env_vars("Authorization: ${ADENGINE_TEST_SINK_KEY}");
        assert_eq!(result, "Authorization: secret_value");
        // SAFETY: Cleanup test variable.
        unsafe {
            std::env::remove_var("ADENGINE_TEST_SINK_KEY");
        }
    }
}
