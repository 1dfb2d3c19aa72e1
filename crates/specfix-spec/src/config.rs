//! Resolver configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default nesting limit for thunk chains and container descent.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Domains used for primitive kinds, plus resolution limits.
///
/// Every field has a default, so a partial JSON document only overrides what
/// it names:
///
/// ```
/// use specfix_spec::ResolveConfig;
///
/// let config = ResolveConfig::from_json(r#"{ "int_range": [1, 6] }"#).unwrap();
/// assert_eq!(config.int_range, (1, 6));
/// assert_eq!(config.text_len, (1, 50));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolveConfig {
    /// Inclusive range for [`crate::Kind::Integer`].
    pub int_range: (i64, i64),
    /// Inclusive range for [`crate::Kind::Real`].
    pub real_range: (f64, f64),
    /// Inclusive range for both parts of [`crate::Kind::Complex`].
    pub complex_range: (f64, f64),
    /// Inclusive length range for [`crate::Kind::Text`].
    pub text_len: (usize, usize),
    /// Maximum nesting of thunk invocations and containers.
    pub max_depth: usize,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            int_range: (0, 1000),
            real_range: (0.0, 1000.0),
            complex_range: (-1000.0, 1000.0),
            text_len: (1, 50),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ResolveConfig {
    /// Parses and validates a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ResolveConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects inverted or empty ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.int_range.0 > self.int_range.1 {
            return Err(ConfigError::InvalidRange { field: "int_range" });
        }
        if !valid_real_range(self.real_range) {
            return Err(ConfigError::InvalidRange {
                field: "real_range",
            });
        }
        if !valid_real_range(self.complex_range) {
            return Err(ConfigError::InvalidRange {
                field: "complex_range",
            });
        }
        if self.text_len.0 == 0 || self.text_len.0 > self.text_len.1 {
            return Err(ConfigError::InvalidRange { field: "text_len" });
        }
        if self.max_depth == 0 {
            return Err(ConfigError::InvalidRange { field: "max_depth" });
        }
        Ok(())
    }
}

fn valid_real_range((low, high): (f64, f64)) -> bool {
    low.is_finite() && high.is_finite() && low <= high
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_domains() {
        let config = ResolveConfig::default();
        assert_eq!(config.int_range, (0, 1000));
        assert_eq!(config.real_range, (0.0, 1000.0));
        assert_eq!(config.complex_range, (-1000.0, 1000.0));
        assert_eq!(config.text_len, (1, 50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = ResolveConfig::from_json(r#"{"text_len": [3, 3], "max_depth": 8}"#).unwrap();
        assert_eq!(
            config,
            ResolveConfig {
                text_len: (3, 3),
                max_depth: 8,
                ..ResolveConfig::default()
            }
        );
    }

    #[test]
    fn test_rejects_inverted_range() {
        let err = ResolveConfig::from_json(r#"{"int_range": [5, 1]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRange { field: "int_range" }));
    }

    #[test]
    fn test_rejects_empty_text() {
        let err = ResolveConfig::from_json(r#"{"text_len": [0, 4]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRange { field: "text_len" }));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let err = ResolveConfig::from_json(r#"{"seed": 4}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
