//! Configuration parsing.
//!
//! TOML is the primary format, JSON the secondary.

use contracts::{LinkConfig, LinkError};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format (recommended)
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    /// Infer format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML configuration
pub fn parse_toml(content: &str) -> Result<LinkConfig, LinkError> {
    toml::from_str(content).map_err(|e| LinkError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON configuration
pub fn parse_json(content: &str) -> Result<LinkConfig, LinkError> {
    serde_json::from_str(content).map_err(|e| LinkError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse configuration in the given format
pub fn parse(content: &str, format: ConfigFormat) -> Result<LinkConfig, LinkError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_toml_gives_defaults() {
        let config = parse_toml("").unwrap();
        assert_eq!(config.framing.ring_capacity, 64 * 1024);
        assert!(!config.decoder.trusted_id_filter);
    }

    #[test]
    fn test_parse_partial_override() {
        let content = r#"
[decoder]
max_sensor_count = 20
corrupt_count_values = [0, 255]
quat_norm_min = 0.8
quat_norm_max = 1.2
trusted_id_filter = true
trusted_id_ttl_ms = 1000
mismatch_log_interval_ms = 1000
"#;
        let config = parse_toml(content).unwrap();
        assert_eq!(config.decoder.max_sensor_count, 20);
        assert_eq!(config.decoder.corrupt_count_values, vec![0, 255]);
        assert!(config.decoder.trusted_id_filter);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "transport": { "kind": "mock" },
            "quality": {
                "rate_window_ms": 2000,
                "rate_decay": 0.5,
                "expected_refresh_ms": 5000,
                "gap_restart_threshold": 1000,
                "gap_history_cap": 100,
                "ema_alpha": 0.2,
                "silence_timeout_ms": 500
            }
        }"#;
        let config = parse_json(content).unwrap();
        assert_eq!(config.quality.gap_restart_threshold, 1000);
    }

    #[test]
    fn test_parse_invalid_toml_fails() {
        assert!(parse_toml("not [ valid").is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
