//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    transport: String,
    ring_capacity: usize,
    high_watermark: usize,
    low_watermark: usize,
    trusted_id_filter: bool,
    max_sensor_count: u8,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let path = args.config.to_string_lossy().into_owned();

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => ValidationResult {
            valid: true,
            config_path: path,
            error: None,
            summary: Some(ConfigSummary {
                transport: format!("{:?}", config.transport.kind).to_lowercase(),
                ring_capacity: config.framing.ring_capacity,
                high_watermark: config.flow.high_watermark,
                low_watermark: config.flow.low_watermark,
                trusted_id_filter: config.decoder.trusted_id_filter,
                max_sensor_count: config.decoder.max_sensor_count,
            }),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path: path,
            error: Some(e.to_string()),
            summary: None,
        },
    }
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("OK: {} is valid", result.config_path);
        if let Some(summary) = &result.summary {
            println!("  transport:         {}", summary.transport);
            println!("  ring capacity:     {} bytes", summary.ring_capacity);
            println!(
                "  watermarks:        {} / {} bytes",
                summary.low_watermark, summary.high_watermark
            );
            println!("  trusted-ID filter: {}", summary.trusted_id_filter);
            println!("  max sensor count:  {}", summary.max_sensor_count);
        }
    } else {
        println!("INVALID: {}", result.config_path);
        if let Some(error) = &result.error {
            println!("  {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validate_good_config() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(b"[framing]\nring_capacity = 65536\n").unwrap();

        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(result.valid, "{:?}", result.error);
    }

    #[test]
    fn test_validate_bad_watermarks() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(b"[flow]\nhigh_watermark = 10\nlow_watermark = 20\n")
            .unwrap();

        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("watermark"));
    }
}
