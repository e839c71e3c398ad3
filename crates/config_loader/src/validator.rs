//! Configuration validation.
//!
//! Rules:
//! - flow watermarks keep hysteresis (low < high) and fit the ring
//! - the ring can hold at least one maximum-size frame
//! - decoder bounds and the plausibility band are well-formed
//! - quality windows and smoothing factors are non-degenerate
//! - the selected transport names its endpoint

use contracts::{LinkConfig, LinkError, TransportKind, MAX_FRAME_LEN, LEN_PREFIX_SIZE};

/// Validate a LinkConfig.
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &LinkConfig) -> Result<(), LinkError> {
    validate_framing(config)?;
    validate_flow(config)?;
    validate_decoder(config)?;
    validate_quality(config)?;
    validate_pipeline(config)?;
    validate_transport(config)?;
    Ok(())
}

fn validate_framing(config: &LinkConfig) -> Result<(), LinkError> {
    let framing = &config.framing;
    if framing.ring_capacity < MAX_FRAME_LEN + LEN_PREFIX_SIZE {
        return Err(LinkError::config_validation(
            "framing.ring_capacity",
            format!(
                "must hold at least one maximum-size frame ({} bytes)",
                MAX_FRAME_LEN + LEN_PREFIX_SIZE
            ),
        ));
    }
    if framing.resync_attempt_limit == 0 {
        return Err(LinkError::config_validation(
            "framing.resync_attempt_limit",
            "must be at least 1",
        ));
    }
    if framing.resync_keep_window > framing.ring_capacity {
        return Err(LinkError::config_validation(
            "framing.resync_keep_window",
            "cannot exceed ring_capacity",
        ));
    }
    Ok(())
}

fn validate_flow(config: &LinkConfig) -> Result<(), LinkError> {
    let flow = &config.flow;
    if flow.low_watermark >= flow.high_watermark {
        return Err(LinkError::config_validation(
            "flow.low_watermark",
            "must be below high_watermark (hysteresis)",
        ));
    }
    if flow.high_watermark > config.framing.ring_capacity {
        return Err(LinkError::config_validation(
            "flow.high_watermark",
            "cannot exceed framing.ring_capacity, pause would never fire",
        ));
    }
    Ok(())
}

fn validate_decoder(config: &LinkConfig) -> Result<(), LinkError> {
    let decoder = &config.decoder;
    if decoder.max_sensor_count == 0 {
        return Err(LinkError::config_validation(
            "decoder.max_sensor_count",
            "must be at least 1",
        ));
    }
    if decoder.quat_norm_min < 0.0 || decoder.quat_norm_min >= decoder.quat_norm_max {
        return Err(LinkError::config_validation(
            "decoder.quat_norm_min",
            "plausibility band must satisfy 0 <= min < max",
        ));
    }
    if decoder.trusted_id_ttl_ms == 0 {
        return Err(LinkError::config_validation(
            "decoder.trusted_id_ttl_ms",
            "must be at least 1",
        ));
    }
    Ok(())
}

fn validate_quality(config: &LinkConfig) -> Result<(), LinkError> {
    let quality = &config.quality;
    if quality.rate_window_ms == 0 {
        return Err(LinkError::config_validation(
            "quality.rate_window_ms",
            "must be at least 1",
        ));
    }
    if !(0.0..1.0).contains(&quality.rate_decay) {
        return Err(LinkError::config_validation(
            "quality.rate_decay",
            "must be in [0, 1)",
        ));
    }
    if quality.gap_restart_threshold < 2 {
        return Err(LinkError::config_validation(
            "quality.gap_restart_threshold",
            "must be at least 2",
        ));
    }
    if quality.gap_history_cap == 0 {
        return Err(LinkError::config_validation(
            "quality.gap_history_cap",
            "must be at least 1",
        ));
    }
    if !(quality.ema_alpha > 0.0 && quality.ema_alpha <= 1.0) {
        return Err(LinkError::config_validation(
            "quality.ema_alpha",
            "must be in (0, 1]",
        ));
    }
    Ok(())
}

fn validate_pipeline(config: &LinkConfig) -> Result<(), LinkError> {
    let pipeline = &config.pipeline;
    if pipeline.tick_frame_budget == 0 {
        return Err(LinkError::config_validation(
            "pipeline.tick_frame_budget",
            "must be at least 1",
        ));
    }
    if pipeline.pending_frame_cap == 0 {
        return Err(LinkError::config_validation(
            "pipeline.pending_frame_cap",
            "must be at least 1",
        ));
    }
    if pipeline.chunk_channel_capacity == 0 || pipeline.batch_channel_capacity == 0 {
        return Err(LinkError::config_validation(
            "pipeline.chunk_channel_capacity",
            "channel capacities must be at least 1",
        ));
    }
    Ok(())
}

fn validate_transport(config: &LinkConfig) -> Result<(), LinkError> {
    let transport = &config.transport;
    match transport.kind {
        TransportKind::Serial => {
            if transport.serial.port.is_empty() {
                return Err(LinkError::config_validation(
                    "transport.serial.port",
                    "required when transport.kind = \"serial\"",
                ));
            }
        }
        TransportKind::Replay => {
            if transport.replay.path.is_empty() {
                return Err(LinkError::config_validation(
                    "transport.replay.path",
                    "required when transport.kind = \"replay\"",
                ));
            }
        }
        TransportKind::Mock => {
            if transport.mock.sensor_count == 0 || transport.mock.rate_hz <= 0.0 {
                return Err(LinkError::config_validation(
                    "transport.mock",
                    "sensor_count and rate_hz must be positive",
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(validate(&LinkConfig::default()).is_ok());
    }

    #[test]
    fn test_inverted_watermarks_rejected() {
        let mut config = LinkConfig::default();
        config.flow.low_watermark = config.flow.high_watermark;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("watermark"));
    }

    #[test]
    fn test_ring_too_small_rejected() {
        let mut config = LinkConfig::default();
        config.framing.ring_capacity = 1024;
        config.flow.high_watermark = 512;
        config.flow.low_watermark = 128;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_high_watermark_beyond_ring_rejected() {
        let mut config = LinkConfig::default();
        config.flow.high_watermark = config.framing.ring_capacity + 1;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_degenerate_plausibility_band_rejected() {
        let mut config = LinkConfig::default();
        config.decoder.quat_norm_min = 1.2;
        config.decoder.quat_norm_max = 0.8;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_serial_requires_port() {
        let mut config = LinkConfig::default();
        config.transport.kind = TransportKind::Serial;
        assert!(validate(&config).is_err());

        config.transport.serial.port = "/dev/ttyACM0".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_replay_requires_path() {
        let mut config = LinkConfig::default();
        config.transport.kind = TransportKind::Replay;
        assert!(validate(&config).is_err());
    }
}
