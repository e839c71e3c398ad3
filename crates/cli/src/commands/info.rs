//! `info` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::InfoArgs;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Reading configuration");

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        println!("{}", config_loader::ConfigLoader::to_json(&config)?);
        return Ok(());
    }

    println!("Link configuration ({})", args.config.display());
    println!();
    println!("[transport]");
    println!("  kind = {:?}", config.transport.kind);
    match config.transport.kind {
        contracts::TransportKind::Serial => {
            println!("  port = {}", config.transport.serial.port);
            println!("  baud_rate = {}", config.transport.serial.baud_rate);
        }
        contracts::TransportKind::Replay => {
            println!("  path = {}", config.transport.replay.path);
            println!("  chunk_bytes = {}", config.transport.replay.chunk_bytes);
        }
        contracts::TransportKind::Mock => {
            println!("  sensors = {}", config.transport.mock.sensor_count);
            println!("  rate_hz = {}", config.transport.mock.rate_hz);
        }
    }
    println!();
    println!("[framing]");
    println!("  ring_capacity = {}", config.framing.ring_capacity);
    println!(
        "  resync_attempt_limit = {}",
        config.framing.resync_attempt_limit
    );
    println!(
        "  resync_keep_window = {}",
        config.framing.resync_keep_window
    );
    println!();
    println!("[flow]");
    println!("  high_watermark = {}", config.flow.high_watermark);
    println!("  low_watermark = {}", config.flow.low_watermark);
    println!("  cooldown_ms = {}", config.flow.cooldown_ms);
    println!();
    println!("[decoder]");
    println!("  max_sensor_count = {}", config.decoder.max_sensor_count);
    println!(
        "  corrupt_count_values = {:?}",
        config.decoder.corrupt_count_values
    );
    println!(
        "  quat_norm band = [{}, {}]",
        config.decoder.quat_norm_min, config.decoder.quat_norm_max
    );
    println!("  trusted_id_filter = {}", config.decoder.trusted_id_filter);
    println!("  trusted_id_ttl_ms = {}", config.decoder.trusted_id_ttl_ms);

    Ok(())
}
