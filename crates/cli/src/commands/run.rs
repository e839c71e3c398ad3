//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use contracts::TransportKind;

use crate::cli::RunArgs;
use crate::pipeline::{Orchestrator, RunConfig};

/// Execute the `run` command
pub async fn run_link(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut link = if args.config.exists() {
        config_loader::ConfigLoader::load_from_path(&args.config)
            .with_context(|| format!("Failed to load config from {}", args.config.display()))?
    } else if args.mock || args.replay.is_some() {
        // Mock and replay runs work without a config file.
        info!("No configuration file, using defaults");
        contracts::LinkConfig::default()
    } else {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    };

    // Apply CLI overrides
    if let Some(ref port) = args.port {
        info!(port = %port, "Overriding serial port from CLI");
        link.transport.kind = TransportKind::Serial;
        link.transport.serial.port = port.clone();
    }
    if let Some(ref replay) = args.replay {
        info!(replay = %replay.display(), "Overriding transport with replay file");
        link.transport.kind = TransportKind::Replay;
        link.transport.replay.path = replay.to_string_lossy().into_owned();
    }
    if args.mock {
        info!("Overriding transport with mock gateway");
        link.transport.kind = TransportKind::Mock;
    }

    config_loader::validate(&link).context("Configuration invalid after CLI overrides")?;

    info!(
        transport = ?link.transport.kind,
        ring_capacity = link.framing.ring_capacity,
        trusted_filter = link.decoder.trusted_id_filter,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        return Ok(());
    }

    let run_config = RunConfig {
        link,
        max_frames: if args.max_frames == 0 {
            None
        } else {
            Some(args.max_frames)
        },
        duration: if args.duration == 0 {
            None
        } else {
            Some(Duration::from_secs(args.duration))
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    info!("Starting link pipeline...");
    let stats = Orchestrator::new(run_config).run().await?;
    stats.print_summary();

    Ok(())
}
