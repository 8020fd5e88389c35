//! Binary entrypoint for depth-parallax.
//!
//! Delegates all logic to the library crate.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use depth_parallax::config::{Configuration, EffectEntry};
use depth_parallax::tasks::{check, viewer};

/// Mouse-reactive parallax over an image and its depth map
#[derive(Debug, Parser)]
#[command(name = "depth-parallax", version)]
struct Cli {
    /// Path to YAML config listing the effects to bind
    #[arg(value_name = "CONFIG", conflicts_with_all = ["image", "depth_map"])]
    config: Option<PathBuf>,

    /// Single base image (used instead of CONFIG)
    #[arg(long, value_name = "FILE", requires = "depth_map")]
    image: Option<PathBuf>,

    /// Depth map for --image
    #[arg(long = "depth-map", value_name = "FILE", requires = "image")]
    depth_map: Option<PathBuf>,

    /// Override parallax strength
    #[arg(long, value_name = "F")]
    strength: Option<f32>,

    /// Override per-frame pointer smoothing
    #[arg(long, value_name = "F")]
    smoothing: Option<f32>,

    /// Compile the shader and decode all assets, then exit without a window
    #[arg(long)]
    check: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("depth_parallax={level}").parse()?)
        .add_directive("wgpu=warn".parse()?)
        .add_directive("naga=warn".parse()?)
        .add_directive("winit=warn".parse()?);
    fmt().with_env_filter(filter).with_target(false).compact().init();
    Ok(())
}

fn load_configuration(cli: &Cli) -> Result<Configuration> {
    let mut cfg = match (&cli.config, &cli.image, &cli.depth_map) {
        (Some(path), _, _) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        (None, Some(image), Some(depth_map)) => Configuration {
            effects: vec![EffectEntry {
                image: image.clone(),
                depth_map: depth_map.clone(),
                title: None,
            }],
            ..Configuration::default()
        },
        _ => bail!("pass a CONFIG file or both --image and --depth-map"),
    };
    if let Some(strength) = cli.strength {
        cfg.parallax_strength = strength;
    }
    if let Some(smoothing) = cli.smoothing {
        cfg.smoothing = smoothing;
    }
    cfg.validated().context("invalid configuration values")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = load_configuration(&cli)?;
    info!(
        effects = cfg.effects.len(),
        strength = cfg.parallax_strength,
        smoothing = cfg.smoothing,
        "configuration loaded",
    );

    if cli.check {
        let reports = check::run(cfg.bindings(), (cfg.window.width, cfg.window.height)).await?;
        let failed = reports.iter().filter(|r| !r.is_ok()).count();
        if failed > 0 {
            bail!("{failed} of {} effects failed to load", reports.len());
        }
        return Ok(());
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; shutting down");
            cancel.cancel();
        });
    }

    // winit needs the main thread; this returns once every window is gone.
    viewer::run_windowed(cfg.bindings(), cfg.effect_params(), cfg.window.clone(), cancel)
        .context("viewer failed")
}
