use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use windflow::{
    DEFAULT_DROP_RATE, DEFAULT_DROP_RATE_BUMP, DEFAULT_FADE_OPACITY, DEFAULT_NUM_PARTICLES,
    DEFAULT_SPEED_FACTOR, RendererConfig, WindField, WindRenderer,
};

/// A GPU particle visualizer for wind fields, rendered off-screen to PNG.
#[derive(Parser)]
#[command(name = "windflow")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Wind field metadata (.json); omit to render a synthetic vortex
    #[arg(long, requires = "wind_image")]
    wind_meta: Option<PathBuf>,

    /// Wind field image (.png) with u/v speeds packed into red/green bytes
    #[arg(long, requires = "wind_meta")]
    wind_image: Option<PathBuf>,

    /// Output image path
    #[arg(short, long, default_value = "windflow.png")]
    output: PathBuf,

    /// Surface width in pixels
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Surface height in pixels
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Particle count, rounded up to a perfect square
    #[arg(short, long, default_value_t = DEFAULT_NUM_PARTICLES)]
    particles: u32,

    /// Frames to advance before capturing
    #[arg(short, long, default_value_t = 120)]
    frames: u32,

    /// Fraction of the previous frame kept when fading trails
    #[arg(long, default_value_t = DEFAULT_FADE_OPACITY)]
    fade_opacity: f32,

    /// Advection speed multiplier
    #[arg(long, default_value_t = DEFAULT_SPEED_FACTOR)]
    speed_factor: f32,

    /// Per-frame probability of respawning a particle somewhere random
    #[arg(long, default_value_t = DEFAULT_DROP_RATE)]
    drop_rate: f32,

    /// Extra respawn probability for the fastest particles
    #[arg(long, default_value_t = DEFAULT_DROP_RATE_BUMP)]
    drop_rate_bump: f32,

    /// Seed for deterministic particle placement
    #[arg(long)]
    seed: Option<u64>,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let field = match (&cli.wind_meta, &cli.wind_image) {
        (Some(meta), Some(image)) => WindField::from_files(meta, image)
            .with_context(|| format!("failed to load wind field from {}", meta.display()))?,
        _ => WindField::synthetic(256, 256),
    };

    let mut renderer = WindRenderer::headless(RendererConfig {
        width: cli.width,
        height: cli.height,
        num_particles: cli.particles,
        seed: cli.seed,
    })?;
    renderer.fade_opacity = cli.fade_opacity;
    renderer.speed_factor = cli.speed_factor;
    renderer.drop_rate = cli.drop_rate;
    renderer.drop_rate_bump = cli.drop_rate_bump;
    renderer.set_wind(field)?;

    for _ in 0..cli.frames {
        renderer.draw()?;
    }

    let pixels = renderer.read_pixels();
    let frame = image::RgbaImage::from_raw(cli.width, cli.height, pixels)
        .context("frame readback did not match surface size")?;
    frame.save(&cli.output)?;

    println!(
        "Rendered {} frames of {} particles to {}",
        cli.frames,
        renderer.num_particles(),
        cli.output.display()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    run(Cli::parse())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_with_defaults() {
        let cli = Cli::try_parse_from(["windflow"]).unwrap();
        assert_eq!(cli.output, PathBuf::from("windflow.png"));
        assert_eq!(cli.width, 800);
        assert_eq!(cli.height, 600);
        assert_eq!(cli.particles, DEFAULT_NUM_PARTICLES);
        assert_eq!(cli.frames, 120);
        assert!(cli.wind_meta.is_none());
        assert!(cli.seed.is_none());
    }

    #[test]
    fn cli_parses_overrides() {
        let cli = Cli::try_parse_from([
            "windflow", "--width", "320", "--height", "240", "--frames", "10", "--seed", "7",
            "--drop-rate", "0.0",
        ])
        .unwrap();
        assert_eq!(cli.width, 320);
        assert_eq!(cli.height, 240);
        assert_eq!(cli.frames, 10);
        assert_eq!(cli.seed, Some(7));
        assert_eq!(cli.drop_rate, 0.0);
    }

    #[test]
    fn cli_requires_both_wind_paths() {
        assert!(Cli::try_parse_from(["windflow", "--wind-meta", "wind.json"]).is_err());
        assert!(Cli::try_parse_from(["windflow", "--wind-image", "wind.png"]).is_err());
        let cli = Cli::try_parse_from([
            "windflow",
            "--wind-meta",
            "wind.json",
            "--wind-image",
            "wind.png",
        ])
        .unwrap();
        assert_eq!(cli.wind_meta, Some(PathBuf::from("wind.json")));
        assert_eq!(cli.wind_image, Some(PathBuf::from("wind.png")));
    }
}
