mod demo;
mod snapshot;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use retrogfx_common::frontend::Color;
use retrogfx_core::{InkEffect, RenderConfig, RenderState};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

const SNAPSHOT_OPTIONS_HEADING: &str = "Snapshot Options";
const RENDER_OPTIONS_HEADING: &str = "Render Options";

#[derive(Parser)]
struct Args {
    /// Number of frames to render; the last one is written to the output file
    #[arg(short = 'n', long, default_value_t = 60)]
    frames: u32,

    /// Output PNG path
    #[arg(short = 'o', long, default_value = "frame.png")]
    output: PathBuf,

    /// TOML render config file; replaces the render options below when set
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Ink effect for the spinning overlay sprite (None / Blend / Alpha / Add / Sub / Tint)
    #[arg(long, value_enum, ignore_case = true, default_value_t)]
    overlay_ink: InkEffect,

    /// Restore the stage from a snapshot instead of building the demo stage
    #[arg(long, help_heading = SNAPSHOT_OPTIONS_HEADING)]
    load_state: Option<PathBuf>,

    /// Write a snapshot of the renderer state after the last frame
    #[arg(long, help_heading = SNAPSHOT_OPTIONS_HEADING)]
    save_state: Option<PathBuf>,

    #[command(flatten, next_help_heading = RENDER_OPTIONS_HEADING)]
    render: RenderConfig,
}

impl Args {
    fn render_config(&self) -> anyhow::Result<RenderConfig> {
        let Some(path) = &self.config else {
            return Ok(self.render);
        };

        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: RenderConfig = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;

        log::info!("Loaded render config from '{}'", path.display());

        Ok(config)
    }
}

fn write_png(state: &RenderState, path: &Path) -> anyhow::Result<()> {
    let mut colors: Vec<Color> = Vec::new();
    state.to_rgba(&mut colors);

    let size = state.frame_buffer().size();
    image::save_buffer(
        path,
        bytemuck::cast_slice(&colors),
        size.width,
        size.height,
        image::ColorType::Rgba8,
    )
    .with_context(|| format!("Failed to write PNG to '{}'", path.display()))?;

    log::info!("Wrote {size} frame to '{}'", path.display());

    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut state = match &args.load_state {
        Some(path) => {
            if args.config.is_some() {
                log::warn!("Ignoring --config; the snapshot carries its own render config");
            }
            snapshot::load(path)?
        }
        None => {
            let config = args.render_config()?;
            log::info!("Render config:\n{config}");

            let mut state = RenderState::new(config)?;
            demo::build_stage(&mut state)?;
            state
        }
    };

    let start = Instant::now();
    for frame in 0..args.frames {
        demo::render_frame(&mut state, frame, args.overlay_ink)?;
    }
    log::info!("Rendered {} frames in {:?}", args.frames, start.elapsed());

    write_png(&state, &args.output)?;

    if let Some(path) = &args.save_state {
        snapshot::save(&state, path)?;
    }

    Ok(())
}
