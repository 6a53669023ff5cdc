//! ember - render a built-in scene to a PNG file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use ember_renderer::{render, Background, BvhOptions, RenderConfig, SplitMethod};

mod scenes;

use scenes::Preset;

#[derive(Parser)]
#[command(name = "ember")]
#[command(about = "CPU path tracer for spheres, boxes and quads", long_about = None)]
struct Cli {
    /// Scene to render
    #[arg(short, long, value_enum, default_value_t = Preset::Spheres)]
    scene: Preset,

    /// Output image (format determined by extension)
    #[arg(short, long, default_value = "render.png")]
    output: PathBuf,

    /// JSON file with render settings; missing fields use defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Samples per pixel
    #[arg(long)]
    spp: Option<u32>,

    /// Maximum bounces per path
    #[arg(long)]
    depth: Option<u32>,

    #[arg(long)]
    seed: Option<u64>,

    /// Override the scene's background
    #[arg(long, value_enum)]
    background: Option<BackgroundArg>,

    /// BVH split strategy
    #[arg(long, value_enum, default_value_t = SplitArg::Sah)]
    split: SplitArg,

    /// Disable next-event estimation
    #[arg(long)]
    no_light_sampling: bool,

    /// Disable Russian roulette
    #[arg(long)]
    no_roulette: bool,

    /// Render on a single thread
    #[arg(long)]
    sequential: bool,

    /// Print the effective render settings as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackgroundArg {
    Black,
    Sky,
    Sunset,
}

impl From<BackgroundArg> for Background {
    fn from(arg: BackgroundArg) -> Self {
        match arg {
            BackgroundArg::Black => Background::Black,
            BackgroundArg::Sky => Background::SkyGradient,
            BackgroundArg::Sunset => Background::Sunset,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SplitArg {
    Middle,
    EqualCounts,
    Sah,
}

impl From<SplitArg> for SplitMethod {
    fn from(arg: SplitArg) -> Self {
        match arg {
            SplitArg::Middle => SplitMethod::Middle,
            SplitArg::EqualCounts => SplitMethod::EqualCounts,
            SplitArg::Sah => SplitMethod::Sah,
        }
    }
}

fn load_config(path: &Path) -> Result<RenderConfig> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Settings from the config file (or defaults), then command-line overrides.
fn effective_config(cli: &Cli, scene_background: Background) -> Result<RenderConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RenderConfig {
            background: scene_background,
            ..RenderConfig::default()
        },
    };

    if let Some(spp) = cli.spp {
        config.samples_per_pixel = spp;
    }
    if let Some(depth) = cli.depth {
        config.max_depth = depth;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(background) = cli.background {
        config.background = background.into();
    }
    if cli.no_light_sampling {
        config.light_sampling = false;
    }
    if cli.no_roulette {
        config.russian_roulette = false;
    }
    if cli.sequential {
        config.parallel = false;
    }

    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let options = BvhOptions {
        split: cli.split.into(),
        ..BvhOptions::default()
    };
    let setup = cli
        .scene
        .build(options, cli.width, cli.height)
        .context("building scene")?;
    let config = effective_config(&cli, setup.background)?;

    if cli.dump_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    if let Some(bvh) = setup.scene.bvh() {
        let stats = bvh.stats();
        log::info!(
            "BVH: {} nodes, {} leaves, depth {}",
            stats.nodes,
            stats.leaves,
            stats.depth
        );
    }

    let image = render(&setup.camera, &setup.scene, &config).context("rendering")?;
    image
        .save(&cli.output)
        .with_context(|| format!("writing {}", cli.output.display()))?;

    log::info!("Saved {}", cli.output.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Starting ember");
    run(Cli::parse())
}
