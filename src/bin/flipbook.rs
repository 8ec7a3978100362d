use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::mpsc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "flipbook", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an animated shape and export it as a GIF.
    Generate(GenerateArgs),
    /// Print the frame count, size, delays and loop setting of a GIF.
    Info(InfoArgs),
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Number of frames to generate.
    #[arg(long)]
    count: usize,

    /// Frames per second; overrides the config file.
    #[arg(long)]
    fps: Option<u32>,

    /// Canvas width in pixels; overrides the config file.
    #[arg(long)]
    width: Option<u32>,

    /// Canvas height in pixels; overrides the config file.
    #[arg(long)]
    height: Option<u32>,

    /// Output GIF path.
    #[arg(long)]
    out: PathBuf,

    /// Seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,

    /// Engine config JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// GIF to inspect.
    path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Generate(args) => cmd_generate(args),
        Command::Info(args) => cmd_info(args),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("FLIPBOOK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &GenerateArgs) -> anyhow::Result<flipbook::EngineConfig> {
    let mut cfg = match &args.config {
        Some(path) => flipbook::EngineConfig::from_path(path)?,
        None => flipbook::EngineConfig::default(),
    };
    if let Some(fps) = args.fps {
        cfg.fps = flipbook::Fps::whole(fps)?;
    }
    if args.width.is_some() || args.height.is_some() {
        cfg.canvas = flipbook::Canvas::new(
            args.width.unwrap_or(cfg.canvas.width),
            args.height.unwrap_or(cfg.canvas.height),
        )?;
    }
    if args.seed.is_some() {
        cfg.generator.seed = args.seed;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let cfg = load_config(&args)?;
    let store = flipbook::FrameStore::new(cfg.frames.clone())?;
    let generator = flipbook::BatchGenerator::new(store, cfg.canvas, cfg.generator.clone())?
        .with_style(cfg.tool);

    let (tx, rx) = mpsc::channel();
    let handle = generator.generate(args.count, move |frames| {
        let _ = tx.send(frames);
    })?;
    if handle.wait() == flipbook::GenerationOutcome::Cancelled {
        anyhow::bail!("generation was cancelled");
    }
    let frames = rx.recv().context("generator finished without frames")?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let exporter = flipbook::Exporter::new(cfg.canvas, cfg.export.clone())?;
    let handle = exporter.export_to(&args.out, frames, cfg.fps, |_| {}, || {})?;
    match handle.wait()? {
        flipbook::ExportOutcome::Exported(path) => {
            eprintln!("wrote {}", path.display());
            Ok(())
        }
        flipbook::ExportOutcome::Cancelled => anyhow::bail!("export was cancelled"),
    }
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let info = read_gif_info(&args.path)?;
    println!("frames: {}", info.delays_centis.len());
    println!("size: {}x{}", info.width, info.height);
    let delays: Vec<String> = info
        .delays_centis
        .iter()
        .map(|d| format!("{}ms", u32::from(*d) * 10))
        .collect();
    println!("delays: {}", delays.join(" "));
    match info.repeat {
        gif::Repeat::Infinite => println!("loop: forever"),
        gif::Repeat::Finite(n) => println!("loop: {n}"),
    }
    Ok(())
}

struct GifInfo {
    width: u16,
    height: u16,
    delays_centis: Vec<u16>,
    repeat: gif::Repeat,
}

fn read_gif_info(path: &Path) -> anyhow::Result<GifInfo> {
    let f = File::open(path).with_context(|| format!("open gif '{}'", path.display()))?;
    let mut opts = gif::DecodeOptions::new();
    opts.set_color_output(gif::ColorOutput::Indexed);
    let mut decoder = opts
        .read_info(BufReader::new(f))
        .with_context(|| format!("read gif header '{}'", path.display()))?;

    let mut delays_centis = Vec::new();
    while let Some(frame) = decoder
        .read_next_frame()
        .with_context(|| format!("decode gif frame {}", delays_centis.len()))?
    {
        delays_centis.push(frame.delay);
    }
    Ok(GifInfo {
        width: decoder.width(),
        height: decoder.height(),
        delays_centis,
        repeat: decoder.repeat(),
    })
}
