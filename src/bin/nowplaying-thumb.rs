use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nowplaying_thumb::{Compositor, FontSet, Renderer, RendererConfig, Track};

#[derive(Parser, Debug)]
#[command(name = "nowplaying-thumb", version)]
struct Cli {
    /// Renderer configuration JSON. Defaults apply to anything it leaves out.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render (or reuse) the cached thumbnail for a track and print its path.
    Render(RenderArgs),
    /// Compose a local image into a card PNG. No cache, no network.
    Compose(ComposeArgs),
}

#[derive(Args, Debug)]
struct TrackText {
    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    artist: Option<String>,

    /// Formatted duration, e.g. "3:45".
    #[arg(long)]
    duration: Option<String>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Track JSON (`id`, `title`, `channel_name`, `thumbnail`, `duration`).
    #[arg(long, conflicts_with_all = ["id", "thumbnail"])]
    track: Option<PathBuf>,

    /// Cache key and output file stem.
    #[arg(long, required_unless_present = "track")]
    id: Option<String>,

    /// Album art URL.
    #[arg(long, required_unless_present = "track")]
    thumbnail: Option<String>,

    #[command(flatten)]
    text: TrackText,
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Source image file.
    #[arg(long)]
    image: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    text: TrackText,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    match cli.cmd {
        Command::Render(args) => cmd_render(config, args).await,
        Command::Compose(args) => cmd_compose(config, args).await,
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RendererConfig> {
    match path {
        Some(path) => Ok(RendererConfig::from_json_path(path)?),
        None => Ok(RendererConfig::default()),
    }
}

fn read_track_json(path: &Path) -> anyhow::Result<Track> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("open track '{}'", path.display()))?;
    serde_json::from_str(&json).with_context(|| "parse track JSON")
}

fn apply_text(mut track: Track, text: TrackText) -> Track {
    if let Some(title) = text.title {
        track = track.with_title(title);
    }
    if let Some(artist) = text.artist {
        track = track.with_channel_name(artist);
    }
    if let Some(duration) = text.duration {
        track = track.with_duration(duration);
    }
    track
}

async fn cmd_render(config: RendererConfig, args: RenderArgs) -> anyhow::Result<()> {
    let track = match (&args.track, args.id, args.thumbnail) {
        (Some(path), _, _) => read_track_json(path)?,
        (None, Some(id), Some(thumbnail)) => Track::new(id, thumbnail),
        _ => anyhow::bail!("either --track or both --id and --thumbnail are required"),
    };
    let track = apply_text(track, args.text);

    let renderer = Renderer::from_config(config)?;
    let path = renderer.render(&track).await;
    println!("{}", path.display());
    Ok(())
}

async fn cmd_compose(config: RendererConfig, args: ComposeArgs) -> anyhow::Result<()> {
    let source = image::open(&args.image)
        .with_context(|| format!("open image '{}'", args.image.display()))?
        .to_rgba8();
    let track = apply_text(
        Track::new("compose", args.image.display().to_string()),
        args.text,
    );

    let fonts = Arc::new(FontSet::load(&config.fonts));
    let compositor = Compositor::new(fonts, config.layout)?;
    let canvas = tokio::task::spawn_blocking(move || compositor.compose(&source, &track))
        .await
        .context("compose task")??;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    canvas
        .save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
