use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};

/// Render a PoseNet keypoint CSV into a marker animation video (requires `ffmpeg` on PATH).
#[derive(Parser, Debug)]
#[command(name = "posevid", version)]
struct Cli {
    /// Input CSV with a `frame` column and `<keypoint>_x` / `<keypoint>_y` columns.
    input: PathBuf,

    /// Output video path; the container follows the extension.
    #[arg(long, default_value = "animation.mp4")]
    out: PathBuf,

    /// First frame index to render.
    #[arg(long)]
    start_frame: Option<i64>,

    /// Draw dots only, without keypoint name labels.
    #[arg(long)]
    no_labels: bool,

    /// Label font file (TTF/OTF).
    #[arg(long, conflicts_with = "system_font")]
    font: Option<PathBuf>,

    /// Label font from installed system fonts, e.g. `sans-serif` or `DejaVu Sans`.
    #[arg(long)]
    system_font: Option<String>,

    /// Video codec.
    #[arg(long, value_enum, default_value_t = CodecChoice::Mpeg4)]
    codec: CodecChoice,

    /// Also save every frame as a numbered PNG in this directory.
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Print the resolved configuration as JSON and exit without rendering.
    #[arg(long)]
    print_config: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CodecChoice {
    Mpeg4,
    H264,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = build_config(&cli);
    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg).context("serialize configuration")?;
        println!("{json}");
        return Ok(());
    }

    let out = cfg.output.clone();
    let opts = posevid::AnimationSessionOpts {
        frames_dir: cli.frames_dir.clone(),
    };
    let mut session =
        posevid::AnimationSession::new(cfg, opts).context("prepare animation renderer")?;
    let mut sink = posevid::FfmpegSink::new(posevid::FfmpegSinkOpts::new(&out));

    let stats = session
        .render_csv(&cli.input, &mut sink)
        .with_context(|| format!("render '{}'", cli.input.display()))?;

    eprintln!(
        "wrote {} ({} frames, {} rows skipped)",
        out.display(),
        stats.frames_written,
        stats.rows_skipped
    );
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> posevid::AnimationConfig {
    let mut cfg = posevid::AnimationConfig {
        output: cli.out.clone(),
        codec: match cli.codec {
            CodecChoice::Mpeg4 => posevid::VideoCodec::Mpeg4,
            CodecChoice::H264 => posevid::VideoCodec::H264,
        },
        ..posevid::AnimationConfig::default()
    };
    if let Some(start) = cli.start_frame {
        cfg.start_frame = posevid::FrameIndex(start);
    }
    if cli.no_labels {
        cfg.should_label = false;
    }
    if let Some(path) = cli.font.as_ref() {
        cfg.font = posevid::FontSource::Path(path.clone());
    } else if let Some(family) = cli.system_font.as_ref() {
        cfg.font = posevid::FontSource::System(family.clone());
    }
    cfg
}
