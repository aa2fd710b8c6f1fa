use std::{fs::File, io::BufReader, path::PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use framepipe::{
    CommandLauncher, EncoderLauncher as _, EncoderLogLevel, EncoderSink, Fps, OutputFormat,
    OutputSpec, Pattern, RowOrder, StderrMode,
};

#[derive(Parser, Debug)]
#[command(name = "framepipe", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream a synthetic animation into ffmpeg (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Write a single synthetic frame as a PNG.
    Frame(FrameArgs),
    /// Print the encoder command line without running it.
    #[command(name = "args")]
    ShowArgs(SpecArgs),
}

#[derive(Args, Debug)]
struct SpecArgs {
    /// Output spec JSON; flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum)]
    format: Option<FormatChoice>,

    /// Frame width in pixels [default: 320].
    #[arg(long)]
    width: Option<u32>,

    /// Frame height in pixels [default: 320].
    #[arg(long)]
    height: Option<u32>,

    /// Frame rate, `25` or `30000/1001` [default: 25].
    #[arg(long)]
    fps: Option<Fps>,

    /// Output file [default: output.gif / output.mp4].
    #[arg(long)]
    out: Option<PathBuf>,

    /// Refuse to overwrite an existing output file.
    #[arg(long)]
    no_overwrite: bool,

    /// Encoder log level.
    #[arg(long, value_enum)]
    encoder_log: Option<LogChoice>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    spec: SpecArgs,

    /// Number of frames to stream.
    #[arg(long, default_value_t = 60)]
    frames: u64,

    /// Animation to draw.
    #[arg(long, value_enum, default_value_t = PatternChoice::Bars)]
    pattern: PatternChoice,

    /// Render rows bottom-up and stream them flipped.
    #[arg(long)]
    flipped: bool,

    /// Discard encoder diagnostics instead of sharing stderr.
    #[arg(long)]
    quiet_encoder: bool,

    /// Encoder binary.
    #[arg(long, default_value = "ffmpeg")]
    encoder: String,
}

#[derive(Args, Debug)]
struct FrameArgs {
    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Frame index (0-based).
    #[arg(long, default_value_t = 0)]
    index: u64,

    /// Frame width in pixels.
    #[arg(long, default_value_t = 320)]
    width: u32,

    /// Frame height in pixels.
    #[arg(long, default_value_t = 320)]
    height: u32,

    /// Animation to draw.
    #[arg(long, value_enum, default_value_t = PatternChoice::Bars)]
    pattern: PatternChoice,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Gif,
    Mp4,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PatternChoice {
    ColorCycle,
    Bars,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogChoice {
    Quiet,
    Error,
    Warning,
    Info,
    Verbose,
    Debug,
}

impl From<FormatChoice> for OutputFormat {
    fn from(c: FormatChoice) -> Self {
        match c {
            FormatChoice::Gif => Self::Gif,
            FormatChoice::Mp4 => Self::Mp4,
        }
    }
}

impl From<PatternChoice> for Pattern {
    fn from(c: PatternChoice) -> Self {
        match c {
            PatternChoice::ColorCycle => Self::ColorCycle,
            PatternChoice::Bars => Self::Bars,
        }
    }
}

impl From<LogChoice> for EncoderLogLevel {
    fn from(c: LogChoice) -> Self {
        match c {
            LogChoice::Quiet => Self::Quiet,
            LogChoice::Error => Self::Error,
            LogChoice::Warning => Self::Warning,
            LogChoice::Info => Self::Info,
            LogChoice::Verbose => Self::Verbose,
            LogChoice::Debug => Self::Debug,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
        Command::ShowArgs(args) => cmd_args(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn resolve_spec(args: &SpecArgs) -> anyhow::Result<OutputSpec> {
    let mut spec = match &args.config {
        Some(path) => {
            let f = File::open(path)
                .with_context(|| format!("open output spec '{}'", path.display()))?;
            OutputSpec::from_json_reader(BufReader::new(f))?
        }
        None => OutputSpec::new(320, 320, Fps::integer(25)?, OutputFormat::Gif),
    };

    if let Some(format) = args.format {
        spec.format = format.into();
    }
    if let Some(width) = args.width {
        spec.width = width;
    }
    if let Some(height) = args.height {
        spec.height = height;
    }
    if let Some(fps) = args.fps {
        spec.fps = fps;
    }
    if let Some(out) = &args.out {
        spec.out_path = Some(out.clone());
    }
    if args.no_overwrite {
        spec.overwrite = false;
    }
    if let Some(level) = args.encoder_log {
        spec.log_level = level.into();
    }

    spec.validate()?;
    Ok(spec)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let spec = resolve_spec(&args.spec)?;
    let out = spec.output_path();

    let stderr = if args.quiet_encoder {
        StderrMode::Null
    } else {
        StderrMode::Inherit
    };
    let launcher = CommandLauncher::new(&args.encoder).with_stderr(stderr);
    if !framepipe::is_encoder_on_path(launcher.program()) {
        anyhow::bail!("'{}' was not found on PATH", args.encoder);
    }

    let layout = if args.flipped {
        RowOrder::BottomUp
    } else {
        RowOrder::TopDown
    };

    let mut sink = EncoderSink::new(launcher);
    framepipe::stream_pattern(&mut sink, spec, args.pattern.into(), args.frames, layout)
        .with_context(|| format!("render '{}'", out.display()))?;

    if let Some(report) = sink.report() {
        eprintln!(
            "wrote {} ({} frames, {} bytes streamed)",
            report.output.display(),
            report.frames,
            report.bytes
        );
    }
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let res = framepipe::Resolution::new(args.width, args.height)?;
    let mut buf = Vec::new();
    framepipe::render_pattern(
        args.pattern.into(),
        res,
        args.index,
        RowOrder::TopDown,
        &mut buf,
    )?;

    framepipe::ensure_parent_dir(&args.out)?;
    image::save_buffer_with_format(
        &args.out,
        &buf,
        res.width,
        res.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_args(args: SpecArgs) -> anyhow::Result<()> {
    let spec = resolve_spec(&args)?;
    let invocation = spec.invocation("ffmpeg")?;
    println!("{invocation}");
    Ok(())
}
