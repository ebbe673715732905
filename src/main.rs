use clap::{Args, Parser, Subcommand, ValueEnum};
use shrinkray::config;
use shrinkray::export::DirectorySink;
use shrinkray::imaging::RustBackend;
use shrinkray::queue::JobQueue;
use shrinkray::{inputs, output};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shrinkray")]
#[command(about = "Batch image resizer and re-encoder")]
#[command(long_about = "\
Batch image resizer and re-encoder

Images are processed one at a time, in the order given. Each one is
decoded, resized, and re-encoded as WebP, JPEG, or PNG, then written to
the output directory. Existing files are never overwritten.

Resizing:
  --scale 0.5               both sides halved (never upscales)
  --width 800               800px wide, height follows the aspect ratio
  --width 800 --height 600  fit inside 800x600
  ... --stretch             exactly 800x600

Settings are read from ./shrinkray.toml (or --config) and flags override
them. Run 'shrinkray gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Log scheduling details to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transform images and export the results
    Run(RunArgs),
    /// Validate the config without processing anything
    Check {
        /// Config file (default: ./shrinkray.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print a stock shrinkray.toml with all options documented
    GenConfig,
}

#[derive(Args)]
struct RunArgs {
    /// Image files and/or directories (walked recursively)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "shrunk")]
    output: PathBuf,

    /// Config file (default: ./shrinkray.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Encoding quality, 0.0-1.0 (ignored for PNG)
    #[arg(long)]
    quality: Option<f64>,

    /// Scale factor for both sides, 0 < scale <= 1
    #[arg(long, conflicts_with_all = ["width", "height"])]
    scale: Option<f64>,

    /// Target width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Target height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// With --width and --height, stretch to the exact size instead of fitting
    #[arg(long)]
    stretch: bool,

    /// Export each image as soon as it is done
    #[arg(long)]
    auto_export: bool,

    /// Print job records as JSON instead of progress lines
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Webp,
    Jpeg,
    Png,
    Original,
}

impl FormatArg {
    fn as_str(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Original => "original",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run(args) => run(args).await?,
        Command::Check { config: path } => {
            let app = config::load_config(path.as_deref(), Path::new("."))?;
            print!("{}", toml::to_string_pretty(&app)?);
            output::print_config_notes(&app.transform_config());
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "shrinkray=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Flags as a sparse TOML layer, merged over the config file.
fn cli_overlay(args: &RunArgs) -> toml::Value {
    use toml::Value;

    let mut resize = toml::Table::new();
    if let Some(scale) = args.scale {
        resize.insert("mode".into(), Value::String("percentage".into()));
        resize.insert("scale".into(), Value::Float(scale));
    }
    if args.width.is_some() || args.height.is_some() {
        resize.insert("mode".into(), Value::String("dimensions".into()));
    }
    if let Some(width) = args.width {
        resize.insert("width".into(), Value::Integer(i64::from(width)));
    }
    if let Some(height) = args.height {
        resize.insert("height".into(), Value::Integer(i64::from(height)));
    }
    if args.stretch {
        resize.insert("preserve_aspect".into(), Value::Boolean(false));
    }

    let mut transform = toml::Table::new();
    if let Some(format) = args.format {
        transform.insert("format".into(), Value::String(format.as_str().into()));
    }
    if let Some(quality) = args.quality {
        transform.insert("quality".into(), Value::Float(quality));
    }
    if !resize.is_empty() {
        transform.insert("resize".into(), Value::Table(resize));
    }

    let mut root = toml::Table::new();
    if !transform.is_empty() {
        root.insert("transform".into(), Value::Table(transform));
    }
    if args.auto_export {
        let mut queue = toml::Table::new();
        queue.insert("auto_export".into(), Value::Boolean(true));
        root.insert("queue".into(), Value::Table(queue));
    }
    Value::Table(root)
}

async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let file_layer = match &args.config {
        Some(path) => Some(config::read_config_file(path)?),
        None => config::load_raw_config(Path::new("."))?,
    };
    let overlay = match file_layer {
        Some(file) => config::merge_toml(file, cli_overlay(&args)),
        None => cli_overlay(&args),
    };
    let app = config::resolve_config(config::stock_defaults_value()?, Some(overlay))?;
    let transform = app.transform_config();
    let settings = app.queue_settings();
    let auto_export = settings.auto_export;

    let files = inputs::collect_inputs(&args.inputs)?;
    if files.is_empty() {
        println!("No images found");
        return Ok(());
    }
    let sources = files
        .iter()
        .map(|path| inputs::read_source(path))
        .collect::<Result<Vec<_>, _>>()?;

    if !args.json {
        output::print_config_notes(&transform);
        println!("==> Processing {} image(s)", sources.len());
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let queue = JobQueue::with_events(
        Arc::new(RustBackend::new()),
        Arc::new(DirectorySink::new(args.output.clone())),
        settings,
        tx,
    );

    let quiet = args.json;
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if quiet {
                continue;
            }
            for line in output::format_queue_event(&event) {
                println!("{}", line);
            }
        }
    });

    queue.enqueue(sources, transform);
    queue.wait_idle().await;

    let export = if auto_export {
        None
    } else {
        if !args.json {
            println!("==> Exporting to {}", args.output.display());
        }
        Some(queue.export_all().await)
    };

    let summary = queue.summary();
    let records = queue.snapshot();
    // Dropping the last handle closes the event channel and ends the printer.
    drop(queue);
    printer.await?;

    if args.json {
        println!("{}", output::format_records_json(&records)?);
    } else {
        output::print_summary(&summary, export.as_ref(), &args.output);
    }

    Ok(())
}
