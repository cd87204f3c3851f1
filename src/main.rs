use clap::{Parser, Subcommand};
use imgopt::config::{self, Overrides};
use imgopt::imaging::CropPosition;
use imgopt::{logging, output, process, scan};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

/// Flags shared by every command that reads settings.
#[derive(clap::Args, Clone, Default)]
struct SettingsArgs {
    /// Settings file (default: ./imgopt.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Input directory
    #[arg(short, long, global = true)]
    input_dir: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,
}

/// Transform and encoding flags for `run`.
#[derive(clap::Args, Clone, Default)]
struct RunArgs {
    /// Resize to exactly WIDTHxHEIGHT (each 1-4080), or "none"
    #[arg(short, long)]
    size: Option<String>,

    /// Crop to aspect ratio W:H first, or "none"
    #[arg(short, long)]
    aspect: Option<String>,

    /// Part of the image the aspect crop keeps
    #[arg(short, long, value_enum)]
    crop: Option<CropPosition>,

    /// Shrink to fit inside WIDTHxHEIGHT, never enlarging
    #[arg(short, long)]
    max_size: Option<String>,

    /// Remove edge pixels: "v", "top,bottom" or "top,right,bottom,left"
    #[arg(short = 'p', long)]
    crop_pixels: Option<String>,

    /// Output formats, comma-separated: jpeg, png, webp, tiff
    #[arg(short, long)]
    format: Option<String>,

    /// Encoding quality 0-100 (WebP at 100 is lossless)
    #[arg(short, long)]
    quality: Option<u32>,

    /// Resolution written into the output metadata
    #[arg(long)]
    dpi: Option<u32>,

    /// Copy the source EXIF block into JPEG and TIFF outputs
    #[arg(long, overrides_with = "no_keep_metadata")]
    keep_metadata: bool,

    /// Strip source metadata even if the settings file keeps it
    #[arg(long, overrides_with = "keep_metadata")]
    no_keep_metadata: bool,

    /// Put each format under its own subdirectory
    #[arg(long, overrides_with = "no_group_by_format")]
    group_by_format: bool,

    /// Mirror the input tree once for all formats
    #[arg(long, overrides_with = "group_by_format")]
    no_group_by_format: bool,

    /// Remove each source after all of its outputs were written
    #[arg(long, overrides_with = "keep_original")]
    delete_original: bool,

    /// Never remove sources, even if the settings file says to
    #[arg(long, overrides_with = "delete_original")]
    keep_original: bool,

    /// Write into a fresh YYYYMMDD_HHMMSS subdirectory of the output directory
    #[arg(long, overrides_with = "no_timestamp")]
    timestamp: bool,

    /// Write directly into the output directory instead of a timestamped subdirectory
    #[arg(long, overrides_with = "timestamp")]
    no_timestamp: bool,

    /// Maximum parallel workers (default: all cores)
    #[arg(short = 'j', long)]
    threads: Option<usize>,
}

#[derive(Parser)]
#[command(name = "imgopt")]
#[command(version)]
#[command(about = "Batch image cropper, resizer and re-encoder")]
#[command(long_about = "\
Batch image cropper, resizer and re-encoder

Every .jpg/.jpeg/.jfif/.png/.webp under the input directory goes through:

  aspect crop → resize → max-size downscale → edge crop → encode

Outputs mirror the input tree under the output directory, inside a fresh
YYYYMMDD_HHMMSS subdirectory unless --no-timestamp is given.

Defaults come from ./imgopt.toml (or --config). Flags override the file.
Run 'imgopt gen-config' to print a documented settings file.")]
struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,

    /// Debug-level diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Diagnostics as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Process the input directory (the default when no command is given)
    Run(RunArgs),
    /// Remove the output directory and everything in it
    Reset,
    /// Print a stock imgopt.toml with all options documented
    GenConfig,
}

/// A `--flag` / `--no-flag` pair; neither given leaves the setting alone.
fn switch(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

impl SettingsArgs {
    fn overrides(&self, run: &RunArgs) -> Overrides {
        Overrides {
            input_dir: self.input_dir.clone(),
            output_dir: self.output_dir.clone(),
            size: run.size.clone(),
            aspect: run.aspect.clone(),
            crop: run.crop,
            max_size: run.max_size.clone(),
            crop_pixels: run.crop_pixels.clone(),
            format: run.format.clone(),
            quality: run.quality,
            dpi: run.dpi,
            keep_metadata: switch(run.keep_metadata, run.no_keep_metadata),
            group_by_format: switch(run.group_by_format, run.no_group_by_format),
            delete_original: switch(run.delete_original, run.keep_original),
            threads: run.threads,
            timestamped: switch(run.timestamp, run.no_timestamp),
        }
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json_logs);

    match cli.command {
        Some(Command::GenConfig) => {
            print!("{}", config::stock_config_toml());
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Reset) => {
            let settings = config::load_settings(
                cli.settings.config.as_deref(),
                &cli.settings.overrides(&RunArgs::default()),
            )?;
            let existed = settings.output_dir.exists();
            if existed {
                std::fs::remove_dir_all(&settings.output_dir)?;
            }
            println!("{}", output::format_reset(&settings.output_dir, existed));
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Run(run)) => run_batch(&cli.settings, &run),
        None => run_batch(&cli.settings, &RunArgs::default()),
    }
}

fn run_batch(args: &SettingsArgs, run: &RunArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let settings = config::load_settings(args.config.as_deref(), &args.overrides(run))?;
    let transform = settings.transform_config()?;
    let destination = settings.destination()?;

    let sources = scan::discover(&settings.input_dir, Some(&settings.output_dir))?;
    info!(
        input = %settings.input_dir.display(),
        destination = %destination.display(),
        files = sources.len(),
        "starting batch"
    );
    output::print_run_parameters(&settings.input_dir, &destination, &transform);

    init_thread_pool(settings.threads);

    let (tx, rx) = std::sync::mpsc::channel();
    let (input, dest) = (settings.input_dir.clone(), destination.clone());
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_process_event(&event, &input, &dest) {
                println!("{}", line);
            }
        }
    });
    let summary = process::process(&sources, &transform, &destination, Some(tx))?;
    printer.join().unwrap();

    output::print_summary(&summary, &settings.input_dir);
    if summary.attempted() == 0 {
        warn!(input = %settings.input_dir.display(), "no supported images found");
    }

    Ok(if summary.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Initialize the rayon thread pool.
///
/// Caps at the number of available CPU cores.
fn init_thread_pool(threads: Option<usize>) {
    let threads = config::effective_threads(threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
