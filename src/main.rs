// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow, Context};
use log::{error, warn, info, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::path::{Path, PathBuf};
use std::io::Write;
use std::fs::File;
use std::io::BufReader;
use clap::{Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use dubwai::app_config::{self, Config, NormalizationMode};
use dubwai::app_controller::Controller;
use dubwai::mixing::CompositionRequest;

/// CLI Wrapper for NormalizationMode to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliNormalization {
    Rms,
    Peak,
    Off,
}

impl From<CliNormalization> for NormalizationMode {
    fn from(cli_mode: CliNormalization) -> Self {
        match cli_mode {
            CliNormalization::Rms => NormalizationMode::Rms,
            CliNormalization::Peak => NormalizationMode::Peak,
            CliNormalization::Off => NormalizationMode::Off,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mix synthesized clips into one dubbed audio track (default command)
    Mix(MixArgs),

    /// Print the render command and graph fingerprint without rendering
    Plan(MixArgs),

    /// Generate shell completions for dubwai
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct MixArgs {
    /// SRT file with the cue timings
    #[arg(value_name = "SUBTITLES")]
    subtitles: PathBuf,

    /// Directory holding the per-cue audio clips
    #[arg(value_name = "WORKSPACE")]
    workspace: PathBuf,

    /// Output audio file
    #[arg(short, long)]
    output: PathBuf,

    /// Background track mixed under the voices
    #[arg(short, long)]
    background: Option<PathBuf>,

    /// Target loudness in dBFS
    #[arg(long, allow_hyphen_values = true)]
    target_db: Option<f64>,

    /// Loudness measurement mode
    #[arg(short, long, value_enum)]
    normalization: Option<CliNormalization>,

    /// Disable the per-clip compressor
    #[arg(long)]
    no_compression: bool,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// dubwai - audio timeline compositor for video dubbing
#[derive(Parser, Debug)]
#[command(name = "dubwai")]
#[command(version)]
#[command(about = "Mix per-cue speech clips into a time-locked dubbing track")]
#[command(long_about = "dubwai places one synthesized speech clip per subtitle cue on a timeline, \
normalizes clip loudness and optionally mixes a background bed underneath.

EXAMPLES:
    dubwai movie.srt clips/ -o dub.wav                   # Mix with default config
    dubwai movie.srt clips/ -o dub.wav -b music.wav      # Add a background bed
    dubwai -f --target-db -14 movie.srt clips/ -o dub.wav
    dubwai plan movie.srt clips/ -o dub.wav              # Show the ffmpeg command only
    dubwai completions bash > dubwai.bash                # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// SRT file with the cue timings
    #[arg(value_name = "SUBTITLES")]
    subtitles: Option<PathBuf>,

    /// Directory holding the per-cue audio clips
    #[arg(value_name = "WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Output audio file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Background track mixed under the voices
    #[arg(short, long)]
    background: Option<PathBuf>,

    /// Target loudness in dBFS
    #[arg(long, allow_hyphen_values = true)]
    target_db: Option<f64>,

    /// Loudness measurement mode
    #[arg(short, long, value_enum)]
    normalization: Option<CliNormalization>,

    /// Disable the per-clip compressor
    #[arg(long)]
    no_compression: bool,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level.max(log::max_level())
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Start at info; the level from config or CLI is applied once known
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "dubwai", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Mix(args)) => run_mix(args).await,
        Some(Commands::Plan(args)) => run_plan(args).await,
        None => {
            // Default behavior - use top-level args
            let subtitles = cli.subtitles.ok_or_else(|| {
                anyhow!("SUBTITLES is required when no subcommand is specified")
            })?;
            let workspace = cli.workspace.ok_or_else(|| {
                anyhow!("WORKSPACE is required when no subcommand is specified")
            })?;
            let output = cli.output.ok_or_else(|| anyhow!("--output is required"))?;

            let mix_args = MixArgs {
                subtitles,
                workspace,
                output,
                background: cli.background,
                target_db: cli.target_db,
                normalization: cli.normalization,
                no_compression: cli.no_compression,
                force_overwrite: cli.force_overwrite,
                config_path: cli.config_path,
                log_level: cli.log_level,
            };
            run_mix(mix_args).await
        }
    }
}

/// Load or create the configuration, then apply CLI overrides
fn load_config(options: &MixArgs) -> Result<Config> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let config_log_level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level_filter(&config_log_level));
    }

    let config_path = &options.config_path;
    let mut config = if Path::new(config_path).exists() {
        let file = File::open(config_path)
            .context(format!("Failed to open config file: {}", config_path))?;

        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", config_path))?
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);

        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;

        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        config
    };

    if let Some(target_db) = options.target_db {
        config.mixing.target_loudness_db = target_db;
    }

    if let Some(mode) = &options.normalization {
        config.mixing.normalization = mode.clone().into();
    }

    if options.no_compression {
        config.mixing.compression = false;
    }

    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate()
        .context("Configuration validation failed")?;

    if options.log_level.is_none() {
        log::set_max_level(level_filter(&config.log_level));
    }

    Ok(config)
}

fn build_request(options: &MixArgs) -> CompositionRequest {
    let request = CompositionRequest::new(&options.subtitles, &options.workspace, &options.output);
    match &options.background {
        Some(background) => request.with_background(background),
        None => request,
    }
}

async fn run_mix(options: MixArgs) -> Result<()> {
    let config = load_config(&options)?;
    let controller = Controller::with_config(config)?;

    // Ctrl-C kills the render engine; nothing is published
    let cancel = controller.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling render");
            cancel.cancel();
        }
    });

    match controller.run(build_request(&options), options.force_overwrite).await {
        Ok(Some(report)) => {
            info!("Done: {:?}", report.output_path);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => {
            error!("{:#}", e);
            Err(e)
        }
    }
}

async fn run_plan(options: MixArgs) -> Result<()> {
    let config = load_config(&options)?;
    let controller = Controller::with_config(config)?;
    let command = controller.plan(build_request(&options)).await?;
    println!("{}", command);
    Ok(())
}
