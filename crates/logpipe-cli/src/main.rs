//! logpipe CLI - Command-line tooling for logpipe configurations.
//!
//! Commands:
//! - `check` - Parse a config file and build every logger it declares
//! - `emit` - Send one event through a configured logger
//! - `levels` - List severity levels

#![forbid(unsafe_code)]

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;
use serde_json::Value;

use logpipe::config::build_loggers;
use logpipe::sinks::severity;
use logpipe::{
    BuiltinCatalog, CapabilityCatalog, ConfigError, Level, LevelFilter, LoggingConfig,
    ProcessIdentity, load_config,
};

/// logpipe CLI - Validate logging configs and emit events.
#[derive(Parser)]
#[command(name = "logpipe")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file.
    ///
    /// Parses the file and builds every logger without opening any handler,
    /// then prints each logger's components.
    Check {
        /// Path to the config file (.toml, .yaml, .json).
        #[arg(env = "LOGPIPE_CONFIG")]
        config: Option<PathBuf>,

        /// Output format (text, json).
        #[arg(long, short = 'f', default_value = "text")]
        format: CheckFormat,
    },

    /// Emit one event through a logger.
    ///
    /// Loggers from the config file are registered next to the standard
    /// console logger. Unknown logger names use the standard logger.
    Emit {
        /// Message to log.
        message: String,

        /// Path to the config file (.toml, .yaml, .json).
        #[arg(long, short = 'c', env = "LOGPIPE_CONFIG")]
        config: Option<PathBuf>,

        /// Logger name to emit through.
        #[arg(long, short = 'l', default_value = "default")]
        logger: String,

        /// Severity of the event.
        #[arg(long, default_value = "info")]
        level: Level,

        /// Threshold for the standard console logger.
        #[arg(long, env = "LOGPIPE_LEVEL")]
        threshold: Option<Level>,

        /// Structured attributes (KEY=VALUE format).
        #[arg(long, short = 'a')]
        attr: Vec<String>,
    },

    /// List severity levels, most severe first.
    Levels,
}

/// Output format for the check command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
enum CheckFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for CheckFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {s}. Expected: text, json")),
        }
    }
}

#[derive(Debug)]
enum CliError {
    /// No config given and none found at the default location.
    NoConfig(Option<PathBuf>),
    Config(ConfigError),
    Attribute(String),
    Json(serde_json::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoConfig(Some(path)) => write!(
                f,
                "No config file given and {} does not exist",
                path.display()
            ),
            Self::NoConfig(None) => write!(f, "No config file given"),
            Self::Config(e) => write!(f, "{e}"),
            Self::Attribute(raw) => {
                write!(f, "Invalid attribute format (expected KEY=VALUE): {raw}")
            }
            Self::Json(e) => write!(f, "JSON output failed: {e}"),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

type CliResult<T> = Result<T, CliError>;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { config, format } => cmd_check(config, format),
        Commands::Emit {
            message,
            config,
            logger,
            level,
            threshold,
            attr,
        } => cmd_emit(&EmitArgs {
            message,
            config,
            logger,
            level,
            threshold,
            attrs: attr,
        }),
        Commands::Levels => {
            cmd_levels();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// `$XDG_CONFIG_HOME/logpipe/logpipe.toml` or the platform equivalent.
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("logpipe").join("logpipe.toml"))
}

/// Picks the explicit path, else the default one when it exists.
fn resolve_config(explicit: Option<PathBuf>, fallback: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| fallback.filter(|path| path.is_file()))
}

/// Splits `KEY=VALUE` pairs. Values that parse as JSON keep their type.
fn parse_attrs(raw: &[String]) -> CliResult<Vec<(String, Value)>> {
    raw.iter()
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| CliError::Attribute(pair.clone()))?;
            let value = serde_json::from_str(value).unwrap_or_else(|_| Value::from(value));
            Ok((key.to_string(), value))
        })
        .collect()
}

/// Check command: Parse and build without touching any sink.
fn cmd_check(config: Option<PathBuf>, format: CheckFormat) -> CliResult<()> {
    let fallback = default_config_path();
    let path = resolve_config(config, fallback.clone()).ok_or(CliError::NoConfig(fallback))?;
    let report = check_config(&path)?;

    match format {
        CheckFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        CheckFormat::Text => print_report(&path, &report),
    }
    Ok(())
}

/// Loads `path` and builds each logger with the builtin catalog.
fn check_config(path: &Path) -> CliResult<LoggingConfig> {
    let config = LoggingConfig::from_path(path)?;
    build_loggers(
        &config,
        &CapabilityCatalog::with_builtins(),
        &ProcessIdentity::current(),
    )?;
    Ok(config)
}

fn print_report(path: &Path, config: &LoggingConfig) {
    println!(
        "{} {} ({} logger{})",
        style("OK").green().bold(),
        path.display(),
        config.loggers.len(),
        if config.loggers.len() == 1 { "" } else { "s" }
    );
    for (name, logger) in &config.loggers {
        let handlers: Vec<&str> = logger.handlers.iter().map(|h| h.kind.as_str()).collect();
        println!();
        println!("  {}", style(name).cyan().bold());
        println!("    {:<10} {}", style("filter").dim(), logger.filter.kind);
        println!("    {:<10} {}", style("formatter").dim(), logger.formatter.kind);
        println!("    {:<10} {}", style("handlers").dim(), handlers.join(", "));
        println!("    {:<10} {:?}", style("swap").dim(), logger.swap_order);
    }
}

struct EmitArgs {
    message: String,
    config: Option<PathBuf>,
    logger: String,
    level: Level,
    threshold: Option<Level>,
    attrs: Vec<String>,
}

/// Emit command: Log one event, then flush and close every handler.
fn cmd_emit(args: &EmitArgs) -> CliResult<()> {
    let attrs = parse_attrs(&args.attrs)?;
    let registry = logpipe::standard_registry();
    if let Some(threshold) = args.threshold {
        registry
            .default_logger()
            .change_filter(Arc::new(LevelFilter::with_level(threshold)));
    }
    if let Some(path) = resolve_config(args.config.clone(), default_config_path()) {
        load_config(&registry, &path)?;
    }

    registry
        .get_logger(&args.logger)
        .log_with_attrs(args.level, args.message.as_str(), attrs);
    registry.flush_all();
    registry.close_all();
    Ok(())
}

/// Levels command: Print name, number and syslog severity.
fn cmd_levels() {
    println!(
        "{:<8} {:>3} {:>8}",
        style("LEVEL").bold(),
        style("NUM").bold(),
        style("SYSLOG").bold()
    );
    for level in Level::ALL {
        println!(
            "{:<8} {:>3} {:>8}",
            level.as_str(),
            level.as_num(),
            severity(level)
        );
    }
}
