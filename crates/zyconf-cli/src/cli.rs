//! zyconf CLI - Command-line interface for zyconf configuration files
//!
//! Usage:
//!   zyconf get app.ini db.primary.url
//!   zyconf dump app.ini --resolve --format json
//!   zyconf check app.ini other.ini

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use zyconf_core::{Config, Entry, Item, Value};

/// zyconf - Read-only hierarchical INI configuration
#[derive(Parser)]
#[command(name = "zyconf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get a specific value from the configuration
    Get {
        /// Configuration file
        file: PathBuf,

        /// Path to the value (e.g., db.primary.host)
        path: String,

        /// Print the stored text without interpolation
        #[arg(long)]
        raw: bool,

        /// Output format: text, json, yaml
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Default value if the path is not found
        #[arg(short, long)]
        default: Option<String>,
    },

    /// Export configuration as YAML or JSON
    Dump {
        /// Configuration file to dump
        file: PathBuf,

        /// Resolve interpolations
        #[arg(short, long)]
        resolve: bool,

        /// Output format: yaml, json
        #[arg(short, long, default_value = "yaml")]
        format: String,

        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load each file and resolve every value
    Check {
        /// Configuration file(s) to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Why a command failed, which decides the exit status
#[derive(Debug)]
enum Failure {
    /// The file could not be read or built into a tree
    Load(String),
    /// A lookup, interpolation or output step failed
    Command(String),
}

impl Failure {
    fn exit_code(&self) -> ExitCode {
        match self {
            Failure::Load(_) => ExitCode::from(2),
            Failure::Command(_) => ExitCode::from(1),
        }
    }

    fn message(&self) -> &str {
        match self {
            Failure::Load(msg) | Failure::Command(msg) => msg.as_str(),
        }
    }
}

/// Run the CLI with the process arguments
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Get {
            file,
            path,
            raw,
            format,
            default,
        } => cmd_get(&file, &path, raw, &format, default).map(|out| print!("{}", out)),

        Commands::Dump {
            file,
            resolve,
            format,
            output,
        } => cmd_dump(&file, resolve, &format, output.as_deref()),

        Commands::Check { files } => cmd_check(&files),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("{}", failure.message());
            failure.exit_code()
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}

fn load_config(file: &Path) -> Result<Config, Failure> {
    let config = Config::read(file).map_err(|e| {
        Failure::Load(format!(
            "{} {}\n{}",
            "Failed to load".red(),
            file.display(),
            e
        ))
    })?;
    log::debug!("loaded {} with {} sections", file.display(), config.root().len());
    Ok(config)
}

fn cmd_get(
    file: &Path,
    path: &str,
    raw: bool,
    format: &str,
    default: Option<String>,
) -> Result<String, Failure> {
    let config = load_config(file)?;

    let result = if raw {
        config.lookup_raw(path).and_then(|entry| match entry {
            Entry::Value(value) => Ok(value.clone()),
            Entry::Node(node) => node.to_value(false),
        })
    } else {
        config.lookup(path).and_then(|item| match item {
            Item::Value(value) => Ok(value),
            Item::Node(node) => node.to_value(true),
        })
    };

    match result {
        Ok(value) => render(&value, format).map_err(Failure::Command),
        Err(e) if e.is_not_found() => match default {
            Some(default_val) => {
                log::debug!("{} not found, using default", path);
                Ok(format!("{}\n", default_val))
            }
            None => Err(Failure::Command(format!(
                "{}: Path '{}' not found\n{}",
                "Error".red(),
                path,
                e
            ))),
        },
        Err(e) => Err(Failure::Command(format!("{}: {}", "Error".red(), e))),
    }
}

/// Render a value for stdout, always newline-terminated
fn render(value: &Value, format: &str) -> Result<String, String> {
    match format {
        "json" => serde_json::to_string_pretty(value)
            .map(|s| format!("{}\n", s))
            .map_err(|e| e.to_string()),
        "yaml" => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        "text" => match value {
            Value::Sequence(_) | Value::Mapping(_) => {
                serde_yaml::to_string(value).map_err(|e| e.to_string())
            }
            Value::Null => Ok("None\n".to_string()),
            scalar => Ok(format!("{}\n", scalar)),
        },
        other => Err(format!(
            "Unsupported format: {}. Use text, json, or yaml.",
            other
        )),
    }
}

fn cmd_dump(file: &Path, resolve: bool, format: &str, output: Option<&Path>) -> Result<(), Failure> {
    let config = load_config(file)?;

    let content = match format {
        "json" => config.to_json(resolve).map(|s| format!("{}\n", s)),
        "yaml" | "yml" => config.to_yaml(resolve),
        other => {
            return Err(Failure::Command(format!(
                "Unsupported format: {}. Use yaml or json.",
                other
            )))
        }
    }
    .map_err(|e| Failure::Command(format!("{}: {}", "Error".red(), e)))?;

    match output {
        Some(output_path) => {
            std::fs::write(output_path, &content).map_err(|e| {
                Failure::Command(format!("{}: {}", "Error writing file".red(), e))
            })?;
            eprintln!("{} Wrote to {}", "✓".green(), output_path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn cmd_check(files: &[PathBuf]) -> Result<(), Failure> {
    let mut load_failed = false;
    let mut resolve_failed = false;

    for file in files {
        log::debug!("checking {}", file.display());
        let config = match Config::read(file) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                load_failed = true;
                continue;
            }
        };

        match config.resolve_all() {
            Ok(()) => println!(
                "{} {}: {} sections",
                "✓".green(),
                file.display(),
                config.root().len()
            ),
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                resolve_failed = true;
            }
        }
    }

    log::debug!(
        "checked {} files (load failed: {}, resolve failed: {})",
        files.len(),
        load_failed,
        resolve_failed
    );
    if load_failed {
        Err(Failure::Load("Some files could not be loaded".to_string()))
    } else if resolve_failed {
        Err(Failure::Command("Some values could not be resolved".to_string()))
    } else {
        Ok(())
    }
}
