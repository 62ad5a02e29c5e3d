//! surface-diff: attack surface snapshot comparison tool
//!
//! Imports collection runs, compares them and scores every change against a
//! rule document.

#![allow(clippy::too_many_lines, clippy::needless_pass_by_value)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::io::{self, Write as _};
use std::path::PathBuf;
use surface_diff::{
    AppConfig, ConfigPreset, Validatable, cli,
    config::{self, CONFIG_FILE_NAMES, load_or_default},
    pipeline::exit_codes,
    reports::ReportFormat,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const fn build_long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\n\nSnapshot Input:",
        "\n  JSON run snapshots (Run + Observations)",
        "\n\nOutput Formats:",
        "\n  summary, json, ndjson, sarif",
        "\n\nFeatures:",
        "\n  Identity reconciliation, field-level diffs, rule-based severity analysis"
    )
}

#[derive(Parser)]
#[command(name = "surface-diff")]
#[command(author = "Binarly.io")]
#[command(version, long_version = build_long_version())]
#[command(about = "Attack surface snapshot comparison and analysis", long_about = None)]
#[command(after_help = "EXIT CODES:
    0  Success
    1  A result reached --fail-on severity / rules file failed validation
    3  Error occurred

EXAMPLES:
    # Import two collection runs
    surface-diff import monday.json tuesday.json

    # Compare them with the built-in rules
    surface-diff compare monday tuesday

    # CI gate: SARIF output, fail on anything at Fail or above
    surface-diff compare monday tuesday -o sarif -O surface.sarif --fail-on fail

    # Report every observation of a single run
    surface-diff export tuesday -o json")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output (also respects `NO_COLOR` env)
    #[arg(long, global = true)]
    no_color: bool,

    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Start from a named preset (default, audit, ci) before applying the config file
    #[arg(long, global = true)]
    preset: Option<String>,

    /// Directory holding imported runs and comparisons
    #[arg(long, global = true, env = "SURFACE_DIFF_STORE")]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Arguments for the `compare` subcommand
#[derive(Parser)]
struct CompareArgs {
    /// Base run id
    first: String,

    /// Run id compared against the base
    second: String,

    /// Skip rule analysis
    #[arg(long)]
    no_analyze: bool,

    /// JSON rule document (built-in rules if not specified)
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Skip a rule by name (repeatable)
    #[arg(long = "disable-rule", value_name = "NAME")]
    disabled_rules: Vec<String>,

    /// Recompute even if this comparison already completed
    #[arg(long)]
    force: bool,

    #[command(flatten)]
    output: OutputArgs,

    /// Exit with code 1 if any result reaches this severity
    #[arg(long, value_name = "SEVERITY")]
    fail_on: Option<String>,

    /// Worker threads (0 = all cores)
    #[arg(long, default_value = "0")]
    parallel: usize,
}

/// Output options shared by `compare` and `export`
#[derive(clap::Args)]
struct OutputArgs {
    /// Output format
    #[arg(short, long)]
    output: Option<ReportFormat>,

    /// Output file path (stdout if not specified)
    #[arg(short = 'O', long)]
    output_file: Option<PathBuf>,

    /// Compact JSON output
    #[arg(long)]
    compact: bool,

    /// Leave field-level diffs out of the report
    #[arg(long)]
    no_diffs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Import run snapshots into the store
    Import {
        /// Snapshot files
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// List stored runs
    Runs {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Delete a run and every comparison that references it
    Delete {
        /// Run id
        run: String,
    },

    /// Compare two stored runs
    Compare(CompareArgs),

    /// Export a single run, as a report of everything created or as a snapshot
    Export {
        /// Run id
        run: String,

        /// Write the stored run back out as a snapshot document
        #[arg(long)]
        snapshot: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Inspect or validate rule documents
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate JSON Schema for the config file format
    ConfigSchema {
        /// Write schema to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show, discover, or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate a man page and print it to stdout
    Man,
}

#[derive(Subcommand)]
enum RulesAction {
    /// Print the active rule set
    Show {
        /// Print the rule document as JSON
        #[arg(long)]
        json: bool,

        /// JSON rule document (built-in rules if not specified)
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Check that a rule document parses and every rule compiles
    Validate {
        /// Rule document
        file: PathBuf,
    },
}

/// Sub-subcommands for the `config` command
#[derive(Subcommand)]
enum ConfigAction {
    /// Print current effective configuration (merged from defaults + file)
    Show,
    /// Print config file search paths and discovered config file
    Path,
    /// Generate an example .surface-diff.yaml in the current directory
    Init,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    match run(cli) {
        Ok(code) => {
            if code != exit_codes::SUCCESS {
                std::process::exit(code);
            }
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(exit_codes::ERROR);
        }
    }
}

/// Effective configuration: preset, then config file, then CLI flags.
fn base_config(cli: &Cli) -> Result<AppConfig> {
    let (file_config, loaded_from) = load_or_default(cli.config.as_deref());
    if let Some(path) = &loaded_from {
        tracing::debug!("Loaded config from {}", path.display());
    }

    let mut config = match cli.preset.as_deref() {
        Some(name) => {
            let preset = ConfigPreset::from_name(name).with_context(|| {
                let names: Vec<&str> = ConfigPreset::all().iter().map(ConfigPreset::name).collect();
                format!("unknown preset '{name}' (expected one of: {})", names.join(", "))
            })?;
            let mut config = AppConfig::from_preset(preset);
            config.merge(&file_config);
            config
        }
        None => file_config,
    };

    let overrides = AppConfig::builder()
        .quiet(cli.quiet)
        .no_color(cli.no_color)
        .storage_directory(cli.storage.clone())
        .build();
    config.merge(&overrides);
    Ok(config)
}

fn apply_output_args(config: &mut AppConfig, args: OutputArgs) {
    if let Some(format) = args.output {
        config.output.format = format;
    }
    if args.output_file.is_some() {
        config.output.file = args.output_file;
    }
    if args.compact {
        config.output.pretty = false;
    }
    if args.no_diffs {
        config.output.include_diffs = false;
    }
}

fn validated(config: AppConfig) -> AppConfig {
    for error in config.validate() {
        tracing::warn!("Config: {error}");
    }
    config
}

fn run(cli: Cli) -> Result<i32> {
    let mut config = base_config(&cli)?;

    match cli.command {
        Commands::Import { paths } => {
            cli::run_import(&validated(config), &paths)?;
            Ok(exit_codes::SUCCESS)
        }

        Commands::Runs { json } => {
            cli::run_list_runs(&validated(config), json)?;
            Ok(exit_codes::SUCCESS)
        }

        Commands::Delete { run } => {
            cli::run_delete(&validated(config), &run)?;
            Ok(exit_codes::SUCCESS)
        }

        Commands::Compare(args) => {
            if args.no_analyze {
                config.compare.analyze = false;
            }
            if args.force {
                config.compare.force = true;
            }
            if args.parallel != 0 {
                config.compare.parallel = args.parallel;
            }
            if args.rules.is_some() {
                config.rules.file = args.rules;
            }
            for name in args.disabled_rules {
                if !config.rules.disabled.contains(&name) {
                    config.rules.disabled.push(name);
                }
            }
            if args.fail_on.is_some() {
                config.behavior.fail_on_severity = args.fail_on;
            }
            apply_output_args(&mut config, args.output);
            cli::run_compare(&validated(config), &args.first, &args.second)
        }

        Commands::Export {
            run,
            snapshot,
            output,
        } => {
            apply_output_args(&mut config, output);
            cli::run_export(&validated(config), &run, snapshot)
        }

        Commands::Rules { action } => match action {
            RulesAction::Show { json, rules } => {
                if rules.is_some() {
                    config.rules.file = rules;
                }
                cli::run_rules_show(&config, json)?;
                Ok(exit_codes::SUCCESS)
            }
            RulesAction::Validate { file } => cli::run_rules_validate(&file),
        },

        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "surface-diff", &mut io::stdout());
            Ok(exit_codes::SUCCESS)
        }

        Commands::ConfigSchema { output } => {
            let schema = config::generate_json_schema().context("failed to build schema")?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &schema)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!("Schema written to {}", path.display());
                }
                None => {
                    println!("{schema}");
                }
            }
            Ok(exit_codes::SUCCESS)
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                match config::discover_config_file(cli.config.as_deref()) {
                    Some(path) => eprintln!("# Loaded from: {}", path.display()),
                    None => eprintln!("# No config file found; showing defaults"),
                }
                let yaml =
                    serde_yaml_ng::to_string(&config).context("failed to serialize config")?;
                print!("{yaml}");
                Ok(exit_codes::SUCCESS)
            }
            ConfigAction::Path => {
                let search_paths: [Option<String>; 3] = [
                    std::env::current_dir()
                        .ok()
                        .map(|p| p.display().to_string()),
                    config::user_config_dir().map(|p| p.display().to_string()),
                    dirs::home_dir().map(|p| p.display().to_string()),
                ];
                eprintln!("Config file search paths (in order):");
                for path in search_paths.into_iter().flatten() {
                    eprintln!("  {path}");
                }
                eprintln!();
                eprintln!("Recognized file names:");
                for name in CONFIG_FILE_NAMES {
                    eprintln!("  {name}");
                }
                eprintln!();
                match config::discover_config_file(cli.config.as_deref()) {
                    Some(path) => eprintln!("Active config file: {}", path.display()),
                    None => eprintln!("No config file found."),
                }
                eprintln!(
                    "Store directory: {}",
                    config.storage.resolved_directory().display()
                );
                Ok(exit_codes::SUCCESS)
            }
            ConfigAction::Init => {
                let target = std::env::current_dir()
                    .context("cannot determine current directory")?
                    .join(".surface-diff.yaml");
                if target.exists() {
                    anyhow::bail!(
                        "{} already exists. Remove it first to re-initialize.",
                        target.display()
                    );
                }
                let content = config::generate_full_example_config();
                std::fs::write(&target, content)
                    .with_context(|| format!("failed to write {}", target.display()))?;
                eprintln!("Created {}", target.display());
                Ok(exit_codes::SUCCESS)
            }
        },

        Commands::Man => {
            let cmd = Cli::command();
            let man = clap_mangen::Man::new(cmd);
            let mut buf = Vec::new();
            man.render(&mut buf).context("failed to render man page")?;
            io::stdout().write_all(&buf)?;
            Ok(exit_codes::SUCCESS)
        }
    }
}
