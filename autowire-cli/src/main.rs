mod commands;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use autowire_core::{Analyzer, AnalyzerOptions};
use commands::{analyze, graph, trace, validate};

#[derive(Parser)]
#[command(
    name = "autowire",
    version,
    about = "Autowire CLI — analyze, validate, and visualize DI graphs"
)]
struct Cli {
    /// Source root(s) to scan (overrides autowire.yaml)
    #[arg(long, global = true)]
    src: Vec<PathBuf>,
    /// Output directory for generated configuration
    #[arg(long, global = true)]
    output: Option<PathBuf>,
    /// Active profiles
    #[arg(long, global = true, num_args = 1..)]
    profiles: Vec<String>,
    /// Treat partial-key resolution hits as errors
    #[arg(long, global = true)]
    strict: bool,
    /// Verbose logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the source tree and write the DI configuration artifact
    Analyze {
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run graph validation without writing anything
    Validate {
        /// Restrict to one issue category
        #[arg(long = "type", value_enum, default_value_t = validate::CheckType::All)]
        check_type: validate::CheckType,
        /// Print issues as JSON
        #[arg(long)]
        json: bool,
    },
    /// Explain how one token resolves, or list unresolved/circular ones
    Trace {
        /// Token to resolve (e.g. "LoggerInterface")
        token: Option<String>,
        /// List all missing dependencies instead
        #[arg(long)]
        missing: bool,
        /// List all dependency cycles instead
        #[arg(long)]
        circular: bool,
    },
    /// Render the projected dependency graph
    Graph {
        #[arg(long, value_enum, default_value_t = graph::Format::Ascii)]
        format: graph::Format,
        /// Class names to highlight
        #[arg(long, num_args = 1..)]
        highlight: Vec<String>,
        /// Limit the ascii rendering depth
        #[arg(long)]
        max_depth: Option<usize>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = match build_options(&cli) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let mut analyzer = Analyzer::new(options);

    let outcome = match &cli.command {
        Commands::Analyze { json } => analyze::run(&mut analyzer, *json),
        Commands::Validate { check_type, json } => {
            validate::run(&mut analyzer, *check_type, *json)
        }
        Commands::Trace {
            token,
            missing,
            circular,
        } => trace::run(&mut analyzer, token.as_deref(), *missing, *circular),
        Commands::Graph {
            format,
            highlight,
            max_depth,
        } => graph::run(&mut analyzer, *format, highlight, *max_depth),
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Options precedence: `autowire.yaml` when present, then CLI flags.
fn build_options(cli: &Cli) -> Result<AnalyzerOptions, autowire_core::AnalyzerError> {
    let config_path = Path::new("autowire.yaml");
    let mut options = if config_path.exists() {
        AnalyzerOptions::from_yaml_file(config_path)?
    } else {
        AnalyzerOptions::default()
    };

    if !cli.src.is_empty() {
        options.src_dirs = cli.src.clone();
    }
    if let Some(output) = &cli.output {
        options.output_dir = output.clone();
    }
    options.active_profiles.extend(cli.profiles.iter().cloned());
    if cli.strict {
        options.strict = true;
    }
    Ok(options)
}
