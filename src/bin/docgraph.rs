//! Binary entry point for the docgraph CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Build and persist the graph for a source tree
//! docgraph src/ https://docs.example.com/api 2.1
//!
//! # Resolve only, printing the graph
//! docgraph src/api.js --no-persist --emit-graph
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use docgraph::cli::{run_build, BuildOptions, DEFAULT_DB};
use docgraph::error::{DocError, OutputErrorCode};
use docgraph::output::{emit_response, ErrorResponse};

/// Resolve documentation comments into a graph and store it.
///
/// Output is a single JSON document on stdout.
#[derive(Parser, Debug)]
#[command(name = "docgraph", version, about = "Resolve documentation comments into a graph")]
struct Cli {
    /// Source file or directory.
    source: PathBuf,

    /// Base URI for rewritten `{@link}` markup.
    link_base: Option<String>,

    /// Version label for this build.
    #[arg(value_name = "VERSION")]
    doc_version: Option<String>,

    /// SQLite database file.
    #[arg(long, default_value = DEFAULT_DB)]
    db: PathBuf,

    /// Include glob for directory sources (repeatable; default `**/*.js`, `**/*.ts`).
    #[arg(long = "include", value_name = "GLOB")]
    include: Vec<String>,

    /// Resolve only; do not open the database.
    #[arg(long)]
    no_persist: bool,

    /// Include the resolved graph in the output.
    #[arg(long)]
    emit_graph: bool,

    /// Log every skipped node and reference to stdout at debug level.
    #[arg(long)]
    debug: bool,

    /// Log level for tracing output.
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

impl Cli {
    fn options(&self) -> BuildOptions {
        let mut options = BuildOptions::new(&self.source)
            .with_db_path(&self.db)
            .with_include(self.include.clone())
            .with_persist(!self.no_persist)
            .with_emit_graph(self.emit_graph);
        if let Some(base) = &self.link_base {
            options = options.with_link_base(base);
        }
        if let Some(version) = &self.doc_version {
            options = options.with_version(version);
        }
        options
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.debug {
        LogLevel::Debug
    } else {
        cli.log_level
    };
    init_tracing(level, cli.debug);

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON like every other response
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

fn execute(cli: &Cli) -> Result<(), DocError> {
    let response = run_build(&cli.options())?;
    emit_response(&response, &mut io::stdout())
        .map_err(|e| DocError::internal(format!("failed to write output: {}", e)))?;
    Ok(())
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, to_stdout: bool) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false);

    if to_stdout {
        builder.with_writer(io::stdout).init();
    } else {
        builder.with_writer(io::stderr).init();
    }
}
