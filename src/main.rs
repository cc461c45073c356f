use std::io::Write;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use nestscope::report::{self, ReportFormat};
use nestscope::runner::{self, RunConfig};

#[derive(Parser)]
#[command(name = "nestscope")]
#[command(version)]
#[command(about = "Find declared-but-unused NestJS module imports", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a directory or file for unnecessary module imports
    Check {
        /// Path to analyze (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Project root containing tsconfig.json
        #[arg(short, long, default_value = ".")]
        project: String,

        /// Only report modules owned by this owner (nearest OWNERS file)
        #[arg(short, long)]
        owner: Option<String>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,

        /// Include modules with no unnecessary imports
        #[arg(long)]
        all: bool,
    },
    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("nestscope={}", log_level))
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Some(Commands::Check {
            path,
            project,
            owner,
            json,
            all,
        }) => {
            let mut config = RunConfig::new(path, project);
            config.owner_filter = owner.clone();
            config.include_clean = *all;

            let format = if *json {
                ReportFormat::Json
            } else {
                ReportFormat::Text
            };
            match check(&config, format) {
                Ok(true) => ExitCode::from(1),
                Ok(false) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("error: {:#}", e);
                    ExitCode::from(2)
                }
            }
        }
        Some(Commands::Version) => {
            println!("nestscope v{}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        None => {
            println!("NestScope - unnecessary NestJS module import finder");
            println!("Run 'nestscope check' to analyze the current directory");
            println!("Run 'nestscope --help' for more information");
            ExitCode::SUCCESS
        }
    }
}

/// Runs the check and prints the reports; returns whether anything was
/// flagged, which drives the lint exit code.
fn check(config: &RunConfig, format: ReportFormat) -> Result<bool> {
    let reports = runner::run(config)?;
    let mut stdout = std::io::stdout().lock();
    report::write_reports(format, &reports, &mut stdout)?;
    stdout.flush()?;
    Ok(reports.iter().any(|r| r.has_unnecessary_imports()))
}
