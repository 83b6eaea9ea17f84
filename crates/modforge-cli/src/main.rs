//! `modforge`: offline access to the module analyzers, the tool catalog and
//! the configured model settings.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use modforge_agent::ModforgeSettings;
use modforge_tools::analyzers::{lint, security, syntax};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "modforge", about = "Modforge: AI extension module toolkit")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "modforge.toml")]
    config: PathBuf,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print tool function schemas
    Tools {
        /// Only this tool
        #[arg(long)]
        name: Option<String>,
    },
    /// Check a file for syntax errors
    Check {
        file: PathBuf,
        /// javascript | js | css (default: from the extension)
        #[arg(short, long)]
        language: Option<String>,
    },
    /// Lint a file and print its quality score
    Lint {
        file: PathBuf,
        #[arg(short, long)]
        language: Option<String>,
    },
    /// Scan JavaScript for risky patterns
    Scan { file: PathBuf },
    /// Validate a {config_items, config_values} JSON document
    ValidateConfig { file: PathBuf },
    /// Show configured models and the one a develop run would use
    Models,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn read_source(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read '{}'", path.display()))
}

fn exit_status(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Commands::Tools { name } => {
            print_json(&commands::tool_schemas(name.as_deref())?)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check { file, language } => {
            let language = commands::resolve_language(&file, language.as_deref())?;
            let code = read_source(&file).await?;
            let result = syntax::check_syntax(&code, language);
            info!(
                file = %file.display(),
                language = language.as_str(),
                errors = result.errors.len(),
                warnings = result.warnings.len(),
                "syntax check finished"
            );
            print_json(&result)?;
            Ok(exit_status(result.valid))
        }
        Commands::Lint { file, language } => {
            let language = commands::resolve_language(&file, language.as_deref())?;
            let code = read_source(&file).await?;
            let report = lint::lint(&code, language);
            info!(file = %file.display(), score = report.score, "lint finished");
            print_json(&report)?;
            Ok(exit_status(report.syntax_result.valid))
        }
        Commands::Scan { file } => {
            let code = read_source(&file).await?;
            let result = security::scan_security(&code);
            info!(
                file = %file.display(),
                issues = result.issues.len(),
                risk = ?result.risk_level,
                "security scan finished"
            );
            print_json(&result)?;
            Ok(exit_status(result.safe))
        }
        Commands::ValidateConfig { file } => {
            let text = read_source(&file).await?;
            let result = commands::validate_config_document(&text)?;
            print_json(&result)?;
            Ok(exit_status(result.valid))
        }
        Commands::Models => {
            let settings = ModforgeSettings::load(&cli.config)?;
            debug!(config = %cli.config.display(), "settings loaded");
            print_json(&commands::model_report(&settings.providers))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
