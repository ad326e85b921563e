//! Pageforge CLI
//!
//! The `pageforge` command runs deployment rounds from request files.
//!
//! ## Commands
//!
//! - `run`: Execute one round against the configured services
//! - `validate`: Check a request file without contacting any service
//! - `fallback`: Print the placeholder page rendered when generation fails

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pageforge_core::generator::prompt::fallback_document;
use pageforge_core::{
    AppConfig, DeployResponse, ExpectedSecret, Orchestrator, RawTaskRequest, TaskRequest,
};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "pageforge")]
#[command(version = pageforge_core::VERSION)]
#[command(about = "Generate, publish and report single-page deployments", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one deployment round and print the response
    Run {
        /// Path to the task request (JSON)
        #[arg(short, long)]
        request: PathBuf,
    },

    /// Check a request file's shape and credential without any remote call
    Validate {
        /// Path to the task request (JSON)
        #[arg(short, long)]
        request: PathBuf,

        /// Expected credential
        #[arg(long, env = "STUDENT_SECRET", hide_env_values = true)]
        secret: String,
    },

    /// Print the fallback page for a brief
    Fallback {
        /// Brief to embed in the page
        #[arg(short, long)]
        brief: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    pageforge_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run { request } => {
            let config = AppConfig::from_env().context("Failed to load configuration")?;
            let orchestrator = Orchestrator::from_config(&config)
                .context("Failed to build deployment pipeline")?;
            let response = cmd_run(&orchestrator, &request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if !response.is_success() {
                bail!("deployment round failed");
            }
            Ok(())
        }
        Commands::Validate { request, secret } => {
            let validated = cmd_validate(&request, &secret)?;
            println!("{}", serde_json::to_string_pretty(&validated)?);
            Ok(())
        }
        Commands::Fallback { brief } => {
            println!("{}", fallback_document(&brief));
            Ok(())
        }
    }
}

fn read_request(path: &Path) -> Result<RawTaskRequest> {
    let body = std::fs::read(path)
        .with_context(|| format!("Failed to read request file {}", path.display()))?;
    Ok(RawTaskRequest::from_json(&body)?)
}

async fn cmd_run(orchestrator: &Orchestrator, path: &Path) -> Result<DeployResponse> {
    let raw = read_request(path)?;
    info!(path = %path.display(), "Running deployment round");
    let (_, response) = orchestrator.respond(raw).await;
    Ok(response)
}

fn cmd_validate(path: &Path, secret: &str) -> Result<TaskRequest> {
    let raw = read_request(path)?;
    ExpectedSecret::new(secret).verify(raw.secret.as_deref())?;
    let request = raw.validate()?;
    info!(task = %request.task, round = request.round, "Request is valid");
    Ok(request)
}
