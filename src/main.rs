use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use skillpath::{cli, config};

#[derive(Parser)]
#[command(
    name = "skillpath",
    version,
    about = "Skill-gap-driven learning resource recommendations"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process recommendation jobs from the queue until Ctrl-C
    Work {
        /// Exit once the queue is empty instead of waiting for more jobs
        #[arg(long)]
        drain: bool,
    },
    /// Queue a recommendation job for an IDP
    Enqueue {
        #[arg(long)]
        user: String,
        #[arg(long)]
        idp: String,
    },
    /// Rank resources for an IDP and print them as JSON, without saving
    Recommend {
        #[arg(long)]
        user: String,
        #[arg(long)]
        idp: String,
        /// Number of results (defaults to ranking.top_n)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List the catalog skills most similar to a skill name
    Similar {
        skill: String,
        #[arg(short, default_value_t = 5)]
        k: usize,
    },
    /// Upsert skills, resources, users and IDPs from a JSON file
    Import {
        file: PathBuf,
        /// Queue a job for every imported IDP
        #[arg(long)]
        enqueue: bool,
    },
    /// Show an IDP's goals, status and suggested resources
    Inspect { idp: String },
    /// Check database health
    Doctor,
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.skillpath/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::SkillpathConfig::load()?;

    // stdout carries command output; logs go to stderr
    let filter =
        EnvFilter::try_new(&config.worker.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Work { drain } => {
            let stats = skillpath::worker::serve_queue(config, drain).await?;
            println!(
                "Processed {} job(s): {} completed, {} dropped, {} failed, {} discarded",
                stats.processed(),
                stats.completed,
                stats.dropped,
                stats.failed,
                stats.discarded
            );
        }
        Command::Enqueue { user, idp } => cli::enqueue::enqueue(&config, &user, &idp)?,
        Command::Recommend { user, idp, limit } => {
            cli::recommend::recommend(config, &user, &idp, limit).await?
        }
        Command::Similar { skill, k } => cli::similar::similar(config, &skill, k).await?,
        Command::Import { file, enqueue } => cli::import::import(&config, &file, enqueue)?,
        Command::Inspect { idp } => cli::inspect::inspect(&config, &idp)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config.embedding).await?,
        },
    }

    Ok(())
}
