use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use bitable_client::BitableClient;
use browserless_client::BrowserlessClient;
use notesync_common::{Annotations, BrowserlessConfig, Config, WorkflowState};
use notesync_extract::{extract, normalize_timestamp, HtmlSurface, ROOT_SELECTOR};
use notesync_reconcile::Workflow;

#[derive(Parser)]
#[command(name = "notesync")]
#[command(about = "Collect Xiaohongshu notes into a Feishu Bitable table")]
#[command(version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a note page and print the record as JSON
    Extract {
        /// Note page URL
        #[arg(long)]
        url: String,

        /// Read the rendered page from a saved HTML file instead of Browserless
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Extract a note page and upsert it into the configured table
    Sync {
        /// Note page URL
        #[arg(long)]
        url: String,

        /// Read the rendered page from a saved HTML file instead of Browserless
        #[arg(long)]
        html: Option<PathBuf>,

        /// Free-text note stored in the 批注 column
        #[arg(long, default_value = "")]
        note: String,

        /// Keywords stored in the 关键词 column
        #[arg(long, default_value = "")]
        keywords: String,
    },

    /// Normalize a display date ("3天前", "昨天 14:30", "06-01") against the current time
    NormalizeTime {
        /// Raw date text as shown on the page
        raw: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.json_logs)?;

    match cli.command {
        Commands::Extract { url, html } => {
            let browserless = BrowserlessConfig::from_env();
            let surface = load_surface(&url, html.as_deref(), browserless.as_ref()).await?;
            let record = extract(&surface)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Sync {
            url,
            html,
            note,
            keywords,
        } => {
            let config = Config::from_env()?;
            config.log_redacted();

            let surface = load_surface(&url, html.as_deref(), config.browserless.as_ref()).await?;
            let client = Arc::new(BitableClient::new(&config.api_base)?);
            let workflow = Workflow::new(config, client.clone(), client).with_observer(report);

            let outcome = workflow.run(&surface, &Annotations { note, keywords }).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if !outcome.is_success() {
                return Err(anyhow!(outcome.message()));
            }
        }
        Commands::NormalizeTime { raw } => {
            println!("{}", normalize_timestamp(&raw, chrono::Local::now().naive_local()));
        }
    }

    Ok(())
}

fn init_logging(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("notesync=info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

/// Saved snapshot when given, otherwise a Browserless render that waits for
/// the note container.
async fn load_surface(
    url: &str,
    html: Option<&Path>,
    browserless: Option<&BrowserlessConfig>,
) -> Result<HtmlSurface> {
    let html = match (html, browserless) {
        (Some(path), _) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, Some(browserless)) => {
            let client = BrowserlessClient::new(&browserless.base_url, browserless.token.as_deref())?;
            client.render(url, Some(ROOT_SELECTOR)).await?.html
        }
        (None, None) => bail!("BROWSERLESS_URL is not set; pass --html with a saved page instead"),
    };
    info!(url, bytes = html.len(), "Loaded page");
    Ok(HtmlSurface::parse(url, &html))
}

fn report(state: &WorkflowState) {
    match state {
        WorkflowState::Idle => {}
        WorkflowState::Collecting => eprintln!("1. Analyzing note..."),
        WorkflowState::Reconciling => eprintln!("2. Checking for an existing record..."),
        WorkflowState::Done(outcome) => eprintln!("{}", outcome.message()),
        WorkflowState::Error(reason) => eprintln!("Sync failed: {reason}"),
    }
}
