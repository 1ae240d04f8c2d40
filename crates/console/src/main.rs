mod render;
mod session;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repairdesk_core::{
    load_config_or_default, validate_config, JsonFileBackend, LogFormat, LoggingConfig,
    PurgeTimer, SystemClock, TicketStore,
};

use session::{Feedback, Session};

/// Config file used when `REPAIRDESK_CONFIG` is not set
const DEFAULT_CONFIG_PATH: &str = "repairdesk.toml";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        eprintln!("Application failed to start: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Determine config path
    let config_path = std::env::var("REPAIRDESK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = load_config_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    init_logging(&config.logging);
    info!("Configuration loaded from {:?}", config_path);
    info!("Data directory: {:?}", config.storage.data_dir);

    let backend = JsonFileBackend::new(&config.storage.data_dir, &config.storage.file_name)
        .context("Could not create data directory")?;
    let store = TicketStore::open(Box::new(backend), Box::new(SystemClock))
        .context("Could not load data")?
        .with_retention_days(config.retention.repaired_days);
    info!("Ticket store initialized with {} tickets", store.len());

    let mut session = Session::new(store);
    emit(&session.startup());

    // First tick is immediate: purge once at startup, then on every period.
    let mut purge_timer = PurgeTimer::new(config.retention.purge_interval());
    purge_timer.tick().await;
    emit(&session.run_purge());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while !session.is_finished() {
        show_prompt(&session.prompt());

        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read input")? {
                    Some(line) => emit(&session.handle_line(&line)),
                    None => break,
                }
            }
            _ = purge_timer.tick() => {
                let feedback = session.run_purge();
                if !feedback.is_empty() {
                    // Move past the pending prompt
                    println!();
                    emit(&feedback);
                }
            }
        }
    }

    info!("Session ended with {} tickets", session.store().len());
    Ok(())
}

/// Logs go to stderr so they never interleave with the table on stdout.
fn init_logging(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.level.as_str().into());

    let (text, json) = match config.format {
        LogFormat::Text => (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}

fn emit(feedback: &[Feedback]) {
    for item in feedback {
        match item {
            Feedback::Error(_) | Feedback::Warning(_) => eprintln!("{}", item.render()),
            _ => println!("{}", item.render()),
        }
    }
}

fn show_prompt(prompt: &str) {
    print!("{prompt}");
    let _ = std::io::stdout().flush();
}
