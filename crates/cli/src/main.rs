use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use uplift_core::{
    create_journal, load_config, Config, HttpReadyClient, HttpUploadClient, ReadyListView,
    StatusLine, UploadOrchestrator, UploadPayload, WsConnector,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Buffer size for the workflow event journal channel
const JOURNAL_BUFFER_SIZE: usize = 1000;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let file = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => bail!("Usage: uplift <media-file>"),
    };

    // Determine config path
    let config_path = std::env::var("UPLIFT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    let config = if config_path.exists() {
        info!("Loading configuration from {:?}", config_path);
        load_config(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        info!("No config file at {:?}, using defaults", config_path);
        Config::default()
    };

    info!(
        "uplift v{} targeting {}",
        VERSION, config.endpoints.base_url
    );

    let (journal, recorder, log) = create_journal(JOURNAL_BUFFER_SIZE);
    tokio::spawn(recorder.run());

    let client = Arc::new(HttpUploadClient::new(
        config.endpoints.clone(),
        config.upload.clone(),
        journal.clone(),
    ));
    let connector = Arc::new(WsConnector::new());
    let ready = Arc::new(ReadyListView::new(
        Arc::new(HttpReadyClient::new(config.endpoints.clone())),
        journal.clone(),
    ));

    let orchestrator = UploadOrchestrator::new(
        config.endpoints.clone(),
        config.retry.clone(),
        client,
        connector,
        journal,
        log.clone(),
        Some(Arc::clone(&ready)),
    );
    orchestrator.start().await;

    let bytes = tokio::fs::read(&file)
        .await
        .with_context(|| format!("Failed to read {:?}", file))?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.bin")
        .to_string();
    info!("Uploading {} ({} bytes)", file_name, bytes.len());
    let payload = UploadPayload::new(file_name, content_type_for(&file), bytes);

    // Subscribe before submitting so terminal transitions are never missed.
    let mut status_rx = orchestrator.status_line();
    if !orchestrator.upload(payload).await {
        bail!("Upload refused: an attempt is already in flight");
    }

    let completed = loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break false;
            }
            changed = status_rx.changed() => {
                if changed.is_err() {
                    break false;
                }
                let line = status_rx.borrow_and_update().clone();
                println!("status: {line}");
                match line {
                    StatusLine::Completed => break true,
                    StatusLine::Failed { .. } => break false,
                    _ => {}
                }
            }
        }
    };

    if completed {
        let jobs = ready.jobs().await;
        println!("ready: {}", jobs.join(", "));
        if let Some(selected) = ready.selected().await {
            println!("manifest: {}", config.endpoints.manifest_url(&selected));
        }
    }

    println!("--- event journal ---");
    for entry in log.entries().await {
        let event = serde_json::to_string(&entry.event).unwrap_or_default();
        println!("{} {}", entry.timestamp.format("%H:%M:%S%.3f"), event);
    }

    orchestrator.stop().await;
    Ok(())
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp4" | "m4v") => "video/mp4",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}
