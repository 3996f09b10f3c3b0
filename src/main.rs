use std::sync::Arc;

use anyhow::Context;
use lead_qualifier::app::build_router;
use lead_qualifier::config::Config;
use lead_qualifier::dashboard::{DashboardState, LeadReader};
use lead_qualifier::handoff::HandoffCoordinator;
use lead_qualifier::llm::create_provider;
use lead_qualifier::pipeline::{IntakeQueue, LeadClassifier, LeadProcessor, spawn_intake_worker};
use lead_qualifier::store::{LeadStore, SheetsScope, SheetsStore};
use lead_qualifier::webhook::WebhookState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Install rustls crypto provider before any TLS usage
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    let config = Config::from_env().context("Failed to load configuration")?;

    eprintln!("Lead Qualifier v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Sheet: {} ({})", config.sheets.spreadsheet_id, config.sheets.sheet_name);
    eprintln!("   Webhook: http://0.0.0.0:{}/webhook", config.port);
    eprintln!("   Dashboard API: http://0.0.0.0:{}/api/leads", config.port);

    // ── LLM ──────────────────────────────────────────────────────────────
    let llm = create_provider(&config.llm).context("Failed to create LLM provider")?;

    // ── Stores ───────────────────────────────────────────────────────────
    // Intake and handoff write; the dashboard reader only ever reads.
    let writer: Arc<dyn LeadStore> = Arc::new(
        SheetsStore::new(&config.sheets, SheetsScope::ReadWrite)
            .context("Failed to create sheet writer")?,
    );
    let reader: Arc<dyn LeadStore> = Arc::new(
        SheetsStore::new(&config.sheets, SheetsScope::ReadOnly)
            .context("Failed to create sheet reader")?,
    );

    // ── Intake pipeline ──────────────────────────────────────────────────
    let processor = Arc::new(LeadProcessor::new(
        LeadClassifier::new(llm),
        Arc::clone(&writer),
    ));
    let (queue, rx) = IntakeQueue::new(config.queue_capacity);
    let worker = spawn_intake_worker(rx, processor);

    // ── HTTP ─────────────────────────────────────────────────────────────
    let app = build_router(
        WebhookState {
            verify_token: Arc::new(config.verify_token.clone()),
            queue,
        },
        DashboardState {
            handoff: Arc::new(HandoffCoordinator::new(writer)),
            reader: Arc::new(LeadReader::new(reader)),
        },
    );

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Lead qualifier listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    // The router owned the last queue handle; the worker drains and exits.
    tracing::info!("Server stopped, draining intake queue");
    match worker.await {
        Ok(processed) => tracing::info!(processed, "Intake worker finished"),
        Err(e) => tracing::error!(error = %e, "Intake worker panicked"),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
