use std::sync::Arc;

use anyhow::Context;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use facit_extract::{InvoicePipeline, OpenAiOracle};
use facit_ledger::FileLedger;

mod config;
mod routes;

use config::ServerConfig;
use routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    info!(
        ledger = %config.ledger_path.display(),
        decimal_style = ?config.decimal_style,
        "starting facit-server"
    );

    let pipeline = match config.oracle_config() {
        Some(oracle_config) => {
            let oracle = OpenAiOracle::new(oracle_config)
                .context("building the extraction client")?;
            Some(Arc::new(InvoicePipeline::new(oracle, config.decimal_style)))
        }
        None => {
            warn!("OPENAI_API_KEY not set; /process_invoice will answer with configuration errors");
            None
        }
    };

    let state = AppState {
        pipeline,
        ledger: Arc::new(FileLedger::new(&config.ledger_path)),
    };
    let app = routes::router(state).layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("listening on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
