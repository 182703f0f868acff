//! Startup helpers for the clinic desk-agent server.

use std::process::ExitCode;
use std::sync::Arc;

use crate::appointments::store::{AppointmentStore, SqliteAppointmentStore};
use crate::chat::instructions::build_instructions;
use crate::chat::turn::TurnProcessor;
use crate::config::AgentConfig;
use crate::llm::gemini::{ChatModel, GeminiClient};
use crate::server::{self, AppState};

/// Run the server.
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting clinic desk agent v{}", env!("CARGO_PKG_VERSION"));

    let config = AgentConfig::from_env();
    if let Err(err) = config.validate() {
        tracing::error!("Invalid configuration: {err}");
        return ExitCode::from(1);
    }
    if config.gemini.api_key.is_empty() {
        // The server still starts; every chat turn will fail upstream.
        tracing::warn!("GEMINI_API_KEY is not set; chat turns will fail");
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            tracing::error!("Failed to create runtime: {err}");
            return ExitCode::from(1);
        }
    };

    if let Err(err) = rt.block_on(serve(config)) {
        tracing::error!("Server error: {err}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

async fn serve(config: AgentConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let instructions = build_instructions(&chrono::Local::now());
    let model: Arc<dyn ChatModel> = Arc::new(GeminiClient::new(&config.gemini, instructions)?);

    let store: Arc<dyn AppointmentStore> =
        Arc::new(SqliteAppointmentStore::open(&config.storage.sqlite_path).await?);
    tracing::info!(
        "Connected to the database at {}",
        config.storage.sqlite_path.display()
    );

    let state = AppState::new(TurnProcessor::new(model, store.clone()), store);
    server::run_server(state, config.server.port).await
}
