pub mod api;
pub mod chat;
pub mod config;
pub mod credentials;
pub mod db;
pub mod llm;
pub mod models;
pub mod store;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::RelayServer;
use crate::chat::ChatOrchestrator;
use crate::credentials::ApiKeyStore;
use crate::store::ChatStore;

/// The wired-up core: everything a UI needs to drive a chat session.
pub struct AppCore {
    pub store: Arc<ChatStore>,
    pub credentials: Arc<ApiKeyStore>,
    pub orchestrator: Arc<ChatOrchestrator>,
    pub relay: RelayServer,
}

/// Open the store and credential file, start the relay, and wire the
/// orchestrator against it.
pub async fn initialize() -> Result<AppCore, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(config::app_data_dir())?;

    let store = Arc::new(ChatStore::open(&config::database_path())?);
    let credentials = Arc::new(ApiKeyStore::load(config::credential_path()));

    let relay =
        api::start_relay_server(config::relay_bind_addr(), llm::anthropic::ANTHROPIC_API_URL)
            .await?;

    let orchestrator = Arc::new(ChatOrchestrator::new(
        store.clone(),
        credentials.clone(),
        relay.chat_url(),
    ));

    Ok(AppCore {
        store,
        credentials,
        orchestrator,
        relay,
    })
}

/// Run the app core until interrupted.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let mut core = initialize().await?;
    tracing::info!(addr = %core.relay.addr(), "Relay ready");
    if !core.credentials.has_key() {
        tracing::warn!("No API key configured — chat will prompt for one");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    core.relay.shutdown();
    Ok(())
}
