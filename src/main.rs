//! Budget Bot - household income and expense logging over Telegram
//!
//! A Rust service implementing a per-user conversation state machine that
//! collects entries step by step and appends them to a ledger.

mod config;
mod keyboard;
mod ledger;
mod listener;
mod runtime;
mod session;
mod state_machine;
mod transport;

use config::{BotConfig, StartupError};
use ledger::SqliteLedger;
use listener::Listener;
use runtime::{ProductionManager, SystemClock, TelegramAdapter};
use session::InMemorySessionStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::TelegramClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "budget_bot=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Startup failed");
        return Err(e.into());
    }
    Ok(())
}

async fn run() -> Result<(), StartupError> {
    let config = BotConfig::from_env()?;

    // Ensure ledger directory exists
    if let Some(parent) = config.ledger_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.ledger_path.display(), "Opening ledger");
    let ledger = SqliteLedger::open(&config.ledger_path)?;

    let client = Arc::new(TelegramClient::new(
        &config.token,
        &config.api_url,
        config.poll_timeout,
    )?);

    // Fail fast on a bad token or unreachable API
    let me = client.get_me().await?;
    tracing::info!(
        bot_id = me.id,
        username = me.username.as_deref().unwrap_or(&me.first_name),
        currency = %config.currency,
        "Bot started"
    );

    let adapter = TelegramAdapter::new(client);
    let manager: Arc<ProductionManager> = Arc::new(runtime::RuntimeManager::new(
        Arc::new(InMemorySessionStore::new()),
        ledger,
        adapter.clone(),
        SystemClock,
        config.currency.clone(),
    ));

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let result = Listener::new(adapter, manager.clone(), cancel).run().await;

    // Let in-flight conversations finish their current step
    manager.shutdown().await;
    tracing::info!("Bot stopped");

    result.map_err(StartupError::from)
}

/// Cancels `token` on SIGINT or SIGTERM
async fn shutdown_signal(token: CancellationToken) {
    use tokio::signal::unix::{signal, SignalKind};

    let interrupt = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received SIGINT - shutting down"),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGINT handler");
                std::future::pending::<()>().await;
            }
        }
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM - shutting down");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        () = interrupt => {}
        () = terminate => {}
    }

    token.cancel();
}
