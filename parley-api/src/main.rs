//! # Parley API Server
//!
//! Email/password accounts with verification and password reset, and a chat
//! relay that stores conversations and forwards them to a language model.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/parley JWT_SECRET=... cargo run -p parley-api
//! ```
//!
//! Set `LOG_FORMAT=json` for JSON log lines.

use std::sync::Arc;

use parley_api::{
    app::{build_router, AppState, Services},
    config::Config,
};
use parley_shared::{
    db::{migrations::run_migrations, pool},
    llm::http::HttpChatModel,
    mail::{log::LogMailer, smtp::SmtpMailer, Mailer},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "parley_api=debug,parley_shared=debug,tower_http=info".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Parley API v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let db = pool::create_pool(config.pool_config()).await?;
    run_migrations(&db).await?;

    let mailer: Arc<dyn Mailer> = match &config.mail.smtp {
        Some(settings) => {
            tracing::info!(host = %settings.host, port = settings.port, "Using SMTP mailer");
            Arc::new(SmtpMailer::new(settings)?)
        }
        None => {
            tracing::warn!("SMTP_HOST not set; emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    if config.llm.api_key.is_empty() {
        tracing::warn!("LLM_API_KEY not set; chat requests will be rejected upstream");
    }
    let llm = Arc::new(HttpChatModel::new(config.llm.clone())?);

    let bind_address = config.bind_address();
    let state = AppState::new(config, Services::postgres(db.clone(), mailer, llm));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool::close_pool(db).await;
    tracing::info!("Server stopped");

    Ok(())
}
