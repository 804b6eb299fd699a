pub mod api;
pub mod config;
pub mod crypto;
pub mod db;
pub mod models;
pub mod patients;
pub mod reminders;
pub mod schedule;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::api::{ApiContext, ChannelStatus};
use crate::config::{ConfigError, ServiceConfig};
use crate::db::{Database, DatabaseError};
use crate::patients::SqlitePatientStore;
use crate::reminders::channels::{
    ChannelError, DisabledChannel, GatewayPushChannel, HttpPushGateway, TwilioVoiceChannel,
};
use crate::reminders::llm::{LlmClassifier, LlmError, OllamaClient};
use crate::reminders::{
    start_reminder_loop, DailyReset, PushChannel, ReminderTicker, SpeechInterpreter,
    SqliteReminderStore, VoiceChannel,
};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Channel setup failed: {0}")]
    Channel(#[from] ChannelError),

    #[error("LLM client setup failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Server error: {0}")]
    Server(String),
}

/// Outbound collaborators picked from configuration.
struct Collaborators {
    push: Arc<dyn PushChannel>,
    voice: Arc<dyn VoiceChannel>,
    interpreter: Arc<SpeechInterpreter>,
    status: ChannelStatus,
}

/// Build the push, voice and LLM collaborators. Anything unconfigured is
/// replaced by a disabled stand-in so the rest of the service still runs.
///
/// The HTTP clients here are blocking; build them outside the async runtime.
fn build_collaborators(config: &ServiceConfig, db: Arc<Database>) -> Result<Collaborators, StartupError> {
    let timeout = config.channel_timeout_secs;
    let mut status = ChannelStatus::default();

    let push: Arc<dyn PushChannel> = match &config.push_gateway_url {
        Some(url) => {
            status.push = true;
            let gateway = HttpPushGateway::new(url, timeout)?;
            Arc::new(GatewayPushChannel::new(db, Box::new(gateway)))
        }
        None => {
            tracing::warn!("Push gateway not configured; push reminders disabled");
            Arc::new(DisabledChannel::push())
        }
    };

    let voice: Arc<dyn VoiceChannel> = match &config.twilio {
        Some(twilio) => {
            status.voice = true;
            Arc::new(TwilioVoiceChannel::new(twilio.clone(), timeout)?)
        }
        None => {
            tracing::warn!("Twilio credentials not configured; reminder calls disabled");
            Arc::new(DisabledChannel::voice())
        }
    };

    let interpreter = match &config.ollama {
        Some(ollama) => {
            status.llm = true;
            let client = OllamaClient::new(&ollama.base_url, timeout)?;
            tracing::info!(model = %ollama.model, "LLM fallback enabled for speech interpretation");
            SpeechInterpreter::with_llm(LlmClassifier::new(Arc::new(client), &ollama.model))
        }
        None => {
            tracing::warn!("Ollama not configured; speech interpretation is keyword-only");
            SpeechInterpreter::keyword_only()
        }
    };

    Ok(Collaborators {
        push,
        voice,
        interpreter: Arc::new(interpreter),
        status,
    })
}

/// Start the service: reminder loop on its own thread, HTTP API on tokio.
/// Returns when the process receives ctrl-c.
pub fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = ServiceConfig::from_env()?;
    let db = Arc::new(Database::open(&config.db_path)?);
    tracing::info!(path = %config.db_path.display(), "Database ready");

    let store = Arc::new(SqliteReminderStore::new(db.clone()));
    let patients = Arc::new(SqlitePatientStore::new(
        db.clone(),
        config.data_key.clone(),
        config.adherence_retention,
    ));
    let collaborators = build_collaborators(&config, db.clone())?;

    let ticker = ReminderTicker::new(
        store.clone(),
        patients.clone(),
        collaborators.push.clone(),
        collaborators.voice.clone(),
        &config.public_url,
    );
    let reminder_loop = start_reminder_loop(ticker, DailyReset::new(store.clone()), config.tick_secs);

    let ctx = ApiContext::new(
        db,
        store,
        patients,
        collaborators.interpreter.clone(),
        &config.public_url,
        collaborators.status,
    );

    let runtime = tokio::runtime::Runtime::new()?;
    let served = runtime.block_on(serve_until_ctrl_c(ctx, config.bind_addr));

    reminder_loop.shutdown();
    drop(reminder_loop);
    tracing::info!("{} stopped", config::APP_NAME);
    served
}

async fn serve_until_ctrl_c(ctx: ApiContext, addr: std::net::SocketAddr) -> Result<(), StartupError> {
    let mut server = api::start_api_server(ctx, addr)
        .await
        .map_err(StartupError::Server)?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl-c");
    }
    server.shutdown();
    // Let in-flight requests drain
    tokio::time::sleep(Duration::from_millis(200)).await;
    Ok(())
}
