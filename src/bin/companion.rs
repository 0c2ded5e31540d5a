use anyhow::Result;
use dotenvy::dotenv;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use halo::api::ApiClient;
use halo::core::Config;
use halo::features::ai::AiCompanion;
use halo::features::scheduler::SessionScheduler;
use halo::features::speech::{LocalTts, SpeechGate, TranscriptChunk};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting Halo Companion...");

    let client = Arc::new(ApiClient::new(config.api_base_url.clone()));
    let auth = client.login(&config.username, &config.password).await?;
    info!("🔑 Logged in as {}", auth.user.username);

    let speech = Arc::new(SpeechGate::new(Arc::new(LocalTts::new())));
    let ai = Arc::new(AiCompanion::new(
        config.ai_api_url.clone(),
        config.ai_model.clone(),
        config.ai_api_key.clone(),
    ));

    let scheduler = SessionScheduler::new(
        client.clone(),
        speech,
        ai,
        Duration::from_secs(config.reminder_check_secs),
        Duration::from_secs(config.memory_prompt_secs),
    );

    // No speech capture backend is wired in yet, so the transcript channel
    // stays open but idle. The scheduler handles chunks if a backend sends
    // them.
    let (_transcript_tx, transcript_rx) = mpsc::channel::<TranscriptChunk>(32);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let session = tokio::spawn(scheduler.run(transcript_rx, shutdown_rx));

    info!("🏠 Companion session running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    if shutdown_tx.send(true).is_err() {
        warn!("Session already stopped");
    }
    if let Err(e) = session.await {
        warn!("Session task ended abnormally: {e}");
    }
    client.logout().await;

    Ok(())
}
