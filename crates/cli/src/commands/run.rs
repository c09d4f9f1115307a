//! `minebrain run` — Join a server through the game bridge and serve chat.

use minebrain_agent::ChatPipeline;
use minebrain_bridge::RemoteGameClient;
use minebrain_core::GameClient;
use minebrain_providers::ChatCompletionsProvider;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub async fn run(explicit: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(explicit)?;
    let provider = Arc::new(ChatCompletionsProvider::from_config(&config.inference)?);

    let client = RemoteGameClient::connect(
        &config.bridge.address,
        config.server.login_options(),
        Duration::from_secs(config.bridge.request_timeout_secs),
    )
    .await?;
    let game: Arc<dyn GameClient> = Arc::new(client);
    info!(username = game.username(), server = %config.server.host, "Agent online");

    // Subscribe before announcing so the first replies are not missed.
    let chat = game.subscribe_chat();
    let pipeline = Arc::new(ChatPipeline::from_config(&config, game, provider));
    pipeline.announce().await;

    let serve = tokio::spawn(pipeline.clone().run(chat));
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
        _ = serve => warn!("Chat source closed"),
    }

    let cancelled = pipeline.dispatcher().cancel_all();
    if cancelled > 0 {
        info!(cancelled, "Stopped ongoing tasks");
    }
    Ok(())
}
