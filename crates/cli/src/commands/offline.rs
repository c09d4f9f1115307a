//! `minebrain offline` — Talk to a simulated world from the terminal.
//!
//! Each stdin line is an operator chat message (the prefix is added when
//! missing). Everything the agent says is printed as `<name> text`.

use minebrain_agent::ChatPipeline;
use minebrain_bridge::{console, SimWorld};
use minebrain_core::{BlockPos, ChatEvent, GameClient, Vec3};
use minebrain_providers::ChatCompletionsProvider;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;

/// A small meadow with a chest, a tree trunk, some animals and the
/// operator standing nearby.
pub fn demo_world(username: &str, operator: &str) -> SimWorld {
    let world = SimWorld::new(username).with_floor(63, 24, "grass_block");
    world.give(0, "cobblestone", 64);
    world.give(1, "oak_planks", 64);
    world.give(2, "torch", 16);
    world.give(36, "iron_sword", 1);
    world.set_block(BlockPos::new(4, 64, 4), "chest");
    world.fill(BlockPos::new(0, 64, -4), BlockPos::new(0, 67, -4), "oak_log");
    world.spawn_entity("pig", Vec3::new(6.5, 64.0, -2.5), 10.0);
    world.spawn_entity("cow", Vec3::new(-5.5, 64.0, 3.5), 10.0);
    world.spawn_entity("zombie", Vec3::new(-8.5, 64.0, -8.5), 20.0);
    world.add_player(operator, Some(Vec3::new(2.5, 64.0, 2.5)));
    world
}

/// Prefix a console line unless the operator already typed the prefix.
pub fn with_prefix(prefix: &str, line: &str) -> String {
    if line.starts_with(prefix) {
        line.to_string()
    } else {
        format!("{prefix}{line}")
    }
}

pub async fn run(explicit: Option<PathBuf>, operator: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(explicit)?;
    let provider = Arc::new(ChatCompletionsProvider::from_config(&config.inference)?);

    let world = Arc::new(demo_world(&config.server.username, &operator));
    tokio::spawn(print_transcript(world.subscribe_chat(), world.username().to_string()));

    let pipeline = ChatPipeline::from_config(&config, world.clone(), provider);
    pipeline.announce().await;
    println!("Type requests for {} (Ctrl+D to quit).", world.username());

    let mut console = console::spawn_stdin(&operator);
    loop {
        let event = tokio::select! {
            event = console.recv() => event,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(event) = event else { break };
        let event = ChatEvent::new(&event.sender, with_prefix(&pipeline.settings().prefix, &event.message));

        tokio::select! {
            _ = pipeline.handle(event) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
        pipeline.dispatcher().flush().await;
    }

    // Let running KILL/BUILD tasks finish unless interrupted.
    while pipeline.dispatcher().ongoing() > 0 {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(200)) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    let cancelled = pipeline.dispatcher().cancel_all();
    info!(cancelled, "Offline session ended");
    Ok(())
}

async fn print_transcript(mut chat: broadcast::Receiver<ChatEvent>, username: String) {
    loop {
        match chat.recv().await {
            Ok(event) if event.sender == username => println!("<{}> {}", event.sender, event.message),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
