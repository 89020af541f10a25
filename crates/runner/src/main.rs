// main.rs
//
// Entry point: loads configuration, wires the session tasks together,
// and drains the outbound sink. A protocol transport owns the other
// ends of the two channels; until one is attached this binary logs
// outbound traffic so the core can be exercised end to end.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use bedrock_bot_core::config::Config;
use bedrock_bot_core::dispatch::{DispatchConfig, Dispatcher};
use bedrock_bot_core::events::{InboundEvent, OutboundPacket};
use bedrock_bot_core::game_state::GameStateHandle;
use bedrock_bot_core::llm::OllamaChat;
use bedrock_bot_core::player::movement::Wander;
use bedrock_bot_core::queue::EventQueue;
use bedrock_bot_core::receiver::start_receiver;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(Config::load_from_file("config.toml")?);
    info!(
        host = %config.host,
        port = config.port,
        username = %config.username,
        "starting bot"
    );

    let (inbound_tx, inbound_rx) = mpsc::channel::<InboundEvent>(512);
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<OutboundPacket>(512);

    let queue = Arc::new(Mutex::new(EventQueue::with_timeout(
        "incoming_messages",
        Duration::from_millis(config.bot.queue_timeout_ms),
    )));

    let game = GameStateHandle::new(
        Wander::new(config.bot.movement.clone()),
        Duration::from_millis(config.bot.tick_interval_ms),
        outbound_tx.clone(),
    );

    let _receiver = tokio::spawn(start_receiver(
        inbound_rx,
        Arc::clone(&queue),
        game,
        config.username.clone(),
    ));

    let dispatcher = Dispatcher::new(
        Arc::clone(&queue),
        outbound_tx.clone(),
        DispatchConfig {
            username: config.username.clone(),
            persona: config.bot.persona.clone(),
            admin_xuids: config.admin_xuids.clone(),
            interval: Duration::from_millis(config.bot.dispatch_interval_ms),
        },
    );
    let llm = OllamaChat {
        cfg: config.llm.clone(),
    };
    let _dispatch = tokio::spawn(async move { dispatcher.run(&llm).await });

    // Transport boundary: a real protocol adapter takes `inbound_tx`
    // and this drain loop. Keep the sender alive so the receiver task
    // stays up while we log outbound traffic.
    let _transport_inbound = inbound_tx;
    while let Some(packet) = outbound_rx.recv().await {
        match packet {
            OutboundPacket::Text {
                message,
                source_name,
            } => info!(%source_name, %message, "outbound chat"),
            OutboundPacket::AuthInput(p) => debug!(
                tick = p.tick,
                x = p.position.x,
                y = p.position.y,
                z = p.position.z,
                yaw = p.yaw,
                "outbound auth input"
            ),
            OutboundPacket::LoadingScreen { screen_type } => {
                info!(screen_type, "outbound loading screen")
            }
            OutboundPacket::Interact {
                action_id,
                target_entity_id,
                ..
            } => info!(%action_id, target_entity_id, "outbound interact"),
            OutboundPacket::LocalPlayerInitialized { runtime_entity_id } => {
                info!(runtime_entity_id, "outbound local player initialized")
            }
        }
    }

    Ok(())
}
