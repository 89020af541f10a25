// receiver.rs
//
// Routes inbound transport events to the chat queue and the game state.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::events::InboundEvent;
use crate::game_state::GameStateHandle;
use crate::queue::EventQueue;

/// Consumes the transport's event stream until it closes.
pub async fn start_receiver(
    mut events: mpsc::Receiver<InboundEvent>,
    queue: Arc<Mutex<EventQueue>>,
    mut game: GameStateHandle,
    username: String,
) {
    while let Some(event) = events.recv().await {
        match event {
            InboundEvent::Connect => info!("connected to server"),
            InboundEvent::Spawn => game.handle_spawn().await,
            InboundEvent::StartGame(packet) => {
                if let Err(err) = game.handle_start_game(packet).await {
                    warn!(error = %err, "start_game handling failed");
                }
            }
            InboundEvent::Text(packet) => {
                // don't converse with our own chat echo
                if packet.source_name == username {
                    debug!("ignoring own chat echo");
                } else {
                    queue.lock().await.push(packet);
                }
            }
            InboundEvent::MovePlayer(packet) => game.handle_move_player(packet).await,
        }
    }
    debug!("inbound event stream closed");
}
