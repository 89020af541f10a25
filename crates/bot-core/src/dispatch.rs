// dispatch.rs
//
// Slow poll over the inbound chat queue: claims the earliest actionable
// item, round-trips chat to the LLM, and emits the outbound reply.
//
// Claim-then-work: an item is marked Processing synchronously, before
// the LLM future is first polled, so two poll firings can never issue
// duplicate calls for the same item.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::events::{OutboundPacket, TextKind, TextPacket};
use crate::llm::{ChatMessage, LlmClient};
use crate::queue::{EventQueue, ItemStatus};

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Bot display name, used as the outbound chat source.
    pub username: String,
    /// System persona prepended to every LLM call.
    pub persona: String,
    /// XUIDs treated as privileged in the fallback template.
    pub admin_xuids: Vec<String>,
    pub interval: Duration,
}

pub struct Dispatcher {
    queue: Arc<Mutex<EventQueue>>,
    outbound: mpsc::Sender<OutboundPacket>,
    cfg: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<Mutex<EventQueue>>,
        outbound: mpsc::Sender<OutboundPacket>,
        cfg: DispatchConfig,
    ) -> Self {
        Self {
            queue,
            outbound,
            cfg,
        }
    }

    /// Runs until the outbound sink closes. Poll failures are logged
    /// and the loop keeps going; nothing here is fatal.
    pub async fn run(&self, llm: &dyn LlmClient) {
        let mut ticker = tokio::time::interval(self.cfg.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if self.outbound.is_closed() {
                debug!("outbound sink closed, stopping dispatch");
                break;
            }
            if let Err(err) = self.poll_once(llm).await {
                warn!(error = %err, "dispatch poll failed");
            }
        }
    }

    /// One dispatch firing. Handles at most one queue item.
    pub async fn poll_once(&self, llm: &dyn LlmClient) -> anyhow::Result<()> {
        // Claim under the lock. The LLM await below runs without it, so
        // inbound pushes and movement ticks keep flowing meanwhile.
        let claimed = {
            let mut queue = self.queue.lock().await;
            let Some(index) = queue.next_message() else {
                return Ok(());
            };
            let Some(item) = queue.item_mut(index) else {
                return Ok(());
            };
            match item.last_status() {
                ItemStatus::Received => {
                    if item.packet.kind == TextKind::Chat {
                        item.mark_processing(None);
                        Some((
                            index,
                            Some((item.packet.source_name.clone(), item.packet.message.clone())),
                        ))
                    } else {
                        // pass-through: nothing to say for non-chat events
                        item.mark_success(None);
                        None
                    }
                }
                ItemStatus::Processing => Some((index, None)),
                _ => None,
            }
        };
        let Some((index, pending_call)) = claimed else {
            return Ok(());
        };

        if let Some((source_name, message)) = pending_call {
            let messages = vec![
                ChatMessage::system(&self.cfg.persona),
                ChatMessage::user(&message),
            ];
            match llm.complete(messages).await {
                Ok(reply) => {
                    let mut queue = self.queue.lock().await;
                    if let Some(item) = queue.item_mut(index) {
                        item.mark_processing(Some(reply));
                    }
                }
                Err(err) => {
                    // degrade silently: no reply, no retry
                    warn!(error = %err, from = %source_name, "llm call failed, dropping reply");
                    let mut queue = self.queue.lock().await;
                    if let Some(item) = queue.item_mut(index) {
                        item.mark_success(None);
                    }
                    return Ok(());
                }
            }
        }

        // Flush: prefer the generated reply, else the templated echo.
        let message = {
            let mut queue = self.queue.lock().await;
            let Some(item) = queue.item_mut(index) else {
                return Ok(());
            };
            if item.last_status() != ItemStatus::Processing {
                return Ok(());
            }
            let message = match &item.result {
                Some(reply) => reply.clone(),
                None => self.fallback_reply(&item.packet),
            };
            item.mark_success(None);
            message
        };

        self.outbound
            .send(OutboundPacket::Text {
                message,
                source_name: self.cfg.username.clone(),
            })
            .await?;
        Ok(())
    }

    /// Templated echo used when no generated reply is attached.
    fn fallback_reply(&self, packet: &TextPacket) -> String {
        if self.cfg.admin_xuids.iter().any(|xuid| xuid == &packet.xuid) {
            format!("As you command, {}: {}", packet.source_name, packet.message)
        } else {
            format!("I heard you, {}: {}", packet.source_name, packet.message)
        }
    }
}
