//! Shared bot core primitives: inbound event queue, wander-movement
//! synthesis, and the chat dispatch loop.
//!
//! The transport (RakNet session, packet batching, encryption) lives
//! outside this crate; it feeds `InboundEvent`s in through a channel and
//! drains `OutboundPacket`s out the other side.

pub mod config;
pub mod dispatch;
pub mod events;
pub mod game_state;
pub mod llm;
pub mod player;
pub mod queue;
pub mod receiver;
