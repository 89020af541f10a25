// queue.rs
//
// Ordered store of inbound events with a per-item processing lifecycle.
// Items are appended on arrival and never removed; terminal items stay
// behind as an audit trail. Timeouts are promoted lazily on status
// reads rather than by a background sweep.

use std::time::{Duration, Instant};

use tracing::warn;

use crate::events::TextPacket;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Received,
    Processing,
    Success,
    Error,
    TimedOut,
}

impl ItemStatus {
    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ItemStatus::Success | ItemStatus::Error | ItemStatus::TimedOut
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HistoryEntry {
    pub at: Instant,
    pub status: ItemStatus,
}

#[derive(Debug)]
pub struct QueueItem {
    pub packet: TextPacket,
    pub result: Option<String>,
    history: Vec<HistoryEntry>,
}

impl QueueItem {
    fn new(packet: TextPacket) -> Self {
        Self {
            packet,
            result: None,
            history: vec![HistoryEntry {
                at: Instant::now(),
                status: ItemStatus::Received,
            }],
        }
    }

    /// Append-only status history; never empty.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn last_status(&self) -> ItemStatus {
        // history is never empty by construction
        self.history
            .last()
            .map(|entry| entry.status)
            .unwrap_or(ItemStatus::Error)
    }

    fn push_status(&mut self, status: ItemStatus) {
        let last = self.last_status();
        if last.is_terminal() {
            warn!(?last, ?status, "rejected transition on terminal queue item");
            return;
        }
        self.history.push(HistoryEntry {
            at: Instant::now(),
            status,
        });
    }

    pub fn mark_processing(&mut self, result: Option<String>) {
        if result.is_some() {
            self.result = result;
        }
        self.push_status(ItemStatus::Processing);
    }

    pub fn mark_success(&mut self, result: Option<String>) {
        if result.is_some() {
            self.result = result;
        }
        self.push_status(ItemStatus::Success);
    }

    pub fn mark_error(&mut self) {
        self.push_status(ItemStatus::Error);
    }

    pub fn mark_timeout(&mut self) {
        self.push_status(ItemStatus::TimedOut);
    }

    /// Current status. A `Received` item older than `timeout` is
    /// promoted to `TimedOut` here, on the read path.
    pub fn get_status(&mut self, timeout: Option<Duration>) -> ItemStatus {
        let last = match self.history.last() {
            Some(entry) => *entry,
            None => return ItemStatus::Error,
        };
        if last.status == ItemStatus::Received {
            if let Some(timeout) = timeout {
                if last.at.elapsed() >= timeout {
                    self.mark_timeout();
                    return ItemStatus::TimedOut;
                }
            }
        }
        last.status
    }
}

#[derive(Debug)]
pub struct EventQueue {
    name: String,
    default_timeout: Duration,
    messages: Vec<QueueItem>,
}

impl EventQueue {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_timeout(name, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            default_timeout: timeout,
            messages: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn push(&mut self, packet: TextPacket) {
        self.messages.push(QueueItem::new(packet));
    }

    /// Index of the earliest item still worth handling, i.e. whose
    /// status after lazy timeout promotion is `Received` or
    /// `Processing`. Indices stay valid because items are never removed.
    pub fn next_message(&mut self) -> Option<usize> {
        let timeout = self.default_timeout;
        self.messages.iter_mut().position(|item| {
            matches!(
                item.get_status(Some(timeout)),
                ItemStatus::Received | ItemStatus::Processing
            )
        })
    }

    pub fn item_mut(&mut self, index: usize) -> Option<&mut QueueItem> {
        self.messages.get_mut(index)
    }

    /// Count of items matching any of the given statuses, or the total
    /// count when no filter is supplied.
    pub fn num_messages(&mut self, filter: Option<&[ItemStatus]>) -> usize {
        let Some(filter) = filter else {
            return self.messages.len();
        };
        let timeout = self.default_timeout;
        self.messages
            .iter_mut()
            .map(|item| item.get_status(Some(timeout)))
            .filter(|status| filter.contains(status))
            .count()
    }
}
