//! Progress delivery with disconnect-tolerant buffering.
//!
//! Tracks at most one live push channel per document id. Events sent while
//! no channel is live, or that a dead channel could not accept, go into a
//! per-document backlog that is flushed in original emission order when a
//! channel (re)connects. The backlog is unbounded and cleared only by being
//! flushed.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use crate::models::ProgressUpdate;

struct LiveChannel {
    conn_id: u64,
    tx: mpsc::UnboundedSender<ProgressUpdate>,
}

/// Both halves of a document's delivery state live in one slot so a DashMap
/// shard lock makes connect/send/disconnect atomic per document id.
#[derive(Default)]
struct ChannelSlot {
    live: Option<LiveChannel>,
    backlog: Vec<ProgressUpdate>,
}

/// Manager for per-document progress channels.
#[derive(Default)]
pub struct ProgressChannelManager {
    slots: DashMap<String, ChannelSlot>,
    next_conn_id: AtomicU64,
}

impl ProgressChannelManager {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            next_conn_id: AtomicU64::new(0),
        }
    }

    /// Register a live channel for `document_id`, replacing any prior one.
    ///
    /// Backlogged events are flushed into the new channel, oldest first,
    /// before it goes live, so a reconnecting client observes every event in
    /// emission order. Returns the connection id (for [`disconnect`]) and
    /// the receiving half.
    ///
    /// [`disconnect`]: ProgressChannelManager::disconnect
    pub fn connect(
        &self,
        document_id: &str,
    ) -> (u64, mpsc::UnboundedReceiver<ProgressUpdate>) {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        let mut slot = self.slots.entry(document_id.to_string()).or_default();
        let flushed = slot.backlog.len();
        for update in slot.backlog.drain(..) {
            // Cannot fail: we hold the receiver.
            let _ = tx.send(update);
        }
        // Dropping a replaced sender ends the old forwarder task.
        slot.live = Some(LiveChannel { conn_id, tx });

        debug!(document_id, conn_id, flushed, "Progress channel connected");
        (conn_id, rx)
    }

    /// Drop the live channel for `document_id`, but only if `conn_id` still
    /// identifies it. A forwarder that was replaced by a newer connection
    /// must not evict its replacement.
    pub fn disconnect(&self, document_id: &str, conn_id: u64) {
        if let Some(mut slot) = self.slots.get_mut(document_id)
            && slot.live.as_ref().is_some_and(|l| l.conn_id == conn_id)
        {
            slot.live = None;
            debug!(document_id, conn_id, "Progress channel disconnected");
        }
    }

    /// Deliver `update` to the live channel, or append it to the backlog
    /// when none is live or the live channel is gone. Never fails.
    pub fn send(&self, document_id: &str, update: ProgressUpdate) {
        let mut slot = self.slots.entry(document_id.to_string()).or_default();
        if let Some(live) = &slot.live {
            match live.tx.send(update) {
                Ok(()) => return,
                Err(mpsc::error::SendError(update)) => {
                    debug!(document_id, "Live channel gone, buffering event");
                    slot.live = None;
                    slot.backlog.push(update);
                    return;
                }
            }
        }
        slot.backlog.push(update);
    }

    /// Number of buffered events for a document (0 when unknown).
    pub fn backlog_len(&self, document_id: &str) -> usize {
        self.slots
            .get(document_id)
            .map(|slot| slot.backlog.len())
            .unwrap_or(0)
    }
}
