//! Broadcast hub for dispatching bookmark changes to connected sessions.
//!
//! Uses a single `tokio::sync::broadcast` channel. Each connected session
//! subscribes and drops every event whose owner is not its user.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;

use bookmarks_common::gateway::EventName;

use crate::models::bookmark::Bookmark;

/// Capacity of the broadcast channel. Slow receivers that fall behind will
/// skip messages (RecvError::Lagged).
const BROADCAST_CAPACITY: usize = 4096;

/// A change broadcast to all connected gateway sessions.
#[derive(Debug, Clone)]
pub struct BroadcastPayload {
    /// Owner of the changed row; only this user's sessions receive it.
    pub user_id: String,
    /// The dispatch event name (e.g. "BOOKMARK_INSERT").
    pub event_name: &'static str,
    pub data: Value,
}

/// The change broadcast hub. Store in AppState behind an `Arc`.
pub struct ChangeBroadcast {
    sender: broadcast::Sender<Arc<BroadcastPayload>>,
}

impl Default for ChangeBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeBroadcast {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { sender }
    }

    /// Each gateway session calls this once to get its own receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<BroadcastPayload>> {
        self.sender.subscribe()
    }

    pub fn dispatch(&self, payload: BroadcastPayload) {
        // send() only fails when nobody is listening.
        let receivers = self.sender.send(Arc::new(payload)).unwrap_or(0);
        tracing::trace!(receivers, "change dispatched");
    }

    /// Announce a newly stored bookmark.
    pub fn bookmark_inserted(&self, bookmark: &Bookmark) {
        self.dispatch(BroadcastPayload {
            user_id: bookmark.user_id.clone(),
            event_name: EventName::BOOKMARK_INSERT,
            data: serde_json::to_value(bookmark).unwrap_or_default(),
        });
    }

    /// Announce a removed bookmark.
    pub fn bookmark_deleted(&self, user_id: &str, bookmark_id: &str) {
        self.dispatch(BroadcastPayload {
            user_id: user_id.to_string(),
            event_name: EventName::BOOKMARK_DELETE,
            data: serde_json::json!({ "id": bookmark_id }),
        });
    }
}
