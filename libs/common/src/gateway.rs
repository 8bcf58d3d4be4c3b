//! Gateway opcodes, event names, and wire-format messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bookmark::{Bookmark, ChangeEvent};

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

pub const OP_DISPATCH: u8 = 0;
pub const OP_HEARTBEAT: u8 = 1;
pub const OP_IDENTIFY: u8 = 2;
pub const OP_HEARTBEAT_ACK: u8 = 6;

// ---------------------------------------------------------------------------
// Close codes (4000-range for application-level)
// ---------------------------------------------------------------------------

pub const CLOSE_UNKNOWN_ERROR: u16 = 4000;
pub const CLOSE_UNKNOWN_OPCODE: u16 = 4001;
pub const CLOSE_NOT_AUTHENTICATED: u16 = 4003;
pub const CLOSE_AUTH_FAILED: u16 = 4004;
pub const CLOSE_SESSION_TIMEOUT: u16 = 4009;

// ---------------------------------------------------------------------------
// Server → Client message
// ---------------------------------------------------------------------------

/// A message sent from the server to the client over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayMessage {
    pub op: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(default)]
    pub d: Value,
}

impl GatewayMessage {
    /// Build a DISPATCH message (op=0).
    pub fn dispatch(event_name: &str, seq: u64, data: Value) -> Self {
        Self {
            op: OP_DISPATCH,
            t: Some(event_name.to_string()),
            s: Some(seq),
            d: data,
        }
    }

    /// Build a HEARTBEAT_ACK message (op=6).
    pub fn heartbeat_ack(seq: u64) -> Self {
        Self {
            op: OP_HEARTBEAT_ACK,
            t: None,
            s: None,
            d: serde_json::json!({ "ack": seq }),
        }
    }

    /// Decode a dispatch into a bookmark change.
    ///
    /// Returns `None` for non-dispatch frames, for event names other than
    /// insert/delete, and for payloads that do not parse.
    pub fn change_event(&self) -> Option<ChangeEvent> {
        if self.op != OP_DISPATCH {
            return None;
        }
        match self.t.as_deref()? {
            EventName::BOOKMARK_INSERT => serde_json::from_value::<Bookmark>(self.d.clone())
                .ok()
                .map(ChangeEvent::Insert),
            EventName::BOOKMARK_DELETE => serde_json::from_value::<DeletePayload>(self.d.clone())
                .ok()
                .map(|p| ChangeEvent::Delete { id: p.id }),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Client → Server message
// ---------------------------------------------------------------------------

/// A message received from the client over WebSocket.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientMessage {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
}

impl ClientMessage {
    pub fn identify(ticket: &str) -> Self {
        Self {
            op: OP_IDENTIFY,
            d: serde_json::json!({ "ticket": ticket }),
        }
    }

    pub fn heartbeat(seq: u64) -> Self {
        Self {
            op: OP_HEARTBEAT,
            d: serde_json::json!({ "seq": seq }),
        }
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct IdentifyPayload {
    pub ticket: String,
}

#[derive(Debug, Deserialize)]
pub struct HeartbeatPayload {
    #[serde(default)]
    pub seq: u64,
}

/// READY dispatch data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyPayload {
    pub session_id: String,
    pub user_id: String,
    pub heartbeat_interval: u64,
}

/// BOOKMARK_DELETE dispatch data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletePayload {
    pub id: String,
}

// ---------------------------------------------------------------------------
// Dispatch event types
// ---------------------------------------------------------------------------

/// Event names dispatched to clients.
pub struct EventName;

impl EventName {
    pub const READY: &'static str = "READY";
    pub const BOOKMARK_INSERT: &'static str = "BOOKMARK_INSERT";
    pub const BOOKMARK_DELETE: &'static str = "BOOKMARK_DELETE";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_dispatch_decodes_to_change_event() {
        let msg = GatewayMessage::dispatch(
            EventName::BOOKMARK_INSERT,
            2,
            serde_json::json!({
                "id": "bm_1",
                "user_id": "usr_1",
                "url": "https://example.com",
                "title": "Example",
                "created_at": "2025-03-01T12:00:00Z",
            }),
        );
        match msg.change_event() {
            Some(ChangeEvent::Insert(b)) => {
                assert_eq!(b.id, "bm_1");
                assert_eq!(b.title, "Example");
            }
            other => panic!("expected insert, got {other:?}"),
        }
    }

    #[test]
    fn delete_dispatch_decodes_to_change_event() {
        let msg = GatewayMessage::dispatch(
            EventName::BOOKMARK_DELETE,
            3,
            serde_json::json!({ "id": "abc" }),
        );
        assert_eq!(
            msg.change_event(),
            Some(ChangeEvent::Delete { id: "abc".into() })
        );
    }

    #[test]
    fn other_frames_are_not_changes() {
        assert!(GatewayMessage::heartbeat_ack(4).change_event().is_none());
        let ready = GatewayMessage::dispatch(EventName::READY, 1, serde_json::json!({}));
        assert!(ready.change_event().is_none());
        let update = GatewayMessage::dispatch("BOOKMARK_UPDATE", 5, serde_json::json!({ "id": "x" }));
        assert!(update.change_event().is_none());
    }

    #[test]
    fn heartbeat_ack_omits_event_fields() {
        let json = serde_json::to_value(GatewayMessage::heartbeat_ack(7)).unwrap();
        assert_eq!(json["op"], 6);
        assert_eq!(json["d"]["ack"], 7);
        assert!(json.get("t").is_none());
        assert!(json.get("s").is_none());
    }
}
