//! Session token and WebSocket ticket management.

use serde::{Deserialize, Serialize};

use crate::db::kv::KeyValueStore;
use crate::error::ApiError;

// ---------------------------------------------------------------------------
// Opaque token generation
// ---------------------------------------------------------------------------

/// Generate an opaque random token with the given prefix.
pub fn generate_opaque_token(prefix: &str, bytes: usize) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use rand::Rng;
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill(&mut buf[..]);
    format!("{}_{}", prefix, URL_SAFE_NO_PAD.encode(&buf))
}

fn encode<T: Serialize>(data: &T) -> Result<String, ApiError> {
    serde_json::to_string(data).map_err(|_| ApiError::internal("serialization"))
}

fn decode<T: for<'de> Deserialize<'de>>(value: Option<String>) -> Result<Option<T>, ApiError> {
    value
        .map(|v| serde_json::from_str(&v).map_err(|_| ApiError::internal("corrupt token data")))
        .transpose()
}

// ---------------------------------------------------------------------------
// Session tokens (7-day TTL)
// ---------------------------------------------------------------------------

/// Session TTL in seconds (7 days).
pub const SESSION_TTL_SECS: u64 = 7 * 24 * 3600;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "bm_session";

/// Data stored alongside a session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: String,
}

pub fn generate_session_token() -> String {
    generate_opaque_token("ses", 32)
}

fn session_key(token: &str) -> String {
    format!("bm:ses:{token}")
}

pub async fn store_session(
    kv: &dyn KeyValueStore,
    token: &str,
    data: &SessionData,
) -> Result<(), ApiError> {
    kv.set_ex(&session_key(token), &encode(data)?, SESSION_TTL_SECS)
        .await
}

pub async fn lookup_session(
    kv: &dyn KeyValueStore,
    token: &str,
) -> Result<Option<SessionData>, ApiError> {
    decode(kv.get(&session_key(token)).await?)
}

pub async fn revoke_session(kv: &dyn KeyValueStore, token: &str) -> Result<(), ApiError> {
    kv.del(&session_key(token)).await
}

// ---------------------------------------------------------------------------
// Gateway tickets (30-second TTL, single-use)
// ---------------------------------------------------------------------------

/// WS ticket TTL in seconds.
pub const WS_TICKET_TTL_SECS: u64 = 30;

/// Data stored alongside a WS ticket.
#[derive(Debug, Serialize, Deserialize)]
pub struct WsTicketData {
    pub user_id: String,
}

pub fn generate_ws_ticket() -> String {
    generate_opaque_token("wst", 32)
}

fn ticket_key(ticket: &str) -> String {
    format!("bm:wst:{ticket}")
}

pub async fn store_ws_ticket(
    kv: &dyn KeyValueStore,
    ticket: &str,
    data: &WsTicketData,
) -> Result<(), ApiError> {
    kv.set_ex(&ticket_key(ticket), &encode(data)?, WS_TICKET_TTL_SECS)
        .await
}

/// Consume a WS ticket (single-use).
pub async fn consume_ws_ticket(
    kv: &dyn KeyValueStore,
    ticket: &str,
) -> Result<Option<WsTicketData>, ApiError> {
    decode(kv.take(&ticket_key(ticket)).await?)
}
