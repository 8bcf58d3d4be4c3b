//! IDENTIFY handling: redeem the ticket and build the READY dispatch.

use bookmarks_common::gateway::{EventName, GatewayMessage, IdentifyPayload, ReadyPayload};
use bookmarks_common::id::{prefix, prefixed_ulid};

use crate::auth::tokens;
use crate::AppState;

use super::session::GatewaySession;

/// Heartbeat interval sent to clients in the READY payload (ms).
pub const HEARTBEAT_INTERVAL_MS: u64 = 41250;

/// Process an IDENTIFY opcode. Returns a (`GatewaySession`, READY message) on success.
pub async fn handle_identify(
    state: &AppState,
    payload: IdentifyPayload,
) -> Result<(GatewaySession, GatewayMessage), &'static str> {
    let ticket_data = tokens::consume_ws_ticket(state.kv.as_ref(), &payload.ticket)
        .await
        .map_err(|_| "Ticket lookup failed")?
        .ok_or("Invalid or expired ticket")?;

    let session = GatewaySession::new(prefixed_ulid(prefix::GATEWAY_SESSION), ticket_data.user_id);

    let ready = ReadyPayload {
        session_id: session.session_id.clone(),
        user_id: session.user_id.clone(),
        heartbeat_interval: HEARTBEAT_INTERVAL_MS,
    };
    let data = serde_json::to_value(&ready).map_err(|_| "Failed to encode READY")?;
    let seq = session.next_seq();

    Ok((session, GatewayMessage::dispatch(EventName::READY, seq, data)))
}
