//! The live change stream.
//!
//! [`GatewayFeed`] redeems a single-use ticket, opens the `/gateway`
//! WebSocket, identifies, and then runs a background task that forwards
//! BOOKMARK_INSERT / BOOKMARK_DELETE dispatches to the caller's callbacks and
//! keeps the heartbeat going. The server already scopes the stream to the
//! ticket's user, so no filtering happens here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{Sink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use bookmarks_common::gateway::{ClientMessage, EventName, GatewayMessage, ReadyPayload};
use bookmarks_common::{Bookmark, ChangeEvent};

use crate::error::{ErrorEnvelope, FetchError, SubscriptionError};
use crate::session::Session;

pub type InsertCallback = Box<dyn Fn(Bookmark) + Send + Sync>;
pub type DeleteCallback = Box<dyn Fn(String) + Send + Sync>;

/// How long to wait for READY after IDENTIFY.
const READY_TIMEOUT_SECS: u64 = 10;

/// A source of row-level change notifications for one user.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Open the stream. Each remote insert calls `on_insert`, each remote
    /// delete calls `on_delete`, until the returned handle is released.
    async fn subscribe(
        &self,
        user_id: &str,
        on_insert: InsertCallback,
        on_delete: DeleteCallback,
    ) -> Result<SubscriptionHandle, SubscriptionError>;
}

/// Ownership of an open stream.
///
/// Releasing is idempotent and also happens on drop. After
/// [`unsubscribe`](Self::unsubscribe) no new frame is dispatched, but a
/// callback already running on another worker thread may still finish;
/// callers that need a hard cut-off should discard what arrives after
/// release (as `ListReconciler` does by dropping its queue).
pub struct SubscriptionHandle {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionHandle {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn unsubscribe(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("released", &self.is_released())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// GatewayFeed
// ---------------------------------------------------------------------------

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

#[derive(Debug, Deserialize)]
struct TicketResponse {
    ticket: String,
    ws_url: String,
}

/// [`ChangeFeed`] over the server's `/gateway` WebSocket.
pub struct GatewayFeed {
    session: Session,
}

impl GatewayFeed {
    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
        }
    }

    async fn ticket(&self) -> Result<TicketResponse, FetchError> {
        let resp = self
            .session
            .http()
            .post(self.session.api_url("/gateway/ticket"))
            .bearer_auth(self.session.token())
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(FetchError::Unauthorized);
        }
        if !status.is_success() {
            let detail = ErrorEnvelope::read(resp).await;
            return Err(FetchError::Status {
                status: status.as_u16(),
                message: detail.message,
            });
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl ChangeFeed for GatewayFeed {
    async fn subscribe(
        &self,
        user_id: &str,
        on_insert: InsertCallback,
        on_delete: DeleteCallback,
    ) -> Result<SubscriptionHandle, SubscriptionError> {
        let ticket = self.ticket().await?;
        let (mut ws, _) = tokio_tungstenite::connect_async(ticket.ws_url.as_str()).await?;

        send(&mut ws, &ClientMessage::identify(&ticket.ticket)).await?;

        let ready = time::timeout(
            Duration::from_secs(READY_TIMEOUT_SECS),
            read_ready(&mut ws),
        )
        .await
        .map_err(|_| SubscriptionError::Protocol("timed out waiting for READY".into()))??;

        if ready.user_id != user_id {
            return Err(SubscriptionError::UserMismatch {
                expected: user_id.to_string(),
                actual: ready.user_id,
            });
        }

        tracing::info!(
            session_id = %ready.session_id,
            user_id = %ready.user_id,
            "change stream open"
        );

        let active = Arc::new(AtomicBool::new(true));
        let (sink, source) = ws.split();
        let task = tokio::spawn(run_stream(
            sink,
            source,
            Duration::from_millis(ready.heartbeat_interval),
            active.clone(),
            on_insert,
            on_delete,
        ));

        Ok(SubscriptionHandle::new(move || {
            active.store(false, Ordering::Release);
            task.abort();
        }))
    }
}

async fn send<S>(ws: &mut S, msg: &ClientMessage) -> Result<(), SubscriptionError>
where
    S: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let json = serde_json::to_string(msg).map_err(|e| SubscriptionError::Protocol(e.to_string()))?;
    ws.send(Message::Text(json.into())).await?;
    Ok(())
}

/// Read frames until READY, or fail on a close frame.
async fn read_ready(ws: &mut WsStream) -> Result<ReadyPayload, SubscriptionError> {
    while let Some(frame) = ws.next().await {
        match frame? {
            Message::Text(text) => {
                let msg: GatewayMessage = serde_json::from_str(&text)
                    .map_err(|e| SubscriptionError::Protocol(e.to_string()))?;
                if msg.t.as_deref() == Some(EventName::READY) {
                    return serde_json::from_value(msg.d)
                        .map_err(|e| SubscriptionError::Protocol(e.to_string()));
                }
            }
            Message::Close(frame) => {
                let (code, reason) = frame
                    .map(|f| (u16::from(f.code), f.reason.as_str().to_string()))
                    .unwrap_or((1000, String::new()));
                return Err(SubscriptionError::Rejected { code, reason });
            }
            _ => continue,
        }
    }
    Err(SubscriptionError::Protocol(
        "connection closed before READY".into(),
    ))
}

/// Forward changes and heartbeat until the connection ends or the handle is released.
async fn run_stream(
    mut sink: WsSink,
    mut source: WsSource,
    heartbeat: Duration,
    active: Arc<AtomicBool>,
    on_insert: InsertCallback,
    on_delete: DeleteCallback,
) {
    let mut ticker = time::interval_at(time::Instant::now() + heartbeat, heartbeat);
    let mut last_seq = 1;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = send(&mut sink, &ClientMessage::heartbeat(last_seq)).await {
                    tracing::warn!(error = %e, "heartbeat failed, change stream dropped");
                    break;
                }
            }

            frame = source.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(frame))) => {
                        let code = frame.map(|f| u16::from(f.code));
                        tracing::warn!(?code, "change stream closed by server");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "change stream dropped");
                        break;
                    }
                    None => {
                        tracing::warn!("change stream ended");
                        break;
                    }
                };

                let msg: GatewayMessage = match serde_json::from_str(&text) {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::debug!(error = %e, "ignoring malformed gateway frame");
                        continue;
                    }
                };
                if let Some(seq) = msg.s {
                    last_seq = seq;
                }

                if !active.load(Ordering::Acquire) {
                    break;
                }
                match msg.change_event() {
                    Some(ChangeEvent::Insert(bookmark)) => on_insert(bookmark),
                    Some(ChangeEvent::Delete { id }) => on_delete(id),
                    None => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn unsubscribe_releases_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut handle = SubscriptionHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        handle.unsubscribe();
        handle.unsubscribe();
        assert!(handle.is_released());
        drop(handle);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_releases_the_stream() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle = SubscriptionHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        drop(handle);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
