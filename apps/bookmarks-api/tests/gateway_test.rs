mod common;

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::time;
use tokio_tungstenite::tungstenite;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Helper: mint a gateway ticket over HTTP.
async fn get_ticket(addr: SocketAddr, token: &str) -> String {
    let body: serde_json::Value = reqwest::Client::new()
        .post(format!("http://{addr}/api/v1/gateway/ticket"))
        .bearer_auth(token)
        .send()
        .await
        .expect("ticket request")
        .json()
        .await
        .expect("parse ticket response");
    body["ticket"].as_str().expect("ticket present").to_string()
}

async fn send_json(ws: &mut WsStream, value: serde_json::Value) {
    ws.send(tungstenite::Message::Text(value.to_string().into()))
        .await
        .expect("ws send");
}

/// Read the next text frame as JSON.
async fn next_json(ws: &mut WsStream) -> serde_json::Value {
    loop {
        let msg = time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout")
            .expect("stream ended")
            .expect("read error");
        match msg {
            tungstenite::Message::Text(text) => {
                return serde_json::from_str(&text).expect("parse frame")
            }
            tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_) => continue,
            other => panic!("Expected text frame, got: {other:?}"),
        }
    }
}

/// Assert the server closes the socket with `code`.
async fn expect_close(ws: &mut WsStream, code: u16) {
    let msg = time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timeout")
        .expect("stream ended")
        .expect("read error");
    match msg {
        tungstenite::Message::Close(Some(frame)) => {
            assert_eq!(
                frame.code,
                tungstenite::protocol::frame::coding::CloseCode::from(code)
            );
        }
        tungstenite::Message::Close(None) => {}
        other => panic!("Expected Close frame, got: {other:?}"),
    }
}

/// Helper: connect, IDENTIFY, and consume READY.
async fn connect_and_identify(addr: SocketAddr, ticket: &str) -> (WsStream, serde_json::Value) {
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/gateway"))
        .await
        .expect("ws connect");
    send_json(&mut ws, serde_json::json!({ "op": 2, "d": { "ticket": ticket } })).await;
    let ready = next_json(&mut ws).await;
    (ws, ready)
}

async fn create_bookmark(addr: SocketAddr, token: &str, url: &str, title: &str) -> String {
    let body: serde_json::Value = reqwest::Client::new()
        .post(format!("http://{addr}/api/v1/bookmarks"))
        .bearer_auth(token)
        .json(&serde_json::json!({ "url": url, "title": title }))
        .send()
        .await
        .expect("create request")
        .json()
        .await
        .expect("parse bookmark");
    body["id"].as_str().expect("id present").to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn gateway_identify_returns_ready() {
    let (addr, state) = common::start_server().await;
    let (user_id, token) = common::login_test_user(&state, &common::unique_subject()).await;

    let ticket = get_ticket(addr, &token).await;
    let (_ws, ready) = connect_and_identify(addr, &ticket).await;

    assert_eq!(ready["op"], 0);
    assert_eq!(ready["t"], "READY");
    assert_eq!(ready["s"], 1);
    assert!(ready["d"]["session_id"].as_str().unwrap().starts_with("gw_"));
    assert_eq!(ready["d"]["user_id"], user_id);
    assert_eq!(ready["d"]["heartbeat_interval"], 41250);

    common::cleanup_test_user(&state.db, &user_id).await;
}

#[tokio::test]
async fn gateway_rejects_invalid_ticket() {
    let (addr, _state) = common::start_server().await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/gateway"))
        .await
        .expect("ws connect");
    send_json(&mut ws, serde_json::json!({ "op": 2, "d": { "ticket": "wst_bogus" } })).await;

    expect_close(&mut ws, 4004).await;
}

#[tokio::test]
async fn gateway_ticket_is_single_use() {
    let (addr, state) = common::start_server().await;
    let (user_id, token) = common::login_test_user(&state, &common::unique_subject()).await;
    let ticket = get_ticket(addr, &token).await;

    let (_first, ready) = connect_and_identify(addr, &ticket).await;
    assert_eq!(ready["t"], "READY");

    let (mut second, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/gateway"))
        .await
        .expect("ws connect");
    send_json(&mut second, serde_json::json!({ "op": 2, "d": { "ticket": ticket } })).await;
    expect_close(&mut second, 4004).await;

    common::cleanup_test_user(&state.db, &user_id).await;
}

#[tokio::test]
async fn gateway_requires_identify_first() {
    let (addr, _state) = common::start_server().await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/gateway"))
        .await
        .expect("ws connect");
    send_json(&mut ws, serde_json::json!({ "op": 1, "d": { "seq": 0 } })).await;

    expect_close(&mut ws, 4003).await;
}

#[tokio::test]
async fn gateway_heartbeat_is_acked() {
    let (addr, state) = common::start_server().await;
    let (user_id, token) = common::login_test_user(&state, &common::unique_subject()).await;
    let ticket = get_ticket(addr, &token).await;
    let (mut ws, _) = connect_and_identify(addr, &ticket).await;

    send_json(&mut ws, serde_json::json!({ "op": 1, "d": { "seq": 1 } })).await;
    let ack = next_json(&mut ws).await;
    assert_eq!(ack["op"], 6);
    assert_eq!(ack["d"]["ack"], 1);

    common::cleanup_test_user(&state.db, &user_id).await;
}

#[tokio::test]
async fn gateway_unknown_opcode_closes_connection() {
    let (addr, state) = common::start_server().await;
    let (user_id, token) = common::login_test_user(&state, &common::unique_subject()).await;
    let ticket = get_ticket(addr, &token).await;
    let (mut ws, _) = connect_and_identify(addr, &ticket).await;

    send_json(&mut ws, serde_json::json!({ "op": 99, "d": null })).await;
    expect_close(&mut ws, 4001).await;

    common::cleanup_test_user(&state.db, &user_id).await;
}

#[tokio::test]
async fn gateway_delivers_own_changes_in_order() {
    let (addr, state) = common::start_server().await;
    let (user_id, token) = common::login_test_user(&state, &common::unique_subject()).await;
    let ticket = get_ticket(addr, &token).await;
    let (mut ws, _) = connect_and_identify(addr, &ticket).await;

    let id = create_bookmark(addr, &token, "https://example.com", "Example").await;

    let insert = next_json(&mut ws).await;
    assert_eq!(insert["op"], 0);
    assert_eq!(insert["t"], "BOOKMARK_INSERT");
    assert_eq!(insert["s"], 2);
    assert_eq!(insert["d"]["id"], id);
    assert_eq!(insert["d"]["url"], "https://example.com");
    assert_eq!(insert["d"]["title"], "Example");
    assert_eq!(insert["d"]["user_id"], user_id);

    let status = reqwest::Client::new()
        .delete(format!("http://{addr}/api/v1/bookmarks/{id}"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("delete request")
        .status();
    assert_eq!(status, reqwest::StatusCode::NO_CONTENT);

    let delete = next_json(&mut ws).await;
    assert_eq!(delete["t"], "BOOKMARK_DELETE");
    assert_eq!(delete["s"], 3);
    assert_eq!(delete["d"]["id"], id);

    common::cleanup_test_user(&state.db, &user_id).await;
}

#[tokio::test]
async fn gateway_filters_other_users_changes() {
    let (addr, state) = common::start_server().await;
    let (alice, alice_token) = common::login_test_user(&state, &common::unique_subject()).await;
    let (bob, bob_token) = common::login_test_user(&state, &common::unique_subject()).await;

    let ticket = get_ticket(addr, &alice_token).await;
    let (mut ws, _) = connect_and_identify(addr, &ticket).await;

    create_bookmark(addr, &bob_token, "https://bob.example", "Bob's").await;
    let own = create_bookmark(addr, &alice_token, "https://alice.example", "Alice's").await;

    // Bob's insert never reaches Alice; the next frame is her own.
    let frame = next_json(&mut ws).await;
    assert_eq!(frame["t"], "BOOKMARK_INSERT");
    assert_eq!(frame["d"]["id"], own);

    common::cleanup_test_user(&state.db, &alice).await;
    common::cleanup_test_user(&state.db, &bob).await;
}
