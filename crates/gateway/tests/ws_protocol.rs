//! End-to-end protocol tests over a real WebSocket.
//!
//! Each test binds a server on an ephemeral port, connects with the
//! protocol client, and checks the frames that come back.

use std::sync::Arc;
use std::time::Duration;

use ctxlink_config::AppConfig;
use ctxlink_core::context::{Context, Role};
use ctxlink_core::message::{Message, MessageType, QueryOptions};
use ctxlink_core::store::ContextStore;
use ctxlink_gateway::client::Client;
use ctxlink_gateway::{GatewayState, SharedState, serve};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

struct TestServer {
    url: String,
    state: SharedState,
    _shutdown: oneshot::Sender<()>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(GatewayState::from_config(&AppConfig::default()));
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(serve(listener, state.clone(), async move {
            let _ = rx.await;
        }));
        Self {
            url: format!("ws://{addr}/"),
            state,
            _shutdown: tx,
        }
    }

    async fn client(&self) -> Client {
        Client::connect(&self.url).await.expect("connect")
    }

    async fn active_contexts(&self) -> usize {
        self.state.dispatcher.store().count().await.unwrap()
    }

    /// Context cleanup runs after the socket task notices the close.
    async fn wait_for_contexts(&self, expected: usize) {
        let waited = tokio::time::timeout(Duration::from_secs(2), async {
            while self.active_contexts().await != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(
            waited.is_ok(),
            "expected {expected} contexts, have {}",
            self.active_contexts().await
        );
    }
}

async fn recv(client: &mut Client) -> Message {
    tokio::time::timeout(Duration::from_secs(2), client.recv())
        .await
        .expect("reply within 2s")
        .expect("valid reply")
}

async fn request(client: &mut Client, message: &Message) -> Message {
    client.send(message).await.unwrap();
    recv(client).await
}

async fn request_raw(client: &mut Client, frame: &str) -> serde_json::Value {
    client.send_raw(frame).await.unwrap();
    serde_json::to_value(recv(client).await).unwrap()
}

#[tokio::test]
async fn init_then_query_round_trip() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    let ack = request_raw(
        &mut client,
        r#"{"type":"init","payload":{},"context":{"modelId":"m1","parameters":{},"history":[]}}"#,
    )
    .await;
    assert_eq!(ack["payload"]["status"], "initialized");
    assert_eq!(ack["payload"]["context"]["modelId"], "m1");

    let reply = request_raw(&mut client, r#"{"type":"query","payload":{"prompt":"Hi"}}"#).await;
    assert_eq!(reply["type"], "response");
    assert!(reply["payload"]["text"].as_str().unwrap().contains("Hi"));
    assert_eq!(reply["payload"]["metadata"]["model"], "m1");
    assert_eq!(reply["context"]["history"].as_array().unwrap().len(), 2);
    assert_eq!(reply["context"]["history"][0]["role"], "user");
    assert_eq!(reply["context"]["history"][1]["role"], "assistant");
}

#[tokio::test]
async fn query_options_are_accepted_and_advisory() {
    let server = TestServer::start().await;
    let mut client = server.client().await;
    request(&mut client, &Message::init(None)).await;

    let options = QueryOptions {
        temperature: Some(0.7),
        max_tokens: Some(50),
        ..QueryOptions::default()
    };
    let with_options = request(&mut client, &Message::query_with_options("Hi", options)).await;
    let plain = request(&mut client, &Message::query("Hi")).await;

    assert_eq!(with_options.as_response().unwrap().text, "Processed query: Hi");
    assert_eq!(
        with_options.as_response().unwrap().text,
        plain.as_response().unwrap().text
    );

    let raw = request_raw(
        &mut client,
        r#"{"type":"query","payload":{"prompt":"Hi","options":{"temperature":0.7,"maxTokens":50}}}"#,
    )
    .await;
    assert_eq!(raw["type"], "response");
    assert_eq!(raw["payload"]["text"], "Processed query: Hi");
    assert_eq!(raw["context"]["history"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn unknown_type_is_reported() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    let reply = request_raw(&mut client, r#"{"type":"bogus"}"#).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["payload"]["code"], "UNKNOWN_MESSAGE_TYPE");
    assert!(reply["payload"]["message"].as_str().unwrap().contains("bogus"));
}

#[tokio::test]
async fn query_before_init_leaves_no_context() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    let reply = request(&mut client, &Message::query("too early")).await;
    assert_eq!(reply.as_error().unwrap().code, "NO_CONTEXT");
    assert_eq!(server.active_contexts().await, 0);
}

#[tokio::test]
async fn malformed_frame_keeps_connection_open() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    let reply = request_raw(&mut client, "{this is not json").await;
    assert_eq!(reply["payload"]["code"], "INVALID_MESSAGE");
    assert!(reply["payload"]["details"].is_string());

    let ack = request(&mut client, &Message::init(None)).await;
    assert_eq!(ack.status(), Some("initialized"));
    assert_eq!(ack.context.unwrap().model_id, "default-model");
}

#[tokio::test]
async fn binary_frames_are_decoded_as_utf8() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    client
        .send_binary(br#"{"type":"init","payload":{}}"#.to_vec())
        .await
        .unwrap();
    assert_eq!(recv(&mut client).await.message_type(), MessageType::Init);

    client.send_binary(vec![0xff, 0xfe, 0x00]).await.unwrap();
    let reply = recv(&mut client).await;
    assert_eq!(reply.as_error().unwrap().code, "INVALID_MESSAGE");
}

#[tokio::test]
async fn context_update_is_echoed_by_next_query() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    request(&mut client, &Message::init(Some(Context::new("m1")))).await;
    request(&mut client, &Message::query("first")).await;

    let replacement = Context::new("m2").with_parameter("temperature", json!(0.2));
    let ack = request(&mut client, &Message::context_update(replacement.clone())).await;
    assert_eq!(ack.message_type(), MessageType::ContextUpdate);
    assert_eq!(ack.status(), Some("updated"));
    assert_eq!(ack.context, Some(replacement));

    let reply = request(&mut client, &Message::query("second")).await;
    let context = reply.context.unwrap();
    assert_eq!(context.model_id, "m2");
    assert_eq!(context.parameters["temperature"], json!(0.2));
    assert_eq!(context.history.len(), 2);
    assert_eq!(context.history[0].content, "second");
}

#[tokio::test]
async fn replies_follow_request_order() {
    let server = TestServer::start().await;
    let mut client = server.client().await;
    request(&mut client, &Message::init(None)).await;

    for prompt in ["a", "b", "c"] {
        client.send(&Message::query(prompt)).await.unwrap();
    }

    for (i, prompt) in ["a", "b", "c"].into_iter().enumerate() {
        let reply = recv(&mut client).await;
        let history = reply.context.unwrap().history;
        assert_eq!(history.len(), 2 * (i + 1));
        let user_turn = &history[2 * i];
        assert_eq!(user_turn.role, Role::User);
        assert_eq!(user_turn.content, prompt);
    }
}

#[tokio::test]
async fn close_releases_context() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    request(&mut client, &Message::init(None)).await;
    assert_eq!(server.active_contexts().await, 1);

    client.close().await.unwrap();
    server.wait_for_contexts(0).await;
}

#[tokio::test]
async fn connections_are_isolated() {
    let server = TestServer::start().await;
    let mut a = server.client().await;
    let mut b = server.client().await;

    request(&mut a, &Message::init(Some(Context::new("ma")))).await;
    request(&mut b, &Message::init(Some(Context::new("mb")))).await;

    let reply_a = request(&mut a, &Message::query("from a")).await;
    assert_eq!(reply_a.context.unwrap().model_id, "ma");

    let reply_b = request(&mut b, &Message::query("from b")).await;
    let context_b = reply_b.context.unwrap();
    assert_eq!(context_b.model_id, "mb");
    assert_eq!(context_b.history.len(), 2);
    assert_eq!(context_b.history[0].content, "from b");

    a.close().await.unwrap();
    server.wait_for_contexts(1).await;

    // b is unaffected by a leaving
    let again = request(&mut b, &Message::query("still here")).await;
    assert_eq!(again.context.unwrap().history.len(), 4);
}

#[tokio::test]
async fn ws_path_alias_speaks_the_protocol() {
    let server = TestServer::start().await;
    let url = format!("{}ws", server.url);
    let mut client = Client::connect(&url).await.unwrap();

    let ack = request(&mut client, &Message::init(None)).await;
    assert_eq!(ack.status(), Some("initialized"));
}
