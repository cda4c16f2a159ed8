use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use townsquare_core::net::messages::{
    ClientMessage, ServerMessage, SubscribeMsg, SubscribeResponseMsg,
};
use townsquare_core::net::protocol::{
    PROTOCOL_VERSION, decode_server_message, encode_client_message,
};

use townsquare_server::config::ServerConfig;
use townsquare_server::store::UserStore;
use townsquare_server::{build_app, build_app_with_store};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let (app, _state) = build_app(config);
        Self::serve(app).await
    }

    pub async fn with_store(store: Arc<dyn UserStore>) -> Self {
        Self::from_config_and_store(ServerConfig::default(), store).await
    }

    pub async fn from_config_and_store(config: ServerConfig, store: Arc<dyn UserStore>) -> Self {
        let (app, _state) = build_app_with_store(config, store);
        Self::serve(app).await
    }

    async fn serve(app: axum::Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("http://{}/api/v1{path}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// POST a JSON body and return (status, parsed envelope).
pub async fn post_json(client: &reqwest::Client, url: &str, body: Value) -> (u16, Value) {
    let resp = client.post(url).json(&body).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

pub async fn get_json(client: &reqwest::Client, url: &str) -> (u16, Value) {
    let resp = client.get(url).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

pub async fn delete_json(client: &reqwest::Client, url: &str) -> (u16, Value) {
    let resp = client.delete(url).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

/// Create a game and return its session id.
pub async fn create_game(
    client: &reqwest::Client,
    server: &TestServer,
    variant: &str,
    player1: &str,
    seed: Value,
) -> String {
    let (status, body) = post_json(
        client,
        &server.api_url("/games"),
        serde_json::json!({
            "townId": "town-1",
            "variant": variant,
            "player1Id": player1,
            "player1Name": format!("Player {player1}"),
            "seed": seed,
        }),
    )
    .await;
    assert_eq!(status, 201, "create failed: {body}");
    body["response"]["sessionID"].as_str().unwrap().to_string()
}

pub async fn join_game(
    client: &reqwest::Client,
    server: &TestServer,
    session_id: &str,
    player2: &str,
) -> (u16, Value) {
    post_json(
        client,
        &server.api_url(&format!("/games/{session_id}/join")),
        serde_json::json!({
            "player2Id": player2,
            "player2Name": format!("Player {player2}"),
        }),
    )
    .await
}

pub async fn make_move(
    client: &reqwest::Client,
    server: &TestServer,
    session_id: &str,
    actor: &str,
    move_data: Value,
) -> (u16, Value) {
    post_json(
        client,
        &server.api_url(&format!("/games/{session_id}/moves")),
        serde_json::json!({
            "actingPlayerId": actor,
            "moveData": move_data,
        }),
    )
    .await
}

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// Send a subscribe frame and return the server's reply.
pub async fn ws_subscribe_raw(
    stream: &mut WsStream,
    user_id: &str,
    protocol_version: u8,
) -> SubscribeResponseMsg {
    let msg = ClientMessage::Subscribe(SubscribeMsg {
        user_id: user_id.to_string(),
        protocol_version,
    });
    let encoded = encode_client_message(&msg).unwrap();
    stream.send(Message::Binary(encoded.into())).await.unwrap();

    match ws_read_server_msg(stream).await {
        ServerMessage::SubscribeResponse(resp) => resp,
        other => panic!("Expected SubscribeResponse, got: {other:?}"),
    }
}

/// Connect and subscribe as `user_id`, asserting success.
pub async fn ws_subscribe(server: &TestServer, user_id: &str) -> WsStream {
    let mut stream = ws_connect(&server.ws_url()).await;
    let resp = ws_subscribe_raw(&mut stream, user_id, PROTOCOL_VERSION).await;
    assert!(resp.success, "Expected successful subscribe: {resp:?}");
    stream
}

/// Read the next binary message, with a timeout.
pub async fn ws_read_raw(stream: &mut WsStream) -> Vec<u8> {
    let timeout = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(_)) => continue,
                Some(Err(e)) => panic!("WS error: {e}"),
                None => panic!("WS stream ended"),
            }
        }
    });
    timeout.await.expect("Timed out waiting for WS message")
}

/// Try to read a binary message within `timeout_ms`. Returns None on timeout
/// or when the stream closes.
pub async fn ws_try_read_raw(stream: &mut WsStream, timeout_ms: u64) -> Option<Vec<u8>> {
    let timeout = tokio::time::timeout(Duration::from_millis(timeout_ms), async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return Some(data.to_vec()),
                Some(Ok(_)) => continue,
                _ => return None,
            }
        }
    });
    timeout.await.ok().flatten()
}

pub async fn ws_read_server_msg(stream: &mut WsStream) -> ServerMessage {
    let data = ws_read_raw(stream).await;
    decode_server_message(&data).unwrap()
}

/// Assert that nothing arrives on `stream` for a short while.
pub async fn assert_silent(stream: &mut WsStream) {
    if let Some(data) = ws_try_read_raw(stream, 200).await {
        panic!(
            "Expected no notification, got: {:?}",
            decode_server_message(&data)
        );
    }
}
