use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::puzzles::simon::{Simon, SimonConfig};
use crate::hardware::MockLeds;
use crate::routes::{AppState, app};
use crate::runtime::{self, RuntimeOptions, input_channel};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve(mock: bool) -> String {
    let (_inputs, input_rx) = input_channel();
    let machine = Simon::with_entropy(SimonConfig::default(), Box::new(MockLeds::new(10)));
    let (handle, _actor) = runtime::spawn(machine, input_rx, RuntimeOptions { mock, room_updates: None });
    let state = AppState { handle, prop_id: "puzzle-1-simon".into() };
    let router = app(state, std::path::Path::new("public"));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("ws://{addr}/ws")
}

async fn recv(ws: &mut Client) -> Value {
    loop {
        let msg = timeout(Duration::from_secs(5), ws.next()).await.expect("frame timed out").expect("open").unwrap();
        if let WsMessage::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn recv_type(ws: &mut Client, kind: &str) -> Value {
    loop {
        let frame = recv(ws).await;
        if frame["type"] == kind {
            return frame;
        }
    }
}

#[tokio::test]
async fn client_gets_config_then_state() {
    let url = serve(true).await;
    let (mut ws, _) = connect_async(url.as_str()).await.unwrap();

    let config = recv(&mut ws).await;
    assert_eq!(config["type"], "config");
    assert_eq!(config["mock"], true);
    let state = recv(&mut ws).await;
    assert_eq!(state["type"], "state");
    assert_eq!(state["state"], "inactive");
    assert_eq!(state["totalButtons"], 10);
}

#[tokio::test]
async fn gm_control_reaches_every_client() {
    let url = serve(false).await;
    let (mut gm, _) = connect_async(url.as_str()).await.unwrap();
    let (mut display, _) = connect_async(url.as_str()).await.unwrap();
    recv_type(&mut gm, "state").await;
    recv_type(&mut display, "state").await;

    gm.send(WsMessage::text(json!({ "type": "activate" }).to_string())).await.unwrap();
    assert_eq!(recv_type(&mut display, "state").await["state"], "active");
    assert_eq!(recv_type(&mut gm, "state").await["state"], "active");
}

#[tokio::test]
async fn state_endpoint_returns_snapshot() {
    let url = serve(false).await;
    let (mut ws, _) = connect_async(url.as_str()).await.unwrap();
    ws.send(WsMessage::text(json!({ "type": "forceSolve" }).to_string())).await.unwrap();
    assert_eq!(recv_type(&mut ws, "state").await["state"], "inactive");
    assert_eq!(recv_type(&mut ws, "state").await["state"], "solved");

    let addr = url.trim_start_matches("ws://").trim_end_matches("/ws");
    let mut tcp = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET /state HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    tokio::io::AsyncWriteExt::write_all(&mut tcp, request.as_bytes()).await.unwrap();
    let mut body = String::new();
    tokio::io::AsyncReadExt::read_to_string(&mut tcp, &mut body).await.unwrap();
    assert!(body.starts_with("HTTP/1.1 200"));
    assert!(body.contains(r#""state":"solved""#));
}
