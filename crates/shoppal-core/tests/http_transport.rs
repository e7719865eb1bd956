//! Drives `HttpTransport` against a throwaway HTTP responder on localhost.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use shoppal_core::{Dispatcher, HttpTransport, Role, SendOutcome, TransportError, Turn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

struct CannedReply {
    status: &'static str,
    body: String,
}

impl CannedReply {
    fn ok(body: Value) -> Self {
        Self {
            status: "200 OK",
            body: body.to_string(),
        }
    }
}

/// Serve `replies` in order, forwarding every request body to the receiver.
async fn spawn_agent(replies: Vec<CannedReply>) -> (String, mpsc::UnboundedReceiver<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        for reply in replies {
            let (mut stream, _) = listener.accept().await.unwrap();
            let body = read_request_body(&mut stream).await;
            let _ = tx.send(serde_json::from_str(&body).unwrap_or(Value::Null));

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                reply.status,
                reply.body.len(),
                reply.body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
        }
    });

    (format!("http://{addr}/agent"), rx)
}

async fn read_request_body(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            return String::new();
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);

        let body_start = header_end + 4;
        if buf.len() >= body_start + content_length {
            return String::from_utf8_lossy(&buf[body_start..body_start + content_length]).into_owned();
        }
    }
}

fn transport(endpoint: &str) -> HttpTransport {
    HttpTransport::new(endpoint, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_conversation_over_http() {
    let (endpoint, mut requests) = spawn_agent(vec![
        CannedReply::ok(json!({
            "session_id": "s1",
            "messages": [{"role": "assistant", "content": "Hi!"}]
        })),
        CannedReply::ok(json!({
            "session_id": "s1",
            "messages": [
                {"role": "assistant", "content": ""},
                {"role": "assistant", "content": "Here are some shoes"}
            ]
        })),
    ])
    .await;
    let transport = transport(&endpoint);
    let mut dispatcher = Dispatcher::new();

    let first = dispatcher.send(&transport, "hello").await;
    assert!(first.is_delivered());
    assert_eq!(
        requests.recv().await.unwrap(),
        json!({"session_id": "", "message": "hello"})
    );
    assert_eq!(dispatcher.session().token(), "s1");

    let second = dispatcher.send(&transport, "shoes").await;
    assert!(second.is_delivered());
    assert_eq!(
        requests.recv().await.unwrap(),
        json!({"session_id": "s1", "message": "shoes"})
    );

    assert_eq!(
        dispatcher.transcript().snapshot(),
        &[
            Turn::user("hello"),
            Turn::bot("Hi!"),
            Turn::user("shoes"),
            Turn::bot("Here are some shoes"),
        ]
    );
}

#[tokio::test]
async fn test_server_error_is_contained() {
    let (endpoint, _requests) = spawn_agent(vec![CannedReply {
        status: "500 Internal Server Error",
        body: "agent crashed".to_string(),
    }])
    .await;
    let transport = transport(&endpoint);
    let mut dispatcher = Dispatcher::new();

    let outcome = dispatcher.send(&transport, "hello").await;

    match outcome {
        SendOutcome::Failed(TransportError::Status { status, body }) => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "agent crashed");
        }
        other => panic!("expected status failure, got {other:?}"),
    }
    assert_eq!(dispatcher.transcript().snapshot(), &[Turn::user("hello")]);
    assert!(!dispatcher.is_busy());
    assert_eq!(dispatcher.session().token(), "");
}

#[tokio::test]
async fn test_malformed_body_is_a_decode_failure() {
    let (endpoint, _requests) = spawn_agent(vec![CannedReply::ok(json!({"reply": "Hi!"}))]).await;
    let transport = transport(&endpoint);
    let mut dispatcher = Dispatcher::new();

    let outcome = dispatcher.send(&transport, "hello").await;

    assert!(matches!(outcome, SendOutcome::Failed(TransportError::Decode(_))));
    assert_eq!(dispatcher.transcript().len(), 1);
    assert_eq!(dispatcher.transcript().snapshot()[0].role, Role::User);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_a_network_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = transport(&format!("http://{addr}/agent"));
    let mut dispatcher = Dispatcher::new();

    let outcome = dispatcher.send(&transport, "hello").await;

    assert!(matches!(outcome, SendOutcome::Failed(TransportError::Network(_))));
    assert!(!dispatcher.is_busy());
}
