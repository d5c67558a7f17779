use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tungstenite::protocol::Message as WsMessage;

use crate::config::{BrokerSettings, Settings};
use crate::session::{Session, SessionRegistry, SessionState};
use crate::transport::message::{ClientMessage, ServerMessage, decode, encode};
use crate::transport::websocket::{handle_frame, serve};
use crate::utils::error::DecodeError;

#[test]
fn decode_accepts_every_control_message() {
    assert!(matches!(
        decode(r#"{"type":"connect"}"#).unwrap(),
        ClientMessage::Connect
    ));
    assert!(matches!(
        decode(r#"{"type":"disconnect"}"#).unwrap(),
        ClientMessage::Disconnect
    ));

    if let ClientMessage::Subscribe { topic } =
        decode(r#"{"type":"subscribe","topic":"sensors/1"}"#).unwrap()
    {
        assert_eq!(topic, "sensors/1");
    } else {
        panic!("Expected a subscribe message");
    }

    if let ClientMessage::Publish { topic, payload } =
        decode(r#"{"type":"publish","topic":"sensors/1","payload":"42"}"#).unwrap()
    {
        assert_eq!(topic, "sensors/1");
        assert_eq!(payload, "42");
    } else {
        panic!("Expected a publish message");
    }
}

#[test]
fn decode_rejects_malformed_frames() {
    assert!(matches!(
        decode("not json at all"),
        Err(DecodeError::Malformed(_))
    ));
    assert!(matches!(
        decode(r#"{"topic":"sensors/1"}"#),
        Err(DecodeError::Malformed(_))
    ));
    assert!(matches!(
        decode(r#"{"type":"launch"}"#),
        Err(DecodeError::Malformed(_))
    ));
    // A publish without its topic is missing a required field
    assert!(matches!(
        decode(r#"{"type":"publish","payload":"42"}"#),
        Err(DecodeError::Malformed(_))
    ));
}

#[test]
fn decode_rejects_empty_topics() {
    assert!(matches!(
        decode(r#"{"type":"subscribe","topic":""}"#),
        Err(DecodeError::EmptyTopic { kind: "subscribe" })
    ));
    assert!(matches!(
        decode(r#"{"type":"publish","topic":"","payload":"42"}"#),
        Err(DecodeError::EmptyTopic { kind: "publish" })
    ));
}

#[test]
fn encode_produces_the_wire_envelopes() {
    let cases = [
        (
            encode(&ServerMessage::Connected {
                message: "Connected to MQTT broker".to_string(),
            }),
            json!({"type":"connected","message":"Connected to MQTT broker"}),
        ),
        (
            encode(&ServerMessage::Message {
                topic: "sensors/1".to_string(),
                payload: "42".to_string(),
            }),
            json!({"type":"message","topic":"sensors/1","payload":"42"}),
        ),
        (
            encode(&ServerMessage::Subscribed {
                topic: "sensors/1".to_string(),
            }),
            json!({"type":"subscribed","topic":"sensors/1"}),
        ),
        (
            encode(&ServerMessage::Error {
                message: "boom".to_string(),
            }),
            json!({"type":"error","message":"boom"}),
        ),
        (
            encode(&ServerMessage::Disconnected {
                message: "gone".to_string(),
            }),
            json!({"type":"disconnected","message":"gone"}),
        ),
    ];

    for (frame, expected) in cases {
        let value: serde_json::Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
        assert_eq!(value, expected);
    }
}

fn frame_test_session() -> (Session, mpsc::UnboundedReceiver<WsMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let broker = BrokerSettings {
        host: "127.0.0.1".to_string(),
        port: 1,
        reconnect_interval_ms: 5000,
    };
    (Session::new("session-test".to_string(), tx, broker), rx)
}

#[tokio::test]
async fn bad_frames_leave_the_session_untouched() {
    let (mut session, mut rx) = frame_test_session();

    handle_frame(&mut session, "garbage").await;
    handle_frame(&mut session, r#"{"type":"subscribe"}"#).await;
    handle_frame(&mut session, r#"{"type":"subscribe","topic":""}"#).await;

    assert_eq!(session.state(), SessionState::AwaitingConnect);
    assert!(session.adapter_client_id().is_none());
    assert!(rx.try_recv().is_err(), "no notification expected");
}

#[tokio::test]
async fn valid_frames_drive_the_session() {
    let (mut session, _rx) = frame_test_session();

    handle_frame(&mut session, r#"{"type":"connect"}"#).await;
    assert_eq!(session.state(), SessionState::Connecting);

    handle_frame(&mut session, r#"{"type":"disconnect"}"#).await;
    assert_eq!(session.state(), SessionState::AwaitingConnect);
}

async fn start_test_server(max_connections: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let registry = Arc::new(SessionRegistry::new(max_connections));
    let mut settings = Settings::default();
    // Point adapters somewhere that never answers
    settings.broker.port = 1;

    tokio::spawn(serve(listener, registry, settings));

    format!("ws://{addr}")
}

#[tokio::test]
async fn malformed_frames_do_not_close_the_connection() {
    let url = start_test_server(8).await;
    let (mut ws, _) = connect_async(url.as_str()).await.expect("connect");

    ws.send(WsMessage::text("not json")).await.unwrap();
    ws.send(WsMessage::text(r#"{"type":"subscribe","topic":"sensors/1"}"#))
        .await
        .unwrap();

    // Neither frame may produce a notification
    let reply = timeout(Duration::from_millis(300), ws.next()).await;
    assert!(reply.is_err(), "expected silence from the bridge");

    // The connection is still serviced
    ws.send(WsMessage::Ping(vec![1].into())).await.unwrap();
    let pong = timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("connection should still be alive")
        .expect("stream should not end")
        .expect("frame should be ok");
    assert!(pong.is_pong());
}

#[tokio::test]
async fn sessions_beyond_capacity_are_refused() {
    let url = start_test_server(0).await;
    let (mut ws, _) = connect_async(url.as_str()).await.expect("connect");

    let frame = timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("expected a refusal")
        .expect("stream should carry a frame")
        .expect("frame should be ok");

    let notice: ServerMessage = serde_json::from_str(frame.to_text().unwrap()).unwrap();
    if let ServerMessage::Error { message } = notice {
        assert!(message.contains("capacity"));
    } else {
        panic!("Expected an error notification");
    }
}
