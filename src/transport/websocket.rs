//! WebSocket transport
//!
//! This file implements the WebSocket side of the bridge. Responsibilities:
//! - Accept TCP/WebSocket connections
//! - Register each connection with the `SessionRegistry`, refusing clients
//!   beyond the configured capacity
//! - Run one dispatch loop per connection that feeds client frames and
//!   broker events into the same `Session`, one at a time
//! - Guarantee that the session (and with it any broker connection) is torn
//!   down exactly once when the loop ends, whichever side caused it

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tungstenite::protocol::Message as WsMessage;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::broker::BrokerEvent;
use crate::config::Settings;
use crate::session::{Session, SessionRegistry};
use crate::transport::message::{self, ServerMessage};

pub async fn start_websocket_server(
    addr: String,
    registry: Arc<SessionRegistry>,
    settings: Settings,
) {
    let listener = TcpListener::bind(addr.clone()).await.expect("Can't bind");

    info!("WebSocket bridge listening on ws://{addr}");

    serve(listener, registry, settings).await;
}

/// Accept loop, split from the bind so tests can listen on an ephemeral
/// port.
pub async fn serve(listener: TcpListener, registry: Arc<SessionRegistry>, settings: Settings) {
    while let Ok((stream, peer)) = listener.accept().await {
        let registry = registry.clone();
        let settings = settings.clone();

        tokio::spawn(async move {
            handle_connection(stream, peer, registry, settings).await;
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    registry: Arc<SessionRegistry>,
    settings: Settings,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake error: {e}");
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let session_id = format!("session-{}", Uuid::new_v4());

    if !registry.try_register(&session_id, peer) {
        warn!("{session_id}: refused, bridge at capacity");
        let notice = message::encode(&ServerMessage::Error {
            message: "bridge at capacity".to_string(),
        });
        let _ = ws_sender.send(notice).await;
        let _ = ws_sender.close().await;
        return;
    }

    info!(
        "{session_id} connected from {peer} ({} active)",
        registry.len()
    );

    // Channel for this client; notifications go through it so the session
    // never touches the sink directly
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();

    // Forward messages from session -> client
    {
        let session_id = session_id.clone();
        spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = ws_sender.send(msg).await {
                    debug!("Failed to send message to {session_id}: {e}");
                    break;
                }
            }
            debug!("Send loop closed for {session_id}");
        });
    }

    let mut session = Session::new(session_id.clone(), tx, settings.broker.clone());

    // The single dispatch point: client frames and broker events are
    // serialized here, never handled concurrently
    loop {
        tokio::select! {
            inbound = ws_receiver.next() => match inbound {
                Some(Ok(msg)) if msg.is_text() => {
                    // to_text on a text frame cannot fail
                    handle_frame(&mut session, msg.to_text().unwrap()).await;
                }
                Some(Ok(msg)) if msg.is_close() => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("{session_id}: websocket error: {e}");
                    break;
                }
                None => break,
            },
            event = session.next_broker_event() => match event {
                Some(event) => session.handle_broker_event(event).await,
                None => {
                    // Adapter task died without a farewell; treat it as a drop
                    session
                        .handle_broker_event(BrokerEvent::Disconnected {
                            reason: "broker event stream closed".to_string(),
                        })
                        .await;
                }
            },
        }
    }

    session.shutdown().await;
    registry.deregister(&session_id);
    info!("{session_id} disconnected");
}

/// Decodes one text frame and dispatches it to the session. Frames that do
/// not decode are logged and dropped; the connection stays up.
pub(crate) async fn handle_frame(session: &mut Session, frame: &str) {
    match message::decode(frame) {
        Ok(control) => {
            if let Err(e) = session.handle_control(control).await {
                debug!("{}: {e}", session.id());
            }
        }
        Err(e) => {
            warn!(
                "Invalid client message from {}: {e} | {}",
                session.id(),
                &frame.chars().take(100).collect::<String>()
            );
        }
    }
}
