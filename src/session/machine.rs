//! The per-connection session state machine.
//!
//! A session moves `AwaitingConnect -> Connecting -> Active`, with `Closed`
//! terminal and reachable from anywhere once the client transport goes away.
//! All mutation happens through `handle_control` and `handle_broker_event`,
//! which the transport calls from a single task, so the two directions of
//! traffic can never interleave into concurrent state changes.

use std::collections::HashSet;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::{BrokerAdapter, BrokerEvent};
use crate::config::BrokerSettings;
use crate::transport::message::{self, ClientMessage, ServerMessage};
use crate::utils::error::BridgeError;

/// Lifecycle state of one client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingConnect,
    Connecting,
    Active,
    Closed,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::AwaitingConnect => "awaiting connect",
            SessionState::Connecting => "connecting",
            SessionState::Active => "active",
            SessionState::Closed => "closed",
        }
    }
}

#[derive(Debug)]
pub struct Session {
    id: String,
    state: SessionState,
    adapter: Option<BrokerAdapter>,
    events: Option<UnboundedReceiver<BrokerEvent>>,
    subscriptions: HashSet<String>,
    outbound: UnboundedSender<WsMessage>,
    broker: BrokerSettings,
}

impl Session {
    pub fn new(id: String, outbound: UnboundedSender<WsMessage>, broker: BrokerSettings) -> Self {
        Self {
            id,
            state: SessionState::AwaitingConnect,
            adapter: None,
            events: None,
            subscriptions: HashSet::new(),
            outbound,
            broker,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Topics the broker has acknowledged for this session.
    pub fn subscriptions(&self) -> &HashSet<String> {
        &self.subscriptions
    }

    /// The identity of the live broker connection, if any.
    pub fn adapter_client_id(&self) -> Option<&str> {
        self.adapter.as_ref().map(|a| a.client_id())
    }

    /// Applies one client control message to the current state.
    ///
    /// Messages the state cannot service return `OutOfSequence`; the caller
    /// logs those and nothing else happens, so a confused client cannot
    /// corrupt the session or conjure a second broker connection.
    pub async fn handle_control(&mut self, message: ClientMessage) -> Result<(), BridgeError> {
        match (self.state, message) {
            (SessionState::AwaitingConnect, ClientMessage::Connect) => {
                let (adapter, events) = BrokerAdapter::open(&self.broker);
                info!(
                    "{}: opening broker session {}",
                    self.id,
                    adapter.client_id()
                );
                self.adapter = Some(adapter);
                self.events = Some(events);
                self.state = SessionState::Connecting;
                Ok(())
            }
            (SessionState::Active, ClientMessage::Subscribe { topic }) => {
                if let Some(adapter) = &self.adapter {
                    if let Err(e) = adapter.subscribe(&topic).await {
                        warn!("{}: subscribe to {topic} failed: {e}", self.id);
                        self.notify(ServerMessage::Error {
                            message: format!("Subscribe failed: {e}"),
                        });
                    }
                }
                Ok(())
            }
            (SessionState::Active, ClientMessage::Publish { topic, payload }) => {
                if let Some(adapter) = &self.adapter {
                    // Publish failures are logged, never surfaced to the client
                    if let Err(e) = adapter.publish(&topic, &payload).await {
                        warn!("{}: publish to {topic} failed: {e}", self.id);
                    }
                }
                Ok(())
            }
            (
                SessionState::Connecting | SessionState::Active,
                ClientMessage::Disconnect,
            ) => {
                info!("{}: client requested broker disconnect", self.id);
                self.drop_adapter().await;
                self.state = SessionState::AwaitingConnect;
                Ok(())
            }
            (state, message) => Err(BridgeError::OutOfSequence {
                kind: message.kind(),
                state: state.name(),
            }),
        }
    }

    /// Applies one adapter event. Events reaching a closed session are late
    /// completions of operations whose session is already gone; they are
    /// dropped.
    pub async fn handle_broker_event(&mut self, event: BrokerEvent) {
        if self.state == SessionState::Closed {
            return;
        }

        match event {
            BrokerEvent::Connected => {
                if self.state == SessionState::Connecting {
                    self.state = SessionState::Active;
                    info!("{}: broker session established", self.id);
                    self.notify(ServerMessage::Connected {
                        message: "Connected to MQTT broker".to_string(),
                    });
                } else {
                    debug!("{}: stray Connected event while {}", self.id, self.state.name());
                }
            }
            BrokerEvent::Message { topic, payload } => {
                if self.state == SessionState::Active {
                    self.notify(ServerMessage::Message { topic, payload });
                }
            }
            BrokerEvent::SubscribeAcked { topic } => {
                if self.state == SessionState::Active {
                    info!("{}: subscribed to {topic}", self.id);
                    self.subscriptions.insert(topic.clone());
                    self.notify(ServerMessage::Subscribed { topic });
                }
            }
            BrokerEvent::SubscribeFailed { topic, reason } => {
                if self.state == SessionState::Active {
                    warn!("{}: subscribe to {topic} failed: {reason}", self.id);
                    self.notify(ServerMessage::Error {
                        message: format!("Subscribe failed: {reason}"),
                    });
                }
            }
            BrokerEvent::Error { reason } => {
                warn!("{}: broker error: {reason}", self.id);
                self.notify(ServerMessage::Error { message: reason });
            }
            BrokerEvent::Disconnected { reason } => {
                warn!("{}: broker connection lost: {reason}", self.id);
                self.notify(ServerMessage::Disconnected { message: reason });
                self.drop_adapter().await;
                self.state = SessionState::AwaitingConnect;
            }
        }
    }

    /// Waits for the next adapter event. Pends forever while no adapter
    /// exists, which keeps the transport's select loop simple.
    pub async fn next_broker_event(&mut self) -> Option<BrokerEvent> {
        match self.events.as_mut() {
            Some(events) => events.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Tears the session down: closes the adapter if one is live and enters
    /// the terminal state. Idempotent, so teardown racing in from both the
    /// transport side and the broker side stays harmless.
    pub async fn shutdown(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.drop_adapter().await;
        self.state = SessionState::Closed;
        info!("{} closed", self.id);
    }

    /// Closes and forgets the adapter along with everything that only made
    /// sense while it existed. Dropping the event receiver here is what
    /// discards late completions.
    async fn drop_adapter(&mut self) {
        if let Some(mut adapter) = self.adapter.take() {
            adapter.close().await;
        }
        self.events = None;
        self.subscriptions.clear();
    }

    fn notify(&self, message: ServerMessage) {
        if self.outbound.send(message::encode(&message)).is_err() {
            debug!("{}: client transport gone, dropping notification", self.id);
        }
    }
}
