//! One MQTT connection on behalf of one client session.
//!
//! `open` never blocks: it spawns a task that drives the rumqttc event loop
//! and translates everything the broker raises into [`BrokerEvent`]s on an
//! unbounded channel. Connection attempts are retried at a fixed interval by
//! that task alone; the session never retries broker operations itself.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
    SubscribeReasonCode,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::broker::event::BrokerEvent;
use crate::config::BrokerSettings;
use crate::utils::error::BridgeError;

/// Subscribe requests in flight, oldest first. The broker acknowledges
/// subscribes in the order they were sent, so a SUBACK always belongs to
/// the front entry.
type PendingSubscribes = Arc<Mutex<VecDeque<String>>>;

#[derive(Debug)]
pub struct BrokerAdapter {
    client_id: String,
    client: AsyncClient,
    pending_subscribes: PendingSubscribes,
    event_task: JoinHandle<()>,
    closed: bool,
}

impl BrokerAdapter {
    /// Begins connecting to the broker and returns the adapter together
    /// with its event stream. The connection itself is established (and
    /// re-attempted) by the spawned task; the caller observes progress
    /// only through the returned receiver.
    pub fn open(settings: &BrokerSettings) -> (Self, UnboundedReceiver<BrokerEvent>) {
        let client_id = format!("bridge-{}", Uuid::new_v4());

        let mut options = MqttOptions::new(&client_id, &settings.host, settings.port);
        options.set_clean_session(true);
        options.set_keep_alive(Duration::from_secs(30));

        let (client, event_loop) = AsyncClient::new(options, 16);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let pending_subscribes: PendingSubscribes = Arc::new(Mutex::new(VecDeque::new()));

        let event_task = tokio::spawn(drive_event_loop(
            event_loop,
            events_tx,
            pending_subscribes.clone(),
            Duration::from_millis(settings.reconnect_interval_ms),
        ));

        (
            Self {
                client_id,
                client,
                pending_subscribes,
                event_task,
                closed: false,
            },
            events_rx,
        )
    }

    /// The connection identity this adapter presents to the broker.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Asks the broker to add `topic` to this connection's filter set.
    /// Completion arrives later as `SubscribeAcked` or `SubscribeFailed`.
    pub async fn subscribe(&self, topic: &str) -> Result<(), BridgeError> {
        self.pending_subscribes
            .lock()
            .unwrap()
            .push_back(topic.to_string());

        if let Err(e) = self.client.subscribe(topic, QoS::AtMostOnce).await {
            // The request never left, so it has no SUBACK coming
            self.pending_subscribes.lock().unwrap().pop_back();
            return Err(BridgeError::BrokerOperation(e));
        }
        Ok(())
    }

    /// Publishes `payload` to `topic`. Fire-and-forget: the broker sends no
    /// completion for QoS 0 publishes, and enqueue failures are the caller's
    /// to log.
    pub async fn publish(&self, topic: &str, payload: &str) -> Result<(), BridgeError> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload.as_bytes().to_vec())
            .await?;
        Ok(())
    }

    /// Terminates the broker connection and releases the event-loop task.
    /// Safe to call on an already-closed adapter.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.client.disconnect().await {
            debug!("{}: disconnect request not delivered: {e}", self.client_id);
        }
        self.event_task.abort();
    }
}

impl Drop for BrokerAdapter {
    fn drop(&mut self) {
        self.event_task.abort();
    }
}

/// Polls the rumqttc event loop until the adapter is closed or its session
/// stops listening, mapping protocol events onto `BrokerEvent`s.
async fn drive_event_loop(
    mut event_loop: EventLoop,
    events: UnboundedSender<BrokerEvent>,
    pending_subscribes: PendingSubscribes,
    retry_interval: Duration,
) {
    let mut established = false;

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                let event = if ack.code == ConnectReturnCode::Success {
                    established = true;
                    BrokerEvent::Connected
                } else {
                    BrokerEvent::Error {
                        reason: format!("broker refused connection: {:?}", ack.code),
                    }
                };
                if events.send(event).is_err() {
                    break;
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let payload = String::from_utf8_lossy(&publish.payload).into_owned();
                let event = BrokerEvent::Message {
                    topic: publish.topic,
                    payload,
                };
                if events.send(event).is_err() {
                    break;
                }
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                let Some(topic) = pending_subscribes.lock().unwrap().pop_front() else {
                    warn!("SUBACK with no subscribe in flight (pkid {})", ack.pkid);
                    continue;
                };
                let rejected = ack
                    .return_codes
                    .iter()
                    .any(|code| matches!(code, SubscribeReasonCode::Failure));
                let event = if rejected {
                    BrokerEvent::SubscribeFailed {
                        topic,
                        reason: "rejected by broker".to_string(),
                    }
                } else {
                    BrokerEvent::SubscribeAcked { topic }
                };
                if events.send(event).is_err() {
                    break;
                }
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                let _ = events.send(BrokerEvent::Disconnected {
                    reason: "Disconnected from MQTT broker".to_string(),
                });
                break;
            }
            Ok(_) => {}
            Err(e) => {
                let event = if established {
                    established = false;
                    BrokerEvent::Disconnected {
                        reason: e.to_string(),
                    }
                } else {
                    BrokerEvent::Error {
                        reason: e.to_string(),
                    }
                };
                if events.send(event).is_err() {
                    break;
                }
                // Fixed-interval retry; the next poll reconnects
                tokio::time::sleep(retry_interval).await;
            }
        }
    }
}
