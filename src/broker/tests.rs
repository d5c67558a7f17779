use crate::broker::BrokerAdapter;
use crate::config::BrokerSettings;

fn unreachable_broker() -> BrokerSettings {
    // Nothing listens here; the adapter just retries in the background
    BrokerSettings {
        host: "127.0.0.1".to_string(),
        port: 1,
        reconnect_interval_ms: 5000,
    }
}

#[tokio::test]
async fn open_assigns_unique_identities() {
    let (first, _first_events) = BrokerAdapter::open(&unreachable_broker());
    let (second, _second_events) = BrokerAdapter::open(&unreachable_broker());

    assert!(first.client_id().starts_with("bridge-"));
    assert!(second.client_id().starts_with("bridge-"));
    assert_ne!(first.client_id(), second.client_id());
}

#[tokio::test]
async fn operations_enqueue_before_the_connection_is_up() {
    let (adapter, _events) = BrokerAdapter::open(&unreachable_broker());

    adapter
        .subscribe("sensors/1")
        .await
        .expect("subscribe should enqueue");
    adapter
        .publish("sensors/1", "42")
        .await
        .expect("publish should enqueue");
}

#[tokio::test]
async fn close_twice_is_safe() {
    let (mut adapter, _events) = BrokerAdapter::open(&unreachable_broker());

    adapter.close().await;
    adapter.close().await;
}
