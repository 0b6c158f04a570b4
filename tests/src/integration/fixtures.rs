//! Shared test fixtures.

use std::sync::Arc;
use std::time::Duration;

use fabric_bus::{Backend, BasicBus, MemoryHistoryStore, StoreConfig};
use fabric_gateway::domain::StreamConfig;
use fabric_gateway::{EventsService, RightsVisibilityOracle, StaticRightsFetcher};
use fabric_types::{
    Authentication, CallContext, DefinitionRegistry, EntityIdentifiers, Event, EventDefinition,
    Right, Rights, STREAM_START_EVENT,
};
use tokio::sync::mpsc;

pub const APP: &str = "app-1";
pub const OTHER_APP: &str = "app-2";
pub const DEVICE: &str = "dev-1";

/// Registry with a propagating uplink event and a few plain ones.
pub fn registry() -> Arc<DefinitionRegistry> {
    let mut registry = DefinitionRegistry::new();
    registry
        .define(EventDefinition::new(STREAM_START_EVENT, "stream started"))
        .unwrap();
    registry
        .define(EventDefinition::new("as.up.data.forward", "forward uplink").with_propagate_to_parent())
        .unwrap();
    registry
        .define(EventDefinition::new("end_device.update", "update end device"))
        .unwrap();
    registry
        .define(EventDefinition::new("gs.up.receive", "receive uplink"))
        .unwrap();
    registry
        .define(EventDefinition::new("cluster.peer.join", "peer joined"))
        .unwrap();
    Arc::new(registry)
}

pub fn app() -> EntityIdentifiers {
    EntityIdentifiers::application(APP)
}

pub fn device() -> EntityIdentifiers {
    EntityIdentifiers::end_device(APP, DEVICE)
}

/// `alice` owns `app-1`; `bob` owns `app-2`.
pub fn fetcher() -> Arc<StaticRightsFetcher> {
    let fetcher = Arc::new(StaticRightsFetcher::new());
    let all: Rights = [Right::ApplicationAll].into_iter().collect();
    fetcher.grant("alice", &app(), &all);
    fetcher.grant("bob", &EntityIdentifiers::application(OTHER_APP), &all);
    fetcher
}

pub fn ctx(subject: &str) -> CallContext {
    CallContext::new().with_authentication(Authentication::bearer(subject))
}

pub fn ephemeral() -> Backend {
    Backend::ephemeral(BasicBus::new(registry(), "test-host"))
}

pub fn history_store() -> MemoryHistoryStore {
    MemoryHistoryStore::new(BasicBus::new(registry(), "test-host"), StoreConfig::default())
}

pub fn service(backend: Backend) -> EventsService {
    let oracle = Arc::new(RightsVisibilityOracle::new(fetcher()));
    EventsService::new(
        backend,
        registry(),
        oracle.clone(),
        oracle,
        StreamConfig::default(),
        "test-host",
    )
}

pub fn uplink(correlation_id: &str) -> Event {
    Event::builder("as.up.data.forward")
        .identifier(device())
        .payload(serde_json::json!({ "f_port": 1 }))
        .correlation_ids([correlation_id])
        .build()
}

/// Next item within 200ms.
pub async fn recv<T>(rx: &mut mpsc::Receiver<T>) -> Option<T> {
    tokio::time::timeout(Duration::from_millis(200), rx.recv())
        .await
        .ok()
        .flatten()
}
