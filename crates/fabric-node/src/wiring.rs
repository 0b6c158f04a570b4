//! Component wiring from [`GatewayConfig`].

use std::sync::Arc;

use fabric_bus::{Backend, BasicBus, MemoryHistoryStore, Multiplexer};
use fabric_gateway::{EventsService, GatewayConfig, RightsVisibilityOracle, StaticRightsFetcher};
use fabric_types::DefinitionRegistry;
use tracing::info;

/// Origin stamped on events: the configured one, else `$HOSTNAME`.
pub fn resolve_origin(config: &GatewayConfig) -> String {
    if !config.origin.is_empty() {
        return config.origin.clone();
    }
    std::env::var("HOSTNAME")
        .ok()
        .filter(|host| !host.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Bus, wrapped in a history store when history is enabled, behind a
/// multiplexer.
pub fn build_backend(
    config: &GatewayConfig,
    registry: Arc<DefinitionRegistry>,
    origin: &str,
) -> Backend {
    let bus = BasicBus::new(registry, origin);
    let primary = if config.history.enabled {
        info!(
            capacity = config.history.capacity,
            retention = ?config.history.retention,
            "History enabled"
        );
        Backend::history(MemoryHistoryStore::new(bus, config.history.store_config()))
    } else {
        info!("History disabled");
        Backend::ephemeral(bus)
    };
    Multiplexer::new(primary).into_backend()
}

/// Rights table seeded from the `access` grants.
pub fn rights_fetcher(config: &GatewayConfig) -> StaticRightsFetcher {
    let fetcher = StaticRightsFetcher::new();
    for grant in &config.access {
        fetcher.grant(grant.subject.clone(), &grant.entity, &grant.rights);
    }
    fetcher
}

/// Events service over the configured backend.
pub fn build_service(config: &GatewayConfig, registry: Arc<DefinitionRegistry>) -> EventsService {
    let origin = resolve_origin(config);
    let backend = build_backend(config, registry.clone(), &origin);
    let oracle = Arc::new(RightsVisibilityOracle::new(Arc::new(rights_fetcher(config))));
    EventsService::new(
        backend,
        registry,
        oracle.clone(),
        oracle,
        config.stream.clone(),
        origin,
    )
}
