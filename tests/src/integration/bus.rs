//! # Bus Scenarios
//!
//! 1. **Basic fan-out**: every matching subscription sees every event once,
//!    in publication order.
//! 2. **Propagation**: device events reach application subscribers only when
//!    the definition propagates to the parent.
//! 3. **Multiplexer selective stream**: auxiliary streams join a subscription
//!    only when their matcher accepts a requested name.

#[cfg(test)]
mod tests {
    use fabric_bus::{channel, Backend, BasicBus, Matcher, Multiplexer, PubSub};
    use fabric_types::{CallContext, EntityIdentifiers, Event};

    use crate::integration::fixtures::{app, device, recv, registry, APP};

    // =============================================================================
    // SCENARIO 1: BASIC FAN-OUT
    // =============================================================================

    #[tokio::test]
    async fn test_fan_out_to_matching_subscriptions() {
        let bus = BasicBus::new(registry(), "test-host");
        let ctx = CallContext::new();

        let (all_handler, mut all_rx) = channel(16);
        bus.subscribe(&ctx, &[], &[], all_handler).await.unwrap();

        let (named_handler, mut named_rx) = channel(16);
        bus.subscribe(&ctx, &["gs.up.receive".to_string()], &[], named_handler)
            .await
            .unwrap();

        let (other_app_handler, mut other_app_rx) = channel(16);
        bus.subscribe(
            &ctx,
            &[],
            &[EntityIdentifiers::application("elsewhere")],
            other_app_handler,
        )
        .await
        .unwrap();

        let first = Event::builder("gs.up.receive").identifier(app()).build();
        let second = Event::builder("end_device.update").identifier(app()).build();
        bus.publish(vec![first.clone(), second.clone()]);

        assert_eq!(recv(&mut all_rx).await.unwrap().unique_id(), first.unique_id());
        assert_eq!(recv(&mut all_rx).await.unwrap().unique_id(), second.unique_id());
        assert_eq!(recv(&mut named_rx).await.unwrap().unique_id(), first.unique_id());
        assert!(recv(&mut named_rx).await.is_none());
        assert!(recv(&mut other_app_rx).await.is_none());

        let stamped = Event::builder("gs.up.receive").build();
        bus.publish(vec![stamped]);
        assert_eq!(recv(&mut all_rx).await.unwrap().origin(), "test-host");
    }

    #[tokio::test]
    async fn test_cancelled_subscription_stops_delivery() {
        let bus = BasicBus::new(registry(), "test-host");
        let ctx = CallContext::new();
        let (handler, mut rx) = channel(16);
        bus.subscribe(&ctx, &[], &[], handler).await.unwrap();
        assert_eq!(bus.subscription_count(), 1);

        ctx.cancel();
        for _ in 0..50 {
            if bus.subscription_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(bus.subscription_count(), 0);

        bus.publish(vec![Event::builder("gs.up.receive").build()]);
        assert!(recv(&mut rx).await.is_none());
    }

    // =============================================================================
    // SCENARIO 2: PROPAGATION
    // =============================================================================

    #[tokio::test]
    async fn test_device_events_propagate_to_application() {
        let bus = BasicBus::new(registry(), "test-host");
        let ctx = CallContext::new();
        let (handler, mut rx) = channel(16);
        bus.subscribe(&ctx, &[], &[EntityIdentifiers::application(APP)], handler)
            .await
            .unwrap();

        let forwarded = Event::builder("as.up.data.forward").identifier(device()).build();
        let updated = Event::builder("end_device.update").identifier(device()).build();
        bus.publish(vec![forwarded.clone(), updated]);

        assert_eq!(recv(&mut rx).await.unwrap().unique_id(), forwarded.unique_id());
        assert!(recv(&mut rx).await.is_none());
    }

    #[tokio::test]
    async fn test_device_subscription_sees_device_events() {
        let bus = BasicBus::new(registry(), "test-host");
        let ctx = CallContext::new();
        let (handler, mut rx) = channel(16);
        bus.subscribe(&ctx, &[], &[device()], handler).await.unwrap();

        bus.publish(vec![Event::builder("end_device.update").identifier(device()).build()]);
        assert!(recv(&mut rx).await.is_some());
    }

    // =============================================================================
    // SCENARIO 3: MULTIPLEXER SELECTIVE STREAM
    // =============================================================================

    #[tokio::test]
    async fn test_multiplexer_routes_stream_by_name() {
        let primary = BasicBus::new(registry(), "primary");
        let cluster = BasicBus::new(registry(), "cluster");
        let mux = Multiplexer::new(Backend::ephemeral(primary.clone())).with_stream(
            Backend::ephemeral(cluster.clone()),
            Matcher::names(["cluster.peer.join"]),
        );
        let backend = mux.into_backend();
        let ctx = CallContext::new();

        let (peer_handler, mut peer_rx) = channel(16);
        backend
            .subscribe(&ctx, &["cluster.peer.join".to_string()], &[], peer_handler)
            .await
            .unwrap();

        let (uplink_handler, mut uplink_rx) = channel(16);
        backend
            .subscribe(&ctx, &["gs.up.receive".to_string()], &[], uplink_handler)
            .await
            .unwrap();

        assert_eq!(primary.subscription_count(), 2);
        assert_eq!(cluster.subscription_count(), 1);

        cluster.publish(vec![Event::builder("cluster.peer.join").build()]);
        assert_eq!(recv(&mut peer_rx).await.unwrap().origin(), "cluster");
        assert!(recv(&mut uplink_rx).await.is_none());

        backend.publish(vec![Event::builder("gs.up.receive").build()]);
        assert_eq!(recv(&mut uplink_rx).await.unwrap().origin(), "primary");
        assert_eq!(cluster.events_published(), 1);
    }

    #[tokio::test]
    async fn test_multiplexer_history_merges_streams() {
        use fabric_bus::{MemoryHistoryStore, StoreConfig};

        let primary = MemoryHistoryStore::new(BasicBus::new(registry(), "primary"), StoreConfig::default());
        let cluster = MemoryHistoryStore::new(BasicBus::new(registry(), "cluster"), StoreConfig::default());
        let backend = Multiplexer::new(Backend::history(primary.clone()))
            .with_stream(Backend::history(cluster.clone()), Matcher::names(["cluster.peer.join"]))
            .into_backend();
        assert!(backend.is_history());

        primary.publish(vec![Event::builder("gs.up.receive").build()]);
        cluster.publish(vec![Event::builder("cluster.peer.join").build()]);
        primary.publish(vec![Event::builder("gs.up.receive").build()]);

        let history = backend
            .fetch_history(&CallContext::new(), &[], &[], None, 0)
            .await
            .unwrap();
        let origins: Vec<_> = history.iter().map(|e| e.origin().to_string()).collect();
        assert_eq!(origins, ["primary", "cluster", "primary"]);

        let only_primary = backend
            .fetch_history(&CallContext::new(), &["gs.up.receive".to_string()], &[], None, 0)
            .await
            .unwrap();
        assert_eq!(only_primary.len(), 2);
    }
}
