//! # Frontend Scenarios
//!
//! 4. **Stream start**: every stream opens with `events.stream.start`
//!    carrying the requested identifiers and expanded names.
//! 5. **Redaction**: related events the caller may not see come back with
//!    only their routing fields.
//! 6. **History on an ephemeral backend**: streams warn and continue live,
//!    related lookups fail with a precondition error.

#[cfg(test)]
mod tests {
    use fabric_bus::{Backend, PubSub};
    use fabric_gateway::domain::{FindRelatedRequest, StreamFrame, StreamRequest, WireEvent};
    use fabric_gateway::service::STORAGE_DISABLED_WARNING;
    use fabric_gateway::{ApiResult, ChannelSink, Code, EventsService};
    use fabric_types::{CallContext, EntityIdentifiers, Event, STREAM_START_EVENT};
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;

    use crate::integration::fixtures::{
        app, ctx, ephemeral, history_store, recv, service, uplink, APP, OTHER_APP,
    };

    fn open(
        svc: &EventsService,
        ctx: &CallContext,
        req: StreamRequest,
    ) -> (mpsc::Receiver<StreamFrame>, JoinHandle<ApiResult<()>>) {
        let (tx, frames) = mpsc::channel(64);
        let svc = svc.clone();
        let ctx = ctx.clone();
        let task = tokio::spawn(async move {
            let mut sink = ChannelSink::new(tx);
            svc.stream(&ctx, req, &mut sink).await
        });
        (frames, task)
    }

    async fn next_event(frames: &mut mpsc::Receiver<StreamFrame>) -> WireEvent {
        match recv(frames).await {
            Some(StreamFrame::Result(event)) => event,
            other => panic!("expected event, got {other:?}"),
        }
    }

    // =============================================================================
    // SCENARIO 4: STREAM START FRAME
    // =============================================================================

    #[tokio::test]
    async fn test_stream_opens_with_start_event() {
        let svc = service(ephemeral());
        let caller = ctx("alice").with_correlation_ids(["req:42"]);
        let req = StreamRequest {
            names: vec!["as.up.*".to_string()],
            identifiers: vec![app()],
            ..StreamRequest::default()
        };
        let (mut frames, task) = open(&svc, &caller, req);

        let start = next_event(&mut frames).await;
        assert_eq!(start.name, STREAM_START_EVENT);
        assert_eq!(start.identifiers, vec![app()]);
        assert_eq!(start.origin, "test-host");
        assert!(start.correlation_ids.contains(&"req:42".to_string()));
        assert!(start
            .correlation_ids
            .iter()
            .any(|id| id.starts_with("events:stream:")));
        assert_eq!(
            start.data,
            Some(serde_json::json!({ "names": ["as.up.data.forward"] }))
        );

        svc.backend().publish(vec![uplink("corr:1")]);
        let live = next_event(&mut frames).await;
        assert_eq!(live.name, "as.up.data.forward");
        assert_eq!(live.data, Some(serde_json::json!({ "f_port": 1 })));

        caller.cancel();
        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err.code, Code::Cancelled);
    }

    #[tokio::test]
    async fn test_stream_drops_invisible_events() {
        let svc = service(ephemeral());
        let caller = ctx("bob");
        let req = StreamRequest {
            identifiers: vec![
                EntityIdentifiers::application(APP),
                EntityIdentifiers::application(OTHER_APP),
            ],
            ..StreamRequest::default()
        };
        let (mut frames, task) = open(&svc, &caller, req);
        assert_eq!(next_event(&mut frames).await.name, STREAM_START_EVENT);

        let hidden = uplink("corr:1");
        let shown = Event::builder("gs.up.receive")
            .identifier(EntityIdentifiers::application(OTHER_APP))
            .build();
        svc.backend().publish(vec![hidden, shown.clone()]);

        assert_eq!(next_event(&mut frames).await.unique_id, shown.unique_id());
        assert!(recv(&mut frames).await.is_none());

        caller.cancel();
        task.await.unwrap().unwrap_err();
    }

    #[tokio::test]
    async fn test_stream_rejects_unknown_pattern() {
        let svc = service(ephemeral());
        let (tx, _frames) = mpsc::channel(4);
        let err = svc
            .stream(
                &ctx("alice"),
                StreamRequest {
                    names: vec!["no.such.*".to_string()],
                    identifiers: vec![app()],
                    ..StreamRequest::default()
                },
                &mut ChannelSink::new(tx),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, Code::InvalidArgument);
    }

    // =============================================================================
    // SCENARIO 5: REDACTION
    // =============================================================================

    #[tokio::test]
    async fn test_find_related_redacts_foreign_events() {
        let store = history_store();
        let producer = ctx("producer")
            .with_remote_ip("192.0.2.7")
            .with_user_agent("agent/1");
        let own = Event::builder("as.up.data.forward")
            .identifier(EntityIdentifiers::end_device(APP, "dev-1"))
            .payload(serde_json::json!({ "secret": false }))
            .correlation_ids(["corr:1"])
            .context(&producer)
            .build();
        let foreign = Event::builder("as.up.data.forward")
            .identifier(EntityIdentifiers::end_device(OTHER_APP, "dev-9"))
            .payload(serde_json::json!({ "secret": true }))
            .correlation_ids(["corr:1"])
            .context(&producer)
            .build();
        let unrelated = uplink("corr:2");
        store.publish(vec![own.clone(), foreign.clone(), unrelated]);

        let svc = service(Backend::history(store));
        let resp = svc
            .find_related(
                &ctx("alice"),
                FindRelatedRequest {
                    correlation_id: "corr:1".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(resp.events.len(), 2);
        let full = &resp.events[0];
        assert_eq!(full.unique_id, own.unique_id());
        assert!(full.data.is_some());
        assert_eq!(full.remote_ip.as_deref(), Some("192.0.2.7"));
        assert!(!full.correlation_ids.is_empty());

        let redacted = &resp.events[1];
        assert_eq!(redacted.unique_id, foreign.unique_id());
        assert_eq!(redacted.name, "as.up.data.forward");
        assert_eq!(redacted.time, foreign.time());
        assert_eq!(redacted.identifiers, foreign.identifiers());
        assert_eq!(redacted.origin, "test-host");
        assert!(redacted.data.is_none());
        assert!(redacted.correlation_ids.is_empty());
        assert!(redacted.authentication.is_none());
        assert!(redacted.remote_ip.is_none());
        assert!(redacted.user_agent.is_none());
    }

    #[tokio::test]
    async fn test_find_related_requires_authentication() {
        let svc = service(Backend::history(history_store()));
        let err = svc
            .find_related(
                &CallContext::new(),
                FindRelatedRequest {
                    correlation_id: "corr:1".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, Code::Unauthenticated);
    }

    // =============================================================================
    // SCENARIO 6: HISTORY ON EPHEMERAL BACKEND
    // =============================================================================

    #[tokio::test]
    async fn test_ephemeral_stream_warns_then_goes_live() {
        let svc = service(ephemeral());
        let caller = ctx("alice");
        let req = StreamRequest {
            identifiers: vec![app()],
            tail: Some(10),
            ..StreamRequest::default()
        };
        let (mut frames, task) = open(&svc, &caller, req);

        match recv(&mut frames).await {
            Some(StreamFrame::Warning(message)) => assert_eq!(message, STORAGE_DISABLED_WARNING),
            other => panic!("expected warning, got {other:?}"),
        }
        assert_eq!(next_event(&mut frames).await.name, STREAM_START_EVENT);

        svc.backend().publish(vec![uplink("corr:1")]);
        assert_eq!(next_event(&mut frames).await.name, "as.up.data.forward");

        caller.cancel();
        task.await.unwrap().unwrap_err();
    }

    #[tokio::test]
    async fn test_ephemeral_find_related_fails_precondition() {
        let svc = service(ephemeral());
        let err = svc
            .find_related(
                &ctx("alice"),
                FindRelatedRequest {
                    correlation_id: "corr:1".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, Code::FailedPrecondition);
        assert_eq!(err.code.http_status(), 412);
    }

    #[tokio::test]
    async fn test_history_stream_replays_tail() {
        let store = history_store();
        for i in 0..3 {
            store.publish(vec![uplink(&format!("corr:{i}"))]);
        }
        let svc = service(Backend::history(store));
        let caller = ctx("alice");
        let req = StreamRequest {
            identifiers: vec![app()],
            tail: Some(2),
            ..StreamRequest::default()
        };
        let (mut frames, task) = open(&svc, &caller, req);

        assert_eq!(next_event(&mut frames).await.name, STREAM_START_EVENT);
        let replayed: Vec<_> = [
            next_event(&mut frames).await,
            next_event(&mut frames).await,
        ]
        .into_iter()
        .flat_map(|e| e.correlation_ids)
        .collect();
        assert_eq!(replayed, ["corr:1", "corr:2"]);

        caller.cancel();
        task.await.unwrap().unwrap_err();
    }
}
