//! # WebSocket Transport
//!
//! Runs the gateway router on a loopback socket and drives it with a real
//! WebSocket client.

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use fabric_bus::{Backend, PubSub};
    use fabric_gateway::{router, AppState};
    use futures::{SinkExt, StreamExt};
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
    use tokio_util::sync::CancellationToken;

    use crate::integration::fixtures::{ephemeral, service, uplink};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn spawn_gateway(backend: Backend) -> (SocketAddr, Backend, CancellationToken) {
        let shutdown = CancellationToken::new();
        let svc = service(backend.clone());
        let app = router(AppState {
            service: svc,
            shutdown: shutdown.clone(),
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stop = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move { stop.cancelled().await })
            .await
            .unwrap();
        });
        (addr, backend, shutdown)
    }

    async fn connect(addr: SocketAddr, subject: &str) -> Client {
        let mut request = format!("ws://{addr}/api/v3/events")
            .into_client_request()
            .unwrap();
        request
            .headers_mut()
            .insert("authorization", format!("Bearer {subject}").parse().unwrap());
        let (client, _) = connect_async(request).await.unwrap();
        client
    }

    async fn next_json(client: &mut Client) -> serde_json::Value {
        loop {
            let msg = tokio::time::timeout(std::time::Duration::from_secs(2), client.next())
                .await
                .expect("frame within timeout")
                .expect("stream open")
                .unwrap();
            if let Message::Text(text) = msg {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_websocket_stream_round_trip() {
        let (addr, backend, shutdown) = spawn_gateway(ephemeral()).await;
        let mut client = connect(addr, "alice").await;

        client
            .send(Message::Text(
                r#"{"identifiers":[{"entity_type":"application","application_id":"app-1"}],"tail":5}"#
                    .to_string(),
            ))
            .await
            .unwrap();

        let warning = next_json(&mut client).await;
        assert_eq!(warning["warning"], "storage is not enabled");

        let start = next_json(&mut client).await;
        assert_eq!(start["result"]["name"], "events.stream.start");
        assert_eq!(start["result"]["origin"], "test-host");

        backend.publish(vec![uplink("corr:ws")]);
        let live = next_json(&mut client).await;
        assert_eq!(live["result"]["name"], "as.up.data.forward");
        assert_eq!(live["result"]["correlation_ids"][0], "corr:ws");

        shutdown.cancel();
        let end = next_json(&mut client).await;
        assert_eq!(end["error"]["code"], "cancelled");
    }

    #[tokio::test]
    async fn test_websocket_rejects_bad_request() {
        let (addr, _backend, shutdown) = spawn_gateway(ephemeral()).await;
        let mut client = connect(addr, "alice").await;

        client
            .send(Message::Text(r#"{"identifiers":[]}"#.to_string()))
            .await
            .unwrap();
        let end = next_json(&mut client).await;
        assert_eq!(end["error"]["code"], "invalid_argument");

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_websocket_rejects_malformed_request() {
        let (addr, _backend, shutdown) = spawn_gateway(ephemeral()).await;
        let mut client = connect(addr, "alice").await;

        client.send(Message::Text("not json".to_string())).await.unwrap();
        let end = next_json(&mut client).await;
        assert_eq!(end["error"]["code"], "invalid_argument");

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_websocket_permission_denied() {
        let (addr, _backend, shutdown) = spawn_gateway(ephemeral()).await;
        let mut client = connect(addr, "mallory").await;

        client
            .send(Message::Text(
                r#"{"identifiers":[{"entity_type":"application","application_id":"app-1"}]}"#
                    .to_string(),
            ))
            .await
            .unwrap();
        let end = next_json(&mut client).await;
        assert_eq!(end["error"]["code"], "permission_denied");
        shutdown.cancel();
    }
}
