//! Plain HTTP status endpoint, served on its own port next to the
//! WebSocket listener.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use tokio::net::TcpListener;

use crate::dispatcher::Dispatcher;
use crate::protocol::SystemStatus;

pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .with_state(dispatcher)
}

/// Handler for `GET /status`
pub async fn get_status(State(dispatcher): State<Arc<Dispatcher>>) -> Json<SystemStatus> {
    Json(dispatcher.status().await)
}

/// Serve the status router until the listener fails.
pub async fn serve(listener: TcpListener, dispatcher: Arc<Dispatcher>) -> std::io::Result<()> {
    axum::serve(listener, router(dispatcher)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::DispatcherOptions;
    use crate::input::VirtualPointer;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::mpsc;

    fn dispatcher() -> Arc<Dispatcher> {
        Arc::new(Dispatcher::new(
            Arc::new(VirtualPointer::new(100, 100)),
            DispatcherOptions::default(),
        ))
    }

    #[tokio::test]
    async fn handler_reports_current_status() {
        let d = dispatcher();
        let (tx, _rx) = mpsc::channel(8);
        d.connect(tx).await;

        let Json(status) = get_status(State(d)).await;
        assert_eq!(
            status,
            SystemStatus {
                is_sharing: false,
                connected_clients: 1,
                has_controller: false,
            }
        );
    }

    #[tokio::test]
    async fn serves_json_over_http() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, dispatcher()));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /status HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        let body = response.split("\r\n\r\n").nth(1).unwrap();
        let json: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(json["isSharing"], false);
        assert_eq!(json["connectedClients"], 0);
        assert_eq!(json["hasController"], false);
    }
}
