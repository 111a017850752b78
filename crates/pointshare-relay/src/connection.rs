//! Per-connection handler: register, pump messages both ways, then clean up.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::dispatcher::Dispatcher;

/// Drive a single WebSocket connection until either side closes it.
pub async fn handle_connection<S>(
    ws: WebSocketStream<S>,
    addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    outbound_buffer: usize,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut sink, mut stream) = ws.split();

    // 1. Register and get greeted (queued into our own channel).
    let (tx, mut rx) = mpsc::channel::<String>(outbound_buffer);
    let client_id = dispatcher.connect(tx).await;
    tracing::info!(peer = %addr, client = %client_id, "Client registered");

    // 2. Pump loop.
    loop {
        tokio::select! {
            // Queued messages → this client's WebSocket
            Some(msg) = rx.recv() => {
                if sink.send(Message::Text(msg.into())).await.is_err() {
                    break;
                }
            }

            // This client's WebSocket → dispatcher
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        dispatcher.handle_text(&client_id, text.as_str()).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::debug!(client = %client_id, "Ignoring binary frame");
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    // 3. Cleanup. Drop the receiver first so broadcasts issued during
    //    teardown see this connection as closed.
    drop(rx);
    dispatcher.disconnect(&client_id).await;
    let _ = sink.close().await;

    tracing::info!(peer = %addr, client = %client_id, "Client closed");
}
