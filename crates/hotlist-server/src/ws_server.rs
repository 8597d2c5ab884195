// WebSocket server: one task per client, one response frame per request.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::Stream;
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{info, warn};

use hotlist_core::HotList;

use crate::handler;

/// Bind the TCP listener the server accepts clients on.
pub async fn bind(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    info!("WebSocket server listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Accept clients forever, serving each on its own task.
///
/// Connections share `service`; its database lock serializes the operations
/// they issue.
pub async fn run(listener: TcpListener, service: Arc<HotList>) -> anyhow::Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        let addr_str = addr.to_string();
        info!("Accepted TCP connection from {addr_str}");

        let service = Arc::clone(&service);
        tokio::spawn(async move {
            let ws_stream = match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!("WebSocket handshake failed for {addr_str}: {e}");
                    return;
                }
            };

            let (write, read) = ws_stream.split();
            if let Err(e) = process_message_stream(read, write, &service, &addr_str).await {
                warn!("Failed to reply to {addr_str}: {e}");
            }
            info!("Client {addr_str} disconnected");
        });
    }
}

/// Answer every text message on `stream` through `sink` until the client
/// closes, the stream errors, or a reply cannot be sent.
///
/// Generic over both halves so it can be tested with in-memory streams
/// without opening TCP ports.
pub async fn process_message_stream<St, Si>(
    mut stream: St,
    mut sink: Si,
    service: &HotList,
    addr: &str,
) -> Result<(), Si::Error>
where
    St: Stream<Item = Result<Message, WsError>> + Unpin,
    Si: Sink<Message> + Unpin,
{
    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                let response = handler::handle_text(service, text.as_str());
                let json = match serde_json::to_string(&response) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to encode response for {addr}: {e}");
                        continue;
                    }
                };
                sink.send(Message::Text(json.into())).await?;
            }
            Ok(Message::Close(_)) => {
                info!("Client {addr} sent close frame");
                break;
            }
            Err(e) => {
                warn!("WebSocket error from {addr}: {e}");
                break;
            }
            _ => {
                // Ignore Binary, Ping, Pong, Frame variants.
            }
        }
    }
    Ok(())
}
