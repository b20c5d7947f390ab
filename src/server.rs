//! WebSocket endpoint for display clients.
//!
//! Every connection registers with the [`BroadcastHub`] and is fed from its
//! queue until either side closes.  Inbound frames are ignored apart from
//! close detection: the display only listens.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use log::{debug, info};
use tokio::net::TcpListener;

use crate::hub::BroadcastHub;

pub fn router(hub: Arc<BroadcastHub>) -> Router {
    Router::new().route("/", get(ws_handler)).with_state(hub)
}

/// Bind `addr` and serve until the listener fails.
pub async fn serve(addr: SocketAddr, hub: Arc<BroadcastHub>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, hub).await
}

pub async fn serve_on(listener: TcpListener, hub: Arc<BroadcastHub>) -> std::io::Result<()> {
    info!("WebSocket server running on ws://{}", listener.local_addr()?);
    axum::serve(listener, router(hub)).await
}

async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<Arc<BroadcastHub>>) -> Response {
    ws.on_upgrade(move |socket| client_session(socket, hub))
}

async fn client_session(mut socket: WebSocket, hub: Arc<BroadcastHub>) {
    let (id, mut rx) = hub.register();
    info!("Client connected. Active connections: {}", hub.client_count());

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                let Some(text) = outbound else { break };
                if let Err(e) = socket.send(Message::Text(text.into())).await {
                    debug!("Client {id} send failed: {e}");
                    break;
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("Client {id} receive failed: {e}");
                        break;
                    }
                }
            }
        }
    }

    hub.unregister(id);
    info!("Client disconnected. Active connections: {}", hub.client_count());
}
