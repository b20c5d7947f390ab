//! Broadcast hub for display clients.
//!
//! Serializes each [`DisplayEvent`] once and queues it for every registered
//! client, in registration order.  Queues are bounded: a client whose
//! queue is closed or full is dropped after the sweep, which ends its
//! session.  The others still receive the message.
//!
//! Late joiners are caught up with the current screen and the last
//! exchange rates before any live traffic.

use std::sync::Mutex;

use log::{debug, warn};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{Receiver, Sender, channel};

use crate::app::events::DisplayEvent;
use crate::app::ports::EventSink;
use crate::fsm::Screen;

pub type ClientId = u64;

/// Messages a display may fall behind by before it is disconnected.
pub const CLIENT_QUEUE_CAPACITY: usize = 256;

struct Client {
    id: ClientId,
    tx: Sender<String>,
}

struct HubState {
    clients: Vec<Client>,
    next_id: ClientId,
    last_screen: DisplayEvent,
    last_exchange: Option<DisplayEvent>,
}

pub struct BroadcastHub {
    inner: Mutex<HubState>,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HubState {
                clients: Vec::new(),
                next_id: 0,
                last_screen: DisplayEvent::screen(Screen::Welcome),
                last_exchange: None,
            }),
        }
    }

    /// Add a client.  Its queue already holds the current screen and, once
    /// known, the latest exchange rates.
    pub fn register(&self) -> (ClientId, Receiver<String>) {
        let (tx, rx) = channel(CLIENT_QUEUE_CAPACITY);
        let Ok(mut state) = self.inner.lock() else {
            warn!("Hub lock poisoned, client not registered");
            return (ClientId::MAX, rx);
        };

        for ev in std::iter::once(&state.last_screen).chain(state.last_exchange.as_ref()) {
            match ev.to_message() {
                Ok(msg) => {
                    let _ = tx.try_send(msg);
                }
                Err(e) => warn!("Failed to serialize {}: {e}", ev.name()),
            }
        }

        let id = state.next_id;
        state.next_id += 1;
        state.clients.push(Client { id, tx });
        (id, rx)
    }

    pub fn unregister(&self, id: ClientId) {
        if let Ok(mut state) = self.inner.lock() {
            state.clients.retain(|c| c.id != id);
        }
    }

    pub fn client_count(&self) -> usize {
        self.inner.lock().map(|s| s.clients.len()).unwrap_or(0)
    }

    /// Deliver to every client.  Delivery failures never propagate.
    pub fn broadcast(&self, event: &DisplayEvent) {
        let msg = match event.to_message() {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Failed to serialize {}: {e}", event.name());
                return;
            }
        };
        let Ok(mut state) = self.inner.lock() else {
            warn!("Hub lock poisoned, dropping {}", event.name());
            return;
        };

        match event {
            DisplayEvent::ScreenChange { .. } => state.last_screen = event.clone(),
            DisplayEvent::ExchangeUpdate { .. } => state.last_exchange = Some(event.clone()),
            _ => {}
        }

        let mut failed: Vec<ClientId> = Vec::new();
        for client in &state.clients {
            match client.tx.try_send(msg.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(
                        "Client {} fell {} messages behind, disconnecting",
                        client.id, CLIENT_QUEUE_CAPACITY
                    );
                    failed.push(client.id);
                }
                Err(TrySendError::Closed(_)) => failed.push(client.id),
            }
        }
        if !failed.is_empty() {
            state.clients.retain(|c| !failed.contains(&c.id));
            debug!("Dropped {} client(s)", failed.len());
        }
        debug!("Sent {} to {} client(s)", event.name(), state.clients.len());
    }
}

impl EventSink for BroadcastHub {
    fn emit(&self, event: &DisplayEvent) {
        self.broadcast(event);
    }
}
