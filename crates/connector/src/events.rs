//! The connector's event surface.

use alloy_primitives::{Address, ChainId};
use tokio::sync::broadcast;
use tracing::trace;

use crate::state::Connection;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// State transitions the connector announces to subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectorEvent {
    /// A session was established.
    Connected(Connection),
    /// The session ended — explicit disconnect, provider drop, or a
    /// policy violation reported by the wallet.
    Disconnected,
    /// The wallet moved to another chain while a session was live.
    ChainChanged(ChainId),
    /// The wallet exposed a different (allowed) account.
    AccountsChanged(Vec<Address>),
}

/// Broadcast sender behind the connector's `subscribe()`. Lagging or
/// absent receivers never block emission.
#[derive(Clone, Debug)]
pub(crate) struct EventSender {
    tx: broadcast::Sender<ConnectorEvent>,
}

impl Default for EventSender {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSender {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectorEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: ConnectorEvent) {
        trace!(?event, "emitting connector event");
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[tokio::test]
    async fn delivers_to_subscribers() {
        let sender = EventSender::new();
        let mut rx = sender.subscribe();

        let conn = Connection {
            address: address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            chain_id: 1,
        };
        sender.emit(ConnectorEvent::Connected(conn));
        sender.emit(ConnectorEvent::Disconnected);

        assert_eq!(rx.recv().await.unwrap(), ConnectorEvent::Connected(conn));
        assert_eq!(rx.recv().await.unwrap(), ConnectorEvent::Disconnected);
    }

    #[test]
    fn emitting_without_subscribers_is_fine() {
        EventSender::new().emit(ConnectorEvent::Disconnected);
    }
}
