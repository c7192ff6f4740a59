//! Transient connection state.

use std::sync::Arc;

use alloy_primitives::{Address, ChainId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// An active wallet session: the exposed account and the chain it is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub address: Address,
    pub chain_id: ChainId,
}

/// Shared handle to the connection state. Cheap to clone; all clones see
/// the same session.
#[derive(Clone, Debug, Default)]
pub(crate) struct ConnectionState {
    inner: Arc<Mutex<StateInner>>,
}

#[derive(Debug, Default)]
struct StateInner {
    connection: Option<Connection>,
    /// Set once the first connect attempt has run, success or not.
    initialized: bool,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().connection.is_some()
    }

    pub fn get(&self) -> Option<Connection> {
        self.inner.lock().connection
    }

    pub fn set(&self, connection: Connection) {
        let mut inner = self.inner.lock();
        inner.connection = Some(connection);
        inner.initialized = true;
    }

    /// Clears the session. Returns whether there was one, so callers emit
    /// `Disconnected` only on an actual transition.
    pub fn clear(&self) -> bool {
        self.inner.lock().connection.take().is_some()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.lock().initialized
    }

    pub fn mark_initialized(&self) {
        self.inner.lock().initialized = true;
    }

    /// Updates the chain id of a live session, if any.
    pub fn set_chain(&self, chain_id: ChainId) -> Option<Connection> {
        let mut inner = self.inner.lock();
        let conn = inner.connection.as_mut()?;
        conn.chain_id = chain_id;
        Some(*conn)
    }

    /// Updates the account of a live session, if any.
    pub fn set_address(&self, address: Address) -> Option<Connection> {
        let mut inner = self.inner.lock();
        let conn = inner.connection.as_mut()?;
        conn.address = address;
        Some(*conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const ALICE: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

    #[test]
    fn session_lifecycle() {
        let state = ConnectionState::new();
        assert!(!state.is_connected());
        assert!(!state.is_initialized());

        state.set(Connection { address: ALICE, chain_id: 1 });
        assert!(state.is_connected());
        assert!(state.is_initialized());
        assert_eq!(state.get().unwrap().chain_id, 1);

        assert!(state.clear());
        assert!(!state.is_connected());
        // still initialized after a disconnect
        assert!(state.is_initialized());
        // clearing twice is not a transition
        assert!(!state.clear());
    }

    #[test]
    fn updates_require_a_live_session() {
        let state = ConnectionState::new();
        assert!(state.set_chain(137).is_none());
        assert!(state.set_address(ALICE).is_none());

        state.set(Connection { address: ALICE, chain_id: 1 });
        assert_eq!(state.set_chain(137).unwrap().chain_id, 137);
        assert_eq!(state.get().unwrap().chain_id, 137);
    }
}
