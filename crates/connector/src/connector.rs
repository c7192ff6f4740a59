//! The connection state machine.

use std::{fmt, sync::Arc};

use alloy_primitives::{Address, ChainId};
use parking_lot::Mutex;
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
    error::{ConnectorError, Result},
    events::{ConnectorEvent, EventSender},
    network::{AddChainParams, Network},
    provider::{
        self, EthereumProvider, EthereumRequest, ProviderEvent, SwitchChainParams,
        CODE_UNRECOGNIZED_CHAIN,
    },
    state::{Connection, ConnectionState},
};

/// How many times `connect()` runs the attempt sequence before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// What the confirm-before-retry callback gets to look at.
#[derive(Debug)]
pub struct RetryContext<'a> {
    /// The attempt that just failed, 1-based.
    pub attempt: u32,
    pub max_attempts: u32,
    pub error: &'a ConnectorError,
}

type ConfirmRetry = dyn Fn(&RetryContext<'_>) -> bool + Send + Sync;

/// Builder for [`WalletConnector`].
pub struct ConnectorBuilder<P> {
    provider: Option<Arc<P>>,
    network: Network,
    allowed_address: Option<Address>,
    max_attempts: u32,
    confirm_retry: Option<Arc<ConfirmRetry>>,
}

impl<P: EthereumProvider> ConnectorBuilder<P> {
    /// Starts a builder enforcing the given network.
    pub fn new(network: Network) -> Self {
        Self {
            provider: None,
            network,
            allowed_address: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            confirm_retry: None,
        }
    }

    /// The injected provider. Leaving this unset models a page without a
    /// wallet extension: `connect()` fails with `ProviderNotFound`.
    pub fn provider(mut self, provider: impl Into<Arc<P>>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Restricts the session to a single wallet address.
    pub fn allowed_address(mut self, address: Address) -> Self {
        self.allowed_address = Some(address);
        self
    }

    /// Caps the connect retry loop. Clamped to at least one attempt.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Called between attempts after a retryable failure; returning `false`
    /// aborts the loop with that failure. Without a callback the connector
    /// retries unconditionally up to the cap.
    pub fn confirm_retry(
        mut self,
        callback: impl Fn(&RetryContext<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.confirm_retry = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> WalletConnector<P> {
        WalletConnector {
            provider: self.provider,
            network: self.network,
            allowed_address: self.allowed_address,
            max_attempts: self.max_attempts,
            confirm_retry: self.confirm_retry,
            state: ConnectionState::new(),
            events: EventSender::new(),
            listener: Mutex::new(None),
        }
    }
}

/// Manages the session between an application and an injected wallet:
/// connect/disconnect/reconnect, network enforcement, the allowed-address
/// policy, and the provider-event listener.
pub struct WalletConnector<P: EthereumProvider> {
    provider: Option<Arc<P>>,
    network: Network,
    allowed_address: Option<Address>,
    max_attempts: u32,
    confirm_retry: Option<Arc<ConfirmRetry>>,
    state: ConnectionState,
    events: EventSender,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl<P: EthereumProvider> WalletConnector<P> {
    /// Starts a [`ConnectorBuilder`] enforcing the given network.
    pub fn builder(network: Network) -> ConnectorBuilder<P> {
        ConnectorBuilder::new(network)
    }

    /// Runs the connection sequence: detect the provider, reconcile the
    /// network, request accounts, apply the address policy. Retryable
    /// failures are retried up to the configured cap, consulting the
    /// confirm callback between attempts.
    ///
    /// A live session is torn down first, so calling this twice behaves
    /// like a reconnect.
    pub async fn connect(&self) -> Result<Connection> {
        self.disconnect();

        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!(attempt, max = self.max_attempts, "starting connection attempt");
            match self.try_connect().await {
                Ok(connection) => {
                    self.spawn_listener();
                    self.events.emit(ConnectorEvent::Connected(connection));
                    debug!(
                        address = %connection.address,
                        chain_id = connection.chain_id,
                        "wallet connected"
                    );
                    return Ok(connection);
                }
                Err(err) => {
                    self.state.mark_initialized();
                    if !err.is_retryable() {
                        return Err(err);
                    }
                    warn!(%err, attempt, "connection attempt failed");
                    if attempt >= self.max_attempts {
                        return Err(ConnectorError::AttemptsExhausted { attempts: attempt });
                    }
                    let ctx =
                        RetryContext { attempt, max_attempts: self.max_attempts, error: &err };
                    if !self.should_retry(&ctx) {
                        debug!("retry declined");
                        return Err(err);
                    }
                }
            }
        }
    }

    /// Ends the session: stops the listener, clears state, and emits
    /// `Disconnected` if there was a session to end. Idempotent.
    pub fn disconnect(&self) {
        self.teardown_listener();
        if self.state.clear() {
            debug!("wallet disconnected");
            self.events.emit(ConnectorEvent::Disconnected);
        }
    }

    /// `disconnect()` followed by `connect()`.
    pub async fn reconnect(&self) -> Result<Connection> {
        self.disconnect();
        self.connect().await
    }

    /// Silently probes `eth_accounts` (no wallet popup): whether the site
    /// is already authorized for a usable account.
    pub async fn is_authorized(&self) -> Result<bool> {
        let provider = self.provider()?;
        let accounts =
            provider::fetch_accounts(provider.as_ref(), EthereumRequest::Accounts).await?;
        Ok(match (accounts.first(), self.allowed_address) {
            (Some(address), Some(allowed)) => *address == allowed,
            (Some(_), None) => true,
            (None, _) => false,
        })
    }

    /// Subscribes to connector events.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectorEvent> {
        self.events.subscribe()
    }

    /// The network this connector enforces.
    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn connection(&self) -> Option<Connection> {
        self.state.get()
    }

    pub fn address(&self) -> Option<Address> {
        self.state.get().map(|conn| conn.address)
    }

    pub fn chain_id(&self) -> Option<ChainId> {
        self.state.get().map(|conn| conn.chain_id)
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Whether a connect attempt has run at all, success or not.
    pub fn is_initialized(&self) -> bool {
        self.state.is_initialized()
    }

    pub(crate) fn provider(&self) -> Result<&Arc<P>> {
        self.provider.as_ref().ok_or(ConnectorError::ProviderNotFound)
    }

    /// One linear pass of the state machine.
    async fn try_connect(&self) -> Result<Connection> {
        let provider = self.provider()?;
        let chain_id = self.ensure_network(provider.as_ref()).await?;
        let accounts =
            provider::fetch_accounts(provider.as_ref(), EthereumRequest::RequestAccounts).await?;
        let address = *accounts.first().ok_or(ConnectorError::NoAccounts)?;

        if let Some(allowed) = self.allowed_address {
            if address != allowed {
                warn!(%address, %allowed, "wallet exposed an account outside the allow-list");
                return Err(ConnectorError::AddressNotAllowed { address, allowed });
            }
        }

        let connection = Connection { address, chain_id };
        self.state.set(connection);
        Ok(connection)
    }

    /// Verifies the wallet chain, switching to the expected one on
    /// mismatch. A wallet that does not know the chain (4902) is asked to
    /// add it from the network descriptor. The chain id is re-checked
    /// afterwards; the wallet has the last word.
    async fn ensure_network(&self, provider: &P) -> Result<ChainId> {
        let expected = self.network.chain_id;
        let current = provider::fetch_chain_id(provider).await?;
        if current == expected {
            return Ok(current);
        }

        debug!(current, expected, "switching wallet network");
        let switch = EthereumRequest::SwitchChain([SwitchChainParams::new(expected)]);
        match provider.request(switch).await {
            Ok(_) => {}
            Err(err) if err.code == CODE_UNRECOGNIZED_CHAIN => {
                debug!(chain_id = expected, "chain unknown to the wallet, requesting add");
                let add = EthereumRequest::AddChain([AddChainParams::from(&self.network)]);
                if let Err(err) = provider.request(add).await {
                    let err = ConnectorError::from_provider("wallet_addEthereumChain", err);
                    return Err(match err {
                        rejected @ ConnectorError::UserRejected { .. } => rejected,
                        _ => ConnectorError::UnrecognizedChain { chain_id: expected },
                    });
                }
            }
            Err(err) => {
                return Err(ConnectorError::from_provider("wallet_switchEthereumChain", err))
            }
        }

        let actual = provider::fetch_chain_id(provider).await?;
        if actual != expected {
            return Err(ConnectorError::WrongNetwork { expected, actual });
        }
        Ok(actual)
    }

    fn should_retry(&self, ctx: &RetryContext<'_>) -> bool {
        match &self.confirm_retry {
            Some(callback) => callback(ctx),
            None => true,
        }
    }

    /// Watches provider notifications for the lifetime of the session.
    /// The subscription is taken before this returns, so no event emitted
    /// after a successful `connect()` is missed.
    fn spawn_listener(&self) {
        self.teardown_listener();
        let Some(provider) = self.provider.as_ref() else { return };
        let mut rx = provider.events();
        let state = self.state.clone();
        let events = self.events.clone();
        let expected = self.network.chain_id;
        let allowed = self.allowed_address;

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => reconcile_event(event, &state, &events, expected, allowed),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "provider event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        *self.listener.lock() = Some(handle);
    }

    fn teardown_listener(&self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
    }
}

impl<P: EthereumProvider> fmt::Debug for WalletConnector<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletConnector")
            .field("network", &self.network)
            .field("allowed_address", &self.allowed_address)
            .field("max_attempts", &self.max_attempts)
            .field("connection", &self.state.get())
            .finish_non_exhaustive()
    }
}

impl<P: EthereumProvider> Drop for WalletConnector<P> {
    fn drop(&mut self) {
        self.teardown_listener();
    }
}

/// Reconciles a provider notification against the session and the
/// configured policy. Session-ending conditions clear state and emit
/// `Disconnected`; all emissions are gated on an actual transition.
fn reconcile_event(
    event: ProviderEvent,
    state: &ConnectionState,
    events: &EventSender,
    expected: ChainId,
    allowed: Option<Address>,
) {
    match event {
        ProviderEvent::ChainChanged(chain_id) if chain_id == expected => {
            if state.set_chain(chain_id).is_some() {
                events.emit(ConnectorEvent::ChainChanged(chain_id));
            }
        }
        ProviderEvent::ChainChanged(chain_id) => {
            if state.clear() {
                warn!(chain_id, expected, "wallet moved to an unexpected chain");
                events.emit(ConnectorEvent::ChainChanged(chain_id));
                events.emit(ConnectorEvent::Disconnected);
            }
        }
        ProviderEvent::AccountsChanged(accounts) => match accounts.first().copied() {
            None => {
                if state.clear() {
                    debug!("wallet exposed no accounts, ending session");
                    events.emit(ConnectorEvent::Disconnected);
                }
            }
            Some(address) if allowed.is_none_or(|allowed| allowed == address) => {
                if state.set_address(address).is_some() {
                    events.emit(ConnectorEvent::AccountsChanged(accounts));
                }
            }
            Some(address) => {
                if state.clear() {
                    warn!(%address, "wallet switched to an account outside the allow-list");
                    events.emit(ConnectorEvent::Disconnected);
                }
            }
        },
        ProviderEvent::Disconnect => {
            if state.clear() {
                debug!("provider disconnected");
                events.emit(ConnectorEvent::Disconnected);
            }
        }
    }
}
