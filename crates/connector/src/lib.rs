//! # Injected Wallet Connector
//!
//! This crate manages the connection between an application and a
//! browser-injected Ethereum wallet provider (MetaMask and friends),
//! following:
//! - [EIP-1193](https://eips.ethereum.org/EIPS/eip-1193): Ethereum Provider JavaScript API
//! - [EIP-3326](https://eips.ethereum.org/EIPS/eip-3326): `wallet_switchEthereumChain`
//! - [EIP-3085](https://eips.ethereum.org/EIPS/eip-3085): `wallet_addEthereumChain`
//!
//! ## Architecture
//!
//! The injected provider is abstracted behind the [`EthereumProvider`]
//! trait: an async request surface plus a stream of provider events.
//! [`WalletConnector`] drives the connection state machine on top of it:
//! 1. Detect the provider
//! 2. Verify the wallet network, switching (and adding) the chain if needed
//! 3. Request accounts and reconcile the allowed-address policy
//! 4. Watch provider events and keep the session state consistent
//!
//! Connection attempts are retried up to a configurable cap, consulting an
//! optional confirm-before-retry callback between attempts. Contract reads
//! and writes are routed through the wallet and normalized into
//! [`ConnectorError`].

mod connector;
mod contract;
mod error;
mod events;
mod network;
mod provider;
mod state;

#[cfg(test)]
pub(crate) mod mock;

pub use connector::{ConnectorBuilder, RetryContext, WalletConnector, DEFAULT_MAX_ATTEMPTS};
pub use contract::CallRequest;
pub use error::{ConnectorError, Result};
pub use events::ConnectorEvent;
pub use network::{AddChainParams, NativeCurrency, Network};
pub use provider::{
    parse_chain_id, EthereumProvider, EthereumRequest, ProviderError, ProviderEvent,
    SwitchChainParams,
};
pub use state::Connection;
