//! Network descriptors and their EIP-3085 wire representation.

use alloy_primitives::ChainId;
use serde::{Deserialize, Serialize};
use url::Url;

/// Native currency metadata of a network, as wallets display it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl NativeCurrency {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, decimals: u8) -> Self {
        Self { name: name.into(), symbol: symbol.into(), decimals }
    }

    /// Ether, the native currency of Ethereum and most rollups.
    pub fn ether() -> Self {
        Self::new("Ether", "ETH", 18)
    }
}

/// Describes the network the connector enforces: the chain id the wallet
/// must be on, plus the metadata needed to add the chain to a wallet that
/// does not know it yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub chain_id: ChainId,
    pub name: String,
    pub native_currency: NativeCurrency,
    pub rpc_url: Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<Url>,
}

impl Network {
    /// Creates a new network descriptor.
    ///
    /// # Panics
    ///
    /// Panics if `chain_id` is zero, which no real network uses.
    pub fn new(
        chain_id: ChainId,
        name: impl Into<String>,
        native_currency: NativeCurrency,
        rpc_url: Url,
    ) -> Self {
        assert!(chain_id != 0, "chain id 0 is reserved");
        Self { chain_id, name: name.into(), native_currency, rpc_url, explorer_url: None }
    }

    /// Sets the block explorer URL.
    pub fn with_explorer(mut self, url: Url) -> Self {
        self.explorer_url = Some(url);
        self
    }

    /// The chain id in its EIP-695 hex-quantity form, e.g. `0xaa36a7`.
    pub fn hex_chain_id(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    /// Ethereum mainnet.
    pub fn mainnet() -> Self {
        Self::new(1, "Ethereum Mainnet", NativeCurrency::ether(), static_url("https://eth.merkle.io"))
            .with_explorer(static_url("https://etherscan.io"))
    }

    /// Sepolia testnet.
    pub fn sepolia() -> Self {
        Self::new(
            11155111,
            "Sepolia",
            NativeCurrency::new("Sepolia Ether", "ETH", 18),
            static_url("https://sepolia.drpc.org"),
        )
        .with_explorer(static_url("https://sepolia.etherscan.io"))
    }

    /// Polygon PoS mainnet.
    pub fn polygon() -> Self {
        Self::new(
            137,
            "Polygon Mainnet",
            NativeCurrency::new("POL", "POL", 18),
            static_url("https://polygon-rpc.com"),
        )
        .with_explorer(static_url("https://polygonscan.com"))
    }

    /// Arbitrum One.
    pub fn arbitrum() -> Self {
        Self::new(
            42161,
            "Arbitrum One",
            NativeCurrency::ether(),
            static_url("https://arb1.arbitrum.io/rpc"),
        )
        .with_explorer(static_url("https://arbiscan.io"))
    }

    /// OP Mainnet.
    pub fn optimism() -> Self {
        Self::new(10, "OP Mainnet", NativeCurrency::ether(), static_url("https://mainnet.optimism.io"))
            .with_explorer(static_url("https://optimistic.etherscan.io"))
    }

    /// Base mainnet.
    pub fn base() -> Self {
        Self::new(8453, "Base", NativeCurrency::ether(), static_url("https://mainnet.base.org"))
            .with_explorer(static_url("https://basescan.org"))
    }
}

/// The `wallet_addEthereumChain` parameter object (EIP-3085). The chain id
/// travels as a 0x-prefixed hex string, not a number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    pub chain_id: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_explorer_urls: Option<Vec<String>>,
}

impl From<&Network> for AddChainParams {
    fn from(network: &Network) -> Self {
        Self {
            chain_id: network.hex_chain_id(),
            chain_name: network.name.clone(),
            native_currency: network.native_currency.clone(),
            rpc_urls: vec![network.rpc_url.to_string()],
            block_explorer_urls: network.explorer_url.as_ref().map(|url| vec![url.to_string()]),
        }
    }
}

#[track_caller]
fn static_url(url: &str) -> Url {
    Url::parse(url).expect("static URL is valid")
}
