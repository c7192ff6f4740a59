//! The injected provider abstraction.
//!
//! [`EthereumProvider`] models the EIP-1193 surface the connector relies
//! on: a request/response call and the `chainChanged` / `accountsChanged` /
//! `disconnect` notifications. A browser bridge implements this against
//! `window.ethereum`; tests use a scripted in-memory provider.

use alloy_primitives::{Address, ChainId};
use alloy_rpc_types::TransactionRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::{
    error::{ConnectorError, Result},
    network::AddChainParams,
};

/// EIP-1193: the user rejected the request.
pub const CODE_USER_REJECTED: i64 = 4001;
/// EIP-1193: the requested method/account has not been authorized.
pub const CODE_UNAUTHORIZED: i64 = 4100;
/// EIP-1193: the provider does not support the requested method.
pub const CODE_UNSUPPORTED_METHOD: i64 = 4200;
/// EIP-1193: the provider is disconnected from all chains.
pub const CODE_DISCONNECTED: i64 = 4900;
/// EIP-1193: the provider is not connected to the requested chain.
pub const CODE_CHAIN_DISCONNECTED: i64 = 4901;
/// MetaMask: the wallet does not recognize the requested chain id.
pub const CODE_UNRECOGNIZED_CHAIN: i64 = 4902;

/// A provider-level error, in the EIP-1193 / JSON-RPC shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("provider error {code}: {message}")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub data: Option<Value>,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }

    /// The canonical "User rejected the request." error.
    pub fn user_rejected() -> Self {
        Self::new(CODE_USER_REJECTED, "User rejected the request.")
    }

    /// The MetaMask "Unrecognized chain ID" error a switch request returns
    /// for a chain the wallet has never seen.
    pub fn unrecognized_chain() -> Self {
        Self::new(CODE_UNRECOGNIZED_CHAIN, "Unrecognized chain ID.")
    }
}

/// The `wallet_switchEthereumChain` parameter object (EIP-3326).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchChainParams {
    pub chain_id: String,
}

impl SwitchChainParams {
    pub fn new(chain_id: ChainId) -> Self {
        Self { chain_id: format!("{chain_id:#x}") }
    }
}

/// The EIP-1193 requests the connector issues, in their wire form.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum EthereumRequest {
    #[serde(rename = "eth_chainId")]
    ChainId,

    #[serde(rename = "eth_accounts")]
    Accounts,

    #[serde(rename = "eth_requestAccounts")]
    RequestAccounts,

    #[serde(rename = "wallet_switchEthereumChain")]
    SwitchChain([SwitchChainParams; 1]),

    #[serde(rename = "wallet_addEthereumChain")]
    AddChain([AddChainParams; 1]),

    #[serde(rename = "eth_call")]
    Call(TransactionRequest, String),

    #[serde(rename = "eth_sendTransaction")]
    SendTransaction([TransactionRequest; 1]),

    #[serde(rename = "personal_sign")]
    PersonalSign(String, Address),

    #[serde(rename = "eth_getBalance")]
    GetBalance(Address, String),
}

impl EthereumRequest {
    /// The JSON-RPC method name, used for logging and error context.
    pub fn method(&self) -> &'static str {
        match self {
            Self::ChainId => "eth_chainId",
            Self::Accounts => "eth_accounts",
            Self::RequestAccounts => "eth_requestAccounts",
            Self::SwitchChain(_) => "wallet_switchEthereumChain",
            Self::AddChain(_) => "wallet_addEthereumChain",
            Self::Call(..) => "eth_call",
            Self::SendTransaction(_) => "eth_sendTransaction",
            Self::PersonalSign(..) => "personal_sign",
            Self::GetBalance(..) => "eth_getBalance",
        }
    }
}

/// Notifications an injected provider pushes to the page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderEvent {
    ChainChanged(ChainId),
    AccountsChanged(Vec<Address>),
    Disconnect,
}

/// An injected EIP-1193 wallet provider.
#[async_trait]
pub trait EthereumProvider: Send + Sync {
    /// Submits a request to the wallet and returns the raw JSON result.
    async fn request(&self, request: EthereumRequest) -> Result<Value, ProviderError>;

    /// Subscribes to provider notifications.
    fn events(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// Parses a chain id from its hex-quantity form, also accepting plain
/// decimal the way foundry's serde helpers do.
pub fn parse_chain_id(value: &str) -> Option<ChainId> {
    if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        ChainId::from_str_radix(hex, 16).ok()
    } else {
        value.parse().ok()
    }
}

/// Decodes a JSON result into `T`, attributing failures to `method`.
pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(
    method: &'static str,
    value: Value,
) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|err| ConnectorError::InvalidResponse { method, reason: err.to_string() })
}

pub(crate) async fn fetch_chain_id<P: EthereumProvider + ?Sized>(provider: &P) -> Result<ChainId> {
    let value = provider
        .request(EthereumRequest::ChainId)
        .await
        .map_err(|err| ConnectorError::from_provider("eth_chainId", err))?;
    value
        .as_str()
        .and_then(parse_chain_id)
        .ok_or_else(|| ConnectorError::InvalidResponse {
            method: "eth_chainId",
            reason: format!("expected a hex quantity, got {value}"),
        })
}

/// Fetches the account list via `eth_accounts` or `eth_requestAccounts`.
pub(crate) async fn fetch_accounts<P: EthereumProvider + ?Sized>(
    provider: &P,
    request: EthereumRequest,
) -> Result<Vec<Address>> {
    let method = request.method();
    let value =
        provider.request(request).await.map_err(|err| ConnectorError::from_provider(method, err))?;
    decode_json(method, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use serde_json::json;

    #[test]
    fn request_wire_shape() {
        let value = serde_json::to_value(EthereumRequest::RequestAccounts).unwrap();
        assert_eq!(value, json!({ "method": "eth_requestAccounts" }));

        let value =
            serde_json::to_value(EthereumRequest::SwitchChain([SwitchChainParams::new(11155111)]))
                .unwrap();
        assert_eq!(
            value,
            json!({
                "method": "wallet_switchEthereumChain",
                "params": [{ "chainId": "0xaa36a7" }],
            })
        );
    }

    #[test]
    fn personal_sign_orders_message_before_address() {
        let signer = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
        let value =
            serde_json::to_value(EthereumRequest::PersonalSign("0xdeadbeef".into(), signer))
                .unwrap();
        assert_eq!(
            value,
            json!({
                "method": "personal_sign",
                "params": ["0xdeadbeef", "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"],
            })
        );
    }

    #[test]
    fn parse_chain_id_accepts_hex_and_decimal() {
        assert_eq!(parse_chain_id("0x1"), Some(1));
        assert_eq!(parse_chain_id("0xaa36a7"), Some(11155111));
        assert_eq!(parse_chain_id("137"), Some(137));
        assert_eq!(parse_chain_id("0x"), None);
        assert_eq!(parse_chain_id("mainnet"), None);
    }

    #[test]
    fn provider_error_display() {
        let err = ProviderError::user_rejected();
        assert_eq!(err.to_string(), "provider error 4001: User rejected the request.");
    }

    #[test]
    fn provider_error_deserializes_without_data() {
        let err: ProviderError =
            serde_json::from_value(json!({ "code": 4902, "message": "Unrecognized chain ID." }))
                .unwrap();
        assert_eq!(err, ProviderError::unrecognized_chain());
    }
}
