//! Contract reads and writes routed through the wallet.
//!
//! Thin pass-throughs: the wallet signs and broadcasts writes itself
//! (`eth_sendTransaction`), reads go out as `eth_call`. The value these
//! wrappers add is the session requirement and error normalization.

use alloy_primitives::{hex, Address, Bytes, TxHash, U256};
use alloy_rpc_types::TransactionRequest;
use tracing::debug;

use crate::{
    connector::WalletConnector,
    error::{ConnectorError, Result},
    provider::{decode_json, EthereumProvider, EthereumRequest},
    state::Connection,
};

const LATEST_BLOCK: &str = "latest";

/// A read-only contract call. `from` defaults to the connected account.
#[derive(Clone, Debug)]
pub struct CallRequest {
    pub to: Address,
    pub data: Bytes,
    pub value: Option<U256>,
    pub from: Option<Address>,
}

impl CallRequest {
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self { to, data: data.into(), value: None, from: None }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }
}

impl<P: EthereumProvider> WalletConnector<P> {
    /// Executes a read-only contract call against the latest block.
    pub async fn call(&self, call: CallRequest) -> Result<Bytes> {
        let connection = self.require_connection()?;
        let tx = TransactionRequest {
            from: Some(call.from.unwrap_or(connection.address)),
            to: Some(call.to.into()),
            value: call.value,
            input: call.data.into(),
            ..Default::default()
        };
        let value = self.request(EthereumRequest::Call(tx, LATEST_BLOCK.into())).await?;
        decode_json("eth_call", value)
    }

    /// Sends a transaction through the wallet. The wallet prompts, signs,
    /// and broadcasts; the returned hash is all the connector sees. `from`
    /// is forced to the connected account.
    pub async fn send(&self, mut tx: TransactionRequest) -> Result<TxHash> {
        let connection = self.require_connection()?;
        tx.from = Some(connection.address);
        debug!(to = ?tx.to, "sending transaction through the wallet");
        let value = self.request(EthereumRequest::SendTransaction([tx])).await?;
        decode_json("eth_sendTransaction", value)
    }

    /// Signs an arbitrary message with the connected account via
    /// `personal_sign`.
    pub async fn sign_message(&self, message: &[u8]) -> Result<Bytes> {
        let connection = self.require_connection()?;
        let request =
            EthereumRequest::PersonalSign(hex::encode_prefixed(message), connection.address);
        let value = self.request(request).await?;
        decode_json("personal_sign", value)
    }

    /// The latest balance of the given address, defaulting to the
    /// connected account.
    pub async fn balance(&self, address: Option<Address>) -> Result<U256> {
        let connection = self.require_connection()?;
        let address = address.unwrap_or(connection.address);
        let value =
            self.request(EthereumRequest::GetBalance(address, LATEST_BLOCK.into())).await?;
        decode_json("eth_getBalance", value)
    }

    fn require_connection(&self) -> Result<Connection> {
        self.connection().ok_or(ConnectorError::NotConnected)
    }

    async fn request(&self, request: EthereumRequest) -> Result<serde_json::Value> {
        let method = request.method();
        self.provider()?
            .request(request)
            .await
            .map_err(|err| ConnectorError::from_provider(method, err))
    }
}
