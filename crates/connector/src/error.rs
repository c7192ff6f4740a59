//! Failure taxonomy for the connector.

use alloy_primitives::{Address, ChainId};

use crate::provider::{
    ProviderError, CODE_CHAIN_DISCONNECTED, CODE_DISCONNECTED, CODE_UNAUTHORIZED,
    CODE_UNSUPPORTED_METHOD, CODE_USER_REJECTED,
};

/// Result alias for connector operations.
pub type Result<T, E = ConnectorError> = std::result::Result<T, E>;

/// Every failure the façade surfaces, normalized from raw provider errors.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("no injected wallet provider detected")]
    ProviderNotFound,

    #[error("user rejected {operation}")]
    UserRejected { operation: &'static str },

    #[error("the wallet has not authorized this request")]
    Unauthorized,

    #[error("the wallet does not support {method}")]
    UnsupportedMethod { method: &'static str },

    #[error("the wallet provider is disconnected")]
    ProviderDisconnected,

    #[error("the wallet does not recognize chain {chain_id} and it could not be added")]
    UnrecognizedChain { chain_id: ChainId },

    #[error("wallet is on chain {actual}, expected chain {expected}")]
    WrongNetwork { expected: ChainId, actual: ChainId },

    #[error("wallet account {address} is not the allowed account {allowed}")]
    AddressNotAllowed { address: Address, allowed: Address },

    #[error("the wallet exposed no accounts")]
    NoAccounts,

    #[error("no active wallet connection")]
    NotConnected,

    #[error("gave up after {attempts} connection attempts")]
    AttemptsExhausted { attempts: u32 },

    #[error("malformed provider response for {method}: {reason}")]
    InvalidResponse { method: &'static str, reason: String },

    #[error(transparent)]
    Rpc(#[from] ProviderError),
}

impl ConnectorError {
    /// Normalizes a raw provider error raised while performing `operation`.
    pub(crate) fn from_provider(operation: &'static str, err: ProviderError) -> Self {
        match err.code {
            CODE_USER_REJECTED => Self::UserRejected { operation },
            CODE_UNAUTHORIZED => Self::Unauthorized,
            CODE_UNSUPPORTED_METHOD => Self::UnsupportedMethod { method: operation },
            CODE_DISCONNECTED | CODE_CHAIN_DISCONNECTED => Self::ProviderDisconnected,
            _ => Self::Rpc(err),
        }
    }

    /// Whether the user declined a wallet prompt.
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::UserRejected { .. })
    }

    /// Whether a failed connection attempt is worth retrying. Covers the
    /// states the user can fix from the wallet UI: declined prompts, the
    /// wrong account selected, a locked wallet, a declined network switch.
    pub(crate) fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UserRejected { .. }
                | Self::AddressNotAllowed { .. }
                | Self::WrongNetwork { .. }
                | Self::NoAccounts
        )
    }
}
