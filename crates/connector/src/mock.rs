//! A scripted in-memory provider standing in for the browser bridge.

use std::collections::{HashMap, HashSet, VecDeque};

use alloy_primitives::{Address, ChainId, B256};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use crate::provider::{
    parse_chain_id, EthereumProvider, EthereumRequest, ProviderError, ProviderEvent,
};

/// Simulates an injected wallet: it tracks the current chain and account
/// list, honors switch/add requests for known chains, and can be scripted
/// to return canned responses or rejections per method.
pub(crate) struct MockProvider {
    chain_id: Mutex<ChainId>,
    accounts: Mutex<Vec<Address>>,
    known_chains: Mutex<HashSet<ChainId>>,
    scripted: Mutex<HashMap<&'static str, VecDeque<Result<Value, ProviderError>>>>,
    requests: Mutex<Vec<(&'static str, Value)>>,
    events_tx: broadcast::Sender<ProviderEvent>,
}

impl MockProvider {
    pub fn new(chain_id: ChainId, accounts: Vec<Address>) -> Self {
        let (events_tx, _) = broadcast::channel(16);
        Self {
            chain_id: Mutex::new(chain_id),
            accounts: Mutex::new(accounts),
            known_chains: Mutex::new(HashSet::from([chain_id])),
            scripted: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            events_tx,
        }
    }

    /// Marks a chain as known to the wallet, so a switch succeeds without
    /// an add.
    pub fn add_known_chain(&self, chain_id: ChainId) {
        self.known_chains.lock().insert(chain_id);
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        *self.accounts.lock() = accounts;
    }

    /// Queues a canned response for the next request of `method`.
    pub fn push_response(&self, method: &'static str, response: Result<Value, ProviderError>) {
        self.scripted.lock().entry(method).or_default().push_back(response);
    }

    /// Queues a one-shot rejection for the next request of `method`.
    pub fn reject_once(&self, method: &'static str, error: ProviderError) {
        self.push_response(method, Err(error));
    }

    /// The methods requested so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.requests.lock().iter().map(|(method, _)| *method).collect()
    }

    /// The most recent request of `method`, in its wire form.
    pub fn last_request(&self, method: &'static str) -> Option<Value> {
        self.requests
            .lock()
            .iter()
            .rev()
            .find(|(m, _)| *m == method)
            .map(|(_, value)| value.clone())
    }

    /// Pushes a provider notification to subscribers.
    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events_tx.send(event);
    }

    fn target_chain(params_chain_id: &str) -> Result<ChainId, ProviderError> {
        parse_chain_id(params_chain_id)
            .ok_or_else(|| ProviderError::new(-32602, "invalid chainId parameter"))
    }
}

#[async_trait]
impl EthereumProvider for MockProvider {
    async fn request(&self, request: EthereumRequest) -> Result<Value, ProviderError> {
        let method = request.method();
        let wire = serde_json::to_value(&request).expect("requests serialize");
        self.requests.lock().push((method, wire));

        if let Some(scripted) =
            self.scripted.lock().get_mut(method).and_then(VecDeque::pop_front)
        {
            return scripted;
        }

        match request {
            EthereumRequest::ChainId => Ok(json!(format!("{:#x}", *self.chain_id.lock()))),
            EthereumRequest::Accounts | EthereumRequest::RequestAccounts => {
                let accounts = self.accounts.lock().clone();
                Ok(json!(accounts))
            }
            EthereumRequest::SwitchChain([params]) => {
                let target = Self::target_chain(&params.chain_id)?;
                if self.known_chains.lock().contains(&target) {
                    *self.chain_id.lock() = target;
                    Ok(Value::Null)
                } else {
                    Err(ProviderError::unrecognized_chain())
                }
            }
            EthereumRequest::AddChain([params]) => {
                let target = Self::target_chain(&params.chain_id)?;
                self.known_chains.lock().insert(target);
                // MetaMask switches to a freshly added chain
                *self.chain_id.lock() = target;
                Ok(Value::Null)
            }
            EthereumRequest::Call(..) => Ok(json!("0x")),
            EthereumRequest::SendTransaction(_) => Ok(json!(B256::repeat_byte(0x42))),
            EthereumRequest::PersonalSign(..) => {
                Ok(json!(alloy_primitives::Bytes::from(vec![0xab; 65])))
            }
            EthereumRequest::GetBalance(..) => Ok(json!("0x0")),
        }
    }

    fn events(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events_tx.subscribe()
    }
}
