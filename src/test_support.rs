//! Scripted in-memory indexer shared by unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::gateway::Gateway;
use crate::indexer::{Indexer, ModuleChainReport};
use crate::types::{AddressSummary, BlockSummary, TransactionSummary, TxOutcome};

#[derive(Default)]
pub struct ScriptedIndexer {
    pub heights: HashMap<u64, Vec<BlockSummary>>,
    pub hashes: HashMap<String, BlockSummary>,
    pub txs: HashMap<String, TransactionSummary>,
    pub accounts: HashMap<String, AddressSummary>,
    pub modules: HashMap<String, Vec<u32>>,
    pub code: HashMap<String, Vec<String>>,
    pub fail_accounts: bool,
    pub module_delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedIndexer {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl Indexer for ScriptedIndexer {
    async fn blocks_at_height(&self, height: u64) -> Result<Vec<BlockSummary>> {
        self.record(format!("height:{height}"));
        Ok(self.heights.get(&height).cloned().unwrap_or_default())
    }

    async fn block_by_hash(&self, hash: &str) -> Result<Option<BlockSummary>> {
        self.record(format!("hash:{hash}"));
        Ok(self.hashes.get(hash).cloned())
    }

    async fn transaction(&self, request_key: &str) -> Result<Option<TransactionSummary>> {
        self.record(format!("tx:{request_key}"));
        Ok(self.txs.get(request_key).cloned())
    }

    async fn fungible_account(&self, account_name: &str) -> Result<Option<AddressSummary>> {
        self.record(format!("account:{account_name}"));
        if self.fail_accounts {
            return Err(anyhow!("http 503 Service Unavailable"));
        }
        Ok(self.accounts.get(account_name).cloned())
    }

    async fn describe_module(&self, module: &str, chains: &[u32]) -> Result<Vec<ModuleChainReport>> {
        self.record(format!("module:{module}"));
        if let Some(delay) = self.module_delay {
            tokio::time::sleep(delay).await;
        }
        let present = self.modules.get(module).cloned().unwrap_or_default();
        Ok(chains
            .iter()
            .map(|c| ModuleChainReport {
                chain_id: *c,
                has_code: present.contains(c),
            })
            .collect())
    }

    async fn transactions_by_code(&self, code: &str, first: u32) -> Result<Vec<String>> {
        self.record(format!("code:{code}"));
        Ok(self
            .code
            .get(code)
            .map(|keys| keys.iter().take(first as usize).cloned().collect())
            .unwrap_or_default())
    }
}

pub fn gateway(idx: ScriptedIndexer) -> (Arc<ScriptedIndexer>, Arc<Gateway>) {
    let idx = Arc::new(idx);
    let gw = Arc::new(Gateway::new(idx.clone(), Duration::from_secs(300)));
    (idx, gw)
}

pub fn block(hash: &str, height: u64, chain_id: u32, canonical: bool) -> BlockSummary {
    BlockSummary {
        hash: hash.to_string(),
        height,
        chain_id,
        canonical,
        creation_time: None,
        tx_count: Some(0),
    }
}

pub fn account(name: &str) -> AddressSummary {
    AddressSummary {
        account_name: name.to_string(),
        total_balance: "1.0".to_string(),
        chains: Vec::new(),
    }
}

pub fn transaction(request_key: &str) -> TransactionSummary {
    TransactionSummary {
        request_key: request_key.to_string(),
        chain_id: Some(0),
        sender: Some("k:sender".to_string()),
        height: Some(100),
        creation_time: None,
        outcome: TxOutcome::AssumedSuccess,
    }
}
