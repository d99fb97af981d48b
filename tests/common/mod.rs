//! In-memory indexer and session wiring for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use kadx::gateway::Gateway;
use kadx::history::HistoryStore;
use kadx::indexer::{Indexer, ModuleChainReport};
use kadx::router::RecordingNavigator;
use kadx::session::{SearchSession, DEFAULT_DEBOUNCE};
use kadx::storage::{KvStore, MemoryKv};
use kadx::tokens::TokenTable;
use kadx::types::{AddressSummary, BlockSummary, TransactionSummary, TxOutcome};

#[derive(Default)]
pub struct FakeIndexer {
    heights: HashMap<u64, Vec<BlockSummary>>,
    hashes: HashMap<String, BlockSummary>,
    txs: HashMap<String, TransactionSummary>,
    accounts: HashMap<String, AddressSummary>,
    modules: HashMap<String, Vec<u32>>,
    code: HashMap<String, Vec<String>>,
    offline: bool,
    log: Mutex<Vec<String>>,
}

impl FakeIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request fails as if the proxy were down.
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub fn with_block(mut self, hash: &str, height: u64, chain_id: u32, canonical: bool) -> Self {
        let b = BlockSummary {
            hash: hash.to_string(),
            height,
            chain_id,
            canonical,
            creation_time: Some("2024-01-01T00:00:00Z".to_string()),
            tx_count: Some(1),
        };
        self.heights.entry(height).or_default().push(b.clone());
        self.hashes.insert(hash.to_string(), b);
        self
    }

    pub fn with_tx(mut self, request_key: &str) -> Self {
        self.txs.insert(
            request_key.to_string(),
            TransactionSummary {
                request_key: request_key.to_string(),
                chain_id: Some(1),
                sender: Some("k:alice".to_string()),
                height: Some(4_000_000),
                creation_time: None,
                outcome: TxOutcome::AssumedSuccess,
            },
        );
        self
    }

    pub fn with_account(mut self, name: &str) -> Self {
        self.accounts.insert(
            name.to_string(),
            AddressSummary {
                account_name: name.to_string(),
                total_balance: "12.5".to_string(),
                chains: Vec::new(),
            },
        );
        self
    }

    pub fn with_module(mut self, name: &str, chains: &[u32]) -> Self {
        self.modules.insert(name.to_string(), chains.to_vec());
        self
    }

    pub fn with_code(mut self, code: &str, request_key: &str) -> Self {
        self.code
            .entry(code.to_string())
            .or_default()
            .push(request_key.to_string());
        self
    }

    fn note(&self, call: String) -> Result<()> {
        self.log.lock().unwrap().push(call);
        if self.offline {
            Err(anyhow!("http 503 Service Unavailable"))
        } else {
            Ok(())
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn forget_calls(&self) {
        self.log.lock().unwrap().clear();
    }
}

#[async_trait]
impl Indexer for FakeIndexer {
    async fn blocks_at_height(&self, height: u64) -> Result<Vec<BlockSummary>> {
        self.note(format!("height:{height}"))?;
        Ok(self.heights.get(&height).cloned().unwrap_or_default())
    }

    async fn block_by_hash(&self, hash: &str) -> Result<Option<BlockSummary>> {
        self.note(format!("hash:{hash}"))?;
        Ok(self.hashes.get(hash).cloned())
    }

    async fn transaction(&self, request_key: &str) -> Result<Option<TransactionSummary>> {
        self.note(format!("tx:{request_key}"))?;
        Ok(self.txs.get(request_key).cloned())
    }

    async fn fungible_account(&self, account_name: &str) -> Result<Option<AddressSummary>> {
        self.note(format!("account:{account_name}"))?;
        Ok(self.accounts.get(account_name).cloned())
    }

    async fn describe_module(&self, module: &str, chains: &[u32]) -> Result<Vec<ModuleChainReport>> {
        self.note(format!("module:{module}"))?;
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
        self.note(format!("code:{code}"))?;
        Ok(self
            .code
            .get(code)
            .map(|k| k.iter().take(first as usize).cloned().collect())
            .unwrap_or_default())
    }
}

pub struct Harness {
    pub indexer: Arc<FakeIndexer>,
    pub navigator: RecordingNavigator,
    pub session: SearchSession,
}

pub fn harness(indexer: FakeIndexer) -> Harness {
    harness_with_store(indexer, Arc::new(MemoryKv::new()))
}

pub fn harness_with_store(indexer: FakeIndexer, kv: Arc<dyn KvStore>) -> Harness {
    let indexer = Arc::new(indexer);
    let gateway = Arc::new(Gateway::new(indexer.clone(), Duration::from_secs(300)));
    let navigator = RecordingNavigator::default();
    let session = SearchSession::new(
        gateway,
        Arc::new(TokenTable::builtin()),
        HistoryStore::new(kv),
        Box::new(navigator.clone()),
        DEFAULT_DEBOUNCE,
    );
    Harness {
        indexer,
        navigator,
        session,
    }
}
