//! Probe policy over an [`Indexer`]: one request per probe, failures logged and
//! reported as "absent", no retries.
//!
//! The gateway is shared (`Arc`) by every search session of a process, so the
//! module-description cache outlives any one session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::indexer::Indexer;
use crate::types::{AddressSummary, BlockSummary, ModuleSummary, TransactionSummary, CHAIN_COUNT};

pub struct Gateway {
    indexer: Arc<dyn Indexer>,
    module_ttl: Duration,
    module_cache: Mutex<HashMap<String, (Instant, Option<ModuleSummary>)>>,
}

impl Gateway {
    pub fn new(indexer: Arc<dyn Indexer>, module_ttl: Duration) -> Self {
        Self {
            indexer,
            module_ttl,
            module_cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn blocks_at_height(&self, height: u64) -> Vec<BlockSummary> {
        match self.indexer.blocks_at_height(height).await {
            Ok(blocks) => {
                log::debug!("[gateway] height {height}: {} blocks", blocks.len());
                blocks
            }
            Err(e) => {
                log::warn!("[gateway] blocks at height {height} failed: {e:#}");
                Vec::new()
            }
        }
    }

    pub async fn block_by_hash(&self, hash: &str) -> Option<BlockSummary> {
        self.indexer.block_by_hash(hash).await.unwrap_or_else(|e| {
            log::warn!("[gateway] block by hash {hash} failed: {e:#}");
            None
        })
    }

    pub async fn transaction(&self, request_key: &str) -> Option<TransactionSummary> {
        self.indexer.transaction(request_key).await.unwrap_or_else(|e| {
            log::warn!("[gateway] transaction {request_key} failed: {e:#}");
            None
        })
    }

    pub async fn account(&self, name: &str) -> Option<AddressSummary> {
        self.indexer.fungible_account(name).await.unwrap_or_else(|e| {
            log::warn!("[gateway] account {name} failed: {e:#}");
            None
        })
    }

    /// Describe `module` on every chain in one batched request. `None` when no
    /// chain returned module code.
    pub async fn module(&self, module: &str) -> Option<ModuleSummary> {
        if let Some(hit) = self.cached_module(module) {
            log::debug!("[gateway] module cache hit for {module}");
            return hit;
        }

        let chains: Vec<u32> = (0..CHAIN_COUNT).collect();
        let reports = match self.indexer.describe_module(module, &chains).await {
            Ok(r) => r,
            Err(e) => {
                // Failures are not cached; the next search asks again
                log::warn!("[gateway] describe-module {module} failed: {e:#}");
                return None;
            }
        };

        let present: Vec<u32> = reports
            .iter()
            .filter(|r| r.has_code)
            .map(|r| r.chain_id)
            .collect();
        let summary = if present.is_empty() {
            None
        } else {
            Some(ModuleSummary::new(module, present))
        };

        self.module_cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(module.to_string(), (Instant::now(), summary.clone()));
        summary
    }

    fn cached_module(&self, module: &str) -> Option<Option<ModuleSummary>> {
        let mut cache = self.module_cache.lock().unwrap_or_else(|e| e.into_inner());
        match cache.get(module) {
            Some((at, hit)) if at.elapsed() < self.module_ttl => Some(hit.clone()),
            Some(_) => {
                cache.remove(module);
                None
            }
            None => None,
        }
    }

    /// Request keys of up to `first` transactions whose code mentions `code`.
    pub async fn code_search(&self, code: &str, first: u32) -> Vec<String> {
        self.indexer
            .transactions_by_code(code, first)
            .await
            .unwrap_or_else(|e| {
                log::warn!("[gateway] code search {code} failed: {e:#}");
                Vec::new()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::ModuleChainReport;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Flaky {
        describes: AtomicUsize,
    }

    #[async_trait]
    impl Indexer for Flaky {
        async fn blocks_at_height(&self, _height: u64) -> Result<Vec<BlockSummary>> {
            Err(anyhow!("http 502 Bad Gateway"))
        }
        async fn block_by_hash(&self, _hash: &str) -> Result<Option<BlockSummary>> {
            Err(anyhow!("timeout"))
        }
        async fn transaction(&self, _rk: &str) -> Result<Option<TransactionSummary>> {
            Ok(None)
        }
        async fn fungible_account(&self, _name: &str) -> Result<Option<AddressSummary>> {
            Err(anyhow!("connection reset"))
        }
        async fn describe_module(&self, _m: &str, chains: &[u32]) -> Result<Vec<ModuleChainReport>> {
            self.describes.fetch_add(1, Ordering::SeqCst);
            Ok(chains
                .iter()
                .map(|c| ModuleChainReport { chain_id: *c, has_code: *c < 2 })
                .collect())
        }
        async fn transactions_by_code(&self, _c: &str, _f: u32) -> Result<Vec<String>> {
            Err(anyhow!("500"))
        }
    }

    fn gateway(ttl: Duration) -> (Arc<Flaky>, Gateway) {
        let idx = Arc::new(Flaky { describes: AtomicUsize::new(0) });
        let gw = Gateway::new(idx.clone(), ttl);
        (idx, gw)
    }

    #[tokio::test]
    async fn test_failures_read_as_absent() {
        let (_, gw) = gateway(Duration::from_secs(60));
        assert!(gw.blocks_at_height(5).await.is_empty());
        assert!(gw.block_by_hash("abc").await.is_none());
        assert!(gw.account("bob").await.is_none());
        assert!(gw.code_search("transfer", 1).await.is_empty());
    }

    #[tokio::test]
    async fn test_module_summary_and_cache() {
        let (idx, gw) = gateway(Duration::from_secs(60));
        let m = gw.module("free.kdoge").await.unwrap();
        assert_eq!(m.chains, vec![0, 1]);
        assert!(!m.all_chains);

        let again = gw.module("free.kdoge").await.unwrap();
        assert_eq!(again, m);
        assert_eq!(idx.describes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_module_cache_expires() {
        let (idx, gw) = gateway(Duration::ZERO);
        gw.module("free.kdoge").await;
        gw.module("free.kdoge").await;
        assert_eq!(idx.describes.load(Ordering::SeqCst), 2);
    }
}
