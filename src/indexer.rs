//! Transport-level view of the GraphQL indexer.
//!
//! Every method issues exactly one request and reports transport or server
//! failures as `Err`. "Not found" is `Ok(None)` / an empty vec. Policy (logging,
//! treating failures as absent, caching) lives in [`crate::gateway`].

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{AddressSummary, BlockSummary, TransactionSummary};

/// Outcome of describing a module on one chain.
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleChainReport {
    pub chain_id: u32,
    /// True when the chain returned non-empty module code.
    pub has_code: bool,
}

#[async_trait]
pub trait Indexer: Send + Sync {
    /// All blocks reported at `height`, one per chain that has it.
    async fn blocks_at_height(&self, height: u64) -> Result<Vec<BlockSummary>>;

    async fn block_by_hash(&self, hash: &str) -> Result<Option<BlockSummary>>;

    async fn transaction(&self, request_key: &str) -> Result<Option<TransactionSummary>>;

    async fn fungible_account(&self, account_name: &str) -> Result<Option<AddressSummary>>;

    /// One batched `describe-module` over `chains`.
    async fn describe_module(&self, module: &str, chains: &[u32]) -> Result<Vec<ModuleChainReport>>;

    /// Request keys of transactions whose pact code contains `code`.
    async fn transactions_by_code(&self, code: &str, first: u32) -> Result<Vec<String>>;
}
