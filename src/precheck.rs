//! Submit-time verification cascade and its per-query memo.
//!
//! The cascade walks token -> height -> request key -> module -> block hash ->
//! account -> code and stops at the first hit. Every network step records what
//! it learned in [`PrecheckMemo`] so that a live search for the same string can
//! skip the probe, and the other way round.

use crate::classify::{EntityKind, Shape};
use crate::gateway::Gateway;
use crate::tokens::TokenTable;
use crate::types::{BlockSummary, PrecheckTarget, TransactionSummary};

/// Result of a memoized probe. `Absent` means "checked, not found", which is
/// different from never having looked.
#[derive(Clone, Debug, PartialEq)]
pub enum Probe<T> {
    Unchecked,
    Absent,
    Found(T),
}

impl<T> Default for Probe<T> {
    fn default() -> Self {
        Probe::Unchecked
    }
}

impl<T> Probe<T> {
    pub fn is_unchecked(&self) -> bool {
        matches!(self, Probe::Unchecked)
    }

    pub fn from_option(v: Option<T>) -> Self {
        match v {
            Some(v) => Probe::Found(v),
            None => Probe::Absent,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeightInfo {
    pub exists: bool,
    /// Chain and canonical flag of the first block reported at the height.
    pub chain_id: Option<u32>,
    pub canonical: Option<bool>,
}

impl HeightInfo {
    pub fn from_blocks(blocks: &[BlockSummary]) -> Self {
        let first = blocks.first();
        Self {
            exists: first.is_some(),
            chain_id: first.map(|b| b.chain_id),
            canonical: first.map(|b| b.canonical),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrecheckMemo {
    query: String,
    pub account_exists: Option<bool>,
    pub block_hash: Probe<BlockSummary>,
    pub block_height: Option<HeightInfo>,
    pub transaction: Probe<TransactionSummary>,
}

impl PrecheckMemo {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..Default::default()
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Point the memo at `query`, dropping everything if it was for another string.
    pub fn for_query(&mut self, query: &str) {
        if self.query != query {
            *self = Self::new(query);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.account_exists.is_none()
            && self.block_hash.is_unchecked()
            && self.block_height.is_none()
            && self.transaction.is_unchecked()
    }

    /// Fill still-unknown fields from findings made for the same query.
    /// Findings for another query are ignored.
    pub fn absorb(&mut self, findings: PrecheckMemo) {
        if findings.query != self.query {
            return;
        }
        if self.account_exists.is_none() {
            self.account_exists = findings.account_exists;
        }
        if self.block_hash.is_unchecked() {
            self.block_hash = findings.block_hash;
        }
        if self.block_height.is_none() {
            self.block_height = findings.block_height;
        }
        if self.transaction.is_unchecked() {
            self.transaction = findings.transaction;
        }
    }
}

/// Run the cascade for `query`, recording findings in `memo`.
pub async fn run_precheck(
    gateway: &Gateway,
    tokens: &TokenTable,
    query: &str,
    memo: &mut PrecheckMemo,
) -> Option<PrecheckTarget> {
    memo.for_query(query);
    let shape = Shape::of(query, tokens);

    for kind in shape.precheck_candidates() {
        log::debug!("[precheck] {query:?}: checking {kind:?}");
        let hit = match kind {
            EntityKind::Token => shape
                .token_module
                .clone()
                .map(|module| PrecheckTarget::Token { module }),
            EntityKind::BlockHeight => match shape.height {
                Some(height) => check_height(gateway, height, memo).await,
                None => None,
            },
            EntityKind::RequestKey => {
                if memo.transaction.is_unchecked() {
                    memo.transaction = Probe::from_option(gateway.transaction(query).await);
                }
                match memo.transaction {
                    Probe::Found(_) => Some(PrecheckTarget::Transactions),
                    _ => None,
                }
            }
            EntityKind::Module => gateway.module(query).await.map(|_| PrecheckTarget::Module),
            EntityKind::BlockHash => {
                if memo.block_hash.is_unchecked() {
                    memo.block_hash = Probe::from_option(gateway.block_by_hash(query).await);
                }
                match memo.block_hash {
                    Probe::Found(_) => Some(PrecheckTarget::BlockHash),
                    _ => None,
                }
            }
            EntityKind::Account => {
                if memo.account_exists.is_none() {
                    memo.account_exists = Some(gateway.account(query).await.is_some());
                }
                match memo.account_exists {
                    Some(true) => Some(PrecheckTarget::Account),
                    _ => None,
                }
            }
            EntityKind::Code => {
                if gateway.code_search(query, 1).await.is_empty() {
                    None
                } else {
                    Some(PrecheckTarget::Code)
                }
            }
        };
        if let Some(target) = hit {
            log::info!("[precheck] {query:?} resolved as {}", target.type_tag());
            return Some(target);
        }
    }

    log::info!("[precheck] {query:?}: no redirect target");
    None
}

async fn check_height(gateway: &Gateway, height: u64, memo: &mut PrecheckMemo) -> Option<PrecheckTarget> {
    if memo.block_height.is_none() {
        let blocks = gateway.blocks_at_height(height).await;
        memo.block_height = Some(HeightInfo::from_blocks(&blocks));
    }
    match memo.block_height {
        Some(HeightInfo {
            exists: true,
            chain_id: Some(chain_id),
            canonical,
        }) => Some(PrecheckTarget::Blocks {
            height,
            chain_id,
            canonical: canonical.unwrap_or(true),
        }),
        _ => None,
    }
}
