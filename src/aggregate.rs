//! Live, multi-category search used for typeahead results.
//!
//! [`aggregate`] builds a [`ResultBag`] without touching session state; the
//! caller decides whether the outcome is still current before applying it. The
//! namespaced-module probe is not part of it: sessions run [`probe_module`] as
//! a detached task so a slow describe never holds back the primary results.

use crate::classify::{EntityKind, Shape};
use crate::gateway::Gateway;
use crate::precheck::{HeightInfo, PrecheckMemo, Probe};
use crate::tokens::TokenTable;
use crate::types::{CodeSummary, Filter, ModuleSummary, ResultBag};

/// Everything one aggregation needs, captured when it starts.
#[derive(Clone, Debug)]
pub struct SearchRequest {
    pub generation: u64,
    pub query: String,
    pub filter: Filter,
    /// Snapshot of the session memo for `query`.
    pub memo: PrecheckMemo,
}

#[derive(Clone, Debug)]
pub struct SearchOutcome {
    pub generation: u64,
    pub query: String,
    pub bag: ResultBag,
    /// What this run learned, in memo form, for the same query.
    pub findings: PrecheckMemo,
}

pub async fn aggregate(gateway: &Gateway, tokens: &TokenTable, req: SearchRequest) -> SearchOutcome {
    let SearchRequest {
        generation,
        query,
        filter,
        memo,
    } = req;
    let shape = Shape::of(&query, tokens);
    let live = shape.live_candidates();
    let live_has = |kind: EntityKind| live.contains(&kind);
    let q = query.as_str();
    let memo = &memo;

    let blocks = async {
        let mut out = Vec::new();
        let mut height_info = None;
        let mut hash_probe = Probe::Unchecked;
        if !filter.includes(Filter::Blocks) {
            return (out, height_info, hash_probe);
        }
        for kind in &live {
            match kind {
                EntityKind::BlockHeight => {
                    let Some(height) = shape.height else { continue };
                    let known_missing =
                        matches!(memo.block_height, Some(HeightInfo { exists: false, .. }));
                    if !known_missing {
                        let found = gateway.blocks_at_height(height).await;
                        height_info = Some(HeightInfo::from_blocks(&found));
                        out.extend(found);
                    }
                }
                EntityKind::BlockHash => match &memo.block_hash {
                    Probe::Found(b) => out.push(b.clone()),
                    Probe::Absent => {}
                    Probe::Unchecked => {
                        let found = gateway.block_by_hash(q).await;
                        if let Some(b) = &found {
                            out.push(b.clone());
                        }
                        hash_probe = Probe::from_option(found);
                    }
                },
                _ => {}
            }
        }
        (out, height_info, hash_probe)
    };

    let transactions = async {
        if !filter.includes(Filter::Transactions) || !live_has(EntityKind::RequestKey) {
            return (Vec::new(), Probe::Unchecked);
        }
        match &memo.transaction {
            Probe::Found(tx) => (vec![tx.clone()], Probe::Unchecked),
            Probe::Absent => (Vec::new(), Probe::Unchecked),
            Probe::Unchecked => {
                let found = gateway.transaction(q).await;
                (found.iter().cloned().collect(), Probe::from_option(found))
            }
        }
    };

    let addresses = async {
        if !filter.includes(Filter::Address)
            || !live_has(EntityKind::Account)
            || memo.account_exists == Some(false)
        {
            return (Vec::new(), None);
        }
        let found = gateway.account(q).await;
        let exists = Some(found.is_some());
        (found.into_iter().collect(), exists)
    };

    let code = async {
        let wanted = filter == Filter::All || filter == Filter::Transactions;
        if !wanted || !live_has(EntityKind::Code) {
            return Vec::new();
        }
        let keys = gateway.code_search(q, 1).await;
        if keys.is_empty() {
            Vec::new()
        } else {
            vec![CodeSummary {
                code: query.clone(),
                sample_request_key: keys.into_iter().next(),
            }]
        }
    };

    let ((blocks, height_info, hash_probe), (transactions, tx_probe), (addresses, account_exists), code) =
        futures::join!(blocks, transactions, addresses, code);

    let tokens = if filter.includes(Filter::Tokens) {
        tokens.search(q)
    } else {
        Vec::new()
    };

    let bag = ResultBag {
        blocks,
        addresses,
        transactions,
        tokens,
        code,
        modules: Vec::new(),
        bg_loading: false,
    };
    log::debug!("[search] {q:?} ({filter}): {} results", bag.total());

    let mut findings = PrecheckMemo::new(q);
    findings.block_height = height_info;
    findings.block_hash = hash_probe;
    findings.transaction = tx_probe;
    findings.account_exists = account_exists;

    SearchOutcome {
        generation,
        query,
        bag,
        findings,
    }
}

/// Whether a live search for `shape` under `filter` starts the background
/// module probe.
pub fn wants_module_probe(shape: &Shape, filter: Filter) -> bool {
    filter.includes(Filter::Modules) && shape.live_candidates().contains(&EntityKind::Module)
}

/// Background half of the live search: the batched per-chain describe.
pub async fn probe_module(gateway: &Gateway, query: &str) -> Option<ModuleSummary> {
    gateway.module(query).await
}
