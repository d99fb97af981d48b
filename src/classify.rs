//! Shape heuristics that turn raw search input into candidate entity kinds.
//!
//! Nothing here performs I/O. Both the precheck cascade and the live search
//! read the same [`Shape`], but they walk it in different orders.

use crate::tokens::TokenTable;

/// Largest value accepted as a block height.
pub const MAX_BLOCK_HEIGHT: u64 = 20_000_000;

/// Block hashes and full request keys are never shorter than this.
pub const HASH_MIN_LEN: usize = 40;

/// Request keys are accepted from this length on.
pub const REQUEST_KEY_MIN_LEN: usize = 20;

/// Inclusive length bounds for a pact-code search.
pub const CODE_MIN_LEN: usize = 4;
pub const CODE_MAX_LEN: usize = 15;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Token,
    BlockHeight,
    RequestKey,
    Module,
    BlockHash,
    Account,
    Code,
}

/// Precomputed shape signals for one input string.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    pub input: String,
    /// Module of the first exact symbol match (table order).
    pub token_module: Option<String>,
    pub height: Option<u64>,
    pub request_key: bool,
    pub module: bool,
    pub code: bool,
}

impl Shape {
    pub fn of(input: &str, tokens: &TokenTable) -> Self {
        Self {
            input: input.to_string(),
            token_module: tokens.exact_symbol(input).first().map(|t| t.module.clone()),
            height: parse_height(input),
            request_key: is_request_key(input),
            module: is_module_name(input),
            code: is_code_candidate(input),
        }
    }

    /// Long enough and non-numeric: worth a block-hash probe in the live search.
    pub fn is_hash_like(&self) -> bool {
        !is_all_digits(&self.input) && self.input.chars().count() >= HASH_MIN_LEN
    }

    /// Kinds the precheck cascade visits, in its fixed order. Block-hash and
    /// account are always present since they are verification steps.
    pub fn precheck_candidates(&self) -> Vec<EntityKind> {
        let mut out = Vec::with_capacity(7);
        if self.token_module.is_some() {
            out.push(EntityKind::Token);
        }
        if self.height.is_some() {
            out.push(EntityKind::BlockHeight);
        }
        if self.request_key {
            out.push(EntityKind::RequestKey);
        }
        if self.module {
            out.push(EntityKind::Module);
        }
        out.push(EntityKind::BlockHash);
        out.push(EntityKind::Account);
        if self.code {
            out.push(EntityKind::Code);
        }
        out
    }

    /// Kinds the live search probes over the network (tokens are matched
    /// locally and always looked at). Short non-height input gets no hash
    /// verification and is read as an account name.
    pub fn live_candidates(&self) -> Vec<EntityKind> {
        let mut out = Vec::with_capacity(6);
        if self.height.is_some() {
            out.push(EntityKind::BlockHeight);
        }
        if self.is_hash_like() {
            out.push(EntityKind::BlockHash);
        }
        if self.request_key {
            out.push(EntityKind::RequestKey);
        }
        out.push(EntityKind::Account);
        if self.module {
            out.push(EntityKind::Module);
        }
        if self.code {
            out.push(EntityKind::Code);
        }
        out
    }
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// `^\d+$` with a value in `[0, MAX_BLOCK_HEIGHT]`.
pub fn parse_height(s: &str) -> Option<u64> {
    if !is_all_digits(s) {
        return None;
    }
    // Overlong digit strings overflow u64 and are simply not heights
    s.parse::<u64>().ok().filter(|h| *h <= MAX_BLOCK_HEIGHT)
}

/// `^[A-Za-z0-9\-_]{20,}$`
pub fn is_request_key(s: &str) -> bool {
    s.len() >= REQUEST_KEY_MIN_LEN
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Exactly two non-empty segments split on `.`, e.g. `free.kdoge`.
pub fn is_module_name(s: &str) -> bool {
    let mut parts = s.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(ns), Some(name), None) => !ns.is_empty() && !name.is_empty(),
        _ => false,
    }
}

pub fn is_code_candidate(s: &str) -> bool {
    (CODE_MIN_LEN..=CODE_MAX_LEN).contains(&s.chars().count())
}
