//! Redirect selection: precheck targets and result bags to routes.

use crate::router::Route;
use crate::types::{PrecheckTarget, ResultBag};

/// Route for a precheck hit. `BlockHash` has no route of its own: the chain id
/// is only known once a full search has produced the block.
pub fn route_for_target(query: &str, target: &PrecheckTarget) -> Option<Route> {
    match target {
        PrecheckTarget::Token { module } => Some(Route::Token {
            module: module.clone(),
        }),
        PrecheckTarget::Blocks {
            height,
            chain_id,
            canonical,
        } => Some(Route::Block {
            height: *height,
            chain_id: *chain_id,
            canonical: *canonical,
        }),
        PrecheckTarget::Transactions => Some(Route::Transaction {
            request_key: query.to_string(),
        }),
        PrecheckTarget::Module => Some(Route::Module {
            name: query.to_string(),
        }),
        PrecheckTarget::Account => Some(Route::Account {
            name: query.to_string(),
        }),
        PrecheckTarget::Code => Some(Route::CodeSearch {
            code: query.to_string(),
        }),
        PrecheckTarget::BlockHash => None,
    }
}

/// Single-result promotion over a bag.
///
/// Categories are checked in the order addresses, transactions, tokens,
/// blocks, modules; the first one holding exactly one entry wins. Blocks also
/// win with several entries (one per chain at a height), taking the first.
/// Code matches never promote on their own merit: they only route to the
/// code-filtered transaction list once nothing else did.
pub fn route_for_bag(query: &str, bag: &ResultBag) -> Option<Route> {
    if bag.addresses.len() == 1 {
        return Some(Route::Account {
            name: bag.addresses[0].account_name.clone(),
        });
    }
    if bag.transactions.len() == 1 {
        return Some(Route::Transaction {
            request_key: bag.transactions[0].request_key.clone(),
        });
    }
    if bag.tokens.len() == 1 {
        return Some(Route::Token {
            module: bag.tokens[0].module.clone(),
        });
    }
    if let Some(b) = bag.blocks.first() {
        return Some(Route::Block {
            height: b.height,
            chain_id: b.chain_id,
            canonical: b.canonical,
        });
    }
    if bag.modules.len() == 1 {
        return Some(Route::Module {
            name: bag.modules[0].name.clone(),
        });
    }
    if !bag.code.is_empty() {
        return Some(Route::CodeSearch {
            code: query.to_string(),
        });
    }
    None
}
