//! Explorer routes produced by the search subsystem
//!
//! ## Path templates
//!
//! - `/account/<name>` - Account overview
//! - `/transactions/<requestKey>` - Transaction details
//! - `/token/<urlEncodedModule>` - Fungible token page
//! - `/blocks/<height>/chain/<chainId>` - Block details, with `?canonical=false`
//!   for orphaned blocks
//! - `/module/<name>` - Pact module page
//! - `/transactions?code=<query>` - Transaction list filtered by pact code
//!
//! ## Example
//!
//! ```rust
//! use kadx::router::Route;
//!
//! let route = Route::Block { height: 1500000, chain_id: 3, canonical: false };
//! assert_eq!(route.to_path(), "/blocks/1500000/chain/3?canonical=false");
//! ```

use anyhow::Result;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Account { name: String },
    Transaction { request_key: String },
    Token { module: String },
    Block { height: u64, chain_id: u32, canonical: bool },
    Module { name: String },
    CodeSearch { code: String },
}

impl Route {
    pub fn to_path(&self) -> String {
        match self {
            Route::Account { name } => format!("/account/{name}"),
            Route::Transaction { request_key } => format!("/transactions/{request_key}"),
            Route::Token { module } => format!("/token/{}", urlencoding::encode(module)),
            Route::Block {
                height,
                chain_id,
                canonical,
            } => {
                if *canonical {
                    format!("/blocks/{height}/chain/{chain_id}")
                } else {
                    format!("/blocks/{height}/chain/{chain_id}?canonical=false")
                }
            }
            Route::Module { name } => format!("/module/{name}"),
            Route::CodeSearch { code } => {
                format!("/transactions?code={}", urlencoding::encode(code))
            }
        }
    }

    /// History tag recorded for a redirect along this route.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Route::Account { .. } => "account",
            Route::Transaction { .. } => "transactions",
            Route::Token { .. } => "token",
            Route::Block { .. } => "blocks",
            Route::Module { .. } => "module",
            Route::CodeSearch { .. } => "code",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_path())
    }
}

/// Navigation primitive of the hosting UI.
pub trait Navigator: Send {
    fn push(&mut self, path: &str) -> Result<()>;
}

/// Keeps every pushed path; handy for headless hosts and tests.
#[derive(Clone, Debug, Default)]
pub struct RecordingNavigator {
    pub pushed: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    pub fn paths(&self) -> Vec<String> {
        self.pushed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn last(&self) -> Option<String> {
        self.paths().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn push(&mut self, path: &str) -> Result<()> {
        log::debug!("[router] push {path}");
        self.pushed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(path.to_string());
        Ok(())
    }
}
