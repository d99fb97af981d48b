//! kadx - Kadena explorer search
//!
//! This library resolves whatever a user types into an explorer search box
//! (block heights, block hashes, request keys, accounts, token symbols, pact
//! modules, pact code) to the page that shows it.
//!
//! ## Architecture
//!
//! - **Classifier** (`classify`): pure shape checks on the input
//! - **Gateway** (`gateway`, `graphql`): one indexer request per probe, errors
//!   read as "not found"
//! - **Precheck** (`precheck`): ordered cascade run on submit, memoized per query
//! - **Aggregator** (`aggregate`): multi-category typeahead results
//! - **Dispatcher** (`dispatch`, `router`): result to explorer path
//! - **Session** (`session`): debounce, staleness guard, history, redirects
//!
//! ## Usage
//!
//! ```bash
//! kadx resolve 1500000
//! kadx search '$KDA' --filter tokens
//! kadx watch
//! ```

// Core modules (available on all platforms)
pub mod classify;
pub mod config;
pub mod tokens;
pub mod types;

// Indexer access
pub mod gateway;
pub mod graphql;
pub mod indexer;

// Search pipeline
pub mod aggregate;
pub mod dispatch;
pub mod precheck;
pub mod router;
pub mod session;

// Persistence (SQLite backend is native-only internally)
pub mod history;
pub mod storage;

pub mod util;

#[cfg(test)]
mod test_support;

pub use gateway::Gateway;
pub use router::{Navigator, Route};
pub use session::{SearchEvent, SearchSession, SearchState, GENERIC_SEARCH_ERROR};
pub use types::{Filter, ResultBag};
