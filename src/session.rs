//! Search session: typeahead state, submit handling and redirects.
//!
//! A session owns everything that changes while the user types. Network work
//! runs in detached tasks that report back over the session's event channel;
//! the host pumps that channel with [`SearchSession::next_event`] and
//! [`SearchSession::handle_event`] (or one of the `settle` helpers). Every
//! result carries the generation and query it was started for and is dropped
//! if either is no longer current.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::aggregate::{aggregate, probe_module, wants_module_probe, SearchOutcome, SearchRequest};
use crate::classify::Shape;
use crate::dispatch::{route_for_bag, route_for_target};
use crate::gateway::Gateway;
use crate::history::HistoryStore;
use crate::precheck::{run_precheck, PrecheckMemo, Probe};
use crate::router::{Navigator, Route};
use crate::tokens::TokenTable;
use crate::types::{Filter, HistoryEntry, ModuleSummary, PrecheckTarget, ResultBag};
use crate::util::debounce::Debouncer;

/// Message shown when search orchestration itself fails.
pub const GENERIC_SEARCH_ERROR: &str = "Something went wrong while searching. Please try again.";

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Clone, Debug)]
pub enum SearchEvent {
    /// The typeahead quiet period for `query` ran out. Ignored unless
    /// `ticket` is still the debouncer's current one.
    DebounceElapsed { query: String, ticket: u64 },
    SearchCompleted(Box<SearchOutcome>),
    SearchFailed { generation: u64, query: String },
    /// The background module describe for `query` finished.
    ModuleSettled {
        query: String,
        summary: Option<ModuleSummary>,
    },
}

#[derive(Clone, Debug, Default)]
pub struct SearchState {
    pub query: String,
    pub filter: Filter,
    pub open: bool,
    pub loading: bool,
    pub error: Option<String>,
    /// `None` until a search for the current input has started.
    pub searched: Option<ResultBag>,
    pub background_pending: usize,
    pub precheck: PrecheckMemo,
    pub last_search_was_empty: bool,
    pub enter_locked_for_query: Option<String>,
}

pub struct SearchSession {
    state: SearchState,
    gateway: Arc<Gateway>,
    tokens: Arc<TokenTable>,
    history: HistoryStore,
    navigator: Box<dyn Navigator>,
    debouncer: Debouncer,
    events_tx: UnboundedSender<SearchEvent>,
    events_rx: UnboundedReceiver<SearchEvent>,
    generation: u64,
    /// Query the current `searched` bag was built for.
    searched_for: Option<String>,
}

impl SearchSession {
    pub fn new(
        gateway: Arc<Gateway>,
        tokens: Arc<TokenTable>,
        history: HistoryStore,
        navigator: Box<dyn Navigator>,
        debounce: Duration,
    ) -> Self {
        let (events_tx, events_rx) = unbounded_channel();
        Self {
            state: SearchState::default(),
            gateway,
            tokens,
            history,
            navigator,
            debouncer: Debouncer::new(debounce),
            events_tx,
            events_rx,
            generation: 0,
            searched_for: None,
        }
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn current_query(&self) -> &str {
        self.state.query.trim()
    }

    pub fn history(&mut self) -> &[HistoryEntry] {
        self.history.entries()
    }

    pub fn remove_history(&mut self, query: &str) -> Result<bool> {
        self.history.remove(query)
    }

    pub fn clear_history(&mut self) -> Result<()> {
        self.history.clear()
    }

    pub fn open(&mut self) {
        self.state.open = true;
    }

    pub fn close(&mut self) {
        self.state.open = false;
    }

    /// Update the input text and (re)start the typeahead quiet period.
    /// Must be called from within a tokio runtime.
    pub fn set_query(&mut self, input: &str) {
        let changed = input.trim() != self.current_query();
        self.state.query = input.to_string();
        let query = self.current_query().to_string();

        if changed {
            self.state.precheck.for_query(&query);
            self.state.enter_locked_for_query = None;
        }

        if query.is_empty() {
            self.debouncer.cancel();
            self.generation += 1;
            self.state.searched = None;
            self.searched_for = None;
            self.state.loading = false;
            self.state.last_search_was_empty = false;
            return;
        }

        self.state.open = true;
        self.debouncer.schedule(&self.events_tx, |ticket| {
            SearchEvent::DebounceElapsed { query, ticket }
        });
    }

    /// Switch the category filter. Any in-flight search becomes stale and a
    /// fresh one is scheduled for the current input.
    pub fn set_filter(&mut self, filter: Filter) {
        if filter == self.state.filter {
            return;
        }
        log::debug!("[search] filter -> {filter}");
        self.state.filter = filter;
        self.generation += 1;
        self.state.searched = None;
        self.searched_for = None;
        self.state.loading = false;
        self.state.last_search_was_empty = false;

        let query = self.current_query().to_string();
        if !query.is_empty() {
            self.debouncer.schedule(&self.events_tx, |ticket| {
                SearchEvent::DebounceElapsed { query, ticket }
            });
        }
    }

    /// Begin a live search for the current input: bumps the generation, starts
    /// the background module probe when it applies and returns the request
    /// for the foreground aggregation.
    pub fn prepare_search(&mut self) -> SearchRequest {
        self.debouncer.cancel();
        self.generation += 1;
        let query = self.current_query().to_string();
        let filter = self.state.filter;
        self.state.precheck.for_query(&query);
        self.state.loading = true;
        self.state.error = None;

        if wants_module_probe(&Shape::of(&query, &self.tokens), filter) {
            self.spawn_module_probe(query.clone());
        }
        if self.state.background_pending > 0 {
            self.state
                .searched
                .get_or_insert_with(ResultBag::default)
                .bg_loading = true;
        }

        SearchRequest {
            generation: self.generation,
            query,
            filter,
            memo: self.state.precheck.clone(),
        }
    }

    fn spawn_module_probe(&mut self, query: String) {
        self.state.background_pending += 1;
        log::debug!("[search] background module probe for {query:?}");
        let gateway = self.gateway.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let q = query.clone();
            let summary = match tokio::spawn(async move { probe_module(&gateway, &q).await }).await {
                Ok(summary) => summary,
                Err(e) => {
                    log::warn!("[search] module probe for {query:?} aborted: {e}");
                    None
                }
            };
            let _ = tx.send(SearchEvent::ModuleSettled { query, summary });
        });
    }

    /// Run the foreground aggregation detached; its outcome arrives as
    /// [`SearchEvent::SearchCompleted`].
    fn spawn_search(&mut self) {
        let req = self.prepare_search();
        let generation = req.generation;
        let query = req.query.clone();
        let gateway = self.gateway.clone();
        let tokens = self.tokens.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let task = tokio::spawn(async move { aggregate(&gateway, &tokens, req).await });
            let event = match task.await {
                Ok(outcome) => SearchEvent::SearchCompleted(Box::new(outcome)),
                Err(e) => {
                    log::error!("[search] search for {query:?} aborted: {e}");
                    SearchEvent::SearchFailed { generation, query }
                }
            };
            let _ = tx.send(event);
        });
    }

    /// Live search for the current input, awaited in place.
    pub async fn search(&mut self) -> bool {
        let req = self.prepare_search();
        let outcome = aggregate(&self.gateway, &self.tokens, req).await;
        self.apply(outcome)
    }

    /// Install a finished aggregation if it is still current. Returns whether
    /// it was applied.
    pub fn apply(&mut self, outcome: SearchOutcome) -> bool {
        if outcome.generation != self.generation || outcome.query != self.current_query() {
            log::debug!(
                "[search] dropping stale results for {:?} (generation {})",
                outcome.query,
                outcome.generation
            );
            return false;
        }

        let SearchOutcome {
            query,
            mut bag,
            findings,
            ..
        } = outcome;
        // Module hits may have merged before the foreground finished
        if let Some(prev) = self.state.searched.take() {
            bag.modules = prev.modules.into_iter().filter(|m| m.name == query).collect();
        }
        bag.bg_loading = self.state.background_pending > 0;
        self.state.last_search_was_empty = bag.is_empty();
        self.state.searched = Some(bag);
        self.state.loading = false;
        self.state.precheck.absorb(findings);
        self.searched_for = Some(query);
        true
    }

    pub async fn next_event(&mut self) -> Option<SearchEvent> {
        self.events_rx.recv().await
    }

    pub fn handle_event(&mut self, event: SearchEvent) {
        match event {
            SearchEvent::DebounceElapsed { query, ticket } => {
                if self.debouncer.is_current(ticket) && query == self.current_query() {
                    self.spawn_search();
                }
            }
            SearchEvent::SearchCompleted(outcome) => {
                self.apply(*outcome);
            }
            SearchEvent::SearchFailed { generation, query } => {
                if generation == self.generation && query == self.current_query() {
                    self.state.loading = false;
                    self.state.error = Some(GENERIC_SEARCH_ERROR.to_string());
                }
            }
            SearchEvent::ModuleSettled { query, summary } => self.settle_module(query, summary),
        }
    }

    fn settle_module(&mut self, query: String, summary: Option<ModuleSummary>) {
        self.state.background_pending = self.state.background_pending.saturating_sub(1);
        let current = query == self.current_query();

        if let (true, Some(summary)) = (current, summary) {
            log::debug!("[search] module {} found on {} chains", summary.name, summary.chains.len());
            let bag = self.state.searched.get_or_insert_with(ResultBag::default);
            if !bag.modules.iter().any(|m| m.name == summary.name) {
                bag.modules.push(summary);
            }
        }

        let pending = self.state.background_pending > 0;
        if let Some(bag) = self.state.searched.as_mut() {
            bag.bg_loading = pending;
            if current && !self.state.loading {
                self.state.last_search_was_empty = bag.is_empty();
            }
        }
    }

    /// Process events until no detached module probe is outstanding.
    pub async fn settle_background(&mut self) {
        while self.state.background_pending > 0 {
            match self.events_rx.recv().await {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }
    }

    /// Process events until the session is idle: no pending debounce, no
    /// foreground search and no background probe.
    pub async fn settle(&mut self) {
        loop {
            let idle = !self.debouncer.is_pending()
                && !self.state.loading
                && self.state.background_pending == 0;
            if let Ok(event) = self.events_rx.try_recv() {
                self.handle_event(event);
                continue;
            }
            if idle {
                break;
            }
            match self.events_rx.recv().await {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }
    }

    /// Explicit submit (Enter). Redirects to the best target for the current
    /// input and returns the route taken, if any.
    ///
    /// Orchestration failures set the generic error message and are returned.
    pub async fn submit(&mut self) -> Result<Option<Route>> {
        match self.try_submit().await {
            Ok(route) => Ok(route),
            Err(e) => {
                log::error!("[search] submit failed: {e:#}");
                self.state.loading = false;
                self.state.error = Some(GENERIC_SEARCH_ERROR.to_string());
                self.state.enter_locked_for_query = None;
                Err(e)
            }
        }
    }

    async fn try_submit(&mut self) -> Result<Option<Route>> {
        let query = self.current_query().to_string();
        if query.is_empty() {
            return Ok(None);
        }
        if self.state.enter_locked_for_query.as_deref() == Some(query.as_str()) {
            log::debug!("[search] ignoring repeated submit for {query:?}");
            return Ok(None);
        }
        self.state.enter_locked_for_query = Some(query.clone());
        self.debouncer.cancel();
        self.state.error = None;

        let target = run_precheck(&self.gateway, &self.tokens, &query, &mut self.state.precheck).await;

        let route = match target {
            Some(PrecheckTarget::BlockHash) => {
                // Chain id comes from the block itself
                self.search().await;
                let from_bag = self
                    .state
                    .searched
                    .as_ref()
                    .and_then(|bag| route_for_bag(&query, bag));
                from_bag.or_else(|| match &self.state.precheck.block_hash {
                    Probe::Found(b) => Some(Route::Block {
                        height: b.height,
                        chain_id: b.chain_id,
                        canonical: b.canonical,
                    }),
                    _ => None,
                })
            }
            Some(target) => route_for_target(&query, &target),
            None => {
                let fresh = self.searched_for.as_deref() == Some(query.as_str()) && !self.state.loading;
                if !fresh {
                    self.search().await;
                }
                self.state
                    .searched
                    .as_ref()
                    .and_then(|bag| route_for_bag(&query, bag))
            }
        };

        match route {
            Some(route) => self.redirect(&query, route).map(Some),
            None => {
                log::info!("[search] nothing to open for {query:?}");
                Ok(None)
            }
        }
    }

    /// Navigate to `route`, record `query` in history and reset the session.
    pub fn redirect(&mut self, query: &str, route: Route) -> Result<Route> {
        let path = route.to_path();
        log::info!("[search] {query:?} -> {path}");
        self.navigator
            .push(&path)
            .with_context(|| format!("navigate to {path}"))?;
        if let Err(e) = self.history.add(query, Some(route.type_tag())) {
            log::warn!("[history] failed to record {query:?}: {e:#}");
        }
        self.reset();
        Ok(route)
    }

    /// Drop all transient state and close the panel. The filter and any
    /// still-running background probes survive.
    pub fn reset(&mut self) {
        self.debouncer.cancel();
        self.generation += 1;
        self.searched_for = None;
        self.state = SearchState {
            filter: self.state.filter,
            background_pending: self.state.background_pending,
            ..SearchState::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::RecordingNavigator;
    use crate::storage::MemoryKv;
    use crate::test_support::{account, block, gateway, ScriptedIndexer};

    fn session(idx: ScriptedIndexer) -> (Arc<ScriptedIndexer>, RecordingNavigator, SearchSession) {
        let (idx, gw) = gateway(idx);
        let nav = RecordingNavigator::default();
        let s = SearchSession::new(
            gw,
            Arc::new(TokenTable::builtin()),
            HistoryStore::new(Arc::new(MemoryKv::new())),
            Box::new(nav.clone()),
            DEFAULT_DEBOUNCE,
        );
        (idx, nav, s)
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_burst_runs_one_search() {
        let mut idx = ScriptedIndexer::default();
        idx.accounts.insert("alice".into(), account("alice"));
        let (idx, _, mut s) = session(idx);

        s.set_query("a");
        s.set_query("al");
        s.set_query("alice");
        s.settle().await;

        assert_eq!(idx.calls(), vec!["account:alice", "code:alice"]);
        let bag = s.state().searched.as_ref().unwrap();
        assert_eq!(bag.addresses.len(), 1);
        assert!(!s.state().last_search_was_empty);
        assert!(!s.state().loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_outcome_is_dropped() {
        let (_, _, mut s) = session(ScriptedIndexer::default());
        s.set_query("first");
        let old = s.prepare_search();
        let old_outcome = SearchOutcome {
            generation: old.generation,
            query: old.query,
            bag: ResultBag {
                addresses: vec![account("first")],
                ..Default::default()
            },
            findings: PrecheckMemo::new("first"),
        };

        s.set_query("second");
        s.search().await;
        assert!(!s.apply(old_outcome));
        assert!(s.state().searched.as_ref().unwrap().addresses.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_module_probe_merges_in_background() {
        let mut idx = ScriptedIndexer::default();
        idx.modules.insert("free.kdoge".into(), (0..20).collect());
        idx.module_delay = Some(Duration::from_secs(3));
        let (_, _, mut s) = session(idx);

        s.set_query("free.kdoge");
        s.search().await;
        let bag = s.state().searched.as_ref().unwrap();
        assert!(bag.bg_loading);
        assert!(bag.modules.is_empty());
        assert_eq!(s.state().background_pending, 1);

        s.settle_background().await;
        let bag = s.state().searched.as_ref().unwrap();
        assert!(!bag.bg_loading);
        assert_eq!(bag.modules.len(), 1);
        assert!(bag.modules[0].all_chains);
        assert!(!s.state().last_search_was_empty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_module_result_for_old_query_is_ignored() {
        let mut idx = ScriptedIndexer::default();
        idx.modules.insert("free.kdoge".into(), vec![1]);
        idx.module_delay = Some(Duration::from_secs(3));
        let (_, _, mut s) = session(idx);

        s.set_query("free.kdoge");
        s.search().await;
        s.set_query("bob");
        s.search().await;
        s.settle_background().await;

        assert_eq!(s.state().background_pending, 0);
        let bag = s.state().searched.as_ref().unwrap();
        assert!(bag.modules.is_empty());
        assert!(!bag.bg_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_reuses_live_findings() {
        let mut idx = ScriptedIndexer::default();
        idx.heights.insert(1_500_000, vec![block("x", 1_500_000, 4, true)]);
        let (idx, nav, mut s) = session(idx);

        s.set_query("1500000");
        s.settle().await;
        idx.clear_calls();

        let route = s.submit().await.unwrap().unwrap();
        assert_eq!(route.to_path(), "/blocks/1500000/chain/4");
        assert_eq!(nav.last().as_deref(), Some("/blocks/1500000/chain/4"));
        assert!(idx.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_redirect_resets_session() {
        let (_, _, mut s) = session(ScriptedIndexer::default());
        s.set_filter(Filter::Tokens);
        s.set_query("$KDA");
        s.open();

        s.submit().await.unwrap();
        let st = s.state();
        assert_eq!(st.query, "");
        assert!(st.searched.is_none());
        assert!(!st.open);
        assert!(st.precheck.is_empty());
        assert_eq!(st.filter, Filter::Tokens);
        assert_eq!(s.history()[0].kind.as_deref(), Some("token"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_submit_is_locked() {
        let (idx, nav, mut s) = session(ScriptedIndexer::default());
        s.set_query("nobody");

        assert_eq!(s.submit().await.unwrap(), None);
        let calls = idx.calls().len();
        assert_eq!(s.submit().await.unwrap(), None);
        assert_eq!(idx.calls().len(), calls);
        assert!(nav.paths().is_empty());

        // Editing the input releases the lock
        s.set_query("nobody2");
        s.set_query("nobody");
        s.submit().await.unwrap();
        assert!(idx.calls().len() > calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_discards_already_fired_debounce() {
        let (idx, _, mut s) = session(ScriptedIndexer::default());
        s.set_query("nobody");
        // Timer fires while nobody pumps the channel
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(s.submit().await.unwrap(), None);
        let calls = idx.calls();
        s.settle().await;

        assert_eq!(idx.calls(), calls);
        assert!(!s.state().loading);
        assert!(s.state().last_search_was_empty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_filter_invalidates_bag() {
        let mut idx = ScriptedIndexer::default();
        idx.accounts.insert("kda".into(), account("kda"));
        let (_, _, mut s) = session(idx);

        s.set_query("kda");
        s.settle().await;
        assert_eq!(s.state().searched.as_ref().unwrap().addresses.len(), 1);

        s.set_filter(Filter::Tokens);
        assert!(s.state().searched.is_none());
        s.settle().await;
        let bag = s.state().searched.as_ref().unwrap();
        assert!(bag.addresses.is_empty());
        assert_eq!(bag.tokens.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_input_clears_results() {
        let (_, _, mut s) = session(ScriptedIndexer::default());
        s.set_query("bob");
        s.settle().await;
        assert!(s.state().searched.is_some());
        assert!(s.state().last_search_was_empty);

        s.set_query("   ");
        assert!(s.state().searched.is_none());
        assert!(!s.state().last_search_was_empty);
        assert_eq!(s.submit().await.unwrap(), None);
    }

    struct BrokenNavigator;

    impl Navigator for BrokenNavigator {
        fn push(&mut self, _path: &str) -> Result<()> {
            Err(anyhow::anyhow!("router unavailable"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_failure_sets_generic_error() {
        let (_, gw) = gateway(ScriptedIndexer::default());
        let mut s = SearchSession::new(
            gw,
            Arc::new(TokenTable::builtin()),
            HistoryStore::new(Arc::new(MemoryKv::new())),
            Box::new(BrokenNavigator),
            DEFAULT_DEBOUNCE,
        );
        s.set_query("$KDA");
        assert!(s.submit().await.is_err());
        assert_eq!(s.state().error.as_deref(), Some(GENERIC_SEARCH_ERROR));
        assert_eq!(s.state().query, "$KDA");
        assert!(s.history().is_empty());
    }
}
