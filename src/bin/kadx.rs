// Native binary for kadx - search and resolve from the terminal

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use kadx::{
    config::{load, Command, Config},
    gateway::Gateway,
    graphql::GraphqlIndexer,
    history::HistoryStore,
    router::Navigator,
    session::SearchSession,
    storage::SqliteKv,
    tokens::TokenTable,
    types::ResultBag,
};

/// Prints every redirect as a full explorer URL.
struct StdoutNavigator {
    base: String,
}

impl Navigator for StdoutNavigator {
    fn push(&mut self, path: &str) -> Result<()> {
        println!("{}{}", self.base, path);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (safe to ignore if not found)
    let _ = dotenvy::dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = load().context("Failed to load configuration")?;
    if log::log_enabled!(log::Level::Debug) {
        cfg.print_summary();
    }

    let mut session = build_session(&cfg)?;

    match cfg.command.clone() {
        Command::Resolve { query } => {
            session.set_query(&query);
            if session.submit().await?.is_none() {
                log::warn!("No page found for {query:?}");
                std::process::exit(1);
            }
        }
        Command::Search { query, filter } => {
            session.set_filter(filter);
            session.set_query(&query);
            session.search().await;
            session.settle_background().await;
            print_bag(session.state().searched.as_ref())?;
        }
        Command::History { clear, remove } => {
            if clear {
                session.clear_history()?;
                log::info!("History cleared");
            } else if let Some(q) = remove {
                if !session.remove_history(&q)? {
                    log::warn!("{q:?} is not in history");
                }
            }
            for entry in session.history() {
                println!(
                    "{:<14} {}",
                    entry.kind.as_deref().unwrap_or("-"),
                    entry.query
                );
            }
        }
        Command::Watch => watch(&mut session).await?,
    }

    Ok(())
}

fn build_session(cfg: &Config) -> Result<SearchSession> {
    let indexer = Arc::new(GraphqlIndexer::new(
        &cfg.graphql_url,
        cfg.network.id(),
        cfg.timeout_ms,
        cfg.api_token.clone(),
    ));
    let gateway = Arc::new(Gateway::new(
        indexer,
        Duration::from_secs(cfg.module_cache_ttl_secs),
    ));

    let tokens = match &cfg.tokens_file {
        Some(path) => TokenTable::with_file(Path::new(path))
            .with_context(|| format!("Failed to load tokens from {path}"))?,
        None => TokenTable::builtin(),
    };

    let kv = Arc::new(SqliteKv::open(&cfg.history_db)?);
    let navigator = StdoutNavigator {
        base: cfg.explorer_url.clone(),
    };

    Ok(SearchSession::new(
        gateway,
        Arc::new(tokens),
        HistoryStore::new(kv),
        Box::new(navigator),
        Duration::from_millis(cfg.debounce_ms),
    ))
}

fn print_bag(bag: Option<&ResultBag>) -> Result<()> {
    let bag = bag.cloned().unwrap_or_default();
    println!("{}", serde_json::to_string_pretty(&bag)?);
    Ok(())
}

/// Line-driven session: a non-empty line replaces the input, an empty line
/// submits it. Results are printed whenever a live search lands.
async fn watch(session: &mut SearchSession) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprintln!("Type a query; press Enter on an empty line to open it. Ctrl-C quits.");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    match session.submit().await {
                        Ok(Some(_)) => {}
                        Ok(None) => eprintln!("(no single match)"),
                        Err(e) => eprintln!("{}: {e:#}", kadx::GENERIC_SEARCH_ERROR),
                    }
                } else {
                    session.set_query(&line);
                }
            }
            event = session.next_event() => {
                let Some(event) = event else { break };
                let before = session.state().searched.clone();
                session.handle_event(event);
                let after = session.state().searched.as_ref();
                if after != before.as_ref() && !session.state().loading {
                    print_bag(after)?;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}
