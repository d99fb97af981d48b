use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::env;

use crate::types::Filter;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
    Development,
}

impl Network {
    /// Chainweb network id sent with every indexer request.
    pub fn id(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet01",
            Network::Testnet => "testnet04",
            Network::Development => "development",
        }
    }
}

impl std::str::FromStr for Network {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mainnet" | "mainnet01" => Ok(Network::Mainnet),
            "testnet" | "testnet04" => Ok(Network::Testnet),
            "development" | "devnet" | "dev" => Ok(Network::Development),
            _ => Err(anyhow!(
                "Invalid network '{s}'. Valid options: mainnet01, testnet04, development"
            )),
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// kadx - Kadena explorer search
///
/// Resolves free-form input (heights, hashes, request keys, accounts, tokens,
/// modules, pact code) to explorer pages.
/// Configuration priority: CLI args > Environment variables > Defaults
#[derive(Parser, Debug)]
#[command(name = "kadx")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Kadena explorer search", long_about = None)]
pub struct CliArgs {
    /// Indexer GraphQL endpoint URL
    #[arg(long, env = "KADX_GRAPHQL_URL")]
    pub graphql_url: Option<String>,

    /// Network: mainnet01, testnet04 or development
    #[arg(short, long, env = "KADX_NETWORK", value_parser = clap::value_parser!(Network))]
    pub network: Option<Network>,

    /// Bearer token for the indexer proxy
    #[arg(long, env = "KADX_API_TOKEN")]
    pub api_token: Option<String>,

    /// Indexer request timeout in milliseconds (1000-60000)
    #[arg(long, env = "KADX_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Typeahead quiet period in milliseconds (50-5000)
    #[arg(long, env = "KADX_DEBOUNCE_MS")]
    pub debounce_ms: Option<u64>,

    /// How long module descriptions are cached, in seconds (0-86400)
    #[arg(long, env = "KADX_MODULE_CACHE_TTL_SECS")]
    pub module_cache_ttl_secs: Option<u64>,

    /// Path to SQLite database holding search history
    #[arg(long, env = "KADX_HISTORY_DB")]
    pub history_db: Option<String>,

    /// Explorer base URL prefixed to printed routes
    #[arg(long, env = "KADX_EXPLORER_URL")]
    pub explorer_url: Option<String>,

    /// TOML file with extra [[token]] entries
    #[arg(long, env = "KADX_TOKENS_FILE")]
    pub tokens_file: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Resolve a query the way Enter does and print the route
    Resolve { query: String },
    /// Run a live search and print the result bag as JSON
    Search {
        query: String,
        /// Category filter: all, blocks, transactions, address, tokens, modules
        #[arg(short, long, default_value = "all", value_parser = clap::value_parser!(Filter))]
        filter: Filter,
    },
    /// Show or edit search history
    History {
        #[arg(long)]
        clear: bool,
        #[arg(long, value_name = "QUERY")]
        remove: Option<String>,
    },
    /// Interactive session: each line updates the input, an empty line submits
    Watch,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub graphql_url: String,
    pub network: Network,
    pub api_token: Option<String>,
    pub timeout_ms: u64,
    pub debounce_ms: u64,
    pub module_cache_ttl_secs: u64,
    pub history_db: String,
    pub explorer_url: String,
    pub tokens_file: Option<String>,
    pub command: Command,
}

/// Validate that a value is within a given range (inclusive)
fn validate_in_range<T>(val: T, min: T, max: T, name: &str) -> Result<T>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if val < min || val > max {
        Err(anyhow!("{name} must be in range [{min}, {max}], got {val}"))
    } else {
        Ok(val)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.parse().ok())
}

/// Load configuration from CLI args and environment variables
/// Priority: CLI args > Environment variables > Defaults
pub fn load() -> Result<Config> {
    from_args(CliArgs::parse())
}

pub fn from_args(args: CliArgs) -> Result<Config> {
    let network = args
        .network
        .or_else(|| env_parse("KADX_NETWORK"))
        .unwrap_or_default();

    let graphql_url = args
        .graphql_url
        .or_else(|| env::var("KADX_GRAPHQL_URL").ok())
        .unwrap_or_else(|| default_graphql_url(network).to_string());
    validate_url(&graphql_url, "KADX_GRAPHQL_URL")?;

    let explorer_url = args
        .explorer_url
        .or_else(|| env::var("KADX_EXPLORER_URL").ok())
        .unwrap_or_else(|| "https://explorer.kadena.io".to_string());
    validate_url(&explorer_url, "KADX_EXPLORER_URL")?;
    let explorer_url = explorer_url.trim_end_matches('/').to_string();

    let timeout_ms = args
        .timeout_ms
        .or_else(|| env_parse("KADX_TIMEOUT_MS"))
        .unwrap_or(8000);
    let timeout_ms = validate_in_range(timeout_ms, 1000, 60000, "KADX_TIMEOUT_MS")?;

    let debounce_ms = args
        .debounce_ms
        .or_else(|| env_parse("KADX_DEBOUNCE_MS"))
        .unwrap_or(500);
    let debounce_ms = validate_in_range(debounce_ms, 50, 5000, "KADX_DEBOUNCE_MS")?;

    let module_cache_ttl_secs = args
        .module_cache_ttl_secs
        .or_else(|| env_parse("KADX_MODULE_CACHE_TTL_SECS"))
        .unwrap_or(300);
    let module_cache_ttl_secs =
        validate_in_range(module_cache_ttl_secs, 0, 86400, "KADX_MODULE_CACHE_TTL_SECS")?;

    let history_db = args
        .history_db
        .or_else(|| env::var("KADX_HISTORY_DB").ok())
        .unwrap_or_else(|| "./kadx_history.db".to_string());
    if history_db.trim().is_empty() {
        return Err(anyhow!("KADX_HISTORY_DB cannot be empty"));
    }

    Ok(Config {
        graphql_url,
        network,
        api_token: args
            .api_token
            .or_else(|| env::var("KADX_API_TOKEN").ok())
            .filter(|t| !t.is_empty()),
        timeout_ms,
        debounce_ms,
        module_cache_ttl_secs,
        history_db,
        explorer_url,
        tokens_file: args
            .tokens_file
            .or_else(|| env::var("KADX_TOKENS_FILE").ok())
            .filter(|p| !p.is_empty()),
        command: args.command.unwrap_or(Command::Watch),
    })
}

fn default_graphql_url(network: Network) -> &'static str {
    match network {
        Network::Mainnet => "https://graph.kadena.network/graphql",
        Network::Testnet => "https://graph.testnet.kadena.network/graphql",
        Network::Development => "http://localhost:8080/graphql",
    }
}

/// Validate URL format (basic check)
fn validate_url(url: &str, name: &str) -> Result<()> {
    if url.is_empty() {
        return Err(anyhow!("{name} cannot be empty"));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow!("{name} must start with http:// or https://"))
    }
}

impl Config {
    /// Print current configuration (useful for debugging)
    pub fn print_summary(&self) {
        eprintln!("kadx configuration:");
        eprintln!("  Network: {}", self.network);
        eprintln!("  GraphQL URL: {}", self.graphql_url);
        eprintln!("  Timeout: {}ms", self.timeout_ms);
        eprintln!("  Debounce: {}ms", self.debounce_ms);
        eprintln!("  Module cache TTL: {}s", self.module_cache_ttl_secs);
        eprintln!("  History DB: {}", self.history_db);
        eprintln!("  Explorer: {}", self.explorer_url);
        if let Some(path) = &self.tokens_file {
            eprintln!("  Extra tokens: {path}");
        }
        if self.api_token.is_some() {
            eprintln!("  API token: Configured");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> CliArgs {
        let mut full = vec!["kadx"];
        full.extend_from_slice(argv);
        CliArgs::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_validate_in_range() {
        assert_eq!(validate_in_range(500, 50, 5000, "X").unwrap(), 500);
        assert!(validate_in_range(49, 50, 5000, "X").is_err());
        assert!(validate_in_range(5001, 50, 5000, "X").is_err());
    }

    #[test]
    fn test_network_parse() {
        assert_eq!("mainnet01".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("Testnet".parse::<Network>().unwrap(), Network::Testnet);
        assert_eq!(Network::Development.to_string(), "development");
        assert!("moonnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://graph.kadena.network/graphql", "U").is_ok());
        assert!(validate_url("ws://x", "U").is_err());
        assert!(validate_url("", "U").is_err());
    }

    #[test]
    fn test_cli_values_are_validated() {
        let args = parse(&[
            "--graphql-url",
            "http://localhost:4000/graphql",
            "--network",
            "testnet04",
            "--timeout-ms",
            "2000",
            "--debounce-ms",
            "250",
            "--module-cache-ttl-secs",
            "0",
            "--history-db",
            "/tmp/h.db",
            "--explorer-url",
            "https://explorer.example/",
            "resolve",
            "1500000",
        ]);
        let cfg = from_args(args).unwrap();
        assert_eq!(cfg.network, Network::Testnet);
        assert_eq!(cfg.timeout_ms, 2000);
        assert_eq!(cfg.debounce_ms, 250);
        assert_eq!(cfg.module_cache_ttl_secs, 0);
        assert_eq!(cfg.explorer_url, "https://explorer.example");
        assert_eq!(cfg.command, Command::Resolve { query: "1500000".into() });

        let bad = parse(&["--graphql-url", "http://x", "--history-db", "/tmp/h.db", "--debounce-ms", "10"]);
        assert!(from_args(bad).is_err());
    }

    #[test]
    fn test_search_filter_flag() {
        let args = parse(&["search", "kda", "--filter", "tokens"]);
        assert_eq!(
            args.command,
            Some(Command::Search { query: "kda".into(), filter: Filter::Tokens })
        );
        assert!(CliArgs::try_parse_from(["kadx", "search", "kda", "--filter", "nope"]).is_err());
    }
}
