use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of chains a Kadena network braids together (chain ids 0..=19).
pub const CHAIN_COUNT: u32 = 20;

/// Which categories the live search probes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    All,
    Blocks,
    Transactions,
    Address,
    Tokens,
    Modules,
}

impl Filter {
    pub fn includes(&self, other: Filter) -> bool {
        *self == Filter::All || *self == other
    }
}

impl std::str::FromStr for Filter {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(Filter::All),
            "blocks" | "block" => Ok(Filter::Blocks),
            "transactions" | "transaction" | "tx" | "txs" => Ok(Filter::Transactions),
            "address" | "addresses" | "account" | "accounts" => Ok(Filter::Address),
            "tokens" | "token" => Ok(Filter::Tokens),
            "modules" | "module" => Ok(Filter::Modules),
            _ => Err(anyhow::anyhow!(
                "Invalid filter '{s}'. Valid options: all, blocks, transactions, address, tokens, modules"
            )),
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Filter::All => "all",
            Filter::Blocks => "blocks",
            Filter::Transactions => "transactions",
            Filter::Address => "address",
            Filter::Tokens => "tokens",
            Filter::Modules => "modules",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub hash: String,
    pub height: u64,
    pub chain_id: u32,
    pub canonical: bool,
    pub creation_time: Option<String>,
    pub tx_count: Option<u64>,
}

/// Normalized outcome of a transaction. An indexer record without an explicit
/// result is reported as a success.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "payload", rename_all = "snake_case")]
pub enum TxOutcome {
    Failure(Value),
    Success(Value),
    AssumedSuccess,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub request_key: String,
    pub chain_id: Option<u32>,
    pub sender: Option<String>,
    pub height: Option<u64>,
    pub creation_time: Option<String>,
    pub outcome: TxOutcome,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainBalance {
    pub chain_id: u32,
    pub balance: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddressSummary {
    pub account_name: String,
    pub total_balance: String,
    pub chains: Vec<ChainBalance>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenSummary {
    pub name: String,
    pub symbol: String,
    pub module: String,
    pub icon: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModuleSummary {
    pub name: String,
    pub chains: Vec<u32>,
    pub all_chains: bool,
}

impl ModuleSummary {
    pub fn new(name: &str, mut chains: Vec<u32>) -> Self {
        chains.sort_unstable();
        chains.dedup();
        let all_chains = chains.len() == CHAIN_COUNT as usize;
        Self {
            name: name.to_string(),
            chains,
            all_chains,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CodeSummary {
    pub code: String,
    pub sample_request_key: Option<String>,
}

/// Multi-category result of one live search.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultBag {
    pub blocks: Vec<BlockSummary>,
    pub addresses: Vec<AddressSummary>,
    pub transactions: Vec<TransactionSummary>,
    pub tokens: Vec<TokenSummary>,
    pub code: Vec<CodeSummary>,
    pub modules: Vec<ModuleSummary>,
    #[serde(rename = "__bgLoading", default)]
    pub bg_loading: bool,
}

impl ResultBag {
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> usize {
        self.blocks.len()
            + self.addresses.len()
            + self.transactions.len()
            + self.tokens.len()
            + self.code.len()
            + self.modules.len()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub query: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub timestamp: i64,
}

/// What the precheck cascade decided for a query.
#[derive(Clone, Debug, PartialEq)]
pub enum PrecheckTarget {
    Token { module: String },
    Blocks { height: u64, chain_id: u32, canonical: bool },
    Transactions,
    Module,
    BlockHash,
    Account,
    Code,
}

impl PrecheckTarget {
    pub fn type_tag(&self) -> &'static str {
        match self {
            PrecheckTarget::Token { .. } => "token",
            PrecheckTarget::Blocks { .. } => "blocks",
            PrecheckTarget::Transactions => "transactions",
            PrecheckTarget::Module => "module",
            PrecheckTarget::BlockHash => "block-hash",
            PrecheckTarget::Account => "account",
            PrecheckTarget::Code => "code",
        }
    }
}
