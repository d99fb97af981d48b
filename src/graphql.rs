use crate::indexer::{Indexer, ModuleChainReport};
use crate::types::{AddressSummary, BlockSummary, ChainBalance, TransactionSummary, TxOutcome};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;

static HTTP: OnceLock<reqwest::Client> = OnceLock::new();

pub fn http_client() -> &'static reqwest::Client {
    HTTP.get_or_init(|| {
        reqwest::Client::builder()
            .pool_max_idle_per_host(8)
            .tcp_nodelay(true)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("[graphql] falling back to default client: {e}");
                reqwest::Client::new()
            })
    })
}

pub const BLOCKS_AT_HEIGHT: &str = r#"query BlocksAtHeight($height: Int!) {
  blocksFromHeight(startHeight: $height, endHeight: $height) {
    edges { node { hash height chainId canonical creationTime transactions { totalCount } } }
  }
}"#;

pub const BLOCK_BY_HASH: &str = r#"query BlockByHash($hash: String!) {
  block(hash: $hash) { hash height chainId canonical creationTime transactions { totalCount } }
}"#;

pub const TRANSACTION_BY_KEY: &str = r#"query TransactionByKey($requestKey: String!) {
  transaction(requestKey: $requestKey) {
    hash
    cmd { meta { chainId sender creationTime } }
    result { ... on TransactionResult { badResult goodResult block { height } } }
  }
}"#;

pub const FUNGIBLE_ACCOUNT: &str = r#"query FungibleAccount($accountName: String!) {
  fungibleAccount(accountName: $accountName) {
    accountName totalBalance chainAccounts { chainId balance }
  }
}"#;

pub const DESCRIBE_MODULE: &str = r#"query DescribeModule($pactQuery: [PactQuery!]!) {
  pactQuery(pactQuery: $pactQuery) { chainId result status error }
}"#;

pub const TRANSACTIONS_BY_CODE: &str = r#"query TransactionsByCode($pactCode: String!, $first: Int) {
  transactions(pactCode: $pactCode, first: $first) { edges { node { hash } } }
}"#;

/// Futures currently on the wire, keyed by request. Callers asking for a key
/// that is already in flight await the same future instead of starting
/// another one.
pub struct InflightMap<T> {
    map: Mutex<HashMap<String, Shared<BoxFuture<'static, T>>>>,
}

impl<T> Default for InflightMap<T> {
    fn default() -> Self {
        Self {
            map: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> InflightMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Shared<BoxFuture<'static, T>>>> {
        self.map.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Await the in-flight future for `key`, or start one with `make`.
    /// The entry is dropped once it resolves; a later request under the same
    /// key is left in place.
    pub async fn dedup<F, M>(&self, key: String, make: M) -> T
    where
        F: Future<Output = T> + Send + 'static,
        M: FnOnce() -> F,
    {
        let fut = {
            let mut map = self.lock();
            match map.get(&key) {
                Some(f) => {
                    log::debug!("[graphql] joining in-flight request");
                    f.clone()
                }
                None => {
                    let f = make().boxed().shared();
                    map.insert(key.clone(), f.clone());
                    f
                }
            }
        };

        // `fut` itself stays unpolled so it can still be compared afterwards
        let out = fut.clone().await;
        let mut map = self.lock();
        if map.get(&key).is_some_and(|cur| Shared::ptr_eq(cur, &fut)) {
            map.remove(&key);
        }
        out
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Indexer client posting GraphQL documents to the explorer's proxy path.
///
/// Identical request bodies that are in flight at the same time share a single
/// HTTP round trip.
#[derive(Clone)]
pub struct GraphqlIndexer {
    url: String,
    network: String,
    timeout_ms: u64,
    auth_token: Option<String>,
    inflight: Arc<InflightMap<Result<Value, String>>>,
}

impl GraphqlIndexer {
    pub fn new(url: &str, network: &str, timeout_ms: u64, auth_token: Option<String>) -> Self {
        Self {
            url: url.to_string(),
            network: network.to_string(),
            timeout_ms,
            auth_token,
            inflight: Arc::new(InflightMap::new()),
        }
    }

    /// POST one document; returns the `data` object.
    pub async fn query(&self, document: &str, variables: Value) -> Result<Value> {
        let body = json!({
            "query": document,
            "variables": variables,
            "networkId": self.network,
        });
        let key = body.to_string();
        let (url, timeout_ms, auth_token) =
            (self.url.clone(), self.timeout_ms, self.auth_token.clone());

        self.inflight
            .dedup(key, move || {
                post_graphql(url, body, timeout_ms, auth_token)
                    .map(|r| r.map_err(|e| format!("{e:#}")))
            })
            .await
            .map_err(|e| anyhow!(e))
    }
}

async fn post_graphql(
    url: String,
    body: Value,
    timeout_ms: u64,
    auth_token: Option<String>,
) -> Result<Value> {
    let mut req = http_client()
        .post(&url)
        .json(&body)
        .timeout(Duration::from_millis(timeout_ms));

    if let Some(token) = auth_token.as_deref() {
        req = req.header("Authorization", format!("Bearer {token}"));
    }

    let res = req.send().await.context("indexer request failed")?;
    if !res.status().is_success() {
        return Err(anyhow!("http {}", res.status()));
    }
    let v: Value = res.json().await.context("indexer returned invalid JSON")?;
    extract_data(v)
}

/// GraphQL errors only fail the request when no data came back with them.
pub fn extract_data(v: Value) -> Result<Value> {
    let data = v.get("data").cloned().unwrap_or(Value::Null);
    if data.is_null() {
        let msgs: Vec<String> = v
            .get("errors")
            .and_then(|e| e.as_array())
            .map(|errs| {
                errs.iter()
                    .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();
        if msgs.is_empty() {
            return Err(anyhow!("invalid graphql payload (no data)"));
        }
        return Err(anyhow!("graphql error: {}", msgs.join("; ")));
    }
    Ok(data)
}

// BigInt fields arrive either as JSON numbers or as strings depending on the
// indexer version.
fn as_u64(v: &Value) -> Option<u64> {
    v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

fn as_chain(v: &Value) -> Option<u32> {
    as_u64(v).and_then(|c| u32::try_from(c).ok())
}

fn as_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn parse_block(node: &Value) -> Option<BlockSummary> {
    Some(BlockSummary {
        hash: node.get("hash")?.as_str()?.to_string(),
        height: as_u64(node.get("height")?)?,
        chain_id: as_chain(node.get("chainId")?)?,
        canonical: node
            .get("canonical")
            .and_then(|c| c.as_bool())
            .unwrap_or(true),
        creation_time: node.get("creationTime").and_then(as_string),
        tx_count: node.pointer("/transactions/totalCount").and_then(as_u64),
    })
}

/// `badResult` wins, then `goodResult`; no result at all counts as success.
pub fn parse_outcome(result: Option<&Value>) -> TxOutcome {
    let Some(result) = result else {
        return TxOutcome::AssumedSuccess;
    };
    match (result.get("badResult"), result.get("goodResult")) {
        (Some(bad), _) if !bad.is_null() => TxOutcome::Failure(decode_maybe_json(bad)),
        (_, Some(good)) if !good.is_null() => TxOutcome::Success(decode_maybe_json(good)),
        _ => TxOutcome::AssumedSuccess,
    }
}

// Results are often JSON documents serialized into a string field.
fn decode_maybe_json(v: &Value) -> Value {
    match v.as_str() {
        Some(s) => serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string())),
        None => v.clone(),
    }
}

pub fn parse_transaction(request_key: &str, tx: &Value) -> TransactionSummary {
    let meta = tx.pointer("/cmd/meta");
    TransactionSummary {
        request_key: tx
            .get("hash")
            .and_then(|h| h.as_str())
            .unwrap_or(request_key)
            .to_string(),
        chain_id: meta.and_then(|m| m.get("chainId")).and_then(as_chain),
        sender: meta
            .and_then(|m| m.get("sender"))
            .and_then(|s| s.as_str())
            .map(|s| s.to_string()),
        height: tx.pointer("/result/block/height").and_then(as_u64),
        creation_time: meta.and_then(|m| m.get("creationTime")).and_then(as_string),
        outcome: parse_outcome(tx.get("result").filter(|r| !r.is_null())),
    }
}

pub fn parse_account(acct: &Value) -> Option<AddressSummary> {
    let account_name = acct.get("accountName")?.as_str()?.to_string();
    let total_balance = acct
        .get("totalBalance")
        .and_then(as_string)
        .unwrap_or_else(|| "0".to_string());
    let chains = acct
        .get("chainAccounts")
        .and_then(|c| c.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|c| {
                    Some(ChainBalance {
                        chain_id: as_chain(c.get("chainId")?)?,
                        balance: c.get("balance").and_then(as_string).unwrap_or_default(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    Some(AddressSummary {
        account_name,
        total_balance,
        chains,
    })
}

/// A chain "has" the module when `describe-module` returned a non-empty `code`.
pub fn parse_module_report(entry: &Value) -> Option<ModuleChainReport> {
    let chain_id = as_chain(entry.get("chainId")?)?;
    let ok = entry
        .get("status")
        .and_then(|s| s.as_str())
        .map(|s| s.eq_ignore_ascii_case("success"))
        .unwrap_or(true);
    let has_code = ok
        && entry
            .get("result")
            .map(decode_maybe_json)
            .and_then(|r| r.get("code").and_then(|c| c.as_str()).map(|c| !c.is_empty()))
            .unwrap_or(false);
    Some(ModuleChainReport { chain_id, has_code })
}

#[async_trait]
impl Indexer for GraphqlIndexer {
    async fn blocks_at_height(&self, height: u64) -> Result<Vec<BlockSummary>> {
        let data = self.query(BLOCKS_AT_HEIGHT, json!({ "height": height })).await?;
        let blocks = data
            .pointer("/blocksFromHeight/edges")
            .and_then(|e| e.as_array())
            .map(|edges| {
                edges
                    .iter()
                    .filter_map(|e| e.get("node").and_then(parse_block))
                    .collect()
            })
            .unwrap_or_default();
        Ok(blocks)
    }

    async fn block_by_hash(&self, hash: &str) -> Result<Option<BlockSummary>> {
        let data = self.query(BLOCK_BY_HASH, json!({ "hash": hash })).await?;
        Ok(data.get("block").and_then(parse_block))
    }

    async fn transaction(&self, request_key: &str) -> Result<Option<TransactionSummary>> {
        let data = self
            .query(TRANSACTION_BY_KEY, json!({ "requestKey": request_key }))
            .await?;
        Ok(data
            .get("transaction")
            .filter(|t| !t.is_null())
            .map(|t| parse_transaction(request_key, t)))
    }

    async fn fungible_account(&self, account_name: &str) -> Result<Option<AddressSummary>> {
        let data = self
            .query(FUNGIBLE_ACCOUNT, json!({ "accountName": account_name }))
            .await?;
        Ok(data.get("fungibleAccount").and_then(parse_account))
    }

    async fn describe_module(&self, module: &str, chains: &[u32]) -> Result<Vec<ModuleChainReport>> {
        let code = format!("(describe-module \"{}\")", module.replace('"', ""));
        let batch: Vec<Value> = chains
            .iter()
            .map(|c| json!({ "code": code, "chainId": c.to_string() }))
            .collect();
        let data = self
            .query(DESCRIBE_MODULE, json!({ "pactQuery": batch }))
            .await?;
        Ok(data
            .get("pactQuery")
            .and_then(|p| p.as_array())
            .map(|arr| arr.iter().filter_map(parse_module_report).collect())
            .unwrap_or_default())
    }

    async fn transactions_by_code(&self, code: &str, first: u32) -> Result<Vec<String>> {
        let data = self
            .query(TRANSACTIONS_BY_CODE, json!({ "pactCode": code, "first": first }))
            .await?;
        Ok(data
            .pointer("/transactions/edges")
            .and_then(|e| e.as_array())
            .map(|edges| {
                edges
                    .iter()
                    .filter_map(|e| e.pointer("/node/hash").and_then(|h| h.as_str()))
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default())
    }
}
