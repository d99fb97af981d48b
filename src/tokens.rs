//! Static fungible-token table consulted by the classifier and the live search.
//!
//! The built-in list ships with the binary. Deployments can append entries from
//! a TOML file:
//!
//! ```toml
//! [[token]]
//! name = "Example"
//! symbol = "EXM"
//! module = "free.example"
//! icon = "/tokens/exm.svg"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::types::TokenSummary;

/// (name, symbol, module, icon)
const BUILTIN: &[(&str, &str, &str, &str)] = &[
    ("Kadena", "KDA", "coin", "/tokens/kda.svg"),
    ("Kaddex", "KDX", "kaddex.kdx", "/tokens/kdx.svg"),
    ("Flux", "FLUX", "runonflux.flux", "/tokens/flux.svg"),
    ("Hype", "HYPE", "hypercent.prod-hype-coin", "/tokens/hype.svg"),
    ("KDLaunch", "KDL", "kdlaunch.token", "/tokens/kdl.svg"),
    ("KDSwap", "KDS", "kdlaunch.kdswap-token", "/tokens/kds.svg"),
    ("Babena", "BABE", "free.babena", "/tokens/babe.svg"),
    ("Crankk", "CRKK", "free.crankk01", "/tokens/crkk.svg"),
    (
        "Brother",
        "BRO",
        "n_582fed11af00dc626812cd7890bb88e72067f28c.bro",
        "/tokens/bro.svg",
    ),
    ("Wrapped USDC", "kwUSDC", "lago.kwUSDC", "/tokens/kwusdc.svg"),
];

#[derive(Debug, Deserialize)]
struct TokenFile {
    #[serde(default)]
    token: Vec<TokenSummary>,
}

#[derive(Clone, Debug)]
pub struct TokenTable {
    tokens: Vec<TokenSummary>,
}

impl Default for TokenTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TokenTable {
    pub fn builtin() -> Self {
        let tokens = BUILTIN
            .iter()
            .map(|(name, symbol, module, icon)| TokenSummary {
                name: name.to_string(),
                symbol: symbol.to_string(),
                module: module.to_string(),
                icon: icon.to_string(),
            })
            .collect();
        Self { tokens }
    }

    /// Built-in table followed by the entries of a TOML file.
    pub fn with_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read tokens file: {}", path.display()))?;
        let mut table = Self::builtin();
        table.extend_from_toml(&contents)
            .with_context(|| format!("Failed to parse TOML tokens: {}", path.display()))?;
        Ok(table)
    }

    pub fn extend_from_toml(&mut self, contents: &str) -> Result<usize> {
        let file: TokenFile = toml::from_str(contents)?;
        let added = file.token.len();
        self.tokens.extend(file.token);
        log::debug!("[tokens] appended {added} tokens from file");
        Ok(added)
    }

    pub fn tokens(&self) -> &[TokenSummary] {
        &self.tokens
    }

    /// Every token whose symbol equals the input, ignoring case and a leading `$`.
    /// Table order is preserved, so `.first()` is the tie-break winner.
    pub fn exact_symbol(&self, raw: &str) -> Vec<&TokenSummary> {
        let needle = normalize_symbol(raw);
        if needle.is_empty() {
            return Vec::new();
        }
        self.tokens
            .iter()
            .filter(|t| t.symbol.to_lowercase() == needle)
            .collect()
    }

    /// Case-insensitive substring match across module, name and symbol.
    pub fn substring(&self, raw: &str) -> Vec<&TokenSummary> {
        let needle = normalize_symbol(raw);
        if needle.is_empty() {
            return Vec::new();
        }
        self.tokens
            .iter()
            .filter(|t| {
                t.module.to_lowercase().contains(&needle)
                    || t.name.to_lowercase().contains(&needle)
                    || t.symbol.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Exact symbol matches when there are any, otherwise substring matches.
    pub fn search(&self, raw: &str) -> Vec<TokenSummary> {
        let exact = self.exact_symbol(raw);
        let hits = if exact.is_empty() {
            self.substring(raw)
        } else {
            exact
        };
        hits.into_iter().cloned().collect()
    }
}

fn normalize_symbol(raw: &str) -> String {
    let s = raw.trim();
    s.strip_prefix('$').unwrap_or(s).to_lowercase()
}
