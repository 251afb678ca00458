//! On-chain identity resolution
//!
//! Reads the owner-linked fid for a token via a single `eth_call` against
//! the token contract. The call data is the configured 4-byte selector plus
//! the token id as one left-padded 32-byte word; the first return word is
//! the fid and the full return payload is kept as an opaque state snapshot
//! for the persona prompt.
//!
//! Unreliable network I/O by nature. No internal retries: the batch runner's
//! per-id isolation is the retry boundary.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::config::Args;
use crate::types::{KilnError, Result};

/// Resolved on-chain state for a token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenState {
    /// Owner-linked numeric identity; nonzero for any finalizable token
    pub fid: u64,
    /// Raw hex return payload from the state getter
    pub raw: String,
}

/// Seam for identity resolution so the orchestrator can be tested without
/// a chain endpoint
#[async_trait]
pub trait IdentitySource: Send + Sync {
    async fn resolve(&self, token_id: u64) -> Result<TokenState>;
}

/// JSON-RPC identity resolver
pub struct ChainResolver {
    client: reqwest::Client,
    rpc_url: String,
    contract: String,
    selector: String,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    message: String,
}

impl ChainResolver {
    pub fn new(args: &Args) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(args.chain_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            rpc_url: args.chain_rpc_url.clone(),
            contract: args.token_contract.clone(),
            selector: args
                .chain_call_selector
                .trim_start_matches("0x")
                .to_string(),
        })
    }

    /// Build `eth_call` data: selector ++ 32-byte big-endian token id
    fn call_data(&self, token_id: u64) -> String {
        format!("0x{}{:064x}", self.selector, token_id)
    }
}

#[async_trait]
impl IdentitySource for ChainResolver {
    async fn resolve(&self, token_id: u64) -> Result<TokenState> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                { "to": self.contract, "data": self.call_data(token_id) },
                "latest"
            ]
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| KilnError::ChainRead(format!("rpc transport: {}", e)))?;

        if !response.status().is_success() {
            return Err(KilnError::ChainRead(format!(
                "rpc status {}",
                response.status()
            )));
        }

        let rpc: RpcResponse = response
            .json()
            .await
            .map_err(|e| KilnError::ChainRead(format!("rpc decode: {}", e)))?;

        if let Some(err) = rpc.error {
            return Err(KilnError::ChainRead(format!("rpc error: {}", err.message)));
        }

        let raw = rpc
            .result
            .ok_or_else(|| KilnError::ChainRead("rpc returned no result".to_string()))?;

        let fid = decode_first_word(&raw)?;
        debug!(id = token_id, fid, "resolved token identity");

        if fid == 0 {
            return Err(KilnError::NoIdentityOnToken);
        }

        Ok(TokenState { fid, raw })
    }
}

/// Decode the first 32-byte return word as a u64.
///
/// An empty return (`0x`) means the contract has no state for this token,
/// which is the same terminal condition as a zero fid.
fn decode_first_word(raw: &str) -> Result<u64> {
    let hex_body = raw.trim_start_matches("0x");
    if hex_body.is_empty() {
        return Err(KilnError::NoIdentityOnToken);
    }
    if hex_body.len() < 64 {
        return Err(KilnError::ChainRead(format!(
            "short return payload ({} hex chars)",
            hex_body.len()
        )));
    }

    // The payload comes off the wire; slice by checked byte range so a
    // response that is not ASCII hex stays an error, not a panic.
    let word = match hex_body.get(..64) {
        Some(w) if w.is_ascii() => w,
        _ => {
            return Err(KilnError::ChainRead(
                "malformed return payload (non-hex bytes)".to_string(),
            ))
        }
    };

    // fid fits in the low 8 bytes of the first word; reject overflow rather
    // than truncate.
    let (high, low) = word.split_at(48);
    if high.chars().any(|c| c != '0') {
        return Err(KilnError::ChainRead("fid exceeds u64 range".to_string()));
    }

    u64::from_str_radix(low, 16)
        .map_err(|e| KilnError::ChainRead(format!("fid decode: {}", e)))
}
