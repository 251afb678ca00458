//! Configuration for Kiln
//!
//! CLI arguments and environment variable handling using clap.
//! Optional credentials gate capabilities: a missing credential disables the
//! corresponding pipeline stage instead of failing startup.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Kiln - token finalization service
///
/// Derives a deterministic look for a token, generates persona text,
/// optionally pins artwork to content-addressed storage, and persists the
/// result. Safe to call repeatedly and over large id ranges.
#[derive(Parser, Debug, Clone)]
#[command(name = "kiln")]
#[command(about = "Token finalization pipeline and backfill driver")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Chain JSON-RPC endpoint for identity resolution
    #[arg(long, env = "CHAIN_RPC_URL", default_value = "https://mainnet.base.org")]
    pub chain_rpc_url: String,

    /// Token contract address (0x-prefixed, 20 bytes)
    #[arg(long, env = "TOKEN_CONTRACT", default_value = "0x0000000000000000000000000000000000000000")]
    pub token_contract: String,

    /// 4-byte selector of the contract's token-state getter
    #[arg(long, env = "CHAIN_CALL_SELECTOR", default_value = "0x5b70ea9f")]
    pub chain_call_selector: String,

    /// Chain read timeout in milliseconds
    #[arg(long, env = "CHAIN_TIMEOUT_MS", default_value = "10000")]
    pub chain_timeout_ms: u64,

    /// Text-generation API key (absent: deterministic fallback personas)
    #[arg(long, env = "LLM_API_KEY")]
    pub llm_api_key: Option<String>,

    /// Text-generation API endpoint (chat-completions compatible)
    #[arg(long, env = "LLM_API_URL", default_value = "https://api.openai.com/v1/chat/completions")]
    pub llm_api_url: String,

    /// Text-generation model name
    #[arg(long, env = "LLM_MODEL", default_value = "gpt-4o-mini")]
    pub llm_model: String,

    /// Text-generation timeout in milliseconds
    #[arg(long, env = "LLM_TIMEOUT_MS", default_value = "20000")]
    pub llm_timeout_ms: u64,

    /// Image-generation API key (absent: artwork stage disabled)
    #[arg(long, env = "IMAGE_API_KEY")]
    pub image_api_key: Option<String>,

    /// Image-generation API endpoint
    #[arg(long, env = "IMAGE_API_URL", default_value = "https://api.openai.com/v1/images/generations")]
    pub image_api_url: String,

    /// Image-generation model name
    #[arg(long, env = "IMAGE_MODEL", default_value = "gpt-image-1")]
    pub image_model: String,

    /// Generated image size
    #[arg(long, env = "IMAGE_SIZE", default_value = "1024x1024")]
    pub image_size: String,

    /// Image-generation timeout in milliseconds
    #[arg(long, env = "IMAGE_TIMEOUT_MS", default_value = "60000")]
    pub image_timeout_ms: u64,

    /// S3-compatible IPFS pinning endpoint (absent: pinning disabled)
    #[arg(long, env = "PIN_ENDPOINT")]
    pub pin_endpoint: Option<String>,

    /// Bearer token for the pinning endpoint
    #[arg(long, env = "PIN_TOKEN")]
    pub pin_token: Option<String>,

    /// Bucket name at the pinning endpoint
    #[arg(long, env = "PIN_BUCKET", default_value = "kiln-artwork")]
    pub pin_bucket: String,

    /// IPFS gateway base used to build permanent artwork URLs
    #[arg(long, env = "IPFS_GATEWAY", default_value = "https://ipfs.io")]
    pub ipfs_gateway: String,

    /// Pin upload/probe timeout in milliseconds
    #[arg(long, env = "PIN_TIMEOUT_MS", default_value = "30000")]
    pub pin_timeout_ms: u64,

    /// MongoDB connection URI (absent: no idempotency, nothing persisted)
    #[arg(long, env = "MONGODB_URI")]
    pub mongodb_uri: Option<String>,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "kiln")]
    pub mongodb_db: String,

    /// Shared secret gating POST /admin/backfill (absent: endpoint is open)
    #[arg(long, env = "ADMIN_TOKEN")]
    pub admin_token: Option<String>,

    /// Base URL of the always-available dynamically rendered card image
    #[arg(long, env = "CARD_BASE_URL", default_value = "https://kiln.example.com")]
    pub card_base_url: String,
}

impl Args {
    /// Whether the pinning destination is fully configured
    pub fn pinning_configured(&self) -> bool {
        self.pin_endpoint.is_some() && self.pin_token.is_some()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !is_hex_address(&self.token_contract) {
            return Err("TOKEN_CONTRACT must be a 0x-prefixed 20-byte hex address".to_string());
        }

        let selector = self.chain_call_selector.trim_start_matches("0x");
        if selector.len() != 8 || hex::decode(selector).is_err() {
            return Err("CHAIN_CALL_SELECTOR must be a 4-byte hex selector".to_string());
        }

        if self.pin_endpoint.is_some() != self.pin_token.is_some() {
            return Err(
                "PIN_ENDPOINT and PIN_TOKEN must be set together (or both unset)".to_string(),
            );
        }

        Ok(())
    }
}

fn is_hex_address(addr: &str) -> bool {
    addr.len() == 42 && addr.starts_with("0x") && hex::decode(&addr[2..]).is_ok()
}
