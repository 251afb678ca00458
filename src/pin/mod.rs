//! Content-addressed pinning
//!
//! Two-step contract against an S3-compatible IPFS bucket (Filebase style):
//! the object is PUT under a key derived from the token id, so a retry for
//! the same token overwrites instead of duplicating, then a HEAD probe reads
//! the content identifier the destination minted. A pin that produces no CID
//! fails loudly — persisting a broken reference would be worse.

use async_trait::async_trait;
use cid::Cid;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Args;
use crate::types::{KilnError, Result};

/// Header carrying the minted CID on S3-compatible IPFS buckets
const CID_HEADER: &str = "x-amz-meta-cid";

/// Permanent record of pinned artwork
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PinnedAsset {
    pub cid: String,
    pub ipfs_uri: String,
    pub gateway_url: String,
}

/// Seam for the pinning destination
#[async_trait]
pub trait Pinner: Send + Sync {
    async fn pin(&self, token_id: u64, bytes: &[u8]) -> Result<PinnedAsset>;
}

/// S3-compatible IPFS bucket client
pub struct PinStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    token: String,
    gateway: String,
}

impl PinStore {
    pub fn new(args: &Args, endpoint: String, token: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(args.pin_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: args.pin_bucket.clone(),
            token,
            gateway: args.ipfs_gateway.trim_end_matches('/').to_string(),
        })
    }

    /// Deterministic object key for a token; re-uploads overwrite
    fn object_key(token_id: u64) -> String {
        format!("tokens/{}.png", token_id)
    }

    fn object_url(&self, token_id: u64) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint,
            self.bucket,
            Self::object_key(token_id)
        )
    }

    /// Resolve a CID string into a PinnedAsset
    fn asset_for(&self, cid: &str) -> PinnedAsset {
        PinnedAsset {
            cid: cid.to_string(),
            ipfs_uri: format!("ipfs://{}", cid),
            gateway_url: format!("{}/ipfs/{}", self.gateway, cid),
        }
    }
}

#[async_trait]
impl Pinner for PinStore {
    async fn pin(&self, token_id: u64, bytes: &[u8]) -> Result<PinnedAsset> {
        let url = self.object_url(token_id);

        // Step (a): write under the deterministic key
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .header("content-type", "image/png")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| KilnError::PinUpload(format!("transport: {}", e)))?;

        if !response.status().is_success() {
            return Err(KilnError::PinUpload(format!(
                "status {}",
                response.status()
            )));
        }

        // Some destinations return the CID on the write itself; prefer it
        // and skip the probe when present.
        if let Some(cid) = header_cid(response.headers()) {
            let asset = self.asset_for(&cid);
            info!(id = token_id, cid = %cid, "artwork pinned");
            return Ok(asset);
        }

        // Step (b): metadata probe for the minted content identifier
        let probe = self
            .client
            .head(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| KilnError::PinUpload(format!("metadata probe: {}", e)))?;

        if !probe.status().is_success() {
            return Err(KilnError::PinUpload(format!(
                "metadata probe status {}",
                probe.status()
            )));
        }

        let cid = header_cid(probe.headers()).ok_or(KilnError::MissingContentIdentifier)?;

        let asset = self.asset_for(&cid);
        debug!(id = token_id, cid = %cid, gateway = %asset.gateway_url, "cid resolved via probe");
        info!(id = token_id, cid = %cid, "artwork pinned");
        Ok(asset)
    }
}

/// Extract and validate the CID header, if any
fn header_cid(headers: &reqwest::header::HeaderMap) -> Option<String> {
    let value = headers.get(CID_HEADER)?.to_str().ok()?.trim();
    if value.is_empty() {
        return None;
    }
    // Reject values the destination mangled; a malformed CID is as useless
    // as a missing one.
    Cid::from_str(value).ok()?;
    Some(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    // CIDv0 of an empty unixfs directory, a well-known valid CID
    const VALID_CID: &str = "QmUNLLsPACCz1vLxQVkXqqLX5R1X345qqfHbsf67hvA3Nn";

    #[test]
    fn object_keys_are_deterministic() {
        assert_eq!(PinStore::object_key(42), "tokens/42.png");
        assert_eq!(PinStore::object_key(42), PinStore::object_key(42));
    }

    #[test]
    fn header_cid_accepts_valid_cid() {
        let mut headers = HeaderMap::new();
        headers.insert(CID_HEADER, HeaderValue::from_static(VALID_CID));
        assert_eq!(header_cid(&headers).as_deref(), Some(VALID_CID));
    }

    #[test]
    fn header_cid_rejects_missing_empty_and_malformed() {
        let headers = HeaderMap::new();
        assert!(header_cid(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(CID_HEADER, HeaderValue::from_static(""));
        assert!(header_cid(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(CID_HEADER, HeaderValue::from_static("not-a-cid"));
        assert!(header_cid(&headers).is_none());
    }

    #[test]
    fn gateway_url_shape() {
        use clap::Parser;
        let args = crate::config::Args::parse_from(["kiln"]);
        let store = PinStore::new(
            &args,
            "https://s3.filebase.com/".to_string(),
            "secret".to_string(),
        )
        .unwrap();

        let asset = store.asset_for(VALID_CID);
        assert_eq!(asset.ipfs_uri, format!("ipfs://{}", VALID_CID));
        assert_eq!(asset.gateway_url, format!("https://ipfs.io/ipfs/{}", VALID_CID));
        assert_eq!(
            store.object_url(7),
            "https://s3.filebase.com/kiln-artwork/tokens/7.png"
        );
    }
}
