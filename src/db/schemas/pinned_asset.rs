//! Pinned asset document schema
//!
//! At most one per token, write-once in intent. Its presence is what makes
//! later finalize calls free: the orchestrator probes this collection before
//! touching any paid service.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for pinned assets
pub const PINNED_ASSET_COLLECTION: &str = "pinned_assets";

/// Pinned asset document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PinnedAssetDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Token identifier
    pub token_id: i64,

    /// Owner fid at pin time
    pub fid: i64,

    /// Content identifier minted by the pin destination
    pub cid: String,

    /// ipfs:// form of the content identifier
    pub ipfs_uri: String,

    /// Permanent gateway URL; optional because early records predate it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_url: Option<String>,
}

impl PinnedAssetDoc {
    pub fn new(token_id: u64, fid: u64, cid: String, ipfs_uri: String, gateway_url: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            token_id: token_id as i64,
            fid: fid as i64,
            cid,
            ipfs_uri,
            gateway_url: Some(gateway_url),
        }
    }
}

impl IntoIndexes for PinnedAssetDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "token_id": 1 },
            Some(IndexOptions::builder().unique(true).build()),
        )]
    }
}

impl MutMetadata for PinnedAssetDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
