//! Look document schema
//!
//! One derived cosmetic profile per token, overwritten on re-finalize until
//! the token has a pinned asset.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::look::Look;

/// Collection name for looks
pub const LOOK_COLLECTION: &str = "looks";

/// Look document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LookDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Token identifier
    pub token_id: i64,

    /// Owner fid the look was derived from
    pub fid: i64,

    /// The derived cosmetic profile
    pub look: Look,
}

impl LookDoc {
    pub fn new(token_id: u64, fid: u64, look: Look) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            token_id: token_id as i64,
            fid: fid as i64,
            look,
        }
    }
}

impl IntoIndexes for LookDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "token_id": 1 },
            Some(IndexOptions::builder().unique(true).build()),
        )]
    }
}

impl MutMetadata for LookDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
