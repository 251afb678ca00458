//! Persona document schema
//!
//! One persona per token; overwritten on each finalize call that is not
//! short-circuited by idempotency.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::persona::Persona;

/// Collection name for personas
pub const PERSONA_COLLECTION: &str = "personas";

/// Persona document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PersonaDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Token identifier
    pub token_id: i64,

    /// The generated or fallback persona
    pub persona: Persona,
}

impl PersonaDoc {
    pub fn new(token_id: u64, persona: Persona) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            token_id: token_id as i64,
            persona,
        }
    }
}

impl IntoIndexes for PersonaDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "token_id": 1 },
            Some(IndexOptions::builder().unique(true).build()),
        )]
    }
}

impl MutMetadata for PersonaDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
