//! Persistence for looks, personas, and pinned assets
//!
//! The store is a capability: when MongoDB is not configured the pipeline
//! runs stateless — every call behaves as first-time and nothing is durably
//! recorded. Look/Persona writes are best-effort from the orchestrator's
//! point of view; the pinned-asset record is the idempotency anchor.

pub mod mongo;
pub mod schemas;

use async_trait::async_trait;
use bson::doc;

use crate::look::Look;
use crate::persona::Persona;
use crate::pin::PinnedAsset;
use crate::types::Result;

pub use mongo::{MongoClient, MongoCollection};
pub use schemas::{LookDoc, PersonaDoc, PinnedAssetDoc};

/// Seam for the persistence store
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Idempotent upsert of a token's derived look
    async fn save_look(&self, token_id: u64, fid: u64, look: &Look) -> Result<()>;

    /// Idempotent upsert of a token's persona
    async fn save_persona(&self, token_id: u64, persona: &Persona) -> Result<()>;

    /// Record a pinned asset for a token (write-once in intent)
    async fn set_pinned_asset(&self, token_id: u64, fid: u64, asset: &PinnedAsset) -> Result<()>;

    /// Idempotency probe: the stored pin record for a token, if any
    async fn find_pinned(&self, token_id: u64) -> Result<Option<PinnedAssetDoc>>;
}

/// MongoDB-backed metadata store
pub struct MongoStore {
    looks: MongoCollection<LookDoc>,
    personas: MongoCollection<PersonaDoc>,
    pinned: MongoCollection<PinnedAssetDoc>,
}

impl MongoStore {
    /// Open the three pipeline collections and apply their indexes
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            looks: client.collection(schemas::LOOK_COLLECTION).await?,
            personas: client.collection(schemas::PERSONA_COLLECTION).await?,
            pinned: client.collection(schemas::PINNED_ASSET_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl MetadataStore for MongoStore {
    async fn save_look(&self, token_id: u64, fid: u64, look: &Look) -> Result<()> {
        self.looks
            .upsert_one(
                doc! { "token_id": token_id as i64 },
                LookDoc::new(token_id, fid, look.clone()),
            )
            .await
    }

    async fn save_persona(&self, token_id: u64, persona: &Persona) -> Result<()> {
        self.personas
            .upsert_one(
                doc! { "token_id": token_id as i64 },
                PersonaDoc::new(token_id, persona.clone()),
            )
            .await
    }

    async fn set_pinned_asset(&self, token_id: u64, fid: u64, asset: &PinnedAsset) -> Result<()> {
        self.pinned
            .upsert_one(
                doc! { "token_id": token_id as i64 },
                PinnedAssetDoc::new(
                    token_id,
                    fid,
                    asset.cid.clone(),
                    asset.ipfs_uri.clone(),
                    asset.gateway_url.clone(),
                ),
            )
            .await
    }

    async fn find_pinned(&self, token_id: u64) -> Result<Option<PinnedAssetDoc>> {
        self.pinned
            .find_one(doc! { "token_id": token_id as i64 })
            .await
    }
}
