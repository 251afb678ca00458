//! Finalize orchestrator
//!
//! Sequences identity resolution, look derivation, persona generation,
//! artwork synthesis, pinning, and persistence into one idempotent
//! operation. Only identity failures are fatal; every optional stage
//! degrades to a narrower result so the pipeline answers promptly even
//! under total third-party outage.

pub mod batch;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::artwork::ArtworkSource;
use crate::chain::IdentitySource;
use crate::db::MetadataStore;
use crate::look::{artwork_prompt, select_look, Look};
use crate::persona::{fallback_persona, Persona, PersonaSource};
use crate::pin::Pinner;
use crate::types::{KilnError, Result};

pub use batch::{run_range, BatchFailure, BatchOutcome};

/// Optional-service clients, assembled once at startup.
///
/// Branching on "is this field present" is the only feature gating in the
/// pipeline; there are no ambient flags.
#[derive(Clone, Default)]
pub struct Capabilities {
    pub persona: Option<Arc<dyn PersonaSource>>,
    pub artwork: Option<Arc<dyn ArtworkSource>>,
    pub pinner: Option<Arc<dyn Pinner>>,
    pub store: Option<Arc<dyn MetadataStore>>,
}

impl Capabilities {
    /// The artwork stage runs only when both generation and a pin
    /// destination are configured; artwork without a permanent home would
    /// be paid for and lost.
    pub fn artwork_enabled(&self) -> bool {
        self.artwork.is_some() && self.pinner.is_some()
    }

    /// Capability flags for health/ops output
    pub fn summary(&self) -> CapabilitySummary {
        CapabilitySummary {
            persona: self.persona.is_some(),
            artwork: self.artwork.is_some(),
            pinning: self.pinner.is_some(),
            store: self.store.is_some(),
        }
    }
}

/// Which external services are live, as reported by /health
#[derive(Serialize, Clone, Copy, Debug)]
pub struct CapabilitySummary {
    pub persona: bool,
    pub artwork: bool,
    pub pinning: bool,
    pub store: bool,
}

/// External contract returned to finalize callers
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeResult {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fid: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub look: Option<Look>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<Persona>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Best available image URL: the permanent gateway URL when pinned,
    /// otherwise the always-renderable card URL
    pub image: String,
    pub pinned: bool,
    pub already: bool,
}

/// Seam between the batch runner and the orchestrator
#[async_trait]
pub trait Finalizer: Send + Sync {
    async fn finalize(&self, id: u64) -> Result<FinalizeResult>;
}

/// The finalize orchestrator
pub struct Orchestrator {
    identity: Arc<dyn IdentitySource>,
    caps: Capabilities,
    /// Per-token mutual exclusion for the expensive path. In-process only;
    /// a multi-instance deployment would need a claim row instead.
    locks: DashMap<u64, Arc<Mutex<()>>>,
    card_base_url: String,
}

impl Orchestrator {
    pub fn new(identity: Arc<dyn IdentitySource>, caps: Capabilities, card_base_url: &str) -> Self {
        Self {
            identity,
            caps,
            locks: DashMap::new(),
            card_base_url: card_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Dynamically rendered fallback image; always available, never persisted
    fn card_url(&self, id: u64) -> String {
        format!("{}/api/card/{}.png", self.card_base_url, id)
    }

    /// Idempotency probe. Returns the short-circuit result when the token
    /// already has a pinned asset. Probe failures log and read as "not
    /// pinned" — a degraded store must not block interactive calls.
    async fn idempotent_exit(&self, id: u64) -> Option<FinalizeResult> {
        let store = self.caps.store.as_ref()?;

        match store.find_pinned(id).await {
            Ok(Some(doc)) => {
                // Return the actually-stored gateway URL; records written
                // before gateway URLs were stored fall back to the card.
                let image = doc.gateway_url.clone().unwrap_or_else(|| self.card_url(id));
                info!(id, cid = %doc.cid, "already finalized, idempotent exit");
                Some(FinalizeResult {
                    id,
                    fid: None,
                    look: None,
                    persona: None,
                    prompt: None,
                    image,
                    pinned: true,
                    already: true,
                })
            }
            Ok(None) => None,
            Err(e) => {
                warn!(id, error = %e, "idempotency probe failed, treating as first-time");
                None
            }
        }
    }

    /// Run the expensive path for a token that holds the per-token lock
    async fn finalize_locked(&self, id: u64) -> Result<FinalizeResult> {
        let state = self.identity.resolve(id).await?;
        let look = select_look(state.fid);
        let archetype = look.archetype_id.name();

        let persona = match &self.caps.persona {
            Some(source) => source.generate(&state, archetype).await,
            None => fallback_persona(archetype),
        };

        // Best-effort metadata writes: the records are reproducible on the
        // next call, so a failed write narrows nothing.
        if let Some(store) = &self.caps.store {
            if let Err(e) = store.save_look(id, state.fid, &look).await {
                warn!(id, error = %e, "look persistence failed");
            }
            if let Err(e) = store.save_persona(id, &persona).await {
                warn!(id, error = %e, "persona persistence failed");
            }
        }

        let mut prompt = None;
        let mut pinned_asset = None;

        if let (Some(artwork), Some(pinner)) = (&self.caps.artwork, &self.caps.pinner) {
            let text = artwork_prompt(&look);
            match artwork.generate(&text).await {
                Ok(bytes) if !bytes.is_empty() => match pinner.pin(id, &bytes).await {
                    Ok(asset) => {
                        if let Some(store) = &self.caps.store {
                            if let Err(e) = store.set_pinned_asset(id, state.fid, &asset).await {
                                // A paid pin now has no durable record; the
                                // asset itself is safe at the gateway URL.
                                error!(id, cid = %asset.cid, error = %e, "pin record persistence failed");
                            }
                        }
                        pinned_asset = Some(asset);
                    }
                    Err(e) => {
                        warn!(id, error = %e, "pinning failed, falling back to card image");
                    }
                },
                Ok(_) => {
                    warn!(id, "artwork generator returned no bytes");
                }
                Err(e) => {
                    warn!(id, error = %e, "artwork generation failed, falling back to card image");
                }
            }
            prompt = Some(text);
        }

        let (image, pinned) = match &pinned_asset {
            Some(asset) => (asset.gateway_url.clone(), true),
            None => (self.card_url(id), false),
        };

        info!(id, fid = state.fid, pinned, "finalize complete");

        Ok(FinalizeResult {
            id,
            fid: Some(state.fid),
            look: Some(look),
            persona: Some(persona),
            prompt,
            image,
            pinned,
            already: false,
        })
    }
}

#[async_trait]
impl Finalizer for Orchestrator {
    async fn finalize(&self, id: u64) -> Result<FinalizeResult> {
        if id == 0 {
            return Err(KilnError::InvalidId);
        }

        // Free exit before taking the lock: repeated calls after a
        // successful pin never touch the chain or any paid service.
        if let Some(result) = self.idempotent_exit(id).await {
            return Ok(result);
        }

        let lock = self
            .locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;

            // A concurrent caller may have pinned while we waited; the loser
            // takes the idempotent exit instead of paying twice.
            match self.idempotent_exit(id).await {
                Some(result) => Ok(result),
                None => self.finalize_locked(id).await,
            }
        };

        // Evict the entry once nobody else holds a clone; a backfill over
        // millions of ids must not accumulate one mutex per id. Waiters
        // still hold their own Arc, so strong_count > 1 keeps theirs alive.
        drop(lock);
        self.locks
            .remove_if(&id, |_, entry| Arc::strong_count(entry) == 1);

        result
    }
}
