//! Persona generation
//!
//! One bounded-timeout attempt against a chat-completions endpoint per
//! finalize call. The contract is infallible: transport errors, bad status,
//! unparseable replies, and empty fields all collapse into the fixed
//! fallback persona for the archetype. The pipeline never fails because
//! persona generation failed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::chain::TokenState;
use crate::config::Args;

/// Where the persona text came from
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PersonaSourceKind {
    Generated,
    Fallback,
}

/// Short generated (or fallback) text profile for a token
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    pub label: String,
    pub bio: String,
    pub source: PersonaSourceKind,
    pub created_at: DateTime<Utc>,
}

/// Seam for persona generation; infallible by contract
#[async_trait]
pub trait PersonaSource: Send + Sync {
    async fn generate(&self, state: &TokenState, archetype: &str) -> Persona;
}

/// Fixed deterministic persona used when generation is unavailable or fails
pub fn fallback_persona(archetype: &str) -> Persona {
    let (label, bio) = match archetype {
        "Warden" => (
            "Quiet Warden",
            "Keeps the gate nobody else remembers. Counts every passerby twice.",
        ),
        "Oracle" => (
            "Half-Lit Oracle",
            "Answers questions a day before they are asked, then forgets both.",
        ),
        "Drifter" => (
            "Patient Drifter",
            "Maps places by how they smell after rain. Never unpacks fully.",
        ),
        "Tinker" => (
            "Restless Tinker",
            "Fixes what isn't broken until it is interesting. Pockets full of springs.",
        ),
        "Ember" => (
            "Banked Ember",
            "Burns low on purpose. Saves the bright flare for one good reason.",
        ),
        "Verdant" => (
            "Slow Verdant",
            "Grows an inch a season and forgives nothing that steps on roots.",
        ),
        "Cipher" => (
            "Folded Cipher",
            "Speaks plainly in a code everyone assumes is a code. It isn't.",
        ),
        "Herald" => (
            "Offbeat Herald",
            "Announces arrivals slightly late so the news feels earned.",
        ),
        _ => (
            "Unnamed Wanderer",
            "A token still finding its footing. Ask again after the kiln cools.",
        ),
    };

    Persona {
        label: label.to_string(),
        bio: bio.to_string(),
        source: PersonaSourceKind::Fallback,
        created_at: Utc::now(),
    }
}

/// Chat-completions persona generator
pub struct LlmPersona {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct PersonaReply {
    label: String,
    bio: String,
}

impl LlmPersona {
    pub fn new(args: &Args, api_key: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(args.llm_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            api_url: args.llm_api_url.clone(),
            api_key,
            model: args.llm_model.clone(),
        })
    }

    async fn try_generate(&self, state: &TokenState, archetype: &str) -> anyhow::Result<Persona> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You write tiny character profiles for collectible tokens. \
                                Reply with JSON only: {\"label\": <3-word title>, \"bio\": <two short sentences>}."
                },
                {
                    "role": "user",
                    "content": format!(
                        "Archetype: {}. On-chain state snapshot: {}.",
                        archetype, state.raw
                    )
                }
            ],
            "response_format": { "type": "json_object" }
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default();

        let reply = parse_persona_reply(content)?;

        Ok(Persona {
            label: reply.label,
            bio: reply.bio,
            source: PersonaSourceKind::Generated,
            created_at: Utc::now(),
        })
    }
}

#[async_trait]
impl PersonaSource for LlmPersona {
    async fn generate(&self, state: &TokenState, archetype: &str) -> Persona {
        match self.try_generate(state, archetype).await {
            Ok(persona) => {
                debug!(fid = state.fid, label = %persona.label, "persona generated");
                persona
            }
            Err(e) => {
                warn!(fid = state.fid, error = %e, "persona generation failed, using fallback");
                fallback_persona(archetype)
            }
        }
    }
}

/// Parse a `{label, bio}` reply, tolerating markdown code fences
fn parse_persona_reply(content: &str) -> anyhow::Result<PersonaReply> {
    let trimmed = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let reply: PersonaReply = serde_json::from_str(trimmed)?;
    if reply.label.trim().is_empty() || reply.bio.trim().is_empty() {
        anyhow::bail!("persona reply has empty fields");
    }
    Ok(reply)
}
