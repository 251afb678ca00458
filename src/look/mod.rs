//! Deterministic look selection
//!
//! A token's cosmetic profile is a pure function of its owner fid: the fid's
//! little-endian bytes are hashed once with SHA-256 and every pick indexes a
//! constant table with a byte of that digest. No clock, no process state, no
//! RNG — the same fid yields a byte-identical Look across calls and across
//! restarts. That stability is what lets pinned artwork stay in sync with
//! stored metadata.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The eight cosmetic archetypes
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Archetype {
    Warden,
    Oracle,
    Drifter,
    Tinker,
    Ember,
    Verdant,
    Cipher,
    Herald,
}

impl Archetype {
    const ALL: [Archetype; 8] = [
        Archetype::Warden,
        Archetype::Oracle,
        Archetype::Drifter,
        Archetype::Tinker,
        Archetype::Ember,
        Archetype::Verdant,
        Archetype::Cipher,
        Archetype::Herald,
    ];

    /// Display name used in persona and artwork prompts
    pub fn name(&self) -> &'static str {
        match self {
            Archetype::Warden => "Warden",
            Archetype::Oracle => "Oracle",
            Archetype::Drifter => "Drifter",
            Archetype::Tinker => "Tinker",
            Archetype::Ember => "Ember",
            Archetype::Verdant => "Verdant",
            Archetype::Cipher => "Cipher",
            Archetype::Herald => "Herald",
        }
    }
}

/// Derived cosmetic profile for a token
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Look {
    pub archetype_id: Archetype,
    pub base_color: String,
    pub accent_color: String,
    pub aura_color: String,
    pub biome: String,
    pub accessory: String,
}

const BIOMES: [&str; 6] = [
    "neon reef",
    "glass desert",
    "mycelium grove",
    "rust canyon",
    "aurora steppe",
    "tidal vault",
];

const ACCESSORIES: [&str; 7] = [
    "brass monocle",
    "signal lantern",
    "woven sigil scarf",
    "orbiting shard",
    "inkwell charm",
    "echo bell",
    "mirrored visor",
];

// One 4-color palette per archetype: [base options x2, accent, aura].
// Base is picked from the first two entries by a seed byte.
const PALETTES: [[&str; 4]; 8] = [
    ["#2f4858", "#33658a", "#86bbd8", "#9ee493"], // Warden
    ["#5f0f40", "#9a031e", "#fb8b24", "#e36414"], // Oracle
    ["#3d405b", "#81b29a", "#f2cc8f", "#e07a5f"], // Drifter
    ["#495867", "#577399", "#bdd5ea", "#fe5f55"], // Tinker
    ["#6a040f", "#d00000", "#faa307", "#ffba08"], // Ember
    ["#1b4332", "#2d6a4f", "#74c69d", "#d8f3dc"], // Verdant
    ["#10002b", "#3c096c", "#7b2cbf", "#c77dff"], // Cipher
    ["#003049", "#669bbc", "#fdf0d5", "#c1121f"], // Herald
];

/// Select the deterministic Look for a fid.
///
/// Total over all of u64; fid 0 is handled like any other value (callers
/// reject zero fids before ever deriving a look, but the function itself
/// has no failure mode).
pub fn select_look(fid: u64) -> Look {
    let seed = Sha256::digest(fid.to_le_bytes());

    let archetype = Archetype::ALL[(seed[0] as usize) % Archetype::ALL.len()];
    let palette = &PALETTES[(seed[0] as usize) % PALETTES.len()];

    Look {
        archetype_id: archetype,
        base_color: palette[(seed[1] as usize) % 2].to_string(),
        accent_color: palette[2].to_string(),
        aura_color: palette[3].to_string(),
        biome: BIOMES[(seed[2] as usize) % BIOMES.len()].to_string(),
        accessory: ACCESSORIES[(seed[3] as usize) % ACCESSORIES.len()].to_string(),
    }
}

/// Build the artwork prompt for a Look.
///
/// Kept terse and fully derived from the Look so a re-run for an unpinned
/// token produces the same prompt.
pub fn artwork_prompt(look: &Look) -> String {
    format!(
        "A stylized portrait of a {} character in a {} biome, wearing a {}. \
         Base color {}, accent {}, glowing aura {}. Flat illustration, \
         centered, no text.",
        look.archetype_id.name(),
        look.biome,
        look.accessory,
        look.base_color,
        look.accent_color,
        look.aura_color,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_fid_same_look() {
        for fid in [1u64, 2, 100, 7777, u64::MAX] {
            assert_eq!(select_look(fid), select_look(fid));
        }
    }

    #[test]
    fn look_is_total_over_edge_fids() {
        // No panic and well-formed colors for boundary values
        for fid in [0u64, 1, u64::MAX] {
            let look = select_look(fid);
            for color in [&look.base_color, &look.accent_color, &look.aura_color] {
                assert_eq!(color.len(), 7);
                assert!(color.starts_with('#'));
            }
            assert!(!look.biome.is_empty());
            assert!(!look.accessory.is_empty());
        }
    }

    #[test]
    fn known_fid_snapshot() {
        // Pins the derivation so a refactor cannot silently reshuffle looks
        // that already have pinned artwork. SHA-256 of 100u64 LE begins
        // 26 ab 39 15.
        let look = select_look(100);
        assert_eq!(look.archetype_id, Archetype::Cipher);
        assert_eq!(look.base_color, "#3c096c");
        assert_eq!(look.accent_color, "#7b2cbf");
        assert_eq!(look.aura_color, "#c77dff");
        assert_eq!(look.biome, "rust canyon");
        assert_eq!(look.accessory, "brass monocle");
    }

    #[test]
    fn looks_vary_across_fids() {
        // Not a randomness test, just a sanity check that the selector
        // actually uses the seed.
        let distinct: std::collections::HashSet<String> =
            (1u64..=64).map(|fid| select_look(fid).base_color).collect();
        assert!(distinct.len() > 1);
    }

    #[test]
    fn prompt_is_deterministic_and_mentions_the_look() {
        let look = select_look(42);
        let prompt = artwork_prompt(&look);
        assert_eq!(prompt, artwork_prompt(&select_look(42)));
        assert!(prompt.contains(look.archetype_id.name()));
        assert!(prompt.contains(&look.biome));
        assert!(prompt.contains(&look.base_color));
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(select_look(5)).unwrap();
        assert!(json.get("archetypeId").is_some());
        assert!(json.get("baseColor").is_some());
        assert!(json.get("auraColor").is_some());
    }
}
