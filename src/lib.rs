//! Kiln - token finalization service
//!
//! "Where tokens are fired into their final form."
//!
//! Kiln composes unreliable external services — a chain RPC, a text
//! generator, an image generator, a content-addressed pin store, and a
//! database — into one deterministic, idempotent finalize operation, plus
//! a sequential backfill driver for large id ranges.
//!
//! ## Pipeline
//!
//! - **Chain**: resolve the token's owner fid (the only fatal stage)
//! - **Look**: derive the deterministic cosmetic profile from the fid
//! - **Persona**: generate label + bio, or fall back deterministically
//! - **Artwork + Pin**: optional; synthesize and pin to IPFS
//! - **Store**: upsert records, anchor idempotency on the pin record

pub mod artwork;
pub mod chain;
pub mod config;
pub mod db;
pub mod finalize;
pub mod look;
pub mod persona;
pub mod pin;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{KilnError, Result};
