//! Kiln - token finalization service
//!
//! "Where tokens are fired into their final form."

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kiln::{
    artwork::ImageApi,
    chain::ChainResolver,
    config::Args,
    db::{MongoClient, MongoStore},
    finalize::{Capabilities, Orchestrator},
    persona::LlmPersona,
    pin::PinStore,
    server,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("kiln={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Kiln - Token Finalization Service");
    info!("  \"Fired into their final form\"");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Chain RPC: {}", args.chain_rpc_url);
    info!("Token contract: {}", args.token_contract);
    info!("Persona: {}", if args.llm_api_key.is_some() { "LLM" } else { "fallback only" });
    info!(
        "Artwork: {}",
        if args.image_api_key.is_some() && args.pinning_configured() {
            "enabled"
        } else {
            "disabled (card fallback)"
        }
    );
    info!(
        "Store: {}",
        args.mongodb_uri.as_deref().unwrap_or("none (stateless, no idempotency)")
    );
    info!("======================================");

    if args.admin_token.is_none() {
        warn!("ADMIN_TOKEN not set: /admin/backfill is OPEN. This is a misconfiguration in production.");
    }

    // Identity resolution is the one required collaborator
    let identity = Arc::new(ChainResolver::new(&args)?);

    // Assemble capabilities once; every stage gates on field presence
    let mut caps = Capabilities::default();

    if let Some(ref key) = args.llm_api_key {
        caps.persona = Some(Arc::new(LlmPersona::new(&args, key.clone())?));
    } else {
        info!("LLM_API_KEY not set, personas will use the deterministic fallback");
    }

    if let Some(ref key) = args.image_api_key {
        caps.artwork = Some(Arc::new(ImageApi::new(&args, key.clone())?));
    }

    if let (Some(endpoint), Some(token)) = (args.pin_endpoint.clone(), args.pin_token.clone()) {
        caps.pinner = Some(Arc::new(PinStore::new(&args, endpoint, token)?));
    }

    if caps.artwork.is_some() != caps.pinner.is_some() {
        warn!("Artwork stage needs both IMAGE_API_KEY and a pin destination; it stays disabled");
    }

    // Connect to MongoDB (optional capability, warn and run stateless)
    if let Some(ref uri) = args.mongodb_uri {
        match MongoClient::new(uri, &args.mongodb_db).await {
            Ok(client) => match MongoStore::new(&client).await {
                Ok(store) => {
                    info!("MongoDB connected, idempotency and persistence enabled");
                    caps.store = Some(Arc::new(store));
                }
                Err(e) => {
                    warn!("MongoDB collections unavailable (continuing stateless): {}", e);
                }
            },
            Err(e) => {
                warn!("MongoDB connection failed (continuing stateless): {}", e);
            }
        }
    }

    let orchestrator = Arc::new(Orchestrator::new(identity, caps, &args.card_base_url));
    let state = Arc::new(server::AppState::new(args, orchestrator));

    // Run the server
    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
