//! Wicket - single-use download tokens for purchased reports

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use wicket::{
    auth::TokenSigner,
    catalog::MemoryCatalog,
    config::{Args, StoreBackend},
    db::MongoClient,
    logging::{self, AuditLogger},
    server,
    store::{MemoryTokenStore, MongoTokenStore, TokenStore},
    tokens::{SystemClock, TokenIssuer, TokenRedeemer, TokenService},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    logging::init_tracing(&args.log_level, args.log_json);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Wicket - report download tokens");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Store: {:?}", args.store);
    info!("Token validity: {}h", args.token_expiry_hours);
    match args.max_tokens_per_purchase {
        Some(cap) => info!("Tokens per purchase: at most {}", cap),
        None => info!("Tokens per purchase: unlimited"),
    }
    info!("======================================");

    let signer = match args.signing_key()? {
        Some(key) => TokenSigner::new(key)?,
        None => {
            warn!("No signing key configured (dev mode): using an ephemeral secret, tokens will not survive a restart");
            TokenSigner::ephemeral()
        }
    };
    let signer = Arc::new(signer);
    info!("Signing algorithm: {:?}", signer.algorithm());

    let store: Arc<dyn TokenStore> = match args.store {
        StoreBackend::Memory => {
            warn!("Token records are kept in memory and lost on restart");
            Arc::new(MemoryTokenStore::new())
        }
        StoreBackend::Mongo => {
            let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
                Ok(client) => client,
                Err(e) => {
                    error!("MongoDB connection failed: {}", e);
                    std::process::exit(1);
                }
            };
            Arc::new(MongoTokenStore::new(&mongo).await?)
        }
    };

    let catalog = match &args.catalog_file {
        Some(path) => MemoryCatalog::from_file(path, &args.files_dir)?,
        None if args.seed_demo_data || args.dev_mode => {
            info!("Seeding demo catalog (order1 / user1 / prod1)");
            MemoryCatalog::with_demo_data(&args.files_dir)
        }
        None => {
            warn!("No catalog configured: every issuance will fail with not found");
            MemoryCatalog::new(&args.files_dir)
        }
    };
    let catalog = Arc::new(catalog);

    let audit = AuditLogger::new(args.node_id.to_string());
    if let Some(path) = &args.audit_log {
        audit.init_file(path.clone()).await?;
    }

    let clock = Arc::new(SystemClock);
    let issuer = TokenIssuer::new(
        catalog.clone(),
        Arc::clone(&store),
        Arc::clone(&signer),
        clock.clone(),
        args.issuance_policy()?,
    );
    let redeemer = TokenRedeemer::new(Arc::clone(&store), catalog, signer, clock);
    let tokens = TokenService::new(issuer, redeemer, audit, args.base_url.clone())
        .with_request_timeout(Duration::from_millis(args.request_timeout_ms));

    let state = Arc::new(server::AppState::new(args, tokens, store));

    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
