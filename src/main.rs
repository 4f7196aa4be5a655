// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shop Challenge API Server
//!
//! Location-based shop challenges: pick target shops, check in nearby to
//! earn points, and spend the points on vouchers.

use shop_challenge::{
    config::{Config, StoreBackend},
    db::{ChallengeStore, FirestoreDb, MemoryDb},
    services::ShopDirectory,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        port = config.port,
        backend = ?config.store_backend,
        "Starting Shop Challenge API"
    );

    // Initialize the store
    let db: Arc<dyn ChallengeStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(
            FirestoreDb::new(&config.gcp_project_id)
                .await
                .expect("Failed to connect to Firestore"),
        ),
        StoreBackend::Memory => {
            let db = MemoryDb::new();
            let seeded = db
                .seed_vouchers_from_file(&config.voucher_catalog_path)
                .await
                .expect("Failed to seed voucher catalog");
            tracing::info!(
                path = %config.voucher_catalog_path,
                count = seeded,
                "Voucher catalog seeded"
            );
            Arc::new(db)
        }
    };

    // Load shop directory
    tracing::info!(path = %config.shops_path, "Loading shop directory");
    let directory =
        ShopDirectory::load_from_file(&config.shops_path).expect("Failed to load shop directory");
    tracing::info!(count = directory.shops().len(), "Shop directory loaded");

    // Build shared state
    let port = config.port;
    let state = Arc::new(AppState::new(config, db, directory));

    // Build router
    let app = shop_challenge::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("shop_challenge=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
