use event_bus::{EventBus, InMemoryBus, NatsBus};
use event_consumer::DispatcherConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use search_rs::{
    config::Config,
    db,
    repos::PgReplicaStore,
    routes,
    start_replica_consumers,
    store::{InMemoryReplicaStore, ReplicaStore},
    sync::{AuctionServiceClient, CatchUpSynchronizer},
};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting search service...");

    let config = Config::from_env()
        .expect("Failed to load configuration from environment");

    tracing::info!(
        "Configuration loaded: host={}, port={}, bus_type={}, auction_service_url={}",
        config.host,
        config.port,
        config.bus_type,
        config.auction_service_url
    );

    let store: Arc<dyn ReplicaStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = db::init_pool(url)
                .await
                .expect("Failed to connect to database");

            tracing::info!("Running migrations...");
            db::migrate(&pool).await.expect("Failed to run migrations");

            Arc::new(PgReplicaStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, replica is kept in memory");
            Arc::new(InMemoryReplicaStore::new())
        }
    };

    // Create event bus
    let bus: Arc<dyn EventBus> = match config.bus_type.to_lowercase().as_str() {
        "inmemory" => {
            tracing::info!("Using InMemory event bus");
            Arc::new(InMemoryBus::new())
        }
        "nats" => {
            tracing::info!("Connecting to NATS at {}", config.nats_url);
            let bus = NatsBus::connect(&config.nats_url)
                .await
                .expect("Failed to connect to NATS");
            Arc::new(bus)
        }
        _ => panic!("Invalid BUS_TYPE: {}. Must be 'inmemory' or 'nats'", config.bus_type),
    };

    // Subscribe before catching up so nothing published meanwhile is missed
    let _consumers = start_replica_consumers(bus.clone(), store.clone(), DispatcherConfig::from_env())
        .await
        .expect("Failed to start replica consumers");

    match AuctionServiceClient::new(config.auction_service_url.clone()) {
        Ok(client) => {
            CatchUpSynchronizer::new(store.clone(), Arc::new(client))
                .run_at_startup()
                .await;
        }
        Err(e) => tracing::warn!(error = %e, "Could not build auction service client, skipping catch-up"),
    }

    let app = routes::router(store).layer(
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("HOST:PORT must be a valid socket address");
    tracing::info!("Search service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
