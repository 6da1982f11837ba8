use event_bus::{EventBus, InMemoryBus, NatsBus};
use event_consumer::DispatcherConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use auction_rs::{
    alert::{AlertSink, LogAlertSink, PgAlertSink},
    config::Config,
    db,
    events::{run_publisher_task, EventPublisher, RelayConfig},
    repos::PgAuctionStore,
    routes,
    services::AuctionService,
    start_fault_consumer,
    store::{AuctionStore, InMemoryAuctionStore},
};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting auction service...");

    let config = Config::from_env()
        .expect("Failed to load configuration from environment");

    tracing::info!(
        "Configuration loaded: host={}, port={}, bus_type={}, database={}",
        config.host,
        config.port,
        config.bus_type,
        if config.database_url.is_some() { "postgres" } else { "in-memory" }
    );

    // Storage
    let (store, alerts): (Arc<dyn AuctionStore>, Arc<dyn AlertSink>) = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = db::init_pool(url)
                .await
                .expect("Failed to connect to database");

            tracing::info!("Running migrations...");
            db::migrate(&pool).await.expect("Failed to run migrations");

            (
                Arc::new(PgAuctionStore::new(pool.clone())),
                Arc::new(PgAlertSink::new(pool)),
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set, auctions are kept in memory");
            (Arc::new(InMemoryAuctionStore::new()), Arc::new(LogAlertSink))
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

    // Outbox relay
    let relay_store = store.clone();
    let publisher = EventPublisher::new(bus.clone());
    tokio::spawn(run_publisher_task(relay_store, publisher, RelayConfig::from_env()));

    // Fault compensation
    let _consumers = start_fault_consumer(bus.clone(), alerts, DispatcherConfig::from_env())
        .await
        .expect("Failed to start fault consumer");

    let service = Arc::new(AuctionService::new(store, config.default_seller.clone()));

    let app = routes::router(service).layer(
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("HOST:PORT must be a valid socket address");
    tracing::info!("Auction service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
