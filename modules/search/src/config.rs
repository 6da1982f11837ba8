use std::env;

/// Application configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Absent means the replica is kept in memory
    pub database_url: Option<String>,
    pub bus_type: String,
    pub nats_url: String,
    pub host: String,
    pub port: u16,
    /// Base URL of the auction service, used for catch-up at startup
    pub auction_service_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let bus_type = env::var("BUS_TYPE")
            .unwrap_or_else(|_| "inmemory".to_string());

        let nats_url = env::var("NATS_URL")
            .unwrap_or_else(|_| "nats://localhost:4222".to_string());

        let host = env::var("HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "7002".to_string())
            .parse()
            .map_err(|_| "PORT must be a valid u16".to_string())?;

        let auction_service_url = env::var("AUCTION_SERVICE_URL")
            .unwrap_or_else(|_| "http://localhost:7001".to_string());

        Ok(Config {
            database_url,
            bus_type,
            nats_url,
            host,
            port,
            auction_service_url,
        })
    }
}
