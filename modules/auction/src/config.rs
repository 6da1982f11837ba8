use std::env;

/// Application configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Absent means auctions are kept in memory
    pub database_url: Option<String>,
    pub bus_type: String,
    pub nats_url: String,
    pub host: String,
    pub port: u16,
    /// Seller recorded on auctions created through the API
    pub default_seller: String,
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
            .unwrap_or_else(|_| "7001".to_string())
            .parse()
            .map_err(|_| "PORT must be a valid u16".to_string())?;

        let default_seller = env::var("DEFAULT_SELLER")
            .unwrap_or_else(|_| "bob".to_string());

        Ok(Config {
            database_url,
            bus_type,
            nats_url,
            host,
            port,
            default_seller,
        })
    }
}
