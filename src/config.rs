use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub results: ResultsConfig,
    pub backend: BackendConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// SQLite catalog (metaserv) location
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultsConfig {
    pub base_path: String,
}

/// Credentials and pool sizing for backend instances
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub user: Option<String>,
    pub password: Option<String>,
    pub max_connections: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Try to load from .env file
        let _ = dotenv::dotenv();

        let mut builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("catalog.url", "./metaserv.db")?
            .set_default("results.base_path", "./results")?
            .set_default("backend.max_connections", 16)?
            .set_default("logging.level", "info")?;

        if let Ok(host) = env::var("HOST") {
            builder = builder.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            builder = builder.set_override("server.port", port.parse::<u16>().unwrap_or(8080))?;
        }

        if let Ok(catalog_url) = env::var("CATALOG_URL") {
            builder = builder.set_override("catalog.url", catalog_url)?;
        }

        if let Ok(base_path) = env::var("DAX_BASE_PATH") {
            builder = builder.set_override("results.base_path", base_path)?;
        }

        if let Ok(user) = env::var("BACKEND_USER") {
            builder = builder.set_override("backend.user", Some(user))?;
        }

        if let Ok(password) = env::var("BACKEND_PASSWORD") {
            builder = builder.set_override("backend.password", Some(password))?;
        }

        if let Ok(max_connections) = env::var("BACKEND_MAX_CONNECTIONS") {
            builder = builder.set_override(
                "backend.max_connections",
                max_connections.parse::<u64>().unwrap_or(16),
            )?;
        }

        if let Ok(log_level) = env::var("RUST_LOG") {
            builder = builder.set_override("logging.level", log_level)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        // Clear environment variables for this test
        for key in [
            "HOST",
            "PORT",
            "CATALOG_URL",
            "DAX_BASE_PATH",
            "BACKEND_USER",
            "BACKEND_PASSWORD",
            "BACKEND_MAX_CONNECTIONS",
            "RUST_LOG",
        ] {
            env::remove_var(key);
        }

        let config = Config::from_env();
        assert!(config.is_ok());

        let config = config.unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server_address(), "0.0.0.0:8080");
        assert_eq!(config.catalog.url, "./metaserv.db");
        assert_eq!(config.results.base_path, "./results");
        assert_eq!(config.backend.user, None);
        assert_eq!(config.backend.max_connections, 16);
        assert_eq!(config.logging.level, "info");
    }
}
