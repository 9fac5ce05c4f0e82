use std::path::PathBuf;

use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL database connection URL. Without one the service keeps
    /// everything in memory.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Upper bound on pooled database connections
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,

    /// Secret used to sign session tokens
    pub session_secret: String,

    /// Session lifetime in seconds
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Optional JSON file with genres and movies to import at startup
    #[serde(default)]
    pub catalog_seed: Option<PathBuf>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_database_max_connections() -> u32 {
    5
}

fn default_session_ttl_secs() -> u64 {
    // two weeks
    1_209_600
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_iter() {
        let config: Config = envy::from_iter(vec![(
            "SESSION_SECRET".to_string(),
            "s3cret".to_string(),
        )])
        .unwrap();

        assert_eq!(config.database_url, None);
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.session_ttl_secs, 1_209_600);
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
    }

    #[test]
    fn test_overrides_from_iter() {
        let config: Config = envy::from_iter(vec![
            ("SESSION_SECRET".to_string(), "s3cret".to_string()),
            (
                "DATABASE_URL".to_string(),
                "postgres://localhost/movies".to_string(),
            ),
            ("PORT".to_string(), "8080".to_string()),
            ("CATALOG_SEED".to_string(), "seed/movies.json".to_string()),
        ])
        .unwrap();

        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/movies")
        );
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.catalog_seed,
            Some(PathBuf::from("seed/movies.json"))
        );
    }

    #[test]
    fn test_missing_secret_is_an_error() {
        let result = envy::from_iter::<_, Config>(Vec::<(String, String)>::new());
        assert!(result.is_err());
    }
}
