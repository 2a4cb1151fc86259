use rental_client::db::dashboard_queries::MAX_HORIZON_DAYS;
use serde::Deserialize;
use std::{fs, io::ErrorKind};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://rental.db".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind_addr: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub batch_size: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: 200,
            max_retries: 3,
            retry_backoff_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub upcoming_horizon_days: i64,
    pub default_page_size: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            upcoming_horizon_days: 14,
            default_page_size: 25,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub import: ImportConfig,
    pub dashboard: DashboardConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    /// Load from `RENTAL_CONFIG` (default `rental-config.toml`). A missing
    /// file yields the defaults; `RENTAL_DATABASE_URL` overrides the
    /// configured database.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("RENTAL_CONFIG").unwrap_or_else(|_| "rental-config.toml".to_string());
        let mut cfg = match fs::read_to_string(&path) {
            Ok(contents) => Self::from_toml(&contents)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %path, "config file not found, using defaults");
                AppConfig::default()
            }
            Err(e) => return Err(anyhow::anyhow!("failed to read config {path}: {e}")),
        };

        if let Ok(url) = env::var("RENTAL_DATABASE_URL") {
            cfg.database.url = url;
        }

        Ok(cfg)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let horizon = self.dashboard.upcoming_horizon_days;
        if !(0..=MAX_HORIZON_DAYS).contains(&horizon) {
            anyhow::bail!("dashboard.upcoming_horizon_days must be within 0..={MAX_HORIZON_DAYS}, got {horizon}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = AppConfig::from_toml("").unwrap();
        assert_eq!(cfg.database.url, "sqlite://rental.db");
        assert_eq!(cfg.import.batch_size, 200);
        assert!(cfg.metrics.is_none());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg = AppConfig::from_toml(
            r#"
            [database]
            url = "sqlite::memory:"

            [dashboard]
            upcoming_horizon_days = 30

            [metrics]
            bind_addr = "127.0.0.1:9100"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.database.url, "sqlite::memory:");
        assert_eq!(cfg.database.max_connections, 5);
        assert_eq!(cfg.dashboard.upcoming_horizon_days, 30);
        assert_eq!(cfg.dashboard.default_page_size, 25);
        assert_eq!(cfg.metrics.unwrap().bind_addr, "127.0.0.1:9100");
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = AppConfig::from_toml("[dashboard]\nupcoming_horizon_days = 4611686018427387903").unwrap_err();
        assert!(err.to_string().contains("upcoming_horizon_days"));
        assert!(AppConfig::from_toml("[dashboard]\nupcoming_horizon_days = -1").is_err());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(AppConfig::from_toml("[database\nurl = 1").is_err());
    }
}
