// src/config.rs - Configuration management
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::Path;
use anyhow::{Context, Result};
use validator::Validate;

use crate::models::{ClassificationPolicy, DurationUnit, GridLayoutKind};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
    pub warehouse: WarehouseConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    pub keep_alive: u64,
    pub client_timeout: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: u64,
    /// Create the collaborator tables when they are missing (development databases).
    pub ensure_schema: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    pub require_https: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

/// A literal name prefix mapped onto a dashboard zone.
#[derive(Debug, Deserialize, Clone, PartialEq, Validate)]
pub struct ZoneRule {
    #[validate(length(min = 1, max = 50, message = "Zone key must be 1-50 characters"))]
    pub key: String,
    #[validate(length(min = 1, max = 100, message = "Zone label must be 1-100 characters"))]
    pub label: String,
    #[validate(length(min = 1, message = "Zone prefix cannot be empty"))]
    pub prefix: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Validate)]
pub struct DefaultZone {
    #[validate(length(min = 1, max = 50))]
    pub key: String,
    #[validate(length(min = 1, max = 100))]
    pub label: String,
}

/// Everything that identifies the tracked warehouse and how its grid is laid out.
#[derive(Debug, Deserialize, Clone, Validate)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Parent location of every tracked storage location.
    pub location_id: i64,
    #[validate(length(min = 1))]
    pub location_usage: String,
    #[validate(length(min = 1, message = "At least one active order state is required"))]
    pub active_order_states: Vec<String>,
    pub policy: ClassificationPolicy,
    pub duration_unit: DurationUnit,
    pub layout: GridLayoutKind,
    #[validate(length(min = 1, max = 3, message = "Name delimiter must be 1-3 characters"))]
    pub name_delimiter: String,
    /// Highest column number a location name may carry; larger ones are malformed.
    #[validate(range(min = 1, max = 9999, message = "max_column must be between 1 and 9999"))]
    pub max_column: u32,
    #[validate(nested)]
    pub zones: Vec<ZoneRule>,
    #[validate(nested)]
    pub default_zone: DefaultZone,
    pub row_order: Vec<String>,
    pub level_order: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: None,
            keep_alive: 30,
            client_timeout: 30,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:occupancy.db".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: 30,
            ensure_schema: true,
        }
    }
}

/// Development-only secret, long enough to pass validation. Rejected in production.
pub const DEV_JWT_SECRET: &str = "dummy_32_chars_for_tests_only!!!";

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
                "http://localhost:8080".to_string(),
                "http://127.0.0.1:8080".to_string(),
            ],
            require_https: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            location_id: 19,
            location_usage: "internal".to_string(),
            active_order_states: vec![
                "manufactured".to_string(),
                "ready_for_packaging".to_string(),
                "ready_for_picking".to_string(),
            ],
            policy: ClassificationPolicy::Container,
            duration_unit: DurationUnit::Days,
            layout: GridLayoutKind::Rows,
            name_delimiter: "-".to_string(),
            max_column: 999,
            zones: vec![
                ZoneRule {
                    key: "malak_sklad".to_string(),
                    label: "Малък Склад".to_string(),
                    prefix: "M-".to_string(),
                },
                ZoneRule {
                    key: "calandar".to_string(),
                    label: "Calandar".to_string(),
                    prefix: "C-".to_string(),
                },
                ZoneRule {
                    key: "teniski".to_string(),
                    label: "Teniski".to_string(),
                    prefix: "T-".to_string(),
                },
            ],
            default_zone: DefaultZone {
                key: "other".to_string(),
                label: "Other".to_string(),
            },
            row_order: vec!["A".to_string(), "B".to_string()],
            level_order: ["E", "D", "C", "B", "A"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl WarehouseConfig {
    /// A location belongs to the tracked warehouse when it hangs directly
    /// under it, or is the warehouse itself.
    pub fn is_tracked(&self, location_id: i64, parent_id: Option<i64>) -> bool {
        parent_id == Some(self.location_id) || location_id == self.location_id
    }

    fn check_consistency(&self) -> Result<()> {
        let mut keys = HashSet::new();
        for zone in &self.zones {
            if !keys.insert(zone.key.as_str()) {
                anyhow::bail!("Duplicate zone key '{}'", zone.key);
            }
        }
        if keys.contains(self.default_zone.key.as_str()) {
            anyhow::bail!(
                "Default zone key '{}' collides with a configured zone",
                self.default_zone.key
            );
        }

        let mut rows = HashSet::new();
        if let Some(dup) = self.row_order.iter().find(|r| !rows.insert(r.as_str())) {
            anyhow::bail!("Row '{}' listed twice in row_order", dup);
        }
        let mut levels = HashSet::new();
        if let Some(dup) = self.level_order.iter().find(|l| !levels.insert(l.as_str())) {
            anyhow::bail!("Level '{}' listed twice in level_order", dup);
        }
        Ok(())
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse configuration TOML")
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long (current: {})",
                self.auth.jwt_secret.len()
            ));
        }

        if self.database.max_connections < self.database.min_connections {
            return Err(anyhow::anyhow!(
                "max_connections ({}) must be >= min_connections ({})",
                self.database.max_connections,
                self.database.min_connections
            ));
        }

        self.warehouse
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid warehouse settings: {}", e))?;
        self.warehouse.check_consistency()?;

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        env::var("OCCUPANCY_ENV").map(|v| v == "production").unwrap_or(false)
    }

    pub fn print_startup_info(&self) {
        log::info!("📦 Location occupancy service starting up...");
        log::info!("🌐 Server: {}:{}", self.server.host, self.server.port);
        log::info!("💾 Database: {}", self.database.url);
        log::info!(
            "🏭 Warehouse: location {} ({} zones, layout {}, policy {})",
            self.warehouse.location_id,
            self.warehouse.zones.len(),
            self.warehouse.layout,
            self.warehouse.policy
        );
        log::info!("📊 Logging: {} level", self.logging.level);

        if !self.is_production() {
            log::warn!("🚧 Running in development mode");
        }
        if self.security.require_https {
            log::info!("🔒 HTTPS enforcement enabled");
        } else if self.is_production() {
            log::warn!("⚠️  HTTPS not required in production mode");
        }
    }
}

pub fn load_config() -> Result<Config> {
    load_env_file()?;

    let mut config = if let Ok(config_file) = env::var("CONFIG_FILE") {
        let config_str = fs::read_to_string(Path::new(&config_file))
            .with_context(|| format!("Failed to read config file: {}", config_file))?;
        Config::from_toml_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", config_file))?
    } else {
        Config::default()
    };

    override_with_env(&mut config)?;

    config.validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

fn override_with_env(config: &mut Config) -> Result<()> {
    if let Ok(host) = env::var("BIND_ADDRESS") {
        config.server.host = host;
    }
    if let Ok(port_str) = env::var("OCCUPANCY_PORT") {
        if let Ok(port) = port_str.parse::<u16>() {
            config.server.port = port;
        }
    }
    if let Ok(workers_str) = env::var("OCCUPANCY_WORKERS") {
        if let Ok(workers) = workers_str.parse::<usize>() {
            config.server.workers = Some(workers);
        }
    }
    if let Ok(jwt_secret) = env::var("JWT_SECRET") {
        config.auth.jwt_secret = jwt_secret;
    }
    if let Ok(url) = env::var("DATABASE_URL") {
        config.database.url = url;
    }
    if let Ok(max_conn_str) = env::var("DATABASE_MAX_CONNECTIONS") {
        if let Ok(max_conn) = max_conn_str.parse::<u32>() {
            config.database.max_connections = max_conn;
        }
    }
    if let Ok(origins_str) = env::var("ALLOWED_ORIGINS") {
        config.security.allowed_origins = origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Ok(level) = env::var("RUST_LOG") {
        config.logging.level = level;
    }
    if let Ok(id_str) = env::var("OCCUPANCY_WAREHOUSE_ID") {
        config.warehouse.location_id = id_str
            .parse::<i64>()
            .with_context(|| format!("OCCUPANCY_WAREHOUSE_ID is not a number: {}", id_str))?;
    }
    if let Ok(layout) = env::var("OCCUPANCY_LAYOUT") {
        config.warehouse.layout = layout
            .parse()
            .map_err(|_| anyhow::anyhow!("Unknown OCCUPANCY_LAYOUT '{}'", layout))?;
    }
    if let Ok(policy) = env::var("OCCUPANCY_POLICY") {
        config.warehouse.policy = policy
            .parse()
            .map_err(|_| anyhow::anyhow!("Unknown OCCUPANCY_POLICY '{}'", policy))?;
    }

    Ok(())
}

pub fn load_env_file() -> Result<()> {
    if let Ok(env_file) = env::var("ENV_FILE") {
        dotenvy::from_filename(&env_file)
            .with_context(|| format!("Failed to load environment file: {}", env_file))?;
    } else if Path::new(".env").exists() {
        dotenvy::dotenv().context("Failed to load .env file")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.warehouse.location_id, 19);
        assert_eq!(config.warehouse.level_order, vec!["E", "D", "C", "B", "A"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.auth.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());

        config.auth.jwt_secret = "a".repeat(32);
        assert!(config.validate().is_ok());

        config.database.max_connections = 1;
        config.database.min_connections = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_warehouse_validation() {
        let mut config = Config::default();
        config.warehouse.active_order_states.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.warehouse.zones[1].key = "malak_sklad".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.warehouse.zones[0].prefix = String::new();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.warehouse.level_order.push("E".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.warehouse.max_column = 0;
        assert!(config.validate().is_err());
        config.warehouse.max_column = 100_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_membership() {
        let warehouse = WarehouseConfig::default();
        assert!(warehouse.is_tracked(120, Some(19)));
        assert!(warehouse.is_tracked(19, Some(1)));
        assert!(!warehouse.is_tracked(120, Some(20)));
        assert!(!warehouse.is_tracked(120, None));
    }

    #[test]
    fn test_toml_loading() -> Result<()> {
        let toml_content = r#"
        [server]
        host = "0.0.0.0"
        port = 9000

        [auth]
        jwt_secret = "test_secret_123456789012345678901234567890"

        [warehouse]
        location_id = 42
        layout = "zones"
        policy = "stock"
        duration_unit = "hours"
        row_order = ["A"]

        [[warehouse.zones]]
        key = "racks"
        label = "Racks"
        prefix = "R-"
        "#;

        let mut temp_file = tempfile::NamedTempFile::new()?;
        temp_file.write_all(toml_content.as_bytes())?;

        let content = fs::read_to_string(temp_file.path())?;
        let config = Config::from_toml_str(&content)?;
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.warehouse.location_id, 42);
        assert_eq!(config.warehouse.layout, GridLayoutKind::Zones);
        assert_eq!(config.warehouse.policy, ClassificationPolicy::Stock);
        assert_eq!(config.warehouse.duration_unit, DurationUnit::Hours);
        assert_eq!(config.warehouse.zones.len(), 1);
        // untouched keys keep their defaults
        assert_eq!(config.warehouse.name_delimiter, "-");
        assert_eq!(config.warehouse.default_zone.key, "other");
        assert!(config.validate().is_ok());

        Ok(())
    }

    #[test]
    fn test_bad_toml_is_rejected() {
        assert!(Config::from_toml_str("[warehouse]\nlayout = \"spiral\"").is_err());
    }
}
