use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreConfig,
    /// Invitor recorded for users onboarded without a referral token.
    pub fallback_invitor: String,
    /// Hours east of UTC at which check-in calendar days roll over.
    pub checkin_utc_offset_hours: i32,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            store: StoreConfig::default(),
            fallback_invitor: mosq_engine::DEFAULT_FALLBACK_INVITOR.to_string(),
            checkin_utc_offset_hours: 0,
            log_level: "info".into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Process-local store; contents are lost on exit.
    #[default]
    Memory,
    Mongodb { uri: String, database: String },
}

impl ServerConfig {
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> ServerResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> ServerResult<()> {
        if !(-23..=23).contains(&self.checkin_utc_offset_hours) {
            return Err(ServerError::Config(format!(
                "checkin_utc_offset_hours out of range: {}",
                self.checkin_utc_offset_hours
            )));
        }
        mosq_types::Uid::parse(&self.fallback_invitor)
            .map_err(|e| ServerError::Config(format!("fallback_invitor: {e}")))?;
        if let StoreConfig::Mongodb { uri, database } = &self.store {
            if uri.is_empty() || database.is_empty() {
                return Err(ServerError::Config(
                    "mongodb store needs both uri and database".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "0.0.0.0:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(c.store, StoreConfig::Memory);
        assert_eq!(c.fallback_invitor, "1896706785");
        assert_eq!(c.checkin_utc_offset_hours, 0);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn parses_mongodb_store() {
        let c = ServerConfig::from_toml_str(
            r#"
            bind_addr = "127.0.0.1:8080"
            checkin_utc_offset_hours = 1

            [store]
            backend = "mongodb"
            uri = "mongodb://db:27017"
            database = "mosq_database"
            "#,
        )
        .unwrap();
        assert_eq!(c.bind_addr.port(), 8080);
        assert_eq!(
            c.store,
            StoreConfig::Mongodb {
                uri: "mongodb://db:27017".into(),
                database: "mosq_database".into(),
            }
        );
        assert_eq!(c.log_level, "info");
    }

    #[test]
    fn rejects_bad_offset() {
        let err = ServerConfig::from_toml_str("checkin_utc_offset_hours = 30").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn rejects_blank_fallback_invitor() {
        assert!(ServerConfig::from_toml_str("fallback_invitor = \" \"").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mosq.toml");
        std::fs::write(&path, "log_level = \"debug\"\n").unwrap();
        let c = ServerConfig::load(&path).unwrap();
        assert_eq!(c.log_level, "debug");
    }
}
