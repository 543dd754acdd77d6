//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

use crate::game::GameSettings;
use crate::util::time::{BROADCAST_TPS, SIMULATION_TPS};

const DEFAULT_ADDR: &str = "0.0.0.0:3000";

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS, comma-separated; `*` allows any
    pub client_origin: String,
    /// Directory served for everything that is not an API route
    pub static_dir: String,

    pub simulation_tps: u32,
    pub broadcast_tps: u32,
    /// Seconds of play per game
    pub time_limit_secs: f32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string()),
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            client_origin: lookup("CLIENT_ORIGIN").unwrap_or_else(|| "*".to_string()),
            static_dir: lookup("STATIC_DIR").unwrap_or_else(|| "public".to_string()),

            simulation_tps: parse_rate(&lookup, "SIMULATION_TPS", SIMULATION_TPS)?,
            broadcast_tps: parse_rate(&lookup, "BROADCAST_TPS", BROADCAST_TPS)?,
            time_limit_secs: match lookup("TIME_LIMIT_SECS") {
                Some(raw) => raw
                    .trim()
                    .parse::<f32>()
                    .ok()
                    .filter(|secs| secs.is_finite() && *secs > 0.0)
                    .ok_or(ConfigError::Invalid("TIME_LIMIT_SECS"))?,
                None => GameSettings::default().time_limit_secs,
            },
        })
    }

    /// Settings applied to every new session
    pub fn game_settings(&self) -> GameSettings {
        GameSettings {
            time_limit_secs: self.time_limit_secs,
        }
    }
}

/// A positive rate, or the default when unset
fn parse_rate<F>(lookup: &F, name: &'static str, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|rate| *rate > 0)
            .ok_or(ConfigError::Invalid(name)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server_addr, "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.log_level, "info");
        assert_eq!(config.client_origin, "*");
        assert_eq!(config.static_dir, "public");
        assert_eq!(config.simulation_tps, 10);
        assert_eq!(config.broadcast_tps, 5);
        assert_eq!(config.game_settings(), GameSettings::default());
    }

    #[test]
    fn port_wins_over_server_addr() {
        let config = load(&[("PORT", "9000"), ("SERVER_ADDR", "127.0.0.1:1")]).unwrap();
        assert_eq!(config.server_addr.port(), 9000);

        let config = load(&[("SERVER_ADDR", "127.0.0.1:4000")]).unwrap();
        assert_eq!(config.server_addr, "127.0.0.1:4000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("SIMULATION_TPS", "20"),
            ("BROADCAST_TPS", " 2 "),
            ("TIME_LIMIT_SECS", "90"),
            ("CLIENT_ORIGIN", "http://localhost:5173"),
        ])
        .unwrap();
        assert_eq!(config.simulation_tps, 20);
        assert_eq!(config.broadcast_tps, 2);
        assert_eq!(config.game_settings().time_limit_secs, 90.0);
        assert_eq!(config.client_origin, "http://localhost:5173");
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            load(&[("SIMULATION_TPS", "0")]),
            Err(ConfigError::Invalid("SIMULATION_TPS"))
        ));
        assert!(matches!(
            load(&[("BROADCAST_TPS", "fast")]),
            Err(ConfigError::Invalid("BROADCAST_TPS"))
        ));
        assert!(matches!(
            load(&[("TIME_LIMIT_SECS", "-1")]),
            Err(ConfigError::Invalid("TIME_LIMIT_SECS"))
        ));
        assert!(matches!(
            load(&[("PORT", "not-a-port")]),
            Err(ConfigError::InvalidAddress)
        ));
    }
}
