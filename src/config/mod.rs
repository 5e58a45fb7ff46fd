//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Supabase project URL
    pub supabase_url: String,
    /// Supabase service role key (bypasses RLS - server only!)
    pub supabase_service_role_key: String,

    /// Allowed client origins for CORS, comma-separated; `*` allows any
    pub client_origin: String,

    /// Ticks a vacated side keeps fighting before it forfeits; unset disables
    pub abandon_grace_ticks: Option<u32>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        };

        let abandon_grace_ticks = match lookup("ABANDON_GRACE_TICKS") {
            Some(raw) => Some(
                raw.parse()
                    .map_err(|_| ConfigError::Invalid("ABANDON_GRACE_TICKS"))?,
            ),
            None => None,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            supabase_url: lookup("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?,
            supabase_service_role_key: lookup("SUPABASE_SERVICE_ROLE_KEY")
                .ok_or(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY"))?,

            client_origin: lookup("CLIENT_ORIGIN").unwrap_or_else(|| "*".to_string()),

            abandon_grace_ticks,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("SUPABASE_URL", "https://example.supabase.co"),
        ("SUPABASE_SERVICE_ROLE_KEY", "secret"),
    ];

    #[test]
    fn defaults_fill_optional_values() {
        let config = tokio_test::assert_ok!(Config::from_lookup(lookup(&REQUIRED)));
        assert_eq!(config.server_addr.port(), 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.client_origin, "*");
        assert_eq!(config.abandon_grace_ticks, None);
    }

    #[test]
    fn port_overrides_server_addr() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "9100"));
        pairs.push(("SERVER_ADDR", "127.0.0.1:1"));
        pairs.push(("ABANDON_GRACE_TICKS", "200"));
        let config = tokio_test::assert_ok!(Config::from_lookup(lookup(&pairs)));
        assert_eq!(config.server_addr.port(), 9100);
        assert_eq!(config.abandon_grace_ticks, Some(200));
    }

    #[test]
    fn missing_supabase_url_is_reported() {
        let err = Config::from_lookup(lookup(&REQUIRED[1..])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SUPABASE_URL")));
    }

    #[test]
    fn bad_grace_ticks_are_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("ABANDON_GRACE_TICKS", "soon"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("ABANDON_GRACE_TICKS")));
    }
}
