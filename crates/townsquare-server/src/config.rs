use serde::Deserialize;

/// Default config file, read from the working directory.
pub const CONFIG_FILE: &str = "townsquare.toml";

/// Top-level server configuration, loaded from `townsquare.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub limits: LimitsConfig,
    pub games: GamesConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            limits: LimitsConfig::default(),
            games: GamesConfig::default(),
        }
    }
}

/// Infrastructure limits (connection caps, buffer sizes, timeouts).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    /// Outbound queue depth per notification connection.
    pub notification_buffer: usize,
    pub max_sessions: usize,
    pub request_timeout_secs: u64,
    /// Maximum display-name length, in bytes.
    pub max_name_len: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            notification_buffer: 64,
            max_sessions: 1000,
            request_timeout_secs: 30,
            max_name_len: townsquare_core::player::MAX_DISPLAY_NAME_LEN,
        }
    }
}

/// Per-game tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GamesConfig {
    pub word_guess_max_misses: u8,
}

impl Default for GamesConfig {
    fn default() -> Self {
        Self {
            word_guess_max_misses: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidListenAddr(String),
    ZeroValue(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidListenAddr(addr) => {
                write!(f, "listen_addr {addr:?} is not a valid socket address")
            },
            Self::ZeroValue(field) => write!(f, "{field} must be > 0"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    /// Check addresses and limits. The first problem found is returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::InvalidListenAddr(self.listen_addr.clone()));
        }

        let limits = [
            ("limits.max_ws_connections", self.limits.max_ws_connections),
            ("limits.notification_buffer", self.limits.notification_buffer),
            ("limits.max_sessions", self.limits.max_sessions),
            ("limits.max_name_len", self.limits.max_name_len),
        ];
        for (field, value) in limits {
            if value == 0 {
                return Err(ConfigError::ZeroValue(field));
            }
        }
        if self.limits.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroValue("limits.request_timeout_secs"));
        }
        if self.games.word_guess_max_misses == 0 {
            return Err(ConfigError::ZeroValue("games.word_guess_max_misses"));
        }
        Ok(())
    }

    /// Load config from `townsquare.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string(CONFIG_FILE) {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from {CONFIG_FILE}");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse {CONFIG_FILE}: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No {CONFIG_FILE} found, using defaults");
                ServerConfig::default()
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply `TOWNSQUARE_*` overrides from `lookup`. Unparseable values are
    /// ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("TOWNSQUARE_LISTEN_ADDR")
            && !addr.is_empty()
        {
            self.listen_addr = addr;
        }

        let numeric: [(&str, &mut usize); 4] = [
            (
                "TOWNSQUARE_MAX_WS_CONNECTIONS",
                &mut self.limits.max_ws_connections,
            ),
            (
                "TOWNSQUARE_NOTIFICATION_BUFFER",
                &mut self.limits.notification_buffer,
            ),
            ("TOWNSQUARE_MAX_SESSIONS", &mut self.limits.max_sessions),
            ("TOWNSQUARE_MAX_NAME_LEN", &mut self.limits.max_name_len),
        ];
        for (key, slot) in numeric {
            if let Some(val) = lookup(key) {
                match val.parse::<usize>() {
                    Ok(n) => *slot = n,
                    Err(_) => tracing::warn!(key, value = %val, "Ignoring non-numeric override"),
                }
            }
        }

        if let Some(val) = lookup("TOWNSQUARE_REQUEST_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(n) => self.limits.request_timeout_secs = n,
                Err(_) => tracing::warn!(value = %val, "Ignoring non-numeric request timeout"),
            }
        }
        if let Some(val) = lookup("TOWNSQUARE_WORD_GUESS_MAX_MISSES") {
            match val.parse::<u8>() {
                Ok(n) => self.games.word_guess_max_misses = n,
                Err(_) => tracing::warn!(value = %val, "Ignoring invalid word guess miss limit"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn default_config_values() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.listen_addr, "0.0.0.0:8080");
        assert_eq!(cfg.limits.max_ws_connections, 200);
        assert_eq!(cfg.limits.max_name_len, 32);
        assert_eq!(cfg.games.word_guess_max_misses, 6);
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn parse_full_toml() {
        let toml_str = r#"
listen_addr = "127.0.0.1:9090"

[limits]
max_ws_connections = 50
notification_buffer = 8
max_sessions = 10
request_timeout_secs = 5
max_name_len = 16

[games]
word_guess_max_misses = 8
"#;
        let cfg: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.listen_addr, "127.0.0.1:9090");
        assert_eq!(cfg.limits.max_ws_connections, 50);
        assert_eq!(cfg.limits.notification_buffer, 8);
        assert_eq!(cfg.limits.max_sessions, 10);
        assert_eq!(cfg.limits.request_timeout_secs, 5);
        assert_eq!(cfg.limits.max_name_len, 16);
        assert_eq!(cfg.games.word_guess_max_misses, 8);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let cfg: ServerConfig = toml::from_str("[limits]\nmax_sessions = 3\n").unwrap();
        assert_eq!(cfg.limits.max_sessions, 3);
        assert_eq!(cfg.limits.max_ws_connections, 200);
        assert_eq!(cfg.listen_addr, "0.0.0.0:8080");
        assert_eq!(cfg.games.word_guess_max_misses, 6);
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut cfg = ServerConfig::default();
        cfg.apply_overrides(env(&[
            ("TOWNSQUARE_LISTEN_ADDR", "127.0.0.1:7000"),
            ("TOWNSQUARE_MAX_SESSIONS", "5"),
            ("TOWNSQUARE_NOTIFICATION_BUFFER", "not-a-number"),
            ("TOWNSQUARE_WORD_GUESS_MAX_MISSES", "9"),
        ]));
        assert_eq!(cfg.listen_addr, "127.0.0.1:7000");
        assert_eq!(cfg.limits.max_sessions, 5);
        assert_eq!(cfg.limits.notification_buffer, 64);
        assert_eq!(cfg.games.word_guess_max_misses, 9);
    }

    #[test]
    fn empty_listen_addr_override_ignored() {
        let mut cfg = ServerConfig::default();
        cfg.apply_overrides(env(&[("TOWNSQUARE_LISTEN_ADDR", "")]));
        assert_eq!(cfg.listen_addr, "0.0.0.0:8080");
    }

    #[test]
    fn validate_rejects_invalid_addr() {
        let cfg = ServerConfig {
            listen_addr: "not-an-address".to_string(),
            ..ServerConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidListenAddr(_))
        ));
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let mut cfg = ServerConfig::default();
        cfg.limits.max_sessions = 0;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ZeroValue("limits.max_sessions"))
        );

        let mut cfg = ServerConfig::default();
        cfg.limits.request_timeout_secs = 0;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ZeroValue("limits.request_timeout_secs"))
        );

        let mut cfg = ServerConfig::default();
        cfg.games.word_guess_max_misses = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_error_display() {
        assert_eq!(
            ConfigError::ZeroValue("limits.max_sessions").to_string(),
            "limits.max_sessions must be > 0"
        );
    }
}
