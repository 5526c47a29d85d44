use std::net::SocketAddr;

const DEFAULT_LOG_FILTER: &str = "info";

/// Host settings for the coordination server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// `env_logger` filter directive, e.g. `info` or `session_coordinator=trace`.
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: default_bind_addr(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ServerConfig {
    /// Reads settings from the environment, keeping defaults for anything
    /// missing or unparseable.
    ///
    /// # Environment Variables
    /// - `COORDINATOR_BIND_ADDR`: listen address (default: `127.0.0.1:8080`)
    /// - `COORDINATOR_LOG`: log filter (default: `info`)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let bind_addr = lookup("COORDINATOR_BIND_ADDR")
            .and_then(|v| v.parse::<SocketAddr>().ok())
            .unwrap_or_else(default_bind_addr);

        let log_filter = lookup("COORDINATOR_LOG")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        ServerConfig {
            bind_addr,
            log_filter,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}
