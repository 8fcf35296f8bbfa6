use std::time::Duration;

use tracing::warn;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bound on establishing a database connection. Queries are not bounded.
    pub connect_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Reads `PORT`; everything else keeps its default.
    pub fn from_env() -> Self {
        Self::default().with_port_var(std::env::var("PORT").ok().as_deref())
    }

    fn with_port_var(mut self, port: Option<&str>) -> Self {
        if let Some(raw) = port {
            match raw.trim().parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => warn!("Ignoring invalid PORT value {:?}, using {}", raw, self.port),
            }
        }
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn set_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_listen_on_3001() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:3001");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn port_var_overrides_default() {
        let config = ServerConfig::default().with_port_var(Some("8080"));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn invalid_port_var_keeps_default() {
        let config = ServerConfig::default().with_port_var(Some("http"));
        assert_eq!(config.port, DEFAULT_PORT);

        let config = ServerConfig::default().with_port_var(None);
        assert_eq!(config.port, DEFAULT_PORT);
    }
}
