use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::db::mysql::MySqlDriver;
use crate::db::postgres::PostgresDriver;
use crate::db::DatabaseDriver;
use crate::models::DatabaseType;

/// Dialect drivers by database type. Drivers hold no connections; each
/// request opens and closes its own.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: HashMap<DatabaseType, Arc<dyn DatabaseDriver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_drivers() -> Self {
        Self::new()
            .register(Arc::new(MySqlDriver::new()))
            .register(Arc::new(PostgresDriver::new()))
    }

    pub fn register(mut self, driver: Arc<dyn DatabaseDriver>) -> Self {
        self.drivers.insert(driver.database_type(), driver);
        self
    }

    pub fn get(&self, database_type: DatabaseType) -> Option<Arc<dyn DatabaseDriver>> {
        self.drivers.get(&database_type).cloned()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub registry: DriverRegistry,
    pub connect_timeout: Duration,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_registry(DriverRegistry::with_default_drivers(), config)
    }

    pub fn with_registry(registry: DriverRegistry, config: &ServerConfig) -> Self {
        Self {
            registry,
            connect_timeout: config.connect_timeout,
        }
    }
}
