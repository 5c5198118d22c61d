//! Startup configuration, read once from a YAML file.

use std::path::Path;

use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;

use crate::error::Error;
use crate::source::DataSourceDescriptor;

fn default_listen() -> String {
    String::from("127.0.0.1:8080")
}

/// Connection parameters for the backing PostGIS database.
#[derive(Clone, Deserialize, Debug)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }

    /// Password-free connection target, for logs and error bodies.
    pub fn target(&self) -> String {
        format!(
            "postgres://{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    pub database: DatabaseConfig,
    pub sources: Vec<DataSourceDescriptor>,
}

impl ServerConfig {
    pub fn from_yaml(data: &str) -> Result<ServerConfig, Error> {
        Ok(serde_yaml::from_str(data)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<ServerConfig, Error> {
        let data = std::fs::read_to_string(path)?;
        ServerConfig::from_yaml(&data)
    }
}
