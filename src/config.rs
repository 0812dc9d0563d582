use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Client registration for one OAuth provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OauthClientConfig {
    pub client_id: String,
    pub secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub environment: String,
    pub host: String,
    pub port: u16,
    /// Added to `port` when binding so several instances can share one host.
    pub instance_id: u16,
    pub database_url: String,
    pub loglevel: String,
    pub store_timeout_secs: u64,
    pub discord: OauthClientConfig,
    pub github: OauthClientConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "production".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3002,
            instance_id: 0,
            database_url: "sqlite:appkeeper.sqlite".to_string(),
            loglevel: "info".to_string(),
            store_timeout_secs: 5,
            discord: OauthClientConfig::default(),
            github: OauthClientConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration: defaults, then the TOML file, then environment variables.
    ///
    /// A missing file is created from the defaults so operators get a template.
    pub fn load(path: &Path) -> Result<Self, Box<figment::Error>> {
        if !path.exists()
            && let Err(e) = Self::default().write_file(path)
        {
            tracing::warn!(path = %path.display(), error = %e, "failed to write default config file");
        }
        Self::figment(path).extract().map_err(Box::new)
    }

    /// Path of the configuration file, overridable through `APPKEEPER_CONFIG`.
    pub fn path_from_env() -> PathBuf {
        std::env::var_os("APPKEEPER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::raw().only(&[
                "environment",
                "host",
                "port",
                "instance_id",
                "database_url",
                "loglevel",
            ]))
            .merge(Env::prefixed("APPKEEPER_").split("__"))
    }

    pub fn write_file(&self, path: &Path) -> std::io::Result<()> {
        let contents = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, contents)
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port.saturating_add(self.instance_id))
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}
