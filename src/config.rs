use std::{
    env, fs, io,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{credential::CredentialPolicy, feed::DEFAULT_FEED_LIMIT};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Where catches, posts and users live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageConfig {
    /// Process-local, resets on restart.
    #[default]
    Memory,
    Sqlite {
        url: String,
    },
}

/// Runtime configuration.
///
/// Loaded from defaults, then a RON file, then the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind: SocketAddr,
    pub storage: StorageConfig,
    /// Rows shown per division; `None` shows every catch.
    pub leaderboard_limit: Option<usize>,
    pub feed_limit: usize,
    /// Idle lifetime of a login, in humantime notation (`12h`, `30m`).
    pub session_ttl: String,
    pub credential_policy: CredentialPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3030)),
            storage: StorageConfig::Memory,
            leaderboard_limit: None,
            feed_limit: DEFAULT_FEED_LIMIT,
            session_ttl: "12h".to_string(),
            credential_policy: CredentialPolicy::Argon2,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::file_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) => {
                debug!("No config file at {}, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|name| env::var(name).ok())?;
        config.session_ttl()?;

        Ok(config)
    }

    /// `$TOURNAMENT_CONFIG`, else `config.ron` in the platform config dir.
    pub fn file_path() -> Option<PathBuf> {
        env::var_os("TOURNAMENT_CONFIG")
            .map(PathBuf::from)
            .or_else(|| {
                ProjectDirs::from("com", "Everyday Angler", "Tournament")
                    .map(|dirs| dirs.config_dir().join("config.ron"))
            })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading config from {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        ron::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies environment-style overrides looked up through `var`.
    pub fn apply_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = var("DATABASE_URL") {
            self.storage = StorageConfig::Sqlite { url };
        }

        if let Some(bind) = var("BIND_ADDRESS") {
            self.bind = bind.parse().map_err(|err| ConfigError::Invalid {
                name: "BIND_ADDRESS",
                reason: format!("{err}"),
            })?;
        }

        if let Some(limit) = var("LEADERBOARD_LIMIT") {
            self.leaderboard_limit = match limit.trim() {
                "" | "none" => None,
                limit => Some(parse_count("LEADERBOARD_LIMIT", limit)?),
            };
        }

        if let Some(limit) = var("FEED_LIMIT") {
            self.feed_limit = parse_count("FEED_LIMIT", &limit)?;
        }

        if let Some(ttl) = var("SESSION_TTL") {
            self.session_ttl = ttl;
        }

        if let Some(policy) = var("CREDENTIAL_POLICY") {
            self.credential_policy = policy.parse().map_err(|_| ConfigError::Invalid {
                name: "CREDENTIAL_POLICY",
                reason: format!("`{policy}` is neither `argon2` nor `plaintext`"),
            })?;
        }

        Ok(())
    }

    pub fn session_ttl(&self) -> Result<Duration, ConfigError> {
        humantime::parse_duration(&self.session_ttl).map_err(|err| ConfigError::Invalid {
            name: "session_ttl",
            reason: format!("{err}"),
        })
    }
}

fn parse_count(name: &'static str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse().map_err(|err| ConfigError::Invalid {
        name,
        reason: format!("{err}"),
    })
}
