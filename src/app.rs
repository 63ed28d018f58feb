use std::sync::Arc;

use log::info;

use crate::{
    catches::CatchLog,
    config::{Config, StorageConfig},
    feed::Feed,
    identity::Gateway,
    models::LeaderboardEntry,
    session::Sessions,
    store::{CatchStore, MemoryStore, PostStore, SqliteStore, UserStore},
    Error,
};

/// Process-wide tournament state.
///
/// Built once at startup; the backing store is picked by [`Config::storage`].
pub struct App {
    pub config: Config,
    pub identity: Gateway,
    pub catches: CatchLog,
    pub feed: Feed,
}

impl App {
    pub async fn init(config: Config) -> Result<Self, Error> {
        match &config.storage {
            StorageConfig::Memory => {
                info!("Using in-memory storage, data resets on restart");
                Self::with_store(config, Arc::new(MemoryStore::new()))
            }
            StorageConfig::Sqlite { url } => {
                info!("Using SQLite storage");
                let store = Arc::new(SqliteStore::connect(url).await?);
                Self::with_store(config, store)
            }
        }
    }

    pub fn with_store<S>(config: Config, store: Arc<S>) -> Result<Self, Error>
    where
        S: UserStore + CatchStore + PostStore + 'static,
    {
        let sessions = Sessions::new(config.session_ttl()?);

        Ok(Self {
            identity: Gateway::new(store.clone(), sessions, config.credential_policy),
            catches: CatchLog::new(store.clone()),
            feed: Feed::new(store),
            config,
        })
    }

    /// Standings of a division, capped at the configured limit.
    pub async fn leaderboard(&self, division: &str) -> Result<Vec<LeaderboardEntry>, Error> {
        self.catches
            .leaderboard(division, self.config.leaderboard_limit)
            .await
    }
}
