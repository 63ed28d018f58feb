use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use log::debug;
use rand::Rng;
use tokio::sync::Mutex;

#[derive(Debug)]
struct Session {
    username: String,
    expires_at: Instant,
}

/// Login sessions keyed by an unguessable token.
///
/// Sessions live in memory only; a restart logs everybody out.
#[derive(Debug)]
pub struct Sessions {
    ttl: Duration,
    table: Mutex<HashMap<String, Session>>,
}

impl Sessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            table: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Starts a session for `username` and returns its token.
    pub async fn open(&self, username: &str) -> String {
        let token = new_token();
        let now = Instant::now();
        let mut table = self.table.lock().await;
        table.retain(|_, session| session.expires_at > now);
        table.insert(
            token.clone(),
            Session {
                username: username.to_string(),
                expires_at: now + self.ttl,
            },
        );
        token
    }

    /// The user a live session belongs to. Expired sessions are dropped.
    pub async fn resolve(&self, token: &str) -> Option<String> {
        let mut table = self.table.lock().await;
        match table.get(token) {
            Some(session) if session.expires_at > Instant::now() => Some(session.username.clone()),
            Some(_) => {
                debug!("Session expired");
                table.remove(token);
                None
            }
            None => None,
        }
    }

    /// Ends a session. Returns whether it existed.
    pub async fn close(&self, token: &str) -> bool {
        self.table.lock().await.remove(token).is_some()
    }
}

fn new_token() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}
