//! Backing stores.
//!
//! Each trait is one mutation point. Backends serialize writes themselves, so
//! callers never hold a lock across calls.

mod memory;
mod sqlite;

use async_trait::async_trait;

pub use self::{memory::MemoryStore, sqlite::SqliteStore};
use crate::{
    models::{CatchRecord, Division, NewCatch, NewPost, Post, Role, User},
    Error,
};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts `user` unless the username is taken. Returns whether it was
    /// inserted; an existing user is left untouched.
    async fn insert_user(&self, user: &User) -> Result<bool, Error>;

    async fn find_user(&self, username: &str) -> Result<Option<User>, Error>;

    /// Returns the updated user, or `None` if nobody has that name.
    async fn set_role(&self, username: &str, role: Role) -> Result<Option<User>, Error>;

    /// All users ordered by username.
    async fn list_users(&self) -> Result<Vec<User>, Error>;
}

#[async_trait]
pub trait CatchStore: Send + Sync {
    async fn append_catch(&self, catch: NewCatch) -> Result<CatchRecord, Error>;

    /// Catches of one division in insertion order.
    async fn catches_in_division(&self, division: Division) -> Result<Vec<CatchRecord>, Error>;

    async fn count_catches(&self) -> Result<u64, Error>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn append_post(&self, post: NewPost) -> Result<Post, Error>;

    /// Up to `limit` posts, newest first.
    async fn recent_posts(&self, limit: usize) -> Result<Vec<Post>, Error>;

    /// Adds one like. Returns the updated post, or `None` for an unknown id.
    async fn increment_likes(&self, id: i64) -> Result<Option<Post>, Error>;
}
