use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};

use super::{CatchStore, PostStore, UserStore};
use crate::{
    models::{CatchRecord, Division, NewCatch, NewPost, Post, Role, User},
    Error,
};

/// Durable store backed by a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `url` and runs the
    /// embedded migrations.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        debug!("Opening database connection");
        let options = SqliteConnectOptions::from_str(url)?
            .journal_mode(SqliteJournalMode::Wal)
            .create_if_missing(true);

        // Every connection to `sqlite::memory:` is its own database, so keep
        // exactly one alive for the life of the pool.
        let pool_options = if url.contains(":memory:") || url.contains("mode=memory") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        };
        let pool = pool_options.connect_with(options).await?;

        info!("Running migrations");
        sqlx::migrate!().run(&pool).await?;

        Ok(Self { pool })
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    username: String,
    password: String,
    role: String,
}

impl TryFrom<UserRow> for User {
    type Error = Error;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            username: row.username,
            password: row.password,
            role: row.role.parse()?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CatchRow {
    id: i64,
    username: String,
    division: String,
    species: String,
    weight: f64,
    evidence_ref: Option<String>,
    submitted_at: DateTime<Utc>,
}

impl TryFrom<CatchRow> for CatchRecord {
    type Error = Error;

    fn try_from(row: CatchRow) -> Result<Self, Self::Error> {
        Ok(CatchRecord {
            id: row.id,
            username: row.username,
            division: row.division.parse()?,
            species: row.species,
            weight: row.weight,
            evidence_ref: row.evidence_ref,
            submitted_at: row.submitted_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    username: String,
    content: String,
    media_ref: Option<String>,
    like_count: i64,
    submitted_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            username: row.username,
            content: row.content,
            media_ref: row.media_ref,
            like_count: row.like_count,
            submitted_at: row.submitted_at,
        }
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn insert_user(&self, user: &User) -> Result<bool, Error> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO users (username, password, role) VALUES (?, ?, ?)")
                .bind(&user.username)
                .bind(&user.password)
                .bind(user.role.as_str())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, UserRow>(
            "SELECT username, password, role FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn set_role(&self, username: &str, role: Role) -> Result<Option<User>, Error> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE username = ?")
            .bind(role.as_str())
            .bind(username)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_user(username).await
    }

    async fn list_users(&self) -> Result<Vec<User>, Error> {
        sqlx::query_as::<_, UserRow>("SELECT username, password, role FROM users ORDER BY username")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }
}

#[async_trait]
impl CatchStore for SqliteStore {
    async fn append_catch(&self, catch: NewCatch) -> Result<CatchRecord, Error> {
        let id = sqlx::query(
            "INSERT INTO catches (username, division, species, weight, evidence_ref, submitted_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&catch.username)
        .bind(catch.division.as_str())
        .bind(&catch.species)
        .bind(catch.weight)
        .bind(&catch.evidence_ref)
        .bind(catch.submitted_at)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(catch.into_record(id))
    }

    async fn catches_in_division(&self, division: Division) -> Result<Vec<CatchRecord>, Error> {
        sqlx::query_as::<_, CatchRow>(
            "SELECT id, username, division, species, weight, evidence_ref, submitted_at
             FROM catches WHERE division = ? ORDER BY id",
        )
        .bind(division.as_str())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(CatchRecord::try_from)
        .collect()
    }

    async fn count_catches(&self) -> Result<u64, Error> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM catches")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }
}

#[async_trait]
impl PostStore for SqliteStore {
    async fn append_post(&self, post: NewPost) -> Result<Post, Error> {
        let id = sqlx::query(
            "INSERT INTO posts (username, content, media_ref, like_count, submitted_at)
             VALUES (?, ?, ?, 0, ?)",
        )
        .bind(&post.username)
        .bind(&post.content)
        .bind(&post.media_ref)
        .bind(post.submitted_at)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(post.into_post(id))
    }

    async fn recent_posts(&self, limit: usize) -> Result<Vec<Post>, Error> {
        let rows = sqlx::query_as::<_, PostRow>(
            "SELECT id, username, content, media_ref, like_count, submitted_at
             FROM posts ORDER BY id DESC LIMIT ?",
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn increment_likes(&self, id: i64) -> Result<Option<Post>, Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE posts SET like_count = like_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&mut tx)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let row = sqlx::query_as::<_, PostRow>(
            "SELECT id, username, content, media_ref, like_count, submitted_at
             FROM posts WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&mut tx)
        .await?;

        tx.commit().await?;

        Ok(Some(row.into()))
    }
}
