use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};

use crate::{
    models::{blob_ref, NewPost, Post},
    store::PostStore,
    Error,
};

pub const DEFAULT_FEED_LIMIT: usize = 20;

/// The social feed.
///
/// Likes are plain counters; the same user may like a post any number of
/// times.
pub struct Feed {
    store: Arc<dyn PostStore>,
}

impl Feed {
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self { store }
    }

    pub async fn post(
        &self,
        username: &str,
        content: &str,
        media_ref: Option<String>,
    ) -> Result<Post, Error> {
        let post = self
            .store
            .append_post(NewPost {
                username: username.to_string(),
                content: content.to_string(),
                media_ref: blob_ref(media_ref),
                submitted_at: Utc::now(),
            })
            .await?;

        info!("{} posted #{}", post.username, post.id);
        Ok(post)
    }

    /// The newest `limit` posts, newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<Post>, Error> {
        self.store.recent_posts(limit).await
    }

    pub async fn like(&self, post_id: i64) -> Result<Post, Error> {
        let post = self
            .store
            .increment_likes(post_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Post #{post_id}")))?;

        debug!("Post #{} has {} likes", post.id, post.like_count);
        Ok(post)
    }
}
