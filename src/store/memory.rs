use std::collections::{btree_map::Entry, BTreeMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CatchStore, PostStore, UserStore};
use crate::{
    models::{CatchRecord, Division, NewCatch, NewPost, Post, Role, User},
    Error,
};

/// Process-local state, lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Mutex<BTreeMap<String, User>>,
    catches: Mutex<Vec<CatchRecord>>,
    posts: Mutex<Vec<Post>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// Ids are 1-based positions; nothing is ever removed.
fn next_id<T>(items: &[T]) -> i64 {
    items.len() as i64 + 1
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<bool, Error> {
        match self.users.lock().await.entry(user.username.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(true)
            }
        }
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>, Error> {
        Ok(self.users.lock().await.get(username).cloned())
    }

    async fn set_role(&self, username: &str, role: Role) -> Result<Option<User>, Error> {
        Ok(self.users.lock().await.get_mut(username).map(|user| {
            user.role = role;
            user.clone()
        }))
    }

    async fn list_users(&self) -> Result<Vec<User>, Error> {
        Ok(self.users.lock().await.values().cloned().collect())
    }
}

#[async_trait]
impl CatchStore for MemoryStore {
    async fn append_catch(&self, catch: NewCatch) -> Result<CatchRecord, Error> {
        let mut catches = self.catches.lock().await;
        let record = catch.into_record(next_id(&catches));
        catches.push(record.clone());
        Ok(record)
    }

    async fn catches_in_division(&self, division: Division) -> Result<Vec<CatchRecord>, Error> {
        Ok(self
            .catches
            .lock()
            .await
            .iter()
            .filter(|record| record.division == division)
            .cloned()
            .collect())
    }

    async fn count_catches(&self) -> Result<u64, Error> {
        Ok(self.catches.lock().await.len() as u64)
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn append_post(&self, post: NewPost) -> Result<Post, Error> {
        let mut posts = self.posts.lock().await;
        let post = post.into_post(next_id(&posts));
        posts.push(post.clone());
        Ok(post)
    }

    async fn recent_posts(&self, limit: usize) -> Result<Vec<Post>, Error> {
        Ok(self
            .posts
            .lock()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn increment_likes(&self, id: i64) -> Result<Option<Post>, Error> {
        Ok(self
            .posts
            .lock()
            .await
            .iter_mut()
            .find(|post| post.id == id)
            .map(|post| {
                post.like_count += 1;
                post.clone()
            }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::contract;

    #[tokio::test]
    async fn users_are_unique() {
        contract::users_are_unique(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn roles_can_change() {
        contract::roles_can_change(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn catches_keep_insertion_order() {
        contract::catches_keep_insertion_order(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn posts_newest_first() {
        contract::posts_newest_first(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn likes_increment() {
        contract::likes_increment(&MemoryStore::new()).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registration_admits_one() {
        let store = Arc::new(MemoryStore::new());

        let attempts: Vec<_> = (0..16)
            .map(|n| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .insert_user(&contract::user("sam", &format!("pw{n}")))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut inserted = 0;
        for attempt in attempts {
            if attempt.await.unwrap() {
                inserted += 1;
            }
        }

        assert_eq!(inserted, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_get_distinct_ids() {
        let store = Arc::new(MemoryStore::new());

        let appends: Vec<_> = (0..32)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .append_catch(contract::catch("al", Division::Reef, "Snapper", 3.0))
                        .await
                        .unwrap()
                        .id
                })
            })
            .collect();

        let mut ids = Vec::new();
        for append in appends {
            ids.push(append.await.unwrap());
        }
        ids.sort_unstable();

        assert_eq!(ids, (1..=32).collect::<Vec<_>>());
    }
}
