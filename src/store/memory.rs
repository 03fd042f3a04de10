//! In-process gateway used by tests.

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard,
    },
};

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::{ChatEntry, ProgressStore, UserProgress};
use crate::{
    domain::Domain,
    error::PersistenceError,
    progress::{self, Progress, Scored},
};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, UserProgress>,
    domains: HashSet<(Uuid, Domain)>,
    chats: Vec<(Uuid, ChatEntry)>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn with_user(username: &str) -> (Self, Uuid) {
        let store = Self::default();
        let id = store.add_user(username);
        (store, id)
    }

    pub fn add_user(&self, username: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().users.insert(
            id,
            UserProgress {
                id,
                username: username.to_string(),
                progress: Progress::default(),
            },
        );
        id
    }

    /// Make every following write fail as if the database were down.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_writable(&self) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<UserProgress>, PersistenceError> {
        Ok(self.lock().users.get(&user_id).cloned())
    }

    async fn set_user(&self, user_id: Uuid, progress: Progress) -> Result<(), PersistenceError> {
        self.check_writable()?;
        let mut inner = self.lock();
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or(PersistenceError::UserNotFound(user_id))?;
        user.progress = progress;
        Ok(())
    }

    async fn has_domain_usage(
        &self,
        user_id: Uuid,
        domain: Domain,
    ) -> Result<bool, PersistenceError> {
        Ok(self.lock().domains.contains(&(user_id, domain)))
    }

    async fn record_domain_usage(
        &self,
        user_id: Uuid,
        domain: Domain,
    ) -> Result<(), PersistenceError> {
        self.check_writable()?;
        self.lock().domains.insert((user_id, domain));
        Ok(())
    }

    async fn score_interaction(
        &self,
        user_id: Uuid,
        domains: &BTreeSet<Domain>,
        today: Date,
    ) -> Result<Scored, PersistenceError> {
        let mut inner = self.lock();
        let current = inner
            .users
            .get(&user_id)
            .map(|u| u.progress)
            .ok_or(PersistenceError::UserNotFound(user_id))?;

        let scored = progress::score(
            &current,
            domains,
            |d| !inner.domains.contains(&(user_id, d)),
            today,
        );

        // nothing is applied unless the whole write can go through
        self.check_writable()?;
        for &domain in &scored.first_uses {
            inner.domains.insert((user_id, domain));
        }
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.progress = scored.progress;
        }
        Ok(scored)
    }

    async fn append_chat(
        &self,
        user_id: Uuid,
        project: &str,
    ) -> Result<ChatEntry, PersistenceError> {
        self.check_writable()?;
        let entry = ChatEntry {
            id: Uuid::new_v4(),
            project: project.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.lock().chats.push((user_id, entry.clone()));
        Ok(entry)
    }

    async fn list_chats(&self, user_id: Uuid) -> Result<Vec<ChatEntry>, PersistenceError> {
        Ok(self
            .lock()
            .chats
            .iter()
            .rev()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, entry)| entry.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[tokio::test]
    async fn missing_user_is_none_not_error() {
        let store = MemoryStore::default();
        assert!(store.get_user(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn scoring_unknown_user_is_not_found() {
        let store = MemoryStore::default();
        let err = store
            .score_interaction(Uuid::new_v4(), &BTreeSet::new(), date!(2024 - 03 - 10))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn two_scorings_accumulate_xp() {
        let (store, user) = MemoryStore::with_user("ada");
        let domains = BTreeSet::from([Domain::Cloud, Domain::Display, Domain::Actuator]);

        let first = store.score_interaction(user, &domains, date!(2024 - 03 - 10)).await.unwrap();
        let second = store.score_interaction(user, &domains, date!(2024 - 03 - 11)).await.unwrap();

        assert_eq!(first.xp_gained, 160);
        assert_eq!(second.xp_gained, 85);
        let saved = store.get_user(user).await.unwrap().unwrap();
        assert_eq!(saved.progress.xp, 160 + 85);
        assert_eq!(saved.progress.streak, 2);
        assert_eq!(saved.progress.last_visit, Some(date!(2024 - 03 - 11)));
    }

    #[tokio::test]
    async fn recording_twice_does_not_regrant_first_use() {
        let (store, user) = MemoryStore::with_user("ada");
        store.record_domain_usage(user, Domain::Sensor).await.unwrap();
        store.record_domain_usage(user, Domain::Sensor).await.unwrap();
        assert!(store.has_domain_usage(user, Domain::Sensor).await.unwrap());

        let scored = store
            .score_interaction(user, &BTreeSet::from([Domain::Sensor]), date!(2024 - 03 - 10))
            .await
            .unwrap();
        assert_eq!(scored.xp_gained, 5);
        assert!(scored.first_uses.is_empty());
    }

    #[tokio::test]
    async fn failed_write_leaves_state_untouched() {
        let (store, user) = MemoryStore::with_user("ada");
        store.fail_writes(true);
        let res = store
            .score_interaction(user, &BTreeSet::from([Domain::Cloud]), date!(2024 - 03 - 10))
            .await;
        assert!(matches!(res, Err(PersistenceError::Database(_))));

        store.fail_writes(false);
        assert!(!store.has_domain_usage(user, Domain::Cloud).await.unwrap());
        let saved = store.get_user(user).await.unwrap().unwrap();
        assert_eq!(saved.progress, Progress::default());
    }

    #[tokio::test]
    async fn chats_are_listed_newest_first_per_user() {
        let (store, ada) = MemoryStore::with_user("ada");
        let bob = store.add_user("bob");
        store.append_chat(ada, "smart fan").await.unwrap();
        store.append_chat(bob, "plant monitor").await.unwrap();
        store.append_chat(ada, "door alarm").await.unwrap();

        let projects: Vec<String> = store
            .list_chats(ada)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.project)
            .collect();
        assert_eq!(projects, vec!["door alarm", "smart fan"]);
    }

    #[tokio::test]
    async fn set_user_overwrites_progress() {
        let (store, user) = MemoryStore::with_user("ada");
        let progress = Progress { xp: 12, streak: 3, last_visit: Some(date!(2024 - 01 - 02)) };
        store.set_user(user, progress).await.unwrap();
        assert_eq!(store.get_user(user).await.unwrap().unwrap().progress, progress);
        assert!(matches!(
            store.set_user(Uuid::new_v4(), progress).await,
            Err(PersistenceError::UserNotFound(_))
        ));
    }
}
