use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Serialize;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
    domain::Domain,
    error::PersistenceError,
    progress::{Progress, Scored},
};

#[cfg(test)]
pub mod memory;
mod postgres;

pub use postgres::PgStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProgress {
    pub id: Uuid,
    pub username: String,
    #[serde(flatten)]
    pub progress: Progress,
}

/// One submitted project idea in a user's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatEntry {
    pub id: Uuid,
    pub project: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Storage for users' progress, domain usage and project history.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// `Ok(None)` when no such user exists.
    async fn get_user(&self, user_id: Uuid) -> Result<Option<UserProgress>, PersistenceError>;

    /// Overwrite xp, streak and last visit outside of a scored interaction.
    // Request handlers only score through `score_interaction`.
    #[allow(dead_code)]
    async fn set_user(&self, user_id: Uuid, progress: Progress) -> Result<(), PersistenceError>;

    async fn has_domain_usage(
        &self,
        user_id: Uuid,
        domain: Domain,
    ) -> Result<bool, PersistenceError>;

    /// Idempotent: recording an already recorded domain is a no-op.
    // Request handlers record first uses inside `score_interaction`.
    #[allow(dead_code)]
    async fn record_domain_usage(
        &self,
        user_id: Uuid,
        domain: Domain,
    ) -> Result<(), PersistenceError>;

    /// Score one interaction and commit its effects atomically: the newly
    /// credited domains and the updated xp, streak and last visit. Concurrent
    /// calls for the same user are serialized.
    async fn score_interaction(
        &self,
        user_id: Uuid,
        domains: &BTreeSet<Domain>,
        today: Date,
    ) -> Result<Scored, PersistenceError>;

    async fn append_chat(
        &self,
        user_id: Uuid,
        project: &str,
    ) -> Result<ChatEntry, PersistenceError>;

    /// Newest first.
    async fn list_chats(&self, user_id: Uuid) -> Result<Vec<ChatEntry>, PersistenceError>;
}
