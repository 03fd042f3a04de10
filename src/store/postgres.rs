use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::{Date, OffsetDateTime};
use tracing::{debug, info};
use uuid::Uuid;

use super::{ChatEntry, ProgressStore, UserProgress};
use crate::{
    domain::Domain,
    error::PersistenceError,
    progress::{self, Progress, Scored},
};

#[derive(Debug, FromRow)]
struct UserProgressRow {
    id: Uuid,
    username: String,
    xp: i64,
    streak: i32,
    last_visit: Option<Date>,
}

impl From<UserProgressRow> for UserProgress {
    fn from(r: UserProgressRow) -> Self {
        Self {
            id: r.id,
            username: r.username,
            progress: Progress {
                xp: r.xp,
                streak: r.streak,
                last_visit: r.last_visit,
            },
        }
    }
}

#[derive(Debug, FromRow)]
struct ChatRow {
    id: Uuid,
    project: String,
    created_at: OffsetDateTime,
}

impl From<ChatRow> for ChatEntry {
    fn from(r: ChatRow) -> Self {
        Self {
            id: r.id,
            project: r.project,
            created_at: r.created_at,
        }
    }
}

/// Postgres-backed gateway.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Lock the user's row for the rest of the transaction.
async fn lock_progress_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<Option<Progress>, PersistenceError> {
    let row = sqlx::query_as::<_, (i64, i32, Option<Date>)>(
        r#"
        SELECT xp, streak, last_visit
          FROM users
         WHERE id = $1
           FOR UPDATE
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row.map(|(xp, streak, last_visit)| Progress {
        xp,
        streak,
        last_visit,
    }))
}

async fn used_domains_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<BTreeSet<Domain>, PersistenceError> {
    let tags = sqlx::query_scalar::<_, String>(
        r#"SELECT domain FROM domains_used WHERE user_id = $1"#,
    )
    .bind(user_id)
    .fetch_all(&mut **tx)
    .await?;

    tags.into_iter()
        .map(|t| t.parse::<Domain>().map_err(PersistenceError::UnknownDomain))
        .collect()
}

async fn insert_domain_usage_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    domain: Domain,
) -> Result<(), PersistenceError> {
    sqlx::query(
        r#"
        INSERT INTO domains_used (user_id, domain)
        VALUES ($1, $2)
        ON CONFLICT (user_id, domain) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(domain.as_str())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn update_progress_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    progress: &Progress,
) -> Result<(), PersistenceError> {
    let res = sqlx::query(
        r#"
        UPDATE users
           SET xp = $2, streak = $3, last_visit = $4
         WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(progress.xp)
    .bind(progress.streak)
    .bind(progress.last_visit)
    .execute(&mut **tx)
    .await?;

    if res.rows_affected() == 0 {
        return Err(PersistenceError::UserNotFound(user_id));
    }
    Ok(())
}

#[async_trait]
impl ProgressStore for PgStore {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<UserProgress>, PersistenceError> {
        let row = sqlx::query_as::<_, UserProgressRow>(
            r#"
            SELECT id, username, xp, streak, last_visit
              FROM users
             WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn set_user(&self, user_id: Uuid, progress: Progress) -> Result<(), PersistenceError> {
        let mut tx = self.db.begin().await?;
        update_progress_tx(&mut tx, user_id, &progress).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn has_domain_usage(
        &self,
        user_id: Uuid,
        domain: Domain,
    ) -> Result<bool, PersistenceError> {
        let used = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM domains_used WHERE user_id = $1 AND domain = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(domain.as_str())
        .fetch_one(&self.db)
        .await?;
        Ok(used)
    }

    async fn record_domain_usage(
        &self,
        user_id: Uuid,
        domain: Domain,
    ) -> Result<(), PersistenceError> {
        let mut tx = self.db.begin().await?;
        insert_domain_usage_tx(&mut tx, user_id, domain).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn score_interaction(
        &self,
        user_id: Uuid,
        domains: &BTreeSet<Domain>,
        today: Date,
    ) -> Result<Scored, PersistenceError> {
        let mut tx = self.db.begin().await?;

        let current = lock_progress_tx(&mut tx, user_id)
            .await?
            .ok_or(PersistenceError::UserNotFound(user_id))?;
        let used = used_domains_tx(&mut tx, user_id).await?;

        let scored = progress::score(&current, domains, |d| !used.contains(&d), today);

        for &domain in &scored.first_uses {
            insert_domain_usage_tx(&mut tx, user_id, domain).await?;
        }
        update_progress_tx(&mut tx, user_id, &scored.progress).await?;
        tx.commit().await?;

        debug!(%user_id, first_uses = ?scored.first_uses, "domain usage recorded");
        info!(
            %user_id,
            xp = scored.progress.xp,
            streak = scored.progress.streak,
            gained = scored.xp_gained,
            "progress updated"
        );
        Ok(scored)
    }

    async fn append_chat(
        &self,
        user_id: Uuid,
        project: &str,
    ) -> Result<ChatEntry, PersistenceError> {
        let row = sqlx::query_as::<_, ChatRow>(
            r#"
            INSERT INTO chats (user_id, project)
            VALUES ($1, $2)
            RETURNING id, project, created_at
            "#,
        )
        .bind(user_id)
        .bind(project)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn list_chats(&self, user_id: Uuid) -> Result<Vec<ChatEntry>, PersistenceError> {
        let rows = sqlx::query_as::<_, ChatRow>(
            r#"
            SELECT id, project, created_at
              FROM chats
             WHERE user_id = $1
             ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
