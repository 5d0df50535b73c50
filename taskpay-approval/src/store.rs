//! SQLite persistence for approval requests.
//!
//! The store owns one table, `approval_requests`. Rows are inserted once
//! and only ever move forward: the single conditional UPDATE in
//! [`ApprovalStore::claim`] is the serialization point that makes token
//! redemption exactly-once under concurrent clicks.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use taskpay::UnixTimestamp;

use crate::request::{ApprovalRequest, ApprovalStatus};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS approval_requests (
    id               TEXT PRIMARY KEY,
    task_id          TEXT NOT NULL,
    user_id          TEXT NOT NULL,
    token            TEXT NOT NULL UNIQUE,
    status           TEXT NOT NULL,
    amount           TEXT NOT NULL,
    task_description TEXT NOT NULL,
    created_at       INTEGER NOT NULL,
    expires_at       INTEGER NOT NULL,
    approved_at      INTEGER,
    denied_at        INTEGER
);
CREATE INDEX IF NOT EXISTS idx_approval_requests_task
    ON approval_requests (task_id, created_at);
";

/// Handle to the approval request table.
#[derive(Debug, Clone)]
pub struct ApprovalStore {
    pool: SqlitePool,
}

impl ApprovalStore {
    /// Connects to the given `sqlx` SQLite URL and ensures the schema
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns any connection or migration failure.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new().connect(url).await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// An isolated in-memory store, for tests and local development.
    ///
    /// # Errors
    ///
    /// Returns any connection or migration failure.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Inserts a new request row.
    ///
    /// # Errors
    ///
    /// Fails on id or token collision (both are unique) or store errors.
    pub async fn insert(&self, request: &ApprovalRequest) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO approval_requests
                (id, task_id, user_id, token, status, amount, task_description,
                 created_at, expires_at, approved_at, denied_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, NULL)",
        )
        .bind(&request.id)
        .bind(&request.task_id)
        .bind(&request.user_id)
        .bind(&request.token)
        .bind(request.status.as_str())
        .bind(request.amount.to_string())
        .bind(&request.task_description)
        .bind(request.created_at.as_i64())
        .bind(request.expires_at.as_i64())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Looks a request up by its public id.
    ///
    /// # Errors
    ///
    /// Returns store errors; an unknown id is `Ok(None)`.
    pub async fn by_id(&self, id: &str) -> Result<Option<ApprovalRequest>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM approval_requests WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode_row(&r)).transpose()
    }

    /// Looks a request up by its secret token.
    ///
    /// # Errors
    ///
    /// Returns store errors; an unknown token is `Ok(None)`.
    pub async fn by_token(&self, token: &str) -> Result<Option<ApprovalRequest>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM approval_requests WHERE token = ?1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode_row(&r)).transpose()
    }

    /// The most recently created request for a task, if any.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub async fn latest_for_task(
        &self,
        task_id: &str,
    ) -> Result<Option<ApprovalRequest>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT * FROM approval_requests WHERE task_id = ?1
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| decode_row(&r)).transpose()
    }

    /// Atomically claims a pending, unexpired request by token, moving it
    /// to `approved` or `denied` and stamping the matching timestamp.
    ///
    /// Returns `true` iff this call performed the transition. The
    /// status/expiry conditions live inside the UPDATE itself, so two
    /// concurrent redemptions of one token can never both observe
    /// `pending` — at most one row version matches.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub async fn claim(
        &self,
        token: &str,
        status: ApprovalStatus,
        now: UnixTimestamp,
    ) -> Result<bool, sqlx::Error> {
        debug_assert!(matches!(
            status,
            ApprovalStatus::Approved | ApprovalStatus::Denied
        ));
        let result = sqlx::query(
            "UPDATE approval_requests
             SET status = ?1,
                 approved_at = CASE WHEN ?1 = 'approved' THEN ?2 ELSE approved_at END,
                 denied_at   = CASE WHEN ?1 = 'denied'   THEN ?2 ELSE denied_at   END
             WHERE token = ?3 AND status = 'pending' AND expires_at >= ?2",
        )
        .bind(status.as_str())
        .bind(now.as_i64())
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Marks a still-pending request expired, by token. A request that
    /// already left `pending` is untouched.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub async fn expire_by_token(&self, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE approval_requests SET status = 'expired'
             WHERE token = ?1 AND status = 'pending'",
        )
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Marks a still-pending request expired, by id.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub async fn expire_by_id(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE approval_requests SET status = 'expired'
             WHERE id = ?1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

fn decode_row(row: &SqliteRow) -> Result<ApprovalRequest, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<ApprovalStatus>()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: "status".to_owned(),
            source: Box::new(e),
        })?;
    let amount: String = row.try_get("amount")?;
    let amount = amount
        .parse()
        .map_err(|e: rust_decimal::Error| sqlx::Error::ColumnDecode {
            index: "amount".to_owned(),
            source: Box::new(e),
        })?;
    let created_at: i64 = row.try_get("created_at")?;
    let expires_at: i64 = row.try_get("expires_at")?;
    let approved_at: Option<i64> = row.try_get("approved_at")?;
    let denied_at: Option<i64> = row.try_get("denied_at")?;

    Ok(ApprovalRequest {
        id: row.try_get("id")?,
        task_id: row.try_get("task_id")?,
        user_id: row.try_get("user_id")?,
        token: row.try_get("token")?,
        status,
        amount,
        task_description: row.try_get("task_description")?,
        created_at: UnixTimestamp::from_i64(created_at),
        expires_at: UnixTimestamp::from_i64(expires_at),
        approved_at: approved_at.map(UnixTimestamp::from_i64),
        denied_at: denied_at.map(UnixTimestamp::from_i64),
    })
}
