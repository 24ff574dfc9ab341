//! # User Repository
//!
//! Account storage and login bookkeeping.
//!
//! `login_count` lives on the `users` row and every successful login also
//! writes a `login_events` row; both happen in one transaction so the
//! count always equals the history length.

use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult, StoreResult};
use hms_core::{CoreError, Role, UserAccount, UserType};

const USER_COLUMNS: &str = "id, username, password_hash, role, user_type, department, \
     is_active, login_count, last_login, created_at";

#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    password_hash: String,
    role: Role,
    user_type: UserType,
    department: String,
    is_active: bool,
    login_count: i64,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_account(self, login_history: Vec<DateTime<Utc>>) -> UserAccount {
        UserAccount {
            id: self.id,
            username: self.username,
            password_hash: self.password_hash,
            role: self.role,
            user_type: self.user_type,
            department: self.department,
            is_active: self.is_active,
            login_count: self.login_count,
            last_login: self.last_login,
            login_history,
            created_at: self.created_at,
        }
    }
}

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Finds an account by exact username, with its login history.
    pub async fn find(&self, username: &str) -> DbResult<Option<UserAccount>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let history = self.history(&row.id).await?;
                Ok(Some(row.into_account(history)))
            }
            None => Ok(None),
        }
    }

    /// Lists every account in creation order.
    pub async fn list(&self) -> DbResult<Vec<UserAccount>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, rowid"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut accounts = Vec::with_capacity(rows.len());
        for row in rows {
            let history = self.history(&row.id).await?;
            accounts.push(row.into_account(history));
        }
        Ok(accounts)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn history(&self, user_id: &str) -> DbResult<Vec<DateTime<Utc>>> {
        load_history(&self.pool, user_id).await
    }

    /// Inserts or replaces an account by username.
    ///
    /// Replacing keeps the row id but clears the login counter and history,
    /// which is what an account reset means.
    pub async fn upsert(&self, account: &UserAccount) -> DbResult<()> {
        debug!(username = %account.username, "Upserting user");

        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        sqlx::query(
            "DELETE FROM login_events WHERE user_id = (SELECT id FROM users WHERE username = ?1)",
        )
        .bind(&account.username)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, password_hash, role, user_type, department,
                is_active, login_count, last_login, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, NULL, ?8)
            ON CONFLICT (username) DO UPDATE SET
                password_hash = excluded.password_hash,
                role = excluded.role,
                user_type = excluded.user_type,
                department = excluded.department,
                is_active = excluded.is_active,
                login_count = 0,
                last_login = NULL
            "#,
        )
        .bind(&account.id)
        .bind(&account.username)
        .bind(&account.password_hash)
        .bind(account.role)
        .bind(account.user_type)
        .bind(&account.department)
        .bind(account.is_active)
        .bind(account.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await.map_err(DbError::transaction)?;
        Ok(())
    }

    /// Records one successful login: counter +1, `last_login = at`, one
    /// history row. All in a single transaction.
    ///
    /// The returned account is read inside that transaction, so it shows
    /// this login and no later one.
    ///
    /// ## Errors
    /// - `UserNotFound` if the username is unknown
    pub async fn record_login(&self, username: &str, at: DateTime<Utc>) -> StoreResult<UserAccount> {
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET login_count = login_count + 1, last_login = ?2
            WHERE username = ?1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Err(CoreError::UserNotFound(username.to_string()).into());
        };

        sqlx::query("INSERT INTO login_events (user_id, at) VALUES (?1, ?2)")
            .bind(&row.id)
            .bind(at)
            .execute(&mut *tx)
            .await?;

        let history = load_history(&mut *tx, &row.id).await?;
        let account = row.into_account(history);

        tx.commit().await.map_err(DbError::transaction)?;

        debug!(username = %username, login_count = account.login_count, "Login recorded");
        Ok(account)
    }
}

async fn load_history<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: &str,
) -> DbResult<Vec<DateTime<Utc>>> {
    let history: Vec<DateTime<Utc>> =
        sqlx::query_scalar("SELECT at FROM login_events WHERE user_id = ?1 ORDER BY seq")
            .bind(user_id)
            .fetch_all(executor)
            .await?;
    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::{Duration, TimeZone};

    fn nurse(created_at: DateTime<Utc>) -> UserAccount {
        UserAccount {
            id: "u-nurse".to_string(),
            username: "nurse".to_string(),
            password_hash: "not-a-real-hash".to_string(),
            role: Role::User,
            user_type: UserType::Nurse,
            department: "general".to_string(),
            is_active: true,
            login_count: 0,
            last_login: None,
            login_history: Vec::new(),
            created_at,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_record_login_returns_its_own_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.db");
        let db = Database::new(DbConfig::new(path.to_string_lossy())).await.unwrap();
        let users = db.users();

        let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        users.upsert(&nurse(start)).await.unwrap();

        let mut handles = Vec::new();
        for i in 1..=8 {
            let users = users.clone();
            let at = start + Duration::minutes(i);
            handles.push(tokio::spawn(async move { (at, users.record_login("nurse", at).await) }));
        }

        let mut counts = Vec::new();
        for handle in handles {
            let (at, result) = handle.await.unwrap();
            let account = result.unwrap();
            assert_eq!(account.login_history.len() as i64, account.login_count);
            assert_eq!(account.last_login, Some(at));
            assert_eq!(account.login_history.last(), Some(&at));
            counts.push(account.login_count);
        }
        counts.sort_unstable();
        assert_eq!(counts, (1..=8).collect::<Vec<i64>>());

        let err = users.record_login("ghost", start).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::UserNotFound(_))));
        assert_eq!(users.find("nurse").await.unwrap().unwrap().login_count, 8);
    }
}
