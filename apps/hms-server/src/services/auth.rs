//! # Login
//!
//! Unknown usernames and wrong passwords produce the same
//! `InvalidCredentials`, and both still pay for one argon2 verification.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use hms_core::{CoreError, UserProfile};
use hms_db::credentials::verify_password;
use hms_db::{DbError, Store, StoreResult};

/// Valid PHC string that no password verifies against, used for unknown
/// usernames.
const UNKNOWN_USER_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$1Kv3HqkFZoCmw8fSYnUwCsRxJ+H2C5ZlWJEgPiKQfZ8";

/// Checks the credentials and records the login.
///
/// ## Errors
/// - `InvalidCredentials` for an unknown user or a wrong password
pub async fn login(
    store: &dyn Store,
    username: &str,
    password: &str,
    now: DateTime<Utc>,
) -> StoreResult<UserProfile> {
    let account = store.find_user(username).await?;

    let hash = account
        .as_ref()
        .map(|a| a.password_hash.clone())
        .unwrap_or_else(|| UNKNOWN_USER_HASH.to_string());
    let password = password.to_string();

    // Argon2 is deliberately slow; keep it off the async workers.
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| DbError::Internal(format!("password check panicked: {e}")))?;

    if account.is_none() || !verified {
        warn!(username = %username, "Invalid login attempt");
        return Err(CoreError::InvalidCredentials.into());
    }

    let account = store.record_login(username, now).await?;
    info!(username = %username, role = ?account.role, logins = account.login_count, "User logged in");

    Ok(account.profile())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hms_db::{seed_if_empty, MemoryStore};

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        seed_if_empty(&store, Utc::now()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_login_counts_and_strips_hash() {
        let store = seeded().await;

        let profile = login(&store, "doctor", "doctor123", Utc::now()).await.unwrap();
        assert_eq!(profile.username, "doctor");
        assert_eq!(profile.login_count, 1);
        assert_eq!(profile.login_history.len(), 1);
        assert!(profile.last_login.is_some());

        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_the_same() {
        let store = seeded().await;

        let wrong = login(&store, "nurse", "nurse999", Utc::now()).await.unwrap_err();
        let unknown = login(&store, "ghost", "nurse123", Utc::now()).await.unwrap_err();

        assert!(matches!(wrong.as_domain(), Some(CoreError::InvalidCredentials)));
        assert!(matches!(unknown.as_domain(), Some(CoreError::InvalidCredentials)));
        assert_eq!(wrong.to_string(), unknown.to_string());

        // A failed attempt is not a login
        let nurse = store.find_user("nurse").await.unwrap().unwrap();
        assert_eq!(nurse.login_count, 0);
    }
}
