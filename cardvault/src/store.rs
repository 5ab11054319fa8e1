//! SQLite-backed credential store.
//!
//! Two tables: `users` and `credit_cards`. Every operation runs a single
//! parameterized statement on a pooled connection; concurrency control is
//! left to SQLite.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;

pub type UserId = i64;
pub type CardId = i64;

const CREATE_USERS: &str = "CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL
)";

const CREATE_CREDIT_CARDS: &str = "CREATE TABLE IF NOT EXISTS credit_cards (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER,
    card_number TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users (id)
)";

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CreditCard {
    pub id: CardId,
    pub user_id: UserId,
    pub card_number: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// An insert hit a `UNIQUE` constraint.
    #[error("record already exists")]
    Conflict,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens (creating if needed) the database file and ensures the schema exists.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_USERS).execute(&self.pool).await?;
        sqlx::query(CREATE_CREDIT_CARDS).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserId, StoreError> {
        let result = sqlx::query("INSERT INTO users (username, password_hash) VALUES (?, ?)")
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(map_insert_error)?;
        Ok(result.last_insert_rowid())
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn create_card(&self, user_id: UserId, card_number: &str) -> Result<CardId, StoreError> {
        let result = sqlx::query("INSERT INTO credit_cards (user_id, card_number) VALUES (?, ?)")
            .bind(user_id)
            .bind(card_number)
            .execute(&self.pool)
            .await
            .map_err(map_insert_error)?;
        Ok(result.last_insert_rowid())
    }

    /// Fetches a card only if it belongs to `user_id`. A missing card and a
    /// card owned by someone else are both `None`.
    pub async fn find_card_for_user(
        &self,
        card_id: CardId,
        user_id: UserId,
    ) -> Result<Option<CreditCard>, StoreError> {
        let card = sqlx::query_as::<_, CreditCard>(
            "SELECT id, user_id, card_number FROM credit_cards WHERE id = ? AND user_id = ?",
        )
        .bind(card_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(card)
    }

    pub async fn list_cards_for_user(&self, user_id: UserId) -> Result<Vec<CreditCard>, StoreError> {
        let cards = sqlx::query_as::<_, CreditCard>(
            "SELECT id, user_id, card_number FROM credit_cards WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(cards)
    }

    #[cfg(test)]
    pub async fn count_users(&self, username: &str) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn map_insert_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Conflict,
        other => StoreError::Database(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::{Store, StoreError};

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() -> Result<()> {
        let dir = tempdir()?;
        let store = Store::open(&dir.path().join("users.db")).await?;

        let first = store.create_user("alice", "hash-1").await?;
        let second = store.create_user("alice", "hash-2").await;

        assert!(matches!(second, Err(StoreError::Conflict)));
        assert_eq!(store.count_users("alice").await?, 1);
        let alice = store.find_user_by_username("alice").await?.unwrap();
        assert_eq!(alice.id, first);
        assert_eq!(alice.password_hash, "hash-1");
        Ok(())
    }

    #[tokio::test]
    async fn user_ids_increase_monotonically() -> Result<()> {
        let dir = tempdir()?;
        let store = Store::open(&dir.path().join("users.db")).await?;

        let alice = store.create_user("alice", "h").await?;
        let bob = store.create_user("bob", "h").await?;
        assert!(bob > alice);
        Ok(())
    }

    #[tokio::test]
    async fn username_lookup_is_exact() -> Result<()> {
        let dir = tempdir()?;
        let store = Store::open(&dir.path().join("users.db")).await?;
        store.create_user("alice", "h").await?;

        assert!(store.find_user_by_username("alice").await?.is_some());
        assert!(store.find_user_by_username("alic").await?.is_none());
        assert!(store.find_user_by_username("alice ").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn cards_are_only_visible_to_their_owner() -> Result<()> {
        let dir = tempdir()?;
        let store = Store::open(&dir.path().join("users.db")).await?;
        let alice = store.create_user("alice", "h").await?;
        let bob = store.create_user("bob", "h").await?;

        let card = store.create_card(alice, "4111 1111 1111 1111").await?;

        let owned = store.find_card_for_user(card, alice).await?.unwrap();
        assert_eq!(owned.user_id, alice);
        assert_eq!(owned.card_number, "4111 1111 1111 1111");
        assert!(store.find_card_for_user(card, bob).await?.is_none());
        assert!(store.find_card_for_user(9999, alice).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn list_cards_returns_only_own_cards_in_order() -> Result<()> {
        let dir = tempdir()?;
        let store = Store::open(&dir.path().join("users.db")).await?;
        let alice = store.create_user("alice", "h").await?;
        let bob = store.create_user("bob", "h").await?;

        let first = store.create_card(alice, "1111").await?;
        store.create_card(bob, "2222").await?;
        let second = store.create_card(alice, "not-a-number").await?;

        let cards = store.list_cards_for_user(alice).await?;
        let ids = cards.iter().map(|card| card.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![first, second]);
        Ok(())
    }

    #[tokio::test]
    async fn reopening_keeps_existing_rows() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("users.db");
        {
            let store = Store::open(&path).await?;
            store.create_user("alice", "h").await?;
        }

        let store = Store::open(&path).await?;
        assert!(store.find_user_by_username("alice").await?.is_some());
        Ok(())
    }
}
