use sqlx::{query, query_as, AnyPool};
use thiserror::Error;

use crate::{
    config::DatabaseBackend,
    model::{Todo, User},
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username `{0}` is already taken")]
    DuplicateUsername(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Clone)]
pub struct TodoStore {
    pool: AnyPool,
    backend: DatabaseBackend,
}

impl TodoStore {
    pub fn new(pool: AnyPool, backend: DatabaseBackend) -> Self {
        Self { pool, backend }
    }

    pub async fn insert(&self, text: &str, status: &str) -> Result<Todo, sqlx::Error> {
        let now = now_millis();

        // The Any driver only reports last_insert_id for MySQL.
        if self.backend == DatabaseBackend::Sqlite {
            return query_as::<_, Todo>(
                "INSERT INTO todos (text, status, created_at, updated_at) VALUES (?, ?, ?, ?) RETURNING id, text, status, created_at, updated_at",
            )
            .bind(text)
            .bind(status)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await;
        }

        let result = query(
            "INSERT INTO todos (text, status, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(text)
        .bind(status)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_id().ok_or(sqlx::Error::RowNotFound)?;

        Ok(Todo {
            id,
            text: text.to_string(),
            status: status.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// All to-dos, newest first.
    pub async fn list(&self) -> Result<Vec<Todo>, sqlx::Error> {
        query_as::<_, Todo>(
            "SELECT id, text, status, created_at, updated_at FROM todos ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn find(&self, id: i64) -> Result<Option<Todo>, sqlx::Error> {
        query_as::<_, Todo>(
            "SELECT id, text, status, created_at, updated_at FROM todos WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Overwrite text and status. Concurrent updates are last-write-wins.
    pub async fn update(
        &self,
        id: i64,
        text: &str,
        status: &str,
    ) -> Result<Option<Todo>, sqlx::Error> {
        query("UPDATE todos SET text = ?, status = ?, updated_at = ? WHERE id = ?")
            .bind(text)
            .bind(status)
            .bind(now_millis())
            .bind(id)
            .execute(&self.pool)
            .await?;

        // MySQL reports zero affected rows for a no-op update, so re-read instead.
        self.find(id).await
    }

    /// Returns `false` when no row had that id.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let rows_affected = query("DELETE FROM todos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }
}

#[derive(Clone)]
pub struct UserStore {
    pub(crate) pool: AnyPool,
    backend: DatabaseBackend,
}

impl UserStore {
    pub fn new(pool: AnyPool, backend: DatabaseBackend) -> Self {
        Self { pool, backend }
    }

    pub async fn create(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        let duplicate = |e: sqlx::Error| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::DuplicateUsername(username.to_string())
            }
            other => StoreError::Database(other),
        };

        if self.backend == DatabaseBackend::Sqlite {
            return query_as::<_, User>(
                "INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?) RETURNING id, username, password_hash",
            )
            .bind(username)
            .bind(password_hash)
            .bind(now_millis())
            .fetch_one(&self.pool)
            .await
            .map_err(duplicate);
        }

        let result = query("INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)")
            .bind(username)
            .bind(password_hash)
            .bind(now_millis())
            .execute(&self.pool)
            .await
            .map_err(duplicate)?;

        let id = result.last_insert_id().ok_or(sqlx::Error::RowNotFound)?;

        Ok(User {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        })
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        query_as::<_, User>("SELECT id, username, password_hash FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }
}
