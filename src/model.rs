// Data model representing a Todo item
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Todo {
    pub(crate) id: i64,
    pub(crate) text: String,
    pub(crate) status: String,
    /// Unix milliseconds.
    pub(crate) created_at: i64,
    pub(crate) updated_at: i64,
}

// Data model representing a registered user
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub(crate) id: i64,
    pub(crate) username: String,
    /// Argon2 PHC string.
    pub(crate) password_hash: String,
}

/// Identity attached to a request by the session gate.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub(crate) username: String,
}
