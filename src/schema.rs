// Column limits, in characters. Kept in step with the DDL in db.rs.
pub const MAX_TODO_TEXT_LEN: usize = 2048;
pub const MAX_STATUS_LEN: usize = 64;
pub const MAX_USERNAME_LEN: usize = 191;
pub const MAX_PASSWORD_LEN: usize = 1024;

// Struct representing the form body for creating or updating a Todo
#[derive(Debug, serde::Deserialize)]
pub struct TodoForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub status: String,
}

impl TodoForm {
    /// Trimmed text and status, or the reason they cannot be stored.
    pub fn fields(&self) -> Result<(&str, &str), &'static str> {
        let text = self.text.trim();
        let status = self.status.trim();
        if text.is_empty() {
            return Err("todo text must not be empty");
        }
        if text.chars().count() > MAX_TODO_TEXT_LEN {
            return Err("todo text is too long (2048 characters at most)");
        }
        if status.chars().count() > MAX_STATUS_LEN {
            return Err("status is too long (64 characters at most)");
        }
        Ok((text, status))
    }
}

// Struct representing the signup and login form body
#[derive(Debug, serde::Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl CredentialsForm {
    /// Trimmed username and raw password, or a message for the re-rendered form.
    pub fn required(&self) -> Result<(&str, &str), &'static str> {
        let username = self.username.trim();
        if username.is_empty() || self.password.is_empty() {
            return Err("Username and password are required.");
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err("Username is too long (191 characters at most).");
        }
        if self.password.chars().count() > MAX_PASSWORD_LEN {
            return Err("Password is too long (1024 characters at most).");
        }
        Ok((username, self.password.as_str()))
    }
}
