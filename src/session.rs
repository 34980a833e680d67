//! Cookie-backed login sessions.
//!
//! The session lives entirely in a private (encrypted and authenticated) cookie,
//! so there is no server-side session table. The issue time travels inside the
//! encrypted payload and is checked against the configured lifetime on every read,
//! independent of whatever the browser does with `Max-Age`.

use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const SESSION_COOKIE: &str = "mysession";

#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub max_age_secs: i64,
    pub secure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    /// Unix seconds.
    pub issued_at: i64,
}

impl Session {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            issued_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn is_valid_at(&self, now: i64, settings: &SessionSettings) -> bool {
        !self.username.is_empty()
            && self.issued_at <= now
            && now - self.issued_at < settings.max_age_secs
    }
}

/// Write a fresh session for `username` into the jar.
pub fn start(
    jar: PrivateCookieJar,
    settings: &SessionSettings,
    username: &str,
) -> Result<PrivateCookieJar, serde_json::Error> {
    let payload = serde_json::to_string(&Session::new(username))?;

    let cookie = Cookie::build(SESSION_COOKIE, payload)
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(settings.max_age_secs))
        .finish();

    Ok(jar.add(cookie))
}

/// The live session carried by the request, if any.
pub fn current(jar: &PrivateCookieJar, settings: &SessionSettings) -> Option<Session> {
    let cookie = jar.get(SESSION_COOKIE)?;

    let session: Session = match serde_json::from_str(cookie.value()) {
        Ok(session) => session,
        Err(_) => {
            debug!("ignoring malformed session cookie");
            return None;
        }
    };

    if !session.is_valid_at(chrono::Utc::now().timestamp(), settings) {
        debug!("ignoring expired session");
        return None;
    }

    Some(session)
}

pub fn end(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE, "").path("/").finish())
}
