use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use tracing::debug;

use crate::{model::CurrentUser, session, AppState};

pub const LOGIN_PATH: &str = "/login";

/// Let the request through only with a live session; otherwise redirect to the login page.
pub async fn mw_require_session<B>(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    mut request: Request<B>,
    next: Next<B>,
) -> Response {
    let Some(session) = session::current(&jar, &state.session) else {
        debug!(path = %request.uri().path(), "no session, redirecting to login");
        return Redirect::to(LOGIN_PATH).into_response();
    };

    request.extensions_mut().insert(CurrentUser {
        username: session.username,
    });

    next.run(request).await
}
