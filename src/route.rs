use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{handler::*, middleware::mw_require_session, AppState};

/// To-do routes under `prefix` ("" for the root, "/user" for the gated variant's URLs).
fn todo_routes(prefix: &str) -> Router<AppState> {
    Router::new()
        .route(&format!("{prefix}/"), get(list_todos))
        .route(&format!("{prefix}/new"), post(create_todo))
        .route(&format!("{prefix}/detail/:id"), get(show_todo))
        .route(&format!("{prefix}/update/:id"), post(update_todo))
        .route(&format!("{prefix}/delete_check/:id"), get(confirm_delete))
        .route(&format!("{prefix}/delete/:id"), post(delete_todo))
}

pub fn create_router(app_state: AppState) -> Router {
    let mut todos = Router::new()
        .merge(todo_routes(""))
        .merge(todo_routes("/user"))
        .route("/user", get(list_todos));

    if app_state.auth_required {
        todos = todos.route_layer(from_fn_with_state(app_state.clone(), mw_require_session));
    }

    Router::new()
        .merge(todos)
        .route("/signup", get(signup_page).post(signup))
        .route("/login", get(login_page).post(login))
        .route("/logout", post(logout))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{
            header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
            Method, Request, Response, StatusCode,
        },
    };
    use axum_extra::extract::cookie::Key;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::DatabaseBackend,
        db::testing::sqlite_pool,
        schema::{MAX_TODO_TEXT_LEN, MAX_USERNAME_LEN},
        session::{SessionSettings, SESSION_COOKIE},
    };

    async fn test_app(auth_required: bool) -> (Router, AppState, TempDir) {
        let (pool, dir) = sqlite_pool().await;
        let state = AppState::new(
            pool,
            DatabaseBackend::Sqlite,
            Key::generate(),
            SessionSettings {
                max_age_secs: 3600,
                secure: false,
            },
            auth_required,
        );
        (create_router(state.clone()), state, dir)
    }

    fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn form_request(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> Response<axum::body::BoxBody> {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_string(response: Response<axum::body::BoxBody>) -> String {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location<B>(response: &Response<B>) -> &str {
        response.headers().get(LOCATION).unwrap().to_str().unwrap()
    }

    fn session_cookie<B>(response: &Response<B>) -> Option<String> {
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(&format!("{SESSION_COOKIE}=")))
            .map(|v| v.to_string())
    }

    /// Sign up and log in, returning the `name=value` cookie pair.
    async fn login_as(app: &Router, username: &str, password: &str) -> String {
        let body = format!("username={username}&password={password}");

        let response = send(app, form_request("/signup", &body, None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");

        let response = send(app, form_request("/login", &body, None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");

        let cookie = session_cookie(&response).expect("login sets a session cookie");
        cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn unauthenticated_listing_redirects_to_login() {
        let (app, state, _dir) = test_app(true).await;
        state.todos.insert("Secret plan", "open").await.unwrap();

        let response = send(&app, get_request("/", None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
        assert!(!body_string(response).await.contains("Secret plan"));

        let response = send(&app, get_request("/user/detail/1", None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn protected_mutations_never_run_without_a_session() {
        let (app, state, _dir) = test_app(true).await;

        let response = send(&app, form_request("/new", "text=Sneaky&status=open", None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
        assert!(state.todos.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn forged_session_cookie_is_rejected() {
        let (app, _state, _dir) = test_app(true).await;

        let cookie = format!("{SESSION_COOKIE}=not-an-encrypted-value");
        let response = send(&app, get_request("/", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn logged_in_user_can_manage_todos() {
        let (app, state, _dir) = test_app(true).await;
        let cookie = login_as(&app, "alice", "s3cret").await;

        let response = send(&app, get_request("/", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("Logged in as <strong>alice</strong>"));

        let response = send(
            &app,
            form_request("/new", "text=Buy+milk&status=open", Some(&cookie)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");

        let todo = state.todos.list().await.unwrap().remove(0);
        assert_eq!(todo.text, "Buy milk");
        assert_eq!(todo.status, "open");

        let response = send(&app, get_request("/", Some(&cookie))).await;
        assert!(body_string(response).await.contains("Buy milk"));

        let response = send(
            &app,
            form_request(
                &format!("/update/{}", todo.id),
                "text=Buy+milk&status=done",
                Some(&cookie),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = send(&app, get_request(&format!("/detail/{}", todo.id), Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response)
            .await
            .contains(r#"<option value="done" selected>done</option>"#));

        let response = send(
            &app,
            get_request(&format!("/delete_check/{}", todo.id), Some(&cookie)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("Delete this todo?"));

        let response = send(
            &app,
            form_request(&format!("/delete/{}", todo.id), "", Some(&cookie)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = send(&app, get_request(&format!("/detail/{}", todo.id), Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn wrong_password_rerenders_login() {
        let (app, _state, _dir) = test_app(true).await;
        login_as(&app, "bob", "right").await;

        let response = send(&app, form_request("/login", "username=bob&password=wrong", None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(session_cookie(&response).is_none());
        assert!(body_string(response).await.contains("Invalid username or password."));

        let response = send(
            &app,
            form_request("/login", "username=nobody&password=right", None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(session_cookie(&response).is_none());
    }

    #[tokio::test]
    async fn duplicate_signup_is_rejected() {
        let (app, state, _dir) = test_app(true).await;
        login_as(&app, "carol", "first").await;

        let response = send(
            &app,
            form_request("/signup", "username=carol&password=second", None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("already taken"));

        // The original password still works, so the first record is untouched.
        let user = state.users.find_by_username("carol").await.unwrap().unwrap();
        assert!(crate::password::verify_password(&user.password_hash, "first"));
    }

    #[tokio::test]
    async fn blank_credentials_are_a_bad_request() {
        let (app, _state, _dir) = test_app(true).await;

        let response = send(&app, form_request("/signup", "username=&password=", None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("Username and password are required."));

        let response = send(&app, form_request("/login", "username=dave", None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn logout_clears_the_session() {
        let (app, _state, _dir) = test_app(true).await;
        let cookie = login_as(&app, "erin", "pw").await;

        let response = send(&app, form_request("/logout", "", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");

        let removal = session_cookie(&response).expect("logout expires the cookie");
        assert!(removal.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn ungated_mode_serves_todos_without_a_session() {
        let (app, state, _dir) = test_app(false).await;
        let todo = state.todos.insert("Shared list", "open").await.unwrap();

        let response = send(&app, get_request("/", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("Shared list"));
        assert!(!body.contains("Logged in as"));

        let response = send(&app, get_request(&format!("/user/detail/{}", todo.id), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_ids_are_a_bad_request() {
        let (app, _state, _dir) = test_app(false).await;

        for request in [
            get_request("/detail/abc", None),
            get_request("/delete_check/1x", None),
            form_request("/update/abc", "text=x&status=open", None),
            form_request("/delete/abc", "", None),
        ] {
            let response = send(&app, request).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let (app, _state, _dir) = test_app(false).await;

        let response = send(&app, get_request("/delete_check/99", None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&app, form_request("/update/99", "text=x&status=open", None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&app, form_request("/delete/99", "", None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_todo_text_is_a_bad_request() {
        let (app, state, _dir) = test_app(false).await;

        let response = send(&app, form_request("/new", "text=+++&status=open", None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.todos.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn user_prefixed_listing_is_gated() {
        let (app, state, _dir) = test_app(true).await;
        state.todos.insert("Team plan", "open").await.unwrap();

        for uri in ["/user/", "/user"] {
            let response = send(&app, get_request(uri, None)).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&response), "/login");
        }

        let cookie = login_as(&app, "frank", "pw").await;
        for uri in ["/user/", "/user"] {
            let response = send(&app, get_request(uri, Some(&cookie))).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert!(body_string(response).await.contains("Team plan"));
        }

        let response = send(
            &app,
            form_request("/user/new", "text=From+user&status=open", Some(&cookie)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(state.todos.list().await.unwrap()[0].text, "From user");
    }

    #[tokio::test]
    async fn user_prefixed_listing_without_gate() {
        let (app, state, _dir) = test_app(false).await;
        state.todos.insert("Shared list", "open").await.unwrap();

        let response = send(&app, get_request("/user/", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("Shared list"));
    }

    #[tokio::test]
    async fn signup_then_duplicate_keeps_one_account() {
        let (app, state, _dir) = test_app(true).await;

        let response = send(&app, form_request("/signup", "username=gina&password=pw", None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");

        let response = send(&app, form_request("/signup", "username=gina&password=other", None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, form_request("/login", "username=gina&password=pw", None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let response = send(&app, form_request("/login", "username=gina&password=other", None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind("gina")
            .fetch_one(&state.users.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn oversized_input_is_a_bad_request() {
        let (app, state, _dir) = test_app(false).await;

        let text = "x".repeat(MAX_TODO_TEXT_LEN + 1);
        let response = send(&app, form_request("/new", &format!("text={text}&status=open"), None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.todos.list().await.unwrap().is_empty());

        let todo = state.todos.insert("Buy milk", "open").await.unwrap();
        let response = send(
            &app,
            form_request(&format!("/update/{}", todo.id), &format!("text={text}&status=open"), None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.todos.find(todo.id).await.unwrap().unwrap().text, "Buy milk");

        let username = "u".repeat(MAX_USERNAME_LEN + 1);
        let response = send(
            &app,
            form_request("/signup", &format!("username={username}&password=pw"), None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("Username is too long"));
        assert!(state.users.find_by_username(&username).await.unwrap().is_none());
    }
}
