use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use tracing::{info, warn};

use crate::{
    error::{parse_id, AppError},
    middleware::LOGIN_PATH,
    model::CurrentUser,
    password,
    schema::{CredentialsForm, TodoForm},
    session,
    store::StoreError,
    view, AppState,
};

const INVALID_CREDENTIALS: &str = "Invalid username or password.";

fn todo_fields(body: &TodoForm) -> Result<(&str, &str), AppError> {
    body.fields().map_err(AppError::InvalidInput)
}

// Handler for listing all Todo items
pub async fn list_todos(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Html<String>, AppError> {
    let todos = state.todos.list().await?;
    let user = user.as_ref().map(|Extension(user)| user);
    Ok(Html(view::index_page(&todos, user)))
}

// Handler for creating a new Todo
pub async fn create_todo(
    State(state): State<AppState>,
    Form(body): Form<TodoForm>,
) -> Result<Redirect, AppError> {
    let (text, status) = todo_fields(&body)?;
    let todo = state.todos.insert(text, status).await?;
    info!(id = todo.id, "todo created");
    Ok(Redirect::to("/"))
}

// Handler for showing a specific Todo by ID
pub async fn show_todo(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    let id = parse_id(&id)?;
    let todo = state
        .todos
        .find(id)
        .await?
        .ok_or(AppError::TodoNotFound(id))?;
    Ok(Html(view::detail_page(&todo)))
}

// Handler for updating a Todo by ID
pub async fn update_todo(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Form(body): Form<TodoForm>,
) -> Result<Redirect, AppError> {
    let id = parse_id(&id)?;
    let (text, status) = todo_fields(&body)?;
    state
        .todos
        .update(id, text, status)
        .await?
        .ok_or(AppError::TodoNotFound(id))?;
    info!(id, "todo updated");
    Ok(Redirect::to("/"))
}

// Handler for the delete confirmation page
pub async fn confirm_delete(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    let id = parse_id(&id)?;
    let todo = state
        .todos
        .find(id)
        .await?
        .ok_or(AppError::TodoNotFound(id))?;
    Ok(Html(view::delete_page(&todo)))
}

// Handler for deleting a Todo by ID
pub async fn delete_todo(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    let id = parse_id(&id)?;
    if !state.todos.delete(id).await? {
        return Err(AppError::TodoNotFound(id));
    }
    info!(id, "todo deleted");
    Ok(Redirect::to("/"))
}

pub async fn signup_page() -> Html<String> {
    Html(view::signup_page(None))
}

pub async fn signup(
    State(state): State<AppState>,
    Form(body): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    let (username, plaintext) = match body.required() {
        Ok(fields) => fields,
        Err(message) => return Ok(bad_request(view::signup_page(Some(message)))),
    };

    // Argon2 is deliberately slow; keep it off the async workers.
    let plaintext = plaintext.to_string();
    let password_hash =
        tokio::task::spawn_blocking(move || password::hash_password(&plaintext)).await??;

    match state.users.create(username, &password_hash).await {
        Ok(user) => {
            info!(user_id = user.id, username = %user.username, "user signed up");
            Ok(Redirect::to(LOGIN_PATH).into_response())
        }
        Err(StoreError::DuplicateUsername(_)) => {
            warn!("signup rejected: username already taken");
            Ok(bad_request(view::signup_page(Some(
                "That username is already taken.",
            ))))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn login_page() -> Html<String> {
    Html(view::login_page(None))
}

pub async fn login(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(body): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    let (username, plaintext) = match body.required() {
        Ok(fields) => fields,
        Err(message) => return Ok(bad_request(view::login_page(Some(message)))),
    };

    let stored_hash = state
        .users
        .find_by_username(username)
        .await?
        .map(|user| user.password_hash);
    let candidate = plaintext.to_string();
    let verified = tokio::task::spawn_blocking(move || match stored_hash {
        Some(hash) => password::verify_password(&hash, &candidate),
        None => password::verify_against_dummy(&candidate),
    })
    .await?;

    if !verified {
        warn!("login rejected");
        return Ok(bad_request(view::login_page(Some(INVALID_CREDENTIALS))));
    }

    info!(username, "user logged in");
    let jar = session::start(jar, &state.session, username)?;
    Ok((jar, Redirect::to("/")).into_response())
}

pub async fn logout(jar: PrivateCookieJar) -> impl IntoResponse {
    (session::end(jar), Redirect::to(LOGIN_PATH))
}

fn bad_request(page: String) -> Response {
    (StatusCode::BAD_REQUEST, Html(page)).into_response()
}
