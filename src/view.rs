//! Server-rendered HTML pages.

use axum::http::StatusCode;

use crate::model::{CurrentUser, Todo};

const STATUSES: &[&str] = &["open", "in progress", "done"];

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn format_millis(millis: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

fn layout(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
</head>
<body>
    <main>
        {content}
    </main>
</body>
</html>"#,
        title = html_escape(title),
    )
}

fn status_options(selected: &str) -> String {
    let mut options: Vec<String> = STATUSES
        .iter()
        .map(|status| {
            let marker = if *status == selected { " selected" } else { "" };
            format!(r#"<option value="{status}"{marker}>{status}</option>"#)
        })
        .collect();

    // Keep free-form statuses editable.
    if !selected.is_empty() && !STATUSES.contains(&selected) {
        let selected = html_escape(selected);
        options.push(format!(r#"<option value="{selected}" selected>{selected}</option>"#));
    }

    options.join("")
}

fn error_banner(error: Option<&str>) -> String {
    error
        .map(|e| format!(r#"<p class="error">{}</p>"#, html_escape(e)))
        .unwrap_or_default()
}

pub fn index_page(todos: &[Todo], user: Option<&CurrentUser>) -> String {
    let greeting = match user {
        Some(user) => format!(
            r#"<p>Logged in as <strong>{}</strong></p>
        <form method="post" action="/logout"><button type="submit">Log out</button></form>"#,
            html_escape(&user.username)
        ),
        None => String::new(),
    };

    let rows: String = todos
        .iter()
        .map(|todo| {
            format!(
                r#"<li>{text} <em>({status})</em> <small>{created}</small>
            <a href="/detail/{id}">edit</a> <a href="/delete_check/{id}">delete</a></li>"#,
                id = todo.id,
                text = html_escape(&todo.text),
                status = html_escape(&todo.status),
                created = format_millis(todo.created_at),
            )
        })
        .collect();

    layout(
        "Todos",
        &format!(
            r#"<h1>Todos</h1>
        {greeting}
        <form method="post" action="/new">
            <input type="text" name="text" required>
            <select name="status">{options}</select>
            <button type="submit">Add</button>
        </form>
        <ul>{rows}</ul>"#,
            options = status_options(STATUSES[0]),
        ),
    )
}

pub fn detail_page(todo: &Todo) -> String {
    layout(
        "Edit todo",
        &format!(
            r#"<h1>Edit todo</h1>
        <form method="post" action="/update/{id}">
            <input type="text" name="text" value="{text}" required>
            <select name="status">{options}</select>
            <button type="submit">Save</button>
        </form>
        <p><small>created {created}, updated {updated}</small></p>
        <a href="/">back</a>"#,
            id = todo.id,
            text = html_escape(&todo.text),
            options = status_options(&todo.status),
            created = format_millis(todo.created_at),
            updated = format_millis(todo.updated_at),
        ),
    )
}

pub fn delete_page(todo: &Todo) -> String {
    layout(
        "Delete todo",
        &format!(
            r#"<h1>Delete this todo?</h1>
        <p>{text} <em>({status})</em></p>
        <form method="post" action="/delete/{id}">
            <button type="submit">Delete</button>
        </form>
        <a href="/">cancel</a>"#,
            id = todo.id,
            text = html_escape(&todo.text),
            status = html_escape(&todo.status),
        ),
    )
}

pub fn signup_page(error: Option<&str>) -> String {
    layout(
        "Sign up",
        &format!(
            r#"<h1>Sign up</h1>
        {banner}
        <form method="post" action="/signup">
            <input type="text" name="username" placeholder="username" required>
            <input type="password" name="password" placeholder="password" required>
            <button type="submit">Sign up</button>
        </form>
        <a href="/login">log in</a>"#,
            banner = error_banner(error),
        ),
    )
}

pub fn login_page(error: Option<&str>) -> String {
    layout(
        "Log in",
        &format!(
            r#"<h1>Log in</h1>
        {banner}
        <form method="post" action="/login">
            <input type="text" name="username" placeholder="username" required>
            <input type="password" name="password" placeholder="password" required>
            <button type="submit">Log in</button>
        </form>
        <a href="/signup">sign up</a>"#,
            banner = error_banner(error),
        ),
    )
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    let reason = status.canonical_reason().unwrap_or("Error");
    layout(
        reason,
        &format!(
            r#"<h1>{code} {reason}</h1>
        <p>{message}</p>
        <a href="/">back</a>"#,
            code = status.as_u16(),
            message = html_escape(message),
        ),
    )
}
