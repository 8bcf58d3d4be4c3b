//! Minimal server-rendered landing page.
//!
//! The live list belongs to the client; this page only shows who is signed in
//! and a snapshot of their bookmarks.

use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::auth::middleware::MaybeAuthUser;
use crate::error::ApiError;
use crate::models::bookmark::{self, Bookmark};
use crate::models::user::User;
use crate::AppState;

use super::users::find_user;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

async fn index(
    MaybeAuthUser(auth): MaybeAuthUser,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let user = match auth {
        Some(auth) => find_user(&state, &auth.user_id).await?,
        None => None,
    };

    let body = match user {
        Some(user) => {
            let rows = bookmark::list_for_user(&state.db, &user.id).await?;
            signed_in(&user, &rows)
        }
        None => signed_out(),
    };

    Ok(Html(page(&body)).into_response())
}

fn page(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"/><title>Smart Bookmarks</title></head>
<body style="font-family:system-ui;max-width:720px;margin:40px auto">
<h1>Smart Bookmarks</h1>
{body}
</body></html>"#
    )
}

fn signed_out() -> String {
    r#"<p>Sign in to manage your bookmarks</p>
<a href="/auth/login">Sign in</a>"#
        .to_string()
}

fn signed_in(user: &User, rows: &[Bookmark]) -> String {
    let who = user
        .display_name
        .as_deref()
        .or(user.email.as_deref())
        .unwrap_or(&user.id);

    let items = if rows.is_empty() {
        "<p>No bookmarks yet.</p>".to_string()
    } else {
        let lis: String = rows
            .iter()
            .map(|b| {
                let url = escape_html(&b.url);
                let title = escape_html(&b.title);
                if is_web_url(&b.url) {
                    format!(
                        r#"<li><a href="{url}" target="_blank" rel="noopener noreferrer">{title}</a> <small>{url}</small></li>"#
                    )
                } else {
                    format!("<li>{title} <small>{url}</small></li>")
                }
            })
            .collect();
        format!("<ul>{lis}</ul>")
    };

    format!(
        r#"<p>Signed in as {who}</p>
<form method="POST" action="/auth/logout"><button type="submit">Sign out</button></form>
<h2>My Bookmarks ({count})</h2>
{items}"#,
        who = escape_html(who),
        count = rows.len(),
    )
}

/// Only http(s) URLs are rendered as links.
fn is_web_url(url: &str) -> bool {
    reqwest::Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
