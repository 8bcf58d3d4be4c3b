use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::pool::DbPool;
use crate::db::schema::bookmarks;
use crate::error::ApiError;

/// A bookmark row. Serializes to the same shape as `bookmarks_common::Bookmark`.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, ToSchema)]
#[diesel(table_name = bookmarks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Bookmark {
    pub id: String,
    pub user_id: String,
    pub url: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = bookmarks)]
pub struct NewBookmark<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub url: &'a str,
    pub title: &'a str,
    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /bookmarks`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBookmarkRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
}

/// The owner's bookmarks, newest first. Ties on `created_at` fall back to id
/// so every reader sees the same order.
pub async fn list_for_user(pool: &DbPool, user_id: &str) -> Result<Vec<Bookmark>, ApiError> {
    let mut conn = pool.get().await?;

    let rows = diesel_async::RunQueryDsl::load(
        bookmarks::table
            .filter(bookmarks::user_id.eq(user_id))
            .order((bookmarks::created_at.desc(), bookmarks::id.desc()))
            .select(Bookmark::as_select()),
        &mut conn,
    )
    .await?;

    Ok(rows)
}
