//! Bookmark list, create, and delete endpoints.
//!
//! Every query is scoped to the authenticated owner. Writes are announced on
//! the change broadcast after they commit; responses do not wait on delivery.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use chrono::Utc;
use diesel::prelude::*;
use diesel::result::OptionalExtension;

use bookmarks_common::id::{prefix, prefixed_ulid};

use crate::auth::middleware::AuthUser;
use crate::db::schema::bookmarks;
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::models::bookmark::{self, Bookmark, CreateBookmarkRequest, NewBookmark};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bookmarks", get(list_bookmarks).post(create_bookmark))
        .route("/bookmarks/{bookmark_id}", delete(delete_bookmark))
}

// ---------------------------------------------------------------------------
// GET /api/v1/bookmarks
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/bookmarks",
    tag = "Bookmarks",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The caller's bookmarks, newest first", body = [Bookmark]),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
    ),
)]
pub async fn list_bookmarks(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Bookmark>>, ApiError> {
    let rows = bookmark::list_for_user(&state.db, &user_id).await?;
    Ok(Json(rows))
}

// ---------------------------------------------------------------------------
// POST /api/v1/bookmarks
// ---------------------------------------------------------------------------

fn validate(body: &CreateBookmarkRequest) -> Result<(&str, &str), ApiError> {
    let url = body.url.trim();
    let title = body.title.trim();

    let mut errors = Vec::new();
    if url.is_empty() {
        errors.push(FieldError {
            field: "url".into(),
            message: "URL is required".into(),
        });
    }
    if title.is_empty() {
        errors.push(FieldError {
            field: "title".into(),
            message: "Title is required".into(),
        });
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    Ok((url, title))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookmarks",
    tag = "Bookmarks",
    security(("bearer" = [])),
    request_body = CreateBookmarkRequest,
    responses(
        (status = 201, description = "Bookmark created", body = Bookmark),
        (status = 400, description = "Missing url or title", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
    ),
)]
pub async fn create_bookmark(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateBookmarkRequest>,
) -> Result<(StatusCode, Json<Bookmark>), ApiError> {
    let (url, title) = validate(&body)?;
    let id = prefixed_ulid(prefix::BOOKMARK);
    let mut conn = state.db.get().await?;

    let created: Bookmark = diesel_async::RunQueryDsl::get_result(
        diesel::insert_into(bookmarks::table)
            .values(NewBookmark {
                id: &id,
                user_id: &user_id,
                url,
                title,
                created_at: Utc::now(),
            })
            .returning(Bookmark::as_returning()),
        &mut conn,
    )
    .await?;

    tracing::info!(bookmark_id = %created.id, %user_id, "bookmark created");
    state.broadcast.bookmark_inserted(&created);

    Ok((StatusCode::CREATED, Json(created)))
}

// ---------------------------------------------------------------------------
// DELETE /api/v1/bookmarks/:bookmark_id
// ---------------------------------------------------------------------------

#[utoipa::path(
    delete,
    path = "/api/v1/bookmarks/{bookmark_id}",
    tag = "Bookmarks",
    security(("bearer" = [])),
    params(("bookmark_id" = String, Path, description = "Bookmark ID")),
    responses(
        (status = 204, description = "Bookmark deleted"),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "No such bookmark for this user", body = ApiErrorBody),
    ),
)]
pub async fn delete_bookmark(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(bookmark_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut conn = state.db.get().await?;

    let deleted: Option<String> = diesel_async::RunQueryDsl::get_result(
        diesel::delete(
            bookmarks::table
                .filter(bookmarks::id.eq(&bookmark_id))
                .filter(bookmarks::user_id.eq(&user_id)),
        )
        .returning(bookmarks::id),
        &mut conn,
    )
    .await
    .optional()?;

    let deleted = deleted.ok_or_else(|| ApiError::not_found("Bookmark not found"))?;

    tracing::info!(bookmark_id = %deleted, %user_id, "bookmark deleted");
    state.broadcast.bookmark_deleted(&user_id, &deleted);

    Ok(StatusCode::NO_CONTENT)
}
