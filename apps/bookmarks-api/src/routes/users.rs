use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use diesel::prelude::*;
use diesel::result::OptionalExtension;

use crate::auth::middleware::AuthUser;
use crate::db::schema::users;
use crate::error::{ApiError, ApiErrorBody};
use crate::models::user::{CurrentUserResponse, User};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/users/@me", get(get_me))
}

/// Look up the user behind a session.
pub async fn find_user(state: &AppState, user_id: &str) -> Result<Option<User>, ApiError> {
    let mut conn = state.db.get().await?;
    let user = diesel_async::RunQueryDsl::get_result(
        users::table.find(user_id).select(User::as_select()),
        &mut conn,
    )
    .await
    .optional()?;
    Ok(user)
}

#[utoipa::path(
    get,
    path = "/api/v1/users/@me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The signed-in user", body = CurrentUserResponse),
        (status = 401, description = "No valid session", body = ApiErrorBody),
    ),
)]
pub async fn get_me(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<CurrentUserResponse>, ApiError> {
    // A session can outlive its user row if the row was removed.
    let user = find_user(&state, &user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Session user no longer exists"))?;
    Ok(Json(user.into()))
}
