use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::pool::DbPool;
use crate::db::schema::users;
use crate::error::ApiError;

/// A local user record, keyed by the identity provider's subject.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: String,
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub id: &'a str,
    pub subject: &'a str,
    pub email: Option<&'a str>,
    pub display_name: Option<&'a str>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// The user as returned by `GET /users/@me`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentUserResponse {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl From<User> for CurrentUserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            display_name: u.display_name,
        }
    }
}

/// Create or refresh the local record for an identity-provider subject.
pub async fn upsert_from_identity(
    pool: &DbPool,
    subject: &str,
    email: Option<&str>,
    display_name: Option<&str>,
) -> Result<User, ApiError> {
    let now = Utc::now();
    let id = bookmarks_common::id::prefixed_ulid(bookmarks_common::id::prefix::USER);
    let mut conn = pool.get().await?;

    let query = diesel::insert_into(users::table)
        .values(NewUser {
            id: &id,
            subject,
            email,
            display_name,
            created_at: now,
            last_seen_at: now,
        })
        .on_conflict(users::subject)
        .do_update()
        .set((
            users::email.eq(email),
            users::display_name.eq(display_name),
            users::last_seen_at.eq(now),
        ))
        .returning(User::as_returning());

    let user: User = diesel_async::RunQueryDsl::get_result(query, &mut conn).await?;

    Ok(user)
}
