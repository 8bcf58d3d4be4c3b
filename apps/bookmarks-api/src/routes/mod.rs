pub mod auth;
pub mod bookmarks;
pub mod health;
pub mod shell;
pub mod users;

use axum::Router;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(shell::router())
        .merge(auth::router())
        .merge(crate::gateway::server::router())
        .nest(
            "/api/v1",
            auth::api_router()
                .merge(users::router())
                .merge(bookmarks::router()),
        )
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::login,
        auth::callback,
        auth::logout,
        auth::gateway_ticket,
        users::get_me,
        bookmarks::list_bookmarks,
        bookmarks::create_bookmark,
        bookmarks::delete_bookmark,
    ),
    components(
        schemas(
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            crate::error::FieldError,
            crate::models::bookmark::Bookmark,
            crate::models::bookmark::CreateBookmarkRequest,
            crate::models::user::CurrentUserResponse,
            health::HealthResponse,
            auth::GatewayTicketResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Auth", description = "Login, logout, and gateway tickets"),
        (name = "Users", description = "Current user"),
        (name = "Bookmarks", description = "Bookmark management"),
    )
)]
pub struct ApiDoc;
