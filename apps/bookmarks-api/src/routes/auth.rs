//! Login redirect, OIDC callback, logout, and gateway tickets.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::middleware::{AuthUser, MaybeAuthUser};
use crate::auth::tokens::{self, SESSION_COOKIE};
use crate::error::{ApiError, ApiErrorBody};
use crate::models::user;
use crate::AppState;

/// Browser-facing routes mounted at the root.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login))
        .route("/auth/callback", get(callback))
        .route("/auth/logout", post(logout_redirect))
}

/// JSON routes mounted under `/api/v1`.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/auth/logout", post(logout))
        .route("/gateway/ticket", post(gateway_ticket))
}

// ---------------------------------------------------------------------------
// GET /auth/login
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/auth/login",
    tag = "Auth",
    responses((status = 303, description = "Redirect to the identity provider")),
)]
pub async fn login(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    let url = state
        .identity
        .authorize_url(&state.config.callback_url())?;
    Ok(Redirect::to(&url))
}

// ---------------------------------------------------------------------------
// GET /auth/callback?code=...
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
pub struct CallbackParams {
    /// One-time authorization code issued by the identity provider.
    pub code: Option<String>,
}

#[utoipa::path(
    get,
    path = "/auth/callback",
    tag = "Auth",
    params(CallbackParams),
    responses((status = 303, description = "Always redirects to the application origin")),
)]
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    params: Result<Query<CallbackParams>, QueryRejection>,
) -> (CookieJar, Redirect) {
    let redirect = Redirect::to(&state.config.app_origin);

    let code = params.ok().and_then(|Query(p)| p.code).filter(|c| !c.is_empty());
    let Some(code) = code else {
        return (jar, redirect);
    };

    match establish_session(&state, &code).await {
        Ok(token) => (jar.add(session_cookie(token)), redirect),
        Err(err) => {
            tracing::warn!(code = %err.code, message = %err.message, "login callback failed");
            (jar, redirect)
        }
    }
}

/// Exchange the code, mirror the user locally, and mint a session token.
async fn establish_session(state: &AppState, code: &str) -> Result<String, ApiError> {
    let claims = state
        .identity
        .exchange_code(code, &state.config.callback_url())
        .await?;

    let user = user::upsert_from_identity(
        &state.db,
        &claims.sub,
        claims.email.as_deref(),
        claims.name.as_deref(),
    )
    .await?;

    let token = tokens::generate_session_token();
    tokens::store_session(
        state.kv.as_ref(),
        &token,
        &tokens::SessionData {
            user_id: user.id.clone(),
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "session established");

    Ok(token)
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

// ---------------------------------------------------------------------------
// POST /api/v1/auth/logout, POST /auth/logout
// ---------------------------------------------------------------------------

fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, "")).path("/").removal().build();
    jar.remove(cookie)
}

async fn end_session(state: &AppState, auth: &AuthUser) -> Result<(), ApiError> {
    tokens::revoke_session(state.kv.as_ref(), &auth.token).await?;
    tracing::info!(user_id = %auth.user_id, "session revoked");
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Session revoked"),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
    ),
)]
pub async fn logout(
    auth: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    end_session(&state, &auth).await?;
    Ok((clear_session_cookie(jar), StatusCode::NO_CONTENT).into_response())
}

/// Form-post variant used by the landing page. Always lands back on the app.
async fn logout_redirect(
    MaybeAuthUser(auth): MaybeAuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    if let Some(auth) = auth {
        if let Err(err) = end_session(&state, &auth).await {
            tracing::warn!(code = %err.code, "logout failed");
        }
    }
    (clear_session_cookie(jar), Redirect::to(&state.config.app_origin))
}

// ---------------------------------------------------------------------------
// POST /api/v1/gateway/ticket
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
pub struct GatewayTicketResponse {
    /// Single-use ticket for the IDENTIFY frame.
    pub ticket: String,
    pub ws_url: String,
    /// Seconds until the ticket expires.
    pub expires_in: u64,
}

#[utoipa::path(
    post,
    path = "/api/v1/gateway/ticket",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Ticket issued", body = GatewayTicketResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
    ),
)]
pub async fn gateway_ticket(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<GatewayTicketResponse>, ApiError> {
    let ticket = tokens::generate_ws_ticket();
    tokens::store_ws_ticket(
        state.kv.as_ref(),
        &ticket,
        &tokens::WsTicketData { user_id },
    )
    .await?;

    Ok(Json(GatewayTicketResponse {
        ticket,
        ws_url: state.config.gateway_url(),
        expires_in: tokens::WS_TICKET_TTL_SECS,
    }))
}
