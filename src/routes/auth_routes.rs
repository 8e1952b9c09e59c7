//! Authentication endpoint handlers.
//!
//! The refresh token travels exclusively as an http-only cookie; the access
//! token travels exclusively in the JSON body and is presented back as a
//! bearer header. Neither token is ever delivered on both channels.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::auth::password::{hash_password, verify_password};
use crate::models::user::{Language, Location, PublicProfile, Role, User, UserSummary};
use crate::state::AppState;
use crate::store::Store;
use crate::utils::http_helpers::{AuthenticatedUser, HTTPError};

const REFRESH_COOKIE: &str = "refreshToken";

/// Registers authentication routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/refresh", post(refresh_access_token))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignupRequest {
    #[serde(default)]
    phone_number: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    role: Option<Role>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    preferred_language: Option<Language>,
    #[serde(default)]
    location: Option<Location>,
    #[serde(default)]
    land_size: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    #[serde(default)]
    phone_number: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    user: UserSummary,
    access_token: String,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
    message: String,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

/// Rejects absent or blank required fields.
fn required(field: Option<String>, name: &str) -> Result<String, HTTPError> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(HTTPError::validation(format!(
            "Missing required field: {}",
            name
        ))),
    }
}

/// Builds the http-only refresh cookie with a Max-Age matching the token TTL.
fn refresh_cookie(state: &AppState, value: String) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(state.config.cookies.secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(state.config.jwt.refresh_exp))
        .build()
}

fn clear_refresh_cookie(state: &AppState) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(state.config.cookies.secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

/// Registers a new account and returns its public profile. No tokens are
/// issued here; the client follows up with a login.
async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, Json<PublicProfile>), HTTPError> {
    let phone_number = required(body.phone_number, "phoneNumber")?.trim().to_string();
    let password = required(body.password, "password")?;
    let name = required(body.name, "name")?.trim().to_string();

    let location = body
        .location
        .ok_or_else(|| HTTPError::validation("Missing required field: location"))?;
    if location.district.trim().is_empty() || location.village.trim().is_empty() {
        return Err(HTTPError::validation(
            "Location requires both district and village",
        ));
    }

    let role = body.role.unwrap_or_default();
    // Admin accounts are provisioned out of band.
    if role == Role::Admin {
        return Err(HTTPError::validation("Cannot self-register as admin"));
    }

    let existing = state
        .store
        .find_user_by_phone(&phone_number)
        .await
        .map_err(|e| {
            error!("Failed to check for existing user: {}", e);
            HTTPError::server("Internal server error")
        })?;
    if existing.is_some() {
        return Err(HTTPError::conflict("User already exists"));
    }

    let password_hash = hash_password(&password).map_err(|e| {
        error!("{}", e);
        HTTPError::server("Internal server error")
    })?;

    let user = User::new(
        phone_number,
        password_hash,
        name,
        role,
        body.email,
        body.preferred_language.unwrap_or_default(),
        location,
        body.land_size,
    );
    let user = state.store.insert_user(user).await.map_err(|e| {
        error!("Failed to insert user: {}", e);
        HTTPError::server("Failed to create user")
    })?;

    info!("Registered user '{}'", user.id);
    Ok((StatusCode::CREATED, Json(user.public_profile())))
}

/// Verifies credentials, then issues a token pair: access token in the body,
/// refresh token as an http-only cookie.
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), HTTPError> {
    let phone_number = required(body.phone_number, "phoneNumber")?.trim().to_string();
    let password = required(body.password, "password")?;

    let user = state
        .store
        .find_user_by_phone(&phone_number)
        .await
        .map_err(|e| {
            error!("Failed to look up user: {}", e);
            HTTPError::server("Internal server error")
        })?
        .ok_or_else(|| HTTPError::validation("User does not exist"))?;

    let password_ok = verify_password(&password, &user.password_hash).map_err(|e| {
        error!("{}", e);
        HTTPError::server("Internal server error")
    })?;
    if !password_ok {
        return Err(HTTPError::unauthorized("Invalid password"));
    }

    let pair = state.tokens.issue(&user).map_err(|e| {
        error!("Failed to issue tokens: {}", e);
        HTTPError::server("Internal server error")
    })?;
    state
        .store
        .set_refresh_token(&user.id, Some(&pair.refresh_token))
        .await
        .map_err(|e| {
            error!("Failed to store refresh token: {}", e);
            HTTPError::server("Internal server error")
        })?;

    info!("User '{}' logged in", user.id);
    let jar = jar.add(refresh_cookie(&state, pair.refresh_token));
    Ok((
        jar,
        Json(LoginResponse {
            user: user.summary(),
            access_token: pair.access_token,
            message: "User logged in successfully".to_string(),
        }),
    ))
}

/// Clears the stored refresh token and expires the cookie. Safe to call
/// again after the token is already gone.
async fn logout(
    AuthenticatedUser(user): AuthenticatedUser,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), HTTPError> {
    state
        .store
        .set_refresh_token(&user.id, None)
        .await
        .map_err(|e| {
            error!("Failed to clear refresh token: {}", e);
            HTTPError::server("Internal server error")
        })?;

    info!("User '{}' logged out", user.id);
    let jar = jar.add(clear_refresh_cookie(&state));
    Ok((
        jar,
        Json(MessageResponse {
            message: "User logged out successfully".to_string(),
        }),
    ))
}

/// Rotates the refresh token. The presented cookie must match the stored
/// value exactly; a stale token, or losing the conditional swap to a
/// concurrent rotation, is a 401 rather than a silent success.
async fn refresh_access_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<RefreshResponse>), HTTPError> {
    let incoming = jar
        .get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| HTTPError::unauthorized("Unauthorized request: No refresh token"))?;

    let claims = state.tokens.verify_refresh(&incoming).map_err(|e| {
        debug!("Refresh token rejected: {}", e);
        HTTPError::unauthorized("Invalid refresh token")
    })?;

    let user = state
        .store
        .find_user_by_id(&claims.sub)
        .await
        .map_err(|e| {
            error!("Failed to look up user: {}", e);
            HTTPError::server("Internal server error")
        })?
        .ok_or_else(|| HTTPError::unauthorized("Invalid refresh token: User not found"))?;

    if user.refresh_token.as_deref() != Some(incoming.as_str()) {
        warn!("Stale refresh token presented for user '{}'", user.id);
        return Err(HTTPError::unauthorized("Invalid refresh token"));
    }

    let pair = state.tokens.issue(&user).map_err(|e| {
        error!("Failed to issue tokens: {}", e);
        HTTPError::server("Internal server error")
    })?;

    let rotated = state
        .store
        .swap_refresh_token(&user.id, &incoming, &pair.refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to rotate refresh token: {}", e);
            HTTPError::server("Internal server error")
        })?;
    if !rotated {
        warn!("Refresh rotation lost a concurrent update for user '{}'", user.id);
        return Err(HTTPError::unauthorized("Invalid refresh token"));
    }

    debug!("Rotated refresh token for user '{}'", user.id);
    let jar = jar.add(refresh_cookie(&state, pair.refresh_token));
    Ok((
        jar,
        Json(RefreshResponse {
            access_token: pair.access_token,
            message: "Access token refreshed".to_string(),
        }),
    ))
}
