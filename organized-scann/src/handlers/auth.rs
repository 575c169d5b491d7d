//! Registration and login

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::extract::ValidJson;
use crate::auth::IssuedToken;
use crate::error::{Error, Result};
use crate::models::{Role, User, UserPayload};
use crate::repository::{FilterCondition, Pagination, Predicate, Repository};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const EMAIL_TAKEN: &str = "Email is already in use";

/// Login body
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub email: String,

    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
}

/// Token handed back after register or login
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub email: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl AuthResponse {
    fn new(issued: IssuedToken, user: &User) -> Self {
        Self {
            token: issued.token,
            email: user.email.clone(),
            role: user.role,
            expires_at: issued.expires_at,
        }
    }
}

fn by_email(email: &str) -> Predicate {
    Predicate::all().and(FilterCondition::eq("email", email))
}

/// `POST /api/v1/auth/register`
///
/// The requested role is only honored with `registration.allow_role_selection`;
/// otherwise the account is created as `USER`.
pub async fn register(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<UserPayload>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    if state.users().count(&by_email(&payload.email)).await? > 0 {
        return Err(Error::Conflict(EMAIL_TAKEN.to_string()));
    }

    let role = if state.config().registration.allow_role_selection {
        payload.role
    } else {
        if payload.role != Role::User {
            tracing::warn!(
                requested = %payload.role,
                "Role selection disabled, registering as USER"
            );
        }
        Role::User
    };

    let hash = state.passwords().hash_blocking(payload.password).await?;
    let user = state
        .users()
        .insert(User::new(payload.name, payload.email, hash, role))
        .await?;

    let issued = state.tokens().issue_token(user.id, &user.email, user.role)?;
    tracing::info!(user_id = user.id, role = %user.role, "Registered user");

    Ok((StatusCode::CREATED, Json(AuthResponse::new(issued, &user))))
}

/// `POST /api/v1/auth/login`
pub async fn login(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let user = state
        .users()
        .fetch(&by_email(&request.email), Some(Pagination::new(0, 1)))
        .await?
        .into_iter()
        .next();

    let Some(user) = user else {
        tracing::debug!("Login for unknown email");
        return Err(Error::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    let verified = state
        .passwords()
        .verify_blocking(request.password, user.password_hash.clone())
        .await?;
    if !verified {
        tracing::warn!(user_id = user.id, "Login with wrong password");
        return Err(Error::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let issued = state.tokens().issue_token(user.id, &user.email, user.role)?;
    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(AuthResponse::new(issued, &user)))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
}
