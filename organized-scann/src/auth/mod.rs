//! Authentication and authorization
//!
//! - [`TokenService`] issues and validates HS256 bearer tokens
//! - [`PasswordHasher`] stores passwords as Argon2id hashes
//! - [`Identity`] is the verified caller handed to protected handlers
//! - [`require_identity`] and [`require_admin`] guard routes

mod guard;
mod jwt;
mod password;

pub use guard::{extract_token, require_admin, require_identity};
pub use jwt::{Claims, IssuedToken, TokenService};
pub use password::PasswordHasher;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::Error;
use crate::models::Role;

/// Verified caller identity and role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
}

impl Identity {
    /// Whether the role is one of `allowed`; an empty list allows any role
    pub fn has_any_role(&self, allowed: &[Role]) -> bool {
        allowed.is_empty() || allowed.contains(&self.role)
    }
}

/// Reads the identity placed in request extensions by a guard layer
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or_else(|| Error::Unauthorized("Authentication required".to_string()))
    }
}
