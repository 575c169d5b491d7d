//! Route guards that turn a bearer token into an [`Identity`]

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use super::{Identity, TokenService};
use crate::error::Error;
use crate::models::Role;

/// Extract the bearer token from the Authorization header
pub fn extract_token(headers: &HeaderMap) -> Result<&str, Error> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Unauthorized("Missing Authorization header".to_string()))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| Error::Unauthorized("Invalid Authorization header format".to_string()))
}

async fn authorize(
    tokens: &TokenService,
    mut request: Request,
    next: Next,
    allowed: &[Role],
) -> Result<Response, Error> {
    let identity = tokens.validate_token(extract_token(request.headers())?)?;

    if !identity.has_any_role(allowed) {
        tracing::warn!(
            user_id = identity.user_id,
            role = %identity.role,
            path = %request.uri().path(),
            "Role not permitted"
        );
        return Err(Error::Forbidden(
            "Insufficient role for this operation".to_string(),
        ));
    }

    request.extensions_mut().insert::<Identity>(identity);
    Ok(next.run(request).await)
}

/// Require any authenticated caller
pub async fn require_identity(
    State(tokens): State<TokenService>,
    request: Request,
    next: Next,
) -> Result<Response, Error> {
    authorize(&tokens, request, next, &[]).await
}

/// Require an authenticated caller with the `ADMIN` role
pub async fn require_admin(
    State(tokens): State<TokenService>,
    request: Request,
    next: Next,
) -> Result<Response, Error> {
    authorize(&tokens, request, next, &[Role::Admin]).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_token() {
        let mut headers = HeaderMap::new();
        assert!(extract_token(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_token(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_token(&headers).unwrap(), "abc.def.ghi");

        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        assert!(extract_token(&headers).is_err());
    }
}
