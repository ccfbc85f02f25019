use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, DecodingKey, Validation};
use uuid::Uuid;

use crate::error::AppError;
use crate::routes::AppState;
use crate::services::auth_service::Claims;

/// Identity resolved from the bearer token, available to handlers as an
/// extractor. Authenticated routes never reach a service without it.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub id: Uuid,
}

/// Resolve `Authorization: Bearer <jwt>` into a user id.
pub fn authenticate(jwt_secret: &str, auth_header: Option<&str>) -> Result<Uuid, AppError> {
    let token = auth_header
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?
    .claims;

    claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok());
        let id = authenticate(&state.jwt_secret, header)?;
        Ok(AuthenticatedUser { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token_for(secret: &str, sub: &str, exp_offset_hours: i64) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: sub.to_string(),
            exp: (now + chrono::Duration::hours(exp_offset_hours)).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_bearer_token() {
        let id = Uuid::new_v4();
        let token = token_for("s3cret", &id.to_string(), 1);
        let header = format!("Bearer {}", token);
        assert_eq!(authenticate("s3cret", Some(&header)).unwrap(), id);
    }

    #[test]
    fn test_missing_header_rejected() {
        assert!(authenticate("s3cret", None).is_err());
        assert!(authenticate("s3cret", Some("Basic abc")).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = token_for("s3cret", &Uuid::new_v4().to_string(), -2);
        let header = format!("Bearer {}", token);
        assert!(authenticate("s3cret", Some(&header)).is_err());
    }

    #[test]
    fn test_non_uuid_subject_rejected() {
        let token = token_for("s3cret", "not-a-uuid", 1);
        let header = format!("Bearer {}", token);
        assert!(authenticate("s3cret", Some(&header)).is_err());
    }
}
