use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::{PublicUser, UserModel};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug)]
pub struct AuthSession {
    pub token: String,
    pub expires_at: chrono::DateTime<Utc>,
    pub user: PublicUser,
}

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(pool: PgPool, jwt_secret: String) -> Self {
        Self { pool, jwt_secret }
    }

    fn issue_jwt(&self, user_id: &str) -> AppResult<(String, chrono::DateTime<Utc>)> {
        let now = Utc::now();
        let exp = now + chrono::Duration::hours(24);
        let claims = Claims {
            sub: user_id.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("JWT error: {}", e)))?;
        Ok((token, exp))
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        phone: &str,
        password: &str,
    ) -> AppResult<AuthSession> {
        if name.trim().is_empty()
            || email.trim().is_empty()
            || phone.trim().is_empty()
            || password.is_empty()
        {
            return Err(AppError::Validation(
                "name, email, phone, and password are required".to_string(),
            ));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Password hashing error: {}", e)))?
            .to_string();

        let user: UserModel = sqlx::query_as(
            "INSERT INTO users (name, email, phone, password_hash) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, name, email, phone, password_hash, created_at",
        )
        .bind(name.trim())
        .bind(email.trim())
        .bind(phone.trim())
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("unique") || e.to_string().contains("duplicate") {
                AppError::Validation("Email already registered".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

        tracing::info!("Registered user {}", user.id);

        let (token, expires_at) = self.issue_jwt(&user.id.to_string())?;
        Ok(AuthSession {
            token,
            expires_at,
            user: user.into(),
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        if email.is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "email and password are required".to_string(),
            ));
        }

        let user: Option<UserModel> = sqlx::query_as(
            "SELECT id, name, email, phone, password_hash, created_at \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        // Missing user and wrong password are deliberately indistinguishable
        let user = user.ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|e| AppError::Internal(format!("Stored hash is invalid: {}", e)))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AppError::Unauthorized("Invalid credentials".to_string()))?;

        let (token, expires_at) = self.issue_jwt(&user.id.to_string())?;
        Ok(AuthSession {
            token,
            expires_at,
            user: user.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    #[test]
    fn test_claims_round_trip() {
        let now = Utc::now();
        let claims = Claims {
            sub: "8c2f6f0a-2c1a-4a3b-9a57-2f6a1f1b0c0d".to_string(),
            exp: (now + chrono::Duration::hours(24)).timestamp(),
            iat: now.timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, claims.sub);
        assert_eq!(decoded.claims.exp, claims.exp);
    }

    #[test]
    fn test_claims_reject_wrong_secret() {
        let now = Utc::now();
        let claims = Claims {
            sub: "user".to_string(),
            exp: (now + chrono::Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret-a"),
        )
        .unwrap();

        assert!(decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret-b"),
            &Validation::default(),
        )
        .is_err());
    }

    #[test]
    fn test_password_hash_verify() {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(b"hunter2", &salt)
            .unwrap()
            .to_string();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default()
            .verify_password(b"hunter2", &parsed)
            .is_ok());
        assert!(Argon2::default()
            .verify_password(b"hunter3", &parsed)
            .is_err());
    }
}
