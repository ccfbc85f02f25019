use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct UserModel {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// User shape exposed over the API. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl From<UserModel> for PublicUser {
    fn from(u: UserModel) -> Self {
        PublicUser {
            id: u.id,
            name: u.name,
            email: u.email,
            phone: u.phone,
        }
    }
}
