//! Password hashing (bcrypt) and login tokens (HS256 JWT).

use anyhow::Context;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User row id.
    pub id: i64,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

pub fn hash_password(password: &str, cost: u32) -> anyhow::Result<String> {
    bcrypt::hash(password, cost).context("failed to hash password")
}

pub fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    bcrypt::verify(password, hash).context("stored password hash is malformed")
}

pub fn issue_token(user_id: i64, role: Role, secret: &str, ttl_secs: u64) -> anyhow::Result<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        id: user_id,
        role,
        iat: now,
        exp: now.saturating_add(i64::try_from(ttl_secs).unwrap_or(i64::MAX)),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("failed to sign token")
}

pub fn verify_token(token: &str, secret: &str) -> anyhow::Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .context("invalid token")?;
    Ok(data.claims)
}
