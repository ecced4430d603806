use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::auth;
use crate::db::now_stamp;
use crate::http::error::{message, ApiError, ApiResult};
use crate::http::extract::{optional, required, ApiJson};
use crate::http::types::AppState;
use crate::models::{Role, User};

const BAD_LOGIN: &str = "Invalid email or password";

#[derive(Debug, Deserialize)]
pub struct SignupParams {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginParams {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
}

fn normalize_email(raw: Option<String>) -> ApiResult<String> {
    Ok(required(raw, "email")?.to_ascii_lowercase())
}

fn required_password(raw: Option<String>) -> ApiResult<String> {
    raw.filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::bad_params("missing password"))
}

pub fn create_user(conn: &Connection, email: &str, password_hash: &str, role: Role) -> ApiResult<i64> {
    conn.execute(
        "INSERT INTO users(email, password_hash, role, created_at) VALUES(?, ?, ?, ?)",
        (email, password_hash, role.as_str(), now_stamp()),
    )
    .map_err(|e| ApiError::storage_or_conflict(e, "Email already exists"))?;
    Ok(conn.last_insert_rowid())
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> ApiResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE email = ?", User::COLUMNS);
    let user = conn.query_row(&sql, [email], User::from_row).optional()?;
    Ok(user)
}

pub async fn handle_signup(
    State(state): State<AppState>,
    ApiJson(params): ApiJson<SignupParams>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let email = normalize_email(params.email)?;
    let password = required_password(params.password)?;
    let role = match optional(params.role) {
        Some(r) => r.parse::<Role>().map_err(ApiError::BadParams)?,
        None => Role::default(),
    };

    let cost = state.config.bcrypt_cost;
    let password_hash = tokio::task::spawn_blocking(move || auth::hash_password(&password, cost))
        .await
        .context("password hashing task failed")??;

    let conn = state.db()?;
    let user_id = create_user(&conn, &email, &password_hash, role)?;
    info!(user_id, role = %role, "user created");
    Ok((StatusCode::CREATED, message("User created successfully")))
}

pub async fn handle_login(
    State(state): State<AppState>,
    ApiJson(params): ApiJson<LoginParams>,
) -> ApiResult<Json<LoginResponse>> {
    let email = normalize_email(params.email)?;
    let password = required_password(params.password)?;

    let user = {
        let conn = state.db()?;
        find_user_by_email(&conn, &email)?
    };
    let Some(user) = user else {
        return Err(ApiError::Unauthorized(BAD_LOGIN.to_string()));
    };

    let hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || auth::verify_password(&password, &hash))
        .await
        .context("password check task failed")??;
    if !valid {
        return Err(ApiError::Unauthorized(BAD_LOGIN.to_string()));
    }

    let token = auth::issue_token(
        user.id,
        user.role,
        &state.config.jwt_secret,
        state.config.token_ttl_secs,
    )?;
    info!(user_id = user.id, "login");
    Ok(Json(LoginResponse {
        token,
        role: user.role,
    }))
}
