use std::sync::Arc;

use argon2::Argon2;
use axum::{Json, extract::State};
use chrono::Utc;
use tracing::warn;

use courier_db::{Database, DuplicateUser};
use courier_types::api::{
    Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, UserDetail,
};

use crate::error::ApiError;
use crate::identity;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    /// Process-wide signing secret; read-only after startup.
    pub secret_key: String,
    /// Hasher configured with the startup cost parameters.
    pub argon2: Argon2<'static>,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest("username and password are required".into()));
    }

    // Run the deliberately slow hash off the async runtime
    let argon2 = state.argon2.clone();
    let password = req.password;
    let password_hash =
        tokio::task::spawn_blocking(move || identity::hash_password(&argon2, &password)).await??;

    let now = Utc::now();

    let db = state.clone();
    let username = req.username.clone();
    let (first_name, last_name, phone) =
        (req.first_name.clone(), req.last_name.clone(), req.phone.clone());
    let stamp = now.to_rfc3339();
    let created = tokio::task::spawn_blocking(move || {
        db.db.create_user(&username, &password_hash, &first_name, &last_name, &phone, &stamp)
    })
    .await?;

    if let Err(e) = created {
        if e.downcast_ref::<DuplicateUser>().is_some() {
            return Err(ApiError::Conflict(req.username));
        }
        return Err(e.into());
    }

    let token = identity::issue_token(&state.secret_key, &Claims { username: req.username.clone() })?;

    Ok(Json(RegisterResponse {
        token,
        user: UserDetail {
            username: req.username,
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
            join_at: now,
            last_login_at: now,
        },
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let db = state.clone();
    let username = req.username.clone();
    let stored = tokio::task::spawn_blocking(move || db.db.get_password_hash(&username)).await??;

    // Unknown username and wrong password must be indistinguishable
    let Some(hash) = stored else {
        return Err(ApiError::InvalidCredentials);
    };

    let password = req.password;
    let ok = tokio::task::spawn_blocking(move || identity::verify_password(&password, &hash)).await?;
    if !ok {
        return Err(ApiError::InvalidCredentials);
    }

    let db = state.clone();
    let username = req.username.clone();
    let stamp = Utc::now().to_rfc3339();
    let updated =
        tokio::task::spawn_blocking(move || db.db.update_last_login(&username, &stamp)).await??;
    if !updated {
        warn!("login for {} raced a missing user record", req.username);
    }

    let token = identity::issue_token(&state.secret_key, &Claims { username: req.username })?;

    Ok(Json(LoginResponse { token }))
}
