use actix_web::{
    dev::ServiceRequest, http::header::Header, web, Error, HttpMessage, HttpRequest,
};
use actix_web_httpauth::{
    extractors::basic::BasicAuth,
    headers::authorization::{Authorization, Basic},
};
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use rand_core::OsRng;
use regex::Regex;
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    admission::is_valid_email,
    error::AppError,
    models::{UserRow, ROLE_ADMIN, ROLE_USER},
    state::AppState,
};

pub const AUTH_REALM: &str = "Salonbook";

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").unwrap());

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// The account a request acts for.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed_hash = PasswordHash::new(password_hash);
    match parsed_hash {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

/// Stores a new account with an argon2 hash of `password`.
pub async fn create_account(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    role: &str,
    password: &str,
) -> Result<String, AppError> {
    let password_hash = hash_password(password)
        .map_err(|err| sqlx::Error::Protocol(format!("password hash failed: {err}")))?;

    let id = new_id();
    sqlx::query(
        r#"INSERT INTO users (id, username, email, role, password_hash, active, created_at)
           VALUES (?, ?, ?, ?, ?, 1, ?)"#,
    )
    .bind(&id)
    .bind(username)
    .bind(email)
    .bind(role)
    .bind(password_hash)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(id)
}

/// Self-service sign-up for customers. Returns the new user id.
pub async fn register_user(pool: &SqlitePool, form: &RegistrationForm) -> Result<String, AppError> {
    let username = form.username.trim();
    let email = form.email.trim();

    let mut errors = Vec::new();
    if username.len() < 3 {
        errors.push("Username must be at least 3 characters.".to_string());
    }
    if !USERNAME_RE.is_match(username) {
        errors.push("Username can only contain letters, numbers, and underscores.".to_string());
    }
    if !is_valid_email(email) {
        errors.push("Valid email is required.".to_string());
    }
    if form.password.len() < 6 {
        errors.push("Password must be at least 6 characters.".to_string());
    }
    if form.password != form.password_confirm {
        errors.push("Passwords do not match.".to_string());
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let taken = sqlx::query_as::<_, (String, String)>(
        "SELECT username, email FROM users WHERE username = ? OR email = ?",
    )
    .bind(username)
    .bind(email)
    .fetch_all(pool)
    .await?;
    if taken.iter().any(|(existing, _)| existing == username) {
        errors.push("Username already taken.".to_string());
    }
    if taken.iter().any(|(_, existing)| existing == email) {
        errors.push("Email already registered.".to_string());
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let id = create_account(pool, username, email, ROLE_USER, &form.password).await?;
    log::info!("Registered customer account '{username}'");
    Ok(id)
}

pub async fn authenticate_credentials(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<Option<AuthUser>, sqlx::Error> {
    let user = sqlx::query_as::<_, UserRow>(
        r#"SELECT id, username, role, password_hash
           FROM users
           WHERE username = ? AND active = 1
           LIMIT 1"#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    let Some(user) = user else {
        return Ok(None);
    };

    if !verify_password(password, &user.password_hash) {
        return Ok(None);
    }

    Ok(Some(AuthUser {
        id: user.id,
        username: user.username,
        role: user.role,
    }))
}

async fn authenticate(req: &ServiceRequest, credentials: &BasicAuth) -> Result<AuthUser, Error> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or(AppError::Unauthorized)?;
    let username = credentials.user_id();
    let password = credentials.password().unwrap_or_default();
    authenticate_credentials(&state.db, username, password)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::Unauthorized.into())
}

pub async fn user_validator(
    req: ServiceRequest,
    credentials: BasicAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    match authenticate(&req, &credentials).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
            Ok(req)
        }
        Err(err) => Err((err, req)),
    }
}

pub async fn admin_validator(
    req: ServiceRequest,
    credentials: BasicAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    match authenticate(&req, &credentials).await {
        Ok(user) => {
            if !user.is_admin() {
                return Err((AppError::Forbidden.into(), req));
            }
            req.extensions_mut().insert(user);
            Ok(req)
        }
        Err(err) => Err((err, req)),
    }
}

/// Resolves Basic credentials on routes where signing in is optional.
/// Missing or wrong credentials simply mean an anonymous caller.
pub async fn optional_user(pool: &SqlitePool, req: &HttpRequest) -> Result<Option<AuthUser>, AppError> {
    let Ok(auth) = Authorization::<Basic>::parse(req) else {
        return Ok(None);
    };
    let credentials = auth.into_scheme();
    let password = credentials.password().unwrap_or_default();
    authenticate_credentials(pool, credentials.user_id(), password)
        .await
        .map_err(AppError::from)
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
