//! Services and stylists.

use serde::Deserialize;
use sqlx::{Executor, Sqlite};

use crate::{
    auth::new_id,
    error::AppError,
    models::{ServiceRow, StylistRow},
};

const DEFAULT_PHOTO: &str = "images/default-avatar.png";

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub duration: i64,
    pub price: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StylistInput {
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub specialty: String,
    pub photo_url: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl ServiceInput {
    pub fn new(name: &str, duration: i64, price: f64) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            duration,
            price,
            active: true,
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("Service name is required.".to_string());
        }
        if self.duration <= 0 {
            errors.push("Duration must be a positive number of minutes.".to_string());
        }
        if !self.price.is_finite() || self.price < 0.0 {
            errors.push("Price must not be negative.".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

impl StylistInput {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bio: String::new(),
            specialty: String::new(),
            photo_url: None,
            active: true,
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("Stylist name is required."));
        }
        Ok(())
    }

    fn photo(&self) -> String {
        self.photo_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_PHOTO)
            .to_string()
    }
}

pub async fn active_services<'e, E>(executor: E) -> Result<Vec<ServiceRow>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, ServiceRow>(
        "SELECT id, name, description, duration, price, active FROM services WHERE active = 1 ORDER BY name",
    )
    .fetch_all(executor)
    .await
}

pub async fn all_services<'e, E>(executor: E) -> Result<Vec<ServiceRow>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, ServiceRow>(
        "SELECT id, name, description, duration, price, active FROM services ORDER BY name",
    )
    .fetch_all(executor)
    .await
}

/// Looks a service up regardless of its active flag.
pub async fn get_service<'e, E>(executor: E, id: &str) -> Result<Option<ServiceRow>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, ServiceRow>(
        "SELECT id, name, description, duration, price, active FROM services WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn create_service<'e, E>(executor: E, input: &ServiceInput) -> Result<String, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    input.validate()?;
    let id = new_id();
    sqlx::query(
        r#"INSERT INTO services (id, name, description, duration, price, active)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(input.name.trim())
    .bind(input.description.trim())
    .bind(input.duration)
    .bind(input.price)
    .bind(input.active)
    .execute(executor)
    .await?;
    Ok(id)
}

pub async fn update_service<'e, E>(executor: E, id: &str, input: &ServiceInput) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    input.validate()?;
    let result = sqlx::query(
        "UPDATE services SET name = ?, description = ?, duration = ?, price = ?, active = ? WHERE id = ?",
    )
    .bind(input.name.trim())
    .bind(input.description.trim())
    .bind(input.duration)
    .bind(input.price)
    .bind(input.active)
    .bind(id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Service"));
    }
    Ok(())
}

/// Bookings for the service go with it.
pub async fn delete_service<'e, E>(executor: E, id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM services WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn active_stylists<'e, E>(executor: E) -> Result<Vec<StylistRow>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, StylistRow>(
        "SELECT id, name, bio, specialty, photo_url, active FROM stylists WHERE active = 1 ORDER BY name",
    )
    .fetch_all(executor)
    .await
}

pub async fn all_stylists<'e, E>(executor: E) -> Result<Vec<StylistRow>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, StylistRow>(
        "SELECT id, name, bio, specialty, photo_url, active FROM stylists ORDER BY name",
    )
    .fetch_all(executor)
    .await
}

pub async fn get_stylist<'e, E>(executor: E, id: &str) -> Result<Option<StylistRow>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, StylistRow>(
        "SELECT id, name, bio, specialty, photo_url, active FROM stylists WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn create_stylist<'e, E>(executor: E, input: &StylistInput) -> Result<String, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    input.validate()?;
    let id = new_id();
    sqlx::query(
        r#"INSERT INTO stylists (id, name, bio, specialty, photo_url, active)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(input.name.trim())
    .bind(input.bio.trim())
    .bind(input.specialty.trim())
    .bind(input.photo())
    .bind(input.active)
    .execute(executor)
    .await?;
    Ok(id)
}

pub async fn update_stylist<'e, E>(executor: E, id: &str, input: &StylistInput) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    input.validate()?;
    let result = sqlx::query(
        "UPDATE stylists SET name = ?, bio = ?, specialty = ?, photo_url = ?, active = ? WHERE id = ?",
    )
    .bind(input.name.trim())
    .bind(input.bio.trim())
    .bind(input.specialty.trim())
    .bind(input.photo())
    .bind(input.active)
    .bind(id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Stylist"));
    }
    Ok(())
}

/// Removes the stylist together with their rules and bookings.
pub async fn delete_stylist<'e, E>(executor: E, id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM stylists WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
