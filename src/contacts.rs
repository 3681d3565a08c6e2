use serde::Deserialize;
use sqlx::{Executor, Sqlite};

use crate::{admission::is_valid_email, auth::new_id, error::AppError, models::ContactRow};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

pub async fn submit<'e, E>(executor: E, form: &ContactForm) -> Result<String, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut errors = Vec::new();
    if form.name.trim().is_empty() {
        errors.push("Name is required.".to_string());
    }
    if !is_valid_email(form.email.trim()) {
        errors.push("Valid email is required.".to_string());
    }
    if form.message.trim().is_empty() {
        errors.push("Message is required.".to_string());
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let id = new_id();
    sqlx::query(
        "INSERT INTO contacts (id, name, email, message, is_read, created_at) VALUES (?, ?, ?, ?, 0, ?)",
    )
    .bind(&id)
    .bind(form.name.trim())
    .bind(form.email.trim())
    .bind(form.message.trim())
    .bind(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true))
    .execute(executor)
    .await?;
    Ok(id)
}

pub async fn recent<'e, E>(executor: E, limit: i64) -> Result<Vec<ContactRow>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, ContactRow>(
        "SELECT id, name, email, message, is_read, created_at FROM contacts ORDER BY created_at DESC, rowid DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(executor)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;

    #[actix_web::test]
    async fn messages_are_validated_then_listed_newest_first() {
        let pool = test_pool().await;
        let empty = ContactForm::default();
        match submit(&pool, &empty).await {
            Err(AppError::Validation(messages)) => assert_eq!(messages.len(), 3),
            other => panic!("expected validation error, got {other:?}"),
        }

        for n in 0..3 {
            let form = ContactForm {
                name: format!("Visitor {n}"),
                email: "visitor@example.com".to_string(),
                message: "Do you do walk-ins?".to_string(),
            };
            submit(&pool, &form).await.unwrap();
        }

        let latest = recent(&pool, 2).await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].name, "Visitor 2");
        assert!(!latest[0].is_read);
    }
}
