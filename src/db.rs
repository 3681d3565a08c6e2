use std::{fs, path::Path, str::FromStr};

use chrono::NaiveTime;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::{
    auth::create_account,
    catalog::{self, ServiceInput, StylistInput},
    config::AppConfig,
    error::AppError,
    models::ROLE_ADMIN,
    schedule::{self, AvailabilityRule},
};

pub async fn connect(config: &AppConfig) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Opens a transaction that holds SQLite's write lock from the start, so a
/// read-check-write sequence inside it cannot interleave with another writer.
/// Dropping the transaction without committing rolls it back.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = if let Some(path) = db_url.strip_prefix("sqlite://") {
        Some(path)
    } else if let Some(path) = db_url.strip_prefix("sqlite:") {
        Some(path)
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = path.strip_prefix("file:").unwrap_or(path);
    let db_path = Path::new(path);
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub async fn seed_defaults(pool: &SqlitePool, config: &AppConfig) -> Result<(), AppError> {
    seed_admin(pool, config).await?;
    if config.seed_demo {
        seed_demo_catalog(pool).await?;
    }
    Ok(())
}

async fn seed_admin(pool: &SqlitePool, config: &AppConfig) -> Result<(), AppError> {
    let existing = sqlx::query_as::<_, (String,)>("SELECT id FROM users WHERE role = ? LIMIT 1")
        .bind(ROLE_ADMIN)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    if config.admin.uses_default_password() {
        log::warn!("ADMIN_PASSWORD not set. Using default password 'admin'. Set ADMIN_PASSWORD in production.");
    }

    create_account(
        pool,
        &config.admin.username,
        &config.admin.email,
        ROLE_ADMIN,
        &config.admin.password,
    )
    .await?;

    log::info!("Seeded admin account '{}'", config.admin.username);
    Ok(())
}

/// Five services, three stylists working Mon-Fri 09:00-18:00 and Saturday
/// 10:00-14:00. Skipped once any service exists.
async fn seed_demo_catalog(pool: &SqlitePool) -> Result<(), AppError> {
    let services: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM services")
        .fetch_one(pool)
        .await?;
    if services > 0 {
        return Ok(());
    }

    let catalog_entries = [
        ("Classic Haircut", "A professional haircut tailored to your style. Includes wash and blow-dry.", 30, 35.0),
        ("Hair Coloring", "Full color treatment with premium products. Includes consultation.", 90, 85.0),
        ("Blow Dry & Styling", "Professional blow-dry and styling for any occasion.", 45, 45.0),
        ("Hair Treatment", "Deep conditioning and repair treatment for damaged hair.", 60, 55.0),
        ("Beard Trim", "Professional beard trimming and shaping.", 20, 20.0),
    ];
    for (name, description, duration, price) in catalog_entries {
        let mut input = ServiceInput::new(name, duration, price);
        input.description = description.to_string();
        catalog::create_service(pool, &input).await?;
    }

    let stylists = [
        ("Sophie Martin", "Modern cuts and creative coloring.", "Coloring & Cuts"),
        ("James Wilson", "Precise fades and classic gentleman cuts.", "Barbering & Styling"),
        ("Elena Rodriguez", "Hair restoration and bridal styling.", "Treatments & Bridal"),
    ];
    let hours = |start: u32, end: u32| {
        NaiveTime::from_hms_opt(start, 0, 0).zip(NaiveTime::from_hms_opt(end, 0, 0))
    };
    for (name, bio, specialty) in stylists {
        let mut input = StylistInput::named(name);
        input.bio = bio.to_string();
        input.specialty = specialty.to_string();
        let stylist_id = catalog::create_stylist(pool, &input).await?;

        for day_of_week in 1..=6 {
            let window = if day_of_week == 6 { hours(10, 14) } else { hours(9, 18) };
            let Some((start, end)) = window else { continue };
            let rule = AvailabilityRule::Weekly {
                day_of_week,
                start,
                end,
            };
            schedule::add_rule(pool, &stylist_id, &rule).await?;
        }
    }

    log::info!("Seeded demo catalog");
    Ok(())
}
