//! Stylist working hours: weekly rules and holiday exceptions.
//!
//! Both kinds share the `availability` table and are told apart by
//! `is_holiday`. Everything outside this module works with
//! [`AvailabilityRule`] instead of the flat row.

use chrono::{Datelike, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{Executor, Sqlite};

use crate::{
    auth::new_id,
    error::AppError,
    models::{AvailabilityListRow, AvailabilityRow},
};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityRule {
    Weekly {
        day_of_week: u32,
        start: NaiveTime,
        end: NaiveTime,
    },
    Holiday {
        date: NaiveDate,
    },
}

/// 1 = Monday ... 7 = Sunday.
pub fn day_of_week(date: NaiveDate) -> u32 {
    date.weekday().number_from_monday()
}

/// Strict `YYYY-MM-DD`; chrono alone would also take `2030-1-7`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if !DATE_RE.is_match(value) {
        return None;
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// Accepts `HH:MM` and the `HH:MM:SS` form older rows may carry.
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

impl AvailabilityRow {
    pub fn into_rule(self) -> Option<AvailabilityRule> {
        if self.is_holiday {
            let date = self.holiday_date.as_deref().and_then(parse_date);
            if date.is_none() {
                log::warn!("Holiday rule {} has no usable date, ignoring it", self.id);
            }
            return date.map(|date| AvailabilityRule::Holiday { date });
        }

        let day_of_week = u32::try_from(self.day_of_week).ok()?;
        match (parse_time(&self.start_time), parse_time(&self.end_time)) {
            (Some(start), Some(end)) => Some(AvailabilityRule::Weekly {
                day_of_week,
                start,
                end,
            }),
            _ => {
                log::warn!("Weekly rule {} has malformed hours, ignoring it", self.id);
                None
            }
        }
    }
}

/// All rules for a stylist, in insertion order.
pub async fn rules_for<'e, E>(executor: E, stylist_id: &str) -> Result<Vec<AvailabilityRule>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, AvailabilityRow>(
        r#"SELECT id, stylist_id, day_of_week, start_time, end_time, is_holiday, holiday_date
           FROM availability
           WHERE stylist_id = ?
           ORDER BY rowid"#,
    )
    .bind(stylist_id)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().filter_map(AvailabilityRow::into_rule).collect())
}

pub async fn list_all<'e, E>(executor: E) -> Result<Vec<AvailabilityListRow>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, AvailabilityListRow>(
        r#"SELECT a.id, a.stylist_id, h.name AS stylist_name, a.day_of_week, a.start_time,
                  a.end_time, a.is_holiday, a.holiday_date
           FROM availability a
           JOIN stylists h ON a.stylist_id = h.id
           ORDER BY h.name, a.day_of_week, a.rowid"#,
    )
    .fetch_all(executor)
    .await
}

/// Validates and stores a rule, returning its id.
pub async fn add_rule<'e, E>(executor: E, stylist_id: &str, rule: &AvailabilityRule) -> Result<String, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let id = new_id();
    let query = match rule {
        AvailabilityRule::Weekly {
            day_of_week,
            start,
            end,
        } => {
            if !(1..=7).contains(day_of_week) {
                return Err(AppError::validation("Day of week must be between 1 and 7."));
            }
            if start >= end {
                return Err(AppError::validation("Start time must be before end time."));
            }
            sqlx::query(
                r#"INSERT INTO availability (id, stylist_id, day_of_week, start_time, end_time, is_holiday, holiday_date)
                   VALUES (?, ?, ?, ?, ?, 0, NULL)"#,
            )
            .bind(id.clone())
            .bind(stylist_id.to_string())
            .bind(i64::from(*day_of_week))
            .bind(format_time(*start))
            .bind(format_time(*end))
        }
        AvailabilityRule::Holiday { date } => sqlx::query(
            r#"INSERT INTO availability (id, stylist_id, day_of_week, start_time, end_time, is_holiday, holiday_date)
               VALUES (?, ?, ?, '00:00', '00:00', 1, ?)"#,
        )
        .bind(id.clone())
        .bind(stylist_id.to_string())
        .bind(i64::from(day_of_week(*date)))
        .bind(format_date(*date)),
    };

    query.execute(executor).await?;
    Ok(id)
}

pub async fn delete_rule<'e, E>(executor: E, rule_id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM availability WHERE id = ?")
        .bind(rule_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
