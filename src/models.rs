use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {other}")),
        }
    }
}

/// The columns credential checks need.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub role: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ServiceRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub duration: i64,
    pub price: f64,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StylistRow {
    pub id: String,
    pub name: String,
    pub bio: String,
    pub specialty: String,
    pub photo_url: String,
    pub active: bool,
}

/// Flat storage shape of an availability rule. Converted into
/// [`crate::schedule::AvailabilityRule`] before anything else looks at it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AvailabilityRow {
    pub id: String,
    pub stylist_id: String,
    pub day_of_week: i64,
    pub start_time: String,
    pub end_time: String,
    pub is_holiday: bool,
    pub holiday_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AvailabilityListRow {
    pub id: String,
    pub stylist_id: String,
    pub stylist_name: String,
    pub day_of_week: i64,
    pub start_time: String,
    pub end_time: String,
    pub is_holiday: bool,
    pub holiday_date: Option<String>,
}

/// Booking joined with the service and stylist it references.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookingDetailRow {
    pub id: String,
    pub user_id: Option<String>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub service_id: String,
    pub stylist_id: String,
    pub booking_date: String,
    pub booking_time: String,
    pub status: String,
    pub notes: String,
    pub created_at: String,
    pub service_name: String,
    pub price: f64,
    pub duration: i64,
    pub stylist_name: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ContactRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub pages: i64,
    pub current_page: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, per_page: i64, current_page: i64) -> Self {
        let pages = ((total + per_page - 1) / per_page).max(1);
        Self {
            items,
            total,
            pages,
            current_page,
        }
    }
}

/// Clamps a user supplied 1-based page number and returns it with the row offset.
pub fn page_offset(page: Option<i64>, per_page: i64) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    (page, (page - 1).saturating_mul(per_page))
}
