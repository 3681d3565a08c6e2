//! Booking persistence and the reporting queries built on it.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    auth::new_id,
    db,
    error::AppError,
    models::{page_offset, BookingDetailRow, BookingStatus, Page},
    schedule::{format_date, parse_date, parse_time},
    slots::BookedSpan,
};

pub const ADMIN_PAGE_SIZE: i64 = 15;
pub const ACCOUNT_PAGE_SIZE: i64 = 10;

const DETAIL_SELECT: &str = r#"SELECT b.id, b.user_id, b.customer_name, b.customer_email, b.customer_phone,
                  b.service_id, b.stylist_id, b.booking_date, b.booking_time, b.status, b.notes,
                  b.created_at, s.name AS service_name, s.price, s.duration, h.name AS stylist_name
           FROM bookings b
           JOIN services s ON b.service_id = s.id
           JOIN stylists h ON b.stylist_id = h.id"#;

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: Option<String>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub service_id: String,
    pub stylist_id: String,
    pub booking_date: String,
    pub booking_time: String,
    pub notes: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DayCount {
    pub booking_date: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ServiceRevenue {
    pub name: String,
    pub count: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub total_bookings: i64,
    pub pending_bookings: i64,
    pub confirmed_bookings: i64,
    pub total_revenue: f64,
    pub total_users: i64,
    pub today_bookings: i64,
    pub bookings_per_day: Vec<DayCount>,
    pub revenue_per_service: Vec<ServiceRevenue>,
}

/// Live bookings for a stylist on a date, each with its own service length.
pub async fn occupied_spans<'e, E>(
    executor: E,
    stylist_id: &str,
    date: NaiveDate,
) -> Result<Vec<BookedSpan>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, (String, i64)>(
        r#"SELECT b.booking_time, s.duration
           FROM bookings b
           JOIN services s ON b.service_id = s.id
           WHERE b.stylist_id = ? AND b.booking_date = ? AND b.status != 'cancelled'"#,
    )
    .bind(stylist_id)
    .bind(format_date(date))
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(time, duration)| match parse_time(&time) {
            Some(start) => Some(BookedSpan::new(start, duration)),
            None => {
                log::warn!("Skipping booking with unreadable time {time:?}");
                None
            }
        })
        .collect())
}

/// Inserts a `pending` booking. Callers are expected to have checked the slot.
pub async fn insert_booking<'e, E>(executor: E, booking: &NewBooking) -> Result<String, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let id = new_id();
    sqlx::query(
        r#"INSERT INTO bookings
           (id, user_id, customer_name, customer_email, customer_phone, service_id, stylist_id,
            booking_date, booking_time, status, notes, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(&booking.user_id)
    .bind(&booking.customer_name)
    .bind(&booking.customer_email)
    .bind(&booking.customer_phone)
    .bind(&booking.service_id)
    .bind(&booking.stylist_id)
    .bind(&booking.booking_date)
    .bind(&booking.booking_time)
    .bind(BookingStatus::Pending.as_str())
    .bind(&booking.notes)
    .bind(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true))
    .execute(executor)
    .await?;
    Ok(id)
}

pub async fn get_booking<'e, E>(executor: E, id: &str) -> Result<Option<BookingDetailRow>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, BookingDetailRow>(&format!("{DETAIL_SELECT} WHERE b.id = ? LIMIT 1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Changes a booking's status. Bringing a cancelled booking back to life
/// re-checks it against the stylist's other live bookings under the write
/// lock and fails with [`AppError::SlotUnavailable`] on overlap.
pub async fn update_status(pool: &SqlitePool, id: &str, status: BookingStatus) -> Result<(), AppError> {
    let mut tx = db::begin_write(pool).await?;

    let current = sqlx::query_as::<_, (String, String, String, String, i64)>(
        r#"SELECT b.stylist_id, b.booking_date, b.booking_time, b.status, s.duration
           FROM bookings b
           JOIN services s ON b.service_id = s.id
           WHERE b.id = ?"#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("Booking"))?;
    let (stylist_id, date, time, current_status, duration) = current;

    let reactivating = current_status == BookingStatus::Cancelled.as_str() && status != BookingStatus::Cancelled;
    if reactivating {
        let (Some(date), Some(start)) = (parse_date(&date), parse_time(&time)) else {
            return Err(AppError::validation("Booking has an unreadable date or time."));
        };
        let span = BookedSpan::new(start, duration);
        let live = occupied_spans(&mut *tx, &stylist_id, date).await?;
        if live.iter().any(|other| other.collides_with(&span)) {
            return Err(AppError::SlotUnavailable);
        }
    }

    sqlx::query("UPDATE bookings SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// Cancels a booking on behalf of its owner. Returns false when the booking
/// does not exist, belongs to someone else or is already cancelled.
pub async fn cancel_owned<'e, E>(executor: E, id: &str, user_id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE bookings SET status = 'cancelled' WHERE id = ? AND user_id = ? AND status != 'cancelled'",
    )
    .bind(id)
    .bind(user_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_booking<'e, E>(executor: E, id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM bookings WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Staff view: newest first, optionally narrowed by status and date.
pub async fn list_bookings(
    pool: &SqlitePool,
    filter: &BookingFilter,
    page: Option<i64>,
) -> Result<Page<BookingDetailRow>, sqlx::Error> {
    let (page, offset) = page_offset(page, ADMIN_PAGE_SIZE);
    let status = filter.status.map(|status| status.as_str());
    let date = filter.date.map(format_date);

    let total = sqlx::query_scalar::<_, i64>(
        r#"SELECT COUNT(*) FROM bookings b
           WHERE (?1 IS NULL OR b.status = ?1) AND (?2 IS NULL OR b.booking_date = ?2)"#,
    )
    .bind(status)
    .bind(&date)
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query_as::<_, BookingDetailRow>(&format!(
        r#"{DETAIL_SELECT}
           WHERE (?1 IS NULL OR b.status = ?1) AND (?2 IS NULL OR b.booking_date = ?2)
           ORDER BY b.created_at DESC, b.rowid DESC
           LIMIT ?3 OFFSET ?4"#
    ))
    .bind(status)
    .bind(&date)
    .bind(ADMIN_PAGE_SIZE)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(Page::new(rows, total, ADMIN_PAGE_SIZE, page))
}

/// Customer view of their own bookings, latest appointment first.
pub async fn user_bookings(
    pool: &SqlitePool,
    user_id: &str,
    page: Option<i64>,
) -> Result<Page<BookingDetailRow>, sqlx::Error> {
    let (page, offset) = page_offset(page, ACCOUNT_PAGE_SIZE);

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bookings WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query_as::<_, BookingDetailRow>(&format!(
        r#"{DETAIL_SELECT}
           WHERE b.user_id = ?
           ORDER BY b.booking_date DESC, b.booking_time DESC
           LIMIT ? OFFSET ?"#
    ))
    .bind(user_id)
    .bind(ACCOUNT_PAGE_SIZE)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(Page::new(rows, total, ACCOUNT_PAGE_SIZE, page))
}

pub async fn admin_stats(pool: &SqlitePool, today: NaiveDate) -> Result<AdminStats, sqlx::Error> {
    let total_bookings = count(pool, "SELECT COUNT(*) FROM bookings").await?;
    let pending_bookings = count(pool, "SELECT COUNT(*) FROM bookings WHERE status = 'pending'").await?;
    let confirmed_bookings =
        count(pool, "SELECT COUNT(*) FROM bookings WHERE status = 'confirmed'").await?;
    let total_users = count(pool, "SELECT COUNT(*) FROM users").await?;

    let total_revenue = sqlx::query_scalar::<_, f64>(
        r#"SELECT CAST(COALESCE(SUM(s.price), 0) AS REAL)
           FROM bookings b JOIN services s ON b.service_id = s.id
           WHERE b.status != 'cancelled'"#,
    )
    .fetch_one(pool)
    .await?;

    let today_bookings = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bookings WHERE booking_date = ?")
        .bind(format_date(today))
        .fetch_one(pool)
        .await?;

    let bookings_per_day = sqlx::query_as::<_, DayCount>(
        r#"SELECT booking_date, COUNT(*) AS count
           FROM bookings
           WHERE booking_date >= ? AND booking_date <= ?
           GROUP BY booking_date
           ORDER BY booking_date"#,
    )
    .bind(format_date(today - Duration::days(7)))
    .bind(format_date(today))
    .fetch_all(pool)
    .await?;

    let revenue_per_service = sqlx::query_as::<_, ServiceRevenue>(
        r#"SELECT s.name, COUNT(b.id) AS count, CAST(SUM(s.price) AS REAL) AS revenue
           FROM bookings b JOIN services s ON b.service_id = s.id
           WHERE b.status != 'cancelled'
           GROUP BY s.id
           ORDER BY revenue DESC"#,
    )
    .fetch_all(pool)
    .await?;

    Ok(AdminStats {
        total_bookings,
        pending_bookings,
        confirmed_bookings,
        total_revenue,
        total_users,
        today_bookings,
        bookings_per_day,
        revenue_per_service,
    })
}

async fn count(pool: &SqlitePool, sql: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(sql).fetch_one(pool).await
}
