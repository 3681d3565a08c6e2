//! Write-time validation and creation of bookings.
//!
//! The slot check and the insert run inside one `BEGIN IMMEDIATE`
//! transaction, rolled back if admission fails or is abandoned midway.
//! SQLite hands out a single write lock, so two submissions for the same
//! stylist serialize and the second one sees the first one's row.
//! The partial unique index on live `(stylist_id, booking_date, booking_time)`
//! backs this up and surfaces as [`AppError::SlotUnavailable`].

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    bookings::{self, NewBooking},
    catalog, db,
    error::AppError,
    schedule::{format_date, format_time, parse_date, parse_time},
    slots,
};

static TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}:\d{2}$").unwrap());
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9\s\-()]{7,20}$").unwrap());

/// A booking as submitted by the client. Every field is optional on the wire
/// so that missing input turns into a validation message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BookingRequest {
    pub service_id: String,
    pub stylist_id: String,
    pub booking_date: String,
    pub booking_time: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidBooking {
    pub service_id: String,
    pub stylist_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub notes: String,
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Shape checks only. Every failing check contributes a message.
pub fn validate(request: &BookingRequest, today: NaiveDate) -> Result<ValidBooking, AppError> {
    let mut errors = Vec::new();

    let service_id = request.service_id.trim();
    let stylist_id = request.stylist_id.trim();
    let name = request.customer_name.trim();
    let email = request.customer_email.trim();
    let phone = request.customer_phone.as_deref().unwrap_or_default().trim();

    if service_id.is_empty() {
        errors.push("Please select a service.");
    }
    if stylist_id.is_empty() {
        errors.push("Please select a stylist.");
    }

    let date = parse_date(&request.booking_date);
    if date.is_none() {
        errors.push("Invalid date.");
    }

    let time = Some(request.booking_time.trim())
        .filter(|value| TIME_RE.is_match(value))
        .and_then(parse_time);
    if time.is_none() {
        errors.push("Invalid time.");
    }

    if name.is_empty() {
        errors.push("Name is required.");
    }
    if !is_valid_email(email) {
        errors.push("Valid email is required.");
    }
    if !phone.is_empty() && !is_valid_phone(phone) {
        errors.push("Invalid phone number.");
    }
    if matches!(date, Some(date) if date < today) {
        errors.push("Cannot book past dates.");
    }

    match (date, time) {
        (Some(date), Some(time)) if errors.is_empty() => Ok(ValidBooking {
            service_id: service_id.to_string(),
            stylist_id: stylist_id.to_string(),
            date,
            time,
            customer_name: name.to_string(),
            customer_email: email.to_string(),
            customer_phone: phone.to_string(),
            notes: request.notes.as_deref().unwrap_or_default().trim().to_string(),
        }),
        _ => Err(AppError::Validation(
            errors.into_iter().map(str::to_string).collect(),
        )),
    }
}

/// Validates `request`, re-checks the slot against the live schedule and
/// stores a `pending` booking owned by `user_id`. Returns the new booking id.
///
/// `now` is the server's local wall-clock time.
pub async fn admit_booking(
    pool: &SqlitePool,
    request: &BookingRequest,
    user_id: Option<&str>,
    now: NaiveDateTime,
) -> Result<String, AppError> {
    let booking = validate(request, now.date())?;

    let service = catalog::get_service(pool, &booking.service_id)
        .await?
        .ok_or_else(|| AppError::InvalidSelection("Invalid service selected.".to_string()))?;
    if catalog::get_stylist(pool, &booking.stylist_id).await?.is_none() {
        return Err(AppError::InvalidSelection("Invalid stylist selected.".to_string()));
    }

    let mut tx = db::begin_write(pool).await?;
    match check_and_insert(&mut tx, &booking, service.duration, user_id, now).await {
        Ok(id) => {
            tx.commit().await?;
            log::info!(
                "Booking {id} admitted for stylist {} on {} at {}",
                booking.stylist_id,
                booking.date,
                format_time(booking.time)
            );
            Ok(id)
        }
        Err(AppError::SlotUnavailable) => {
            log::info!(
                "Slot {} {} for stylist {} was taken before admission",
                booking.date,
                format_time(booking.time),
                booking.stylist_id
            );
            Err(AppError::SlotUnavailable)
        }
        Err(err) => Err(err),
    }
}

async fn check_and_insert(
    conn: &mut SqliteConnection,
    booking: &ValidBooking,
    duration_minutes: i64,
    user_id: Option<&str>,
    now: NaiveDateTime,
) -> Result<String, AppError> {
    let free = slots::slots_for(&mut *conn, &booking.stylist_id, booking.date, duration_minutes, now).await?;
    if !free.contains(&booking.time) {
        return Err(AppError::SlotUnavailable);
    }

    let row = NewBooking {
        user_id: user_id.map(str::to_string),
        customer_name: booking.customer_name.clone(),
        customer_email: booking.customer_email.clone(),
        customer_phone: booking.customer_phone.clone(),
        service_id: booking.service_id.clone(),
        stylist_id: booking.stylist_id.clone(),
        booking_date: format_date(booking.date),
        booking_time: format_time(booking.time),
        notes: booking.notes.clone(),
    };
    Ok(bookings::insert_booking(&mut *conn, &row).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{file_pool, seed_salon, test_pool};
    use crate::models::BookingStatus;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()
    }

    fn before(date: NaiveDate) -> NaiveDateTime {
        (date - chrono::Duration::days(3)).and_hms_opt(8, 0, 0).unwrap()
    }

    fn request(service: &str, stylist: &str, time: &str) -> BookingRequest {
        BookingRequest {
            service_id: service.to_string(),
            stylist_id: stylist.to_string(),
            booking_date: "2030-01-07".to_string(),
            booking_time: time.to_string(),
            customer_name: "Grace Hopper".to_string(),
            customer_email: "grace@example.com".to_string(),
            customer_phone: Some("+1 (555) 010-2030".to_string()),
            notes: Some("  first visit ".to_string()),
        }
    }

    async fn live_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE status != 'cancelled'")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[test]
    fn validation_collects_every_message() {
        let request = BookingRequest {
            booking_date: "07/01/2030".to_string(),
            booking_time: "9am".to_string(),
            customer_email: "not-an-email".to_string(),
            customer_phone: Some("call me".to_string()),
            ..BookingRequest::default()
        };
        match validate(&request, monday()) {
            Err(AppError::Validation(messages)) => assert_eq!(
                messages,
                vec![
                    "Please select a service.",
                    "Please select a stylist.",
                    "Invalid date.",
                    "Invalid time.",
                    "Name is required.",
                    "Valid email is required.",
                    "Invalid phone number.",
                ]
            ),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn impossible_calendar_values_are_malformed() {
        let mut req = request("svc", "sty", "25:00");
        req.booking_date = "2030-02-30".to_string();
        match validate(&req, monday()) {
            Err(AppError::Validation(messages)) => {
                assert_eq!(messages, vec!["Invalid date.", "Invalid time."])
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn past_dates_are_rejected_and_today_is_allowed() {
        let req = request("svc", "sty", "10:00");
        let tomorrow = monday() + chrono::Duration::days(1);
        match validate(&req, tomorrow) {
            Err(AppError::Validation(messages)) => {
                assert_eq!(messages, vec!["Cannot book past dates."])
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        let valid = validate(&req, monday()).unwrap();
        assert_eq!(valid.notes, "first visit");
        assert_eq!(valid.time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }

    #[test]
    fn phone_is_optional() {
        let mut req = request("svc", "sty", "10:00");
        req.customer_phone = Some("   ".to_string());
        assert!(validate(&req, monday()).is_ok());
        req.customer_phone = None;
        assert!(validate(&req, monday()).is_ok());
    }

    #[actix_web::test]
    async fn admitted_booking_is_pending_and_owned() {
        let pool = test_pool().await;
        let salon = seed_salon(&pool).await;

        let id = admit_booking(
            &pool,
            &request(&salon.haircut, &salon.stylist, "10:00"),
            Some(salon.customer.as_str()),
            before(monday()),
        )
        .await
        .unwrap();

        let stored = bookings::get_booking(&pool, &id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Pending.as_str());
        assert_eq!(stored.user_id.as_deref(), Some(salon.customer.as_str()));
        assert_eq!(stored.booking_date, "2030-01-07");
        assert_eq!(stored.booking_time, "10:00");
        assert_eq!(stored.notes, "first visit");
    }

    #[actix_web::test]
    async fn unknown_references_are_an_invalid_selection() {
        let pool = test_pool().await;
        let salon = seed_salon(&pool).await;

        let err = admit_booking(&pool, &request("nope", &salon.stylist, "10:00"), None, before(monday()))
            .await
            .unwrap_err();
        assert_eq!(err.public_message(), "Invalid service selected.");

        let err = admit_booking(&pool, &request(&salon.haircut, "nope", "10:00"), None, before(monday()))
            .await
            .unwrap_err();
        assert_eq!(err.public_message(), "Invalid stylist selected.");
        assert_eq!(live_count(&pool).await, 0);
    }

    #[actix_web::test]
    async fn taken_slot_is_rejected_without_insert() {
        let pool = test_pool().await;
        let salon = seed_salon(&pool).await;
        let now = before(monday());

        admit_booking(&pool, &request(&salon.coloring, &salon.stylist, "10:00"), None, now)
            .await
            .unwrap();

        // 10:30 falls inside the 90 minute colouring.
        let err = admit_booking(&pool, &request(&salon.haircut, &salon.stylist, "10:30"), None, now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SlotUnavailable));
        assert_eq!(live_count(&pool).await, 1);

        admit_booking(&pool, &request(&salon.haircut, &salon.stylist, "11:30"), None, now)
            .await
            .unwrap();
        assert_eq!(live_count(&pool).await, 2);
    }

    #[actix_web::test]
    async fn off_grid_and_closed_times_are_unavailable() {
        let pool = test_pool().await;
        let salon = seed_salon(&pool).await;
        let now = before(monday());

        for time in ["10:15", "08:30", "18:00"] {
            let err = admit_booking(&pool, &request(&salon.haircut, &salon.stylist, time), None, now)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::SlotUnavailable), "{time}");
        }
        assert_eq!(live_count(&pool).await, 0);
    }

    #[actix_web::test]
    async fn abandoned_write_transaction_does_not_block_admission() {
        let pool = test_pool().await;
        let salon = seed_salon(&pool).await;

        // Same single connection: a leaked transaction would make the next
        // BEGIN fail.
        let tx = db::begin_write(&pool).await.unwrap();
        drop(tx);

        admit_booking(&pool, &request(&salon.haircut, &salon.stylist, "10:00"), None, before(monday()))
            .await
            .unwrap();
        assert_eq!(live_count(&pool).await, 1);
    }

    #[actix_web::test]
    async fn cancelled_booking_frees_its_slot() {
        let pool = test_pool().await;
        let salon = seed_salon(&pool).await;
        let now = before(monday());

        let id = admit_booking(&pool, &request(&salon.haircut, &salon.stylist, "10:00"), None, now)
            .await
            .unwrap();
        bookings::update_status(&pool, &id, BookingStatus::Cancelled).await.unwrap();

        admit_booking(&pool, &request(&salon.haircut, &salon.stylist, "10:00"), None, now)
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn concurrent_submissions_admit_exactly_one() {
        let (_dir, pool) = file_pool(4).await;
        let salon = seed_salon(&pool).await;
        let now = before(monday());

        let mut tasks = Vec::new();
        for i in 0..6 {
            let pool = pool.clone();
            // Alternate services so the overlap check, not only the unique
            // index, has to catch the losers.
            let service = if i % 2 == 0 { salon.coloring.clone() } else { salon.haircut.clone() };
            let time = if i % 2 == 0 { "10:00" } else { "10:30" };
            let req = request(&service, &salon.stylist, time);
            tasks.push(tokio::spawn(async move {
                admit_booking(&pool, &req, None, now).await
            }));
        }

        let mut admitted = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(AppError::SlotUnavailable) => {}
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }

        assert_eq!(admitted, 1);
        assert_eq!(live_count(&pool).await, 1);

        let spans = bookings::occupied_spans(&pool, &salon.stylist, monday()).await.unwrap();
        assert_eq!(spans.len(), 1);
    }
}
