use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{
    admission::{self, BookingRequest},
    auth::{optional_user, register_user, RegistrationForm},
    bookings, catalog,
    contacts::{self, ContactForm},
    error::AppError,
    schedule::{format_date, format_time, parse_date},
    slots,
    state::AppState,
};

const DEFAULT_SLOT_MINUTES: i64 = 30;

#[derive(Deserialize)]
struct DatesQuery {
    stylist_id: Option<String>,
}

#[derive(Deserialize)]
struct SlotsQuery {
    stylist_id: Option<String>,
    date: Option<String>,
    duration: Option<i64>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(health)))
        .service(
            web::scope("/api")
                .service(web::resource("/services").route(web::get().to(list_services)))
                .service(web::resource("/stylists").route(web::get().to(list_stylists)))
                .service(web::resource("/stylists/{id}").route(web::get().to(stylist_detail)))
                .service(web::resource("/available-dates").route(web::get().to(available_dates)))
                .service(web::resource("/available-slots").route(web::get().to(available_slots)))
                .service(web::resource("/bookings").route(web::post().to(create_booking)))
                .service(web::resource("/bookings/{id}").route(web::get().to(booking_detail)))
                .service(web::resource("/contact").route(web::post().to(create_contact)))
                .service(web::resource("/register").route(web::post().to(register))),
        );
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn list_services(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let services = catalog::active_services(&state.db).await?;
    Ok(HttpResponse::Ok().json(json!({ "services": services })))
}

async fn list_stylists(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let stylists = catalog::active_stylists(&state.db).await?;
    Ok(HttpResponse::Ok().json(json!({ "stylists": stylists })))
}

async fn stylist_detail(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let stylist = catalog::get_stylist(&state.db, &path.into_inner())
        .await?
        .filter(|stylist| stylist.active)
        .ok_or_else(|| AppError::not_found("Stylist"))?;
    Ok(HttpResponse::Ok().json(json!({ "stylist": stylist })))
}

async fn available_dates(
    state: web::Data<AppState>,
    query: web::Query<DatesQuery>,
) -> Result<HttpResponse, AppError> {
    let stylist_id = required(query.stylist_id.as_deref(), "Missing stylist_id.")?;
    let today = state.clock.now().date();

    let mut conn = state.db.acquire().await?;
    let dates: Vec<String> = slots::dates_for(&mut conn, stylist_id, today)
        .await?
        .into_iter()
        .map(format_date)
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "dates": dates,
        "stylist_id": stylist_id,
    })))
}

async fn available_slots(
    state: web::Data<AppState>,
    query: web::Query<SlotsQuery>,
) -> Result<HttpResponse, AppError> {
    let stylist_id = required(query.stylist_id.as_deref(), "Missing required parameters.")?;
    let raw_date = required(query.date.as_deref(), "Missing required parameters.")?;
    let date = parse_date(raw_date).ok_or_else(|| AppError::validation("Invalid date format."))?;
    let duration = query.duration.unwrap_or(DEFAULT_SLOT_MINUTES);
    if duration <= 0 {
        return Err(AppError::validation("Invalid duration."));
    }

    let now = state.clock.now();
    if date < now.date() {
        return Err(AppError::validation("Cannot book past dates."));
    }

    let mut conn = state.db.acquire().await?;
    let slots: Vec<String> = slots::slots_for(&mut conn, stylist_id, date, duration, now)
        .await?
        .into_iter()
        .map(format_time)
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "slots": slots,
        "date": format_date(date),
        "stylist_id": stylist_id,
    })))
}

async fn create_booking(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<BookingRequest>,
) -> Result<HttpResponse, AppError> {
    let owner = optional_user(&state.db, &req).await?;
    let booking_id = admission::admit_booking(
        &state.db,
        &form.into_inner(),
        owner.as_ref().map(|user| user.id.as_str()),
        state.clock.now(),
    )
    .await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "booking_id": booking_id,
        "message": "Booking created successfully!",
    })))
}

async fn booking_detail(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let booking = bookings::get_booking(&state.db, &path.into_inner())
        .await?
        .ok_or_else(|| AppError::not_found("Booking"))?;
    Ok(HttpResponse::Ok().json(json!({ "booking": booking })))
}

async fn create_contact(
    state: web::Data<AppState>,
    form: web::Form<ContactForm>,
) -> Result<HttpResponse, AppError> {
    contacts::submit(&state.db, &form.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Thank you! We'll get back to you soon.",
    })))
}

async fn register(
    state: web::Data<AppState>,
    form: web::Form<RegistrationForm>,
) -> Result<HttpResponse, AppError> {
    let user_id = register_user(&state.db, &form).await?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "user_id": user_id,
    })))
}

fn required<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str, AppError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::validation(message))
}
