use actix_web::{web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{admin_validator, AuthUser},
    bookings::{self, BookingFilter},
    catalog::{self, ServiceInput, StylistInput},
    contacts,
    error::AppError,
    models::BookingStatus,
    schedule::{self, parse_date, parse_time, AvailabilityRule},
    state::AppState,
};

const RECENT_CONTACTS: i64 = 20;

#[derive(Deserialize)]
struct BookingListQuery {
    status: Option<BookingStatus>,
    date: Option<chrono::NaiveDate>,
    page: Option<i64>,
}

#[derive(Deserialize)]
struct StatusForm {
    status: String,
}

#[derive(Deserialize)]
struct WeeklyRuleForm {
    stylist_id: String,
    day_of_week: u32,
    start_time: String,
    end_time: String,
}

#[derive(Deserialize)]
struct HolidayForm {
    stylist_id: String,
    holiday_date: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .wrap(HttpAuthentication::basic(admin_validator))
            .service(web::resource("/stats").route(web::get().to(stats)))
            .service(
                web::resource("/services")
                    .route(web::get().to(list_services))
                    .route(web::post().to(create_service)),
            )
            .service(
                web::resource("/services/{id}")
                    .route(web::post().to(update_service))
                    .route(web::delete().to(delete_service)),
            )
            .service(
                web::resource("/stylists")
                    .route(web::get().to(list_stylists))
                    .route(web::post().to(create_stylist)),
            )
            .service(
                web::resource("/stylists/{id}")
                    .route(web::post().to(update_stylist))
                    .route(web::delete().to(delete_stylist)),
            )
            .service(
                web::resource("/availability")
                    .route(web::get().to(list_availability))
                    .route(web::post().to(add_weekly_rule)),
            )
            .service(web::resource("/availability/holidays").route(web::post().to(add_holiday)))
            .service(web::resource("/availability/{id}").route(web::delete().to(delete_rule)))
            .service(web::resource("/bookings").route(web::get().to(list_bookings)))
            .service(
                web::resource("/bookings/{id}")
                    .route(web::post().to(update_booking_status))
                    .route(web::delete().to(delete_booking)),
            )
            .service(web::resource("/contacts").route(web::get().to(list_contacts))),
    );
}

async fn stats(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let stats = bookings::admin_stats(&state.db, state.clock.now().date()).await?;
    Ok(HttpResponse::Ok().json(stats))
}

async fn list_services(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let services = catalog::all_services(&state.db).await?;
    Ok(HttpResponse::Ok().json(json!({ "services": services })))
}

async fn create_service(
    state: web::Data<AppState>,
    form: web::Form<ServiceInput>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse, AppError> {
    let id = catalog::create_service(&state.db, &form).await?;
    log::info!("{} added service '{}'", auth.username, form.name.trim());
    Ok(HttpResponse::Created().json(json!({ "success": true, "id": id })))
}

async fn update_service(
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<ServiceInput>,
) -> Result<HttpResponse, AppError> {
    catalog::update_service(&state.db, &path, &form).await?;
    Ok(success())
}

async fn delete_service(
    state: web::Data<AppState>,
    path: web::Path<String>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse, AppError> {
    if !catalog::delete_service(&state.db, &path).await? {
        return Err(AppError::not_found("Service"));
    }
    log::info!("{} deleted service {}", auth.username, path.as_str());
    Ok(success())
}

async fn list_stylists(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let stylists = catalog::all_stylists(&state.db).await?;
    Ok(HttpResponse::Ok().json(json!({ "stylists": stylists })))
}

async fn create_stylist(
    state: web::Data<AppState>,
    form: web::Form<StylistInput>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse, AppError> {
    let id = catalog::create_stylist(&state.db, &form).await?;
    log::info!("{} added stylist '{}'", auth.username, form.name.trim());
    Ok(HttpResponse::Created().json(json!({ "success": true, "id": id })))
}

async fn update_stylist(
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<StylistInput>,
) -> Result<HttpResponse, AppError> {
    catalog::update_stylist(&state.db, &path, &form).await?;
    Ok(success())
}

async fn delete_stylist(
    state: web::Data<AppState>,
    path: web::Path<String>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse, AppError> {
    if !catalog::delete_stylist(&state.db, &path).await? {
        return Err(AppError::not_found("Stylist"));
    }
    log::info!("{} deleted stylist {}", auth.username, path.as_str());
    Ok(success())
}

async fn list_availability(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let rules = schedule::list_all(&state.db).await?;
    Ok(HttpResponse::Ok().json(json!({ "availability": rules })))
}

async fn add_weekly_rule(
    state: web::Data<AppState>,
    form: web::Form<WeeklyRuleForm>,
) -> Result<HttpResponse, AppError> {
    let mut errors = Vec::new();
    let start = parse_time(&form.start_time);
    let end = parse_time(&form.end_time);
    if start.is_none() {
        errors.push("Invalid start time.".to_string());
    }
    if end.is_none() {
        errors.push("Invalid end time.".to_string());
    }
    let (Some(start), Some(end)) = (start, end) else {
        return Err(AppError::Validation(errors));
    };

    let rule = AvailabilityRule::Weekly {
        day_of_week: form.day_of_week,
        start,
        end,
    };
    store_rule(&state, &form.stylist_id, rule).await
}

async fn add_holiday(
    state: web::Data<AppState>,
    form: web::Form<HolidayForm>,
) -> Result<HttpResponse, AppError> {
    let date = parse_date(&form.holiday_date).ok_or_else(|| AppError::validation("Invalid date."))?;
    store_rule(&state, &form.stylist_id, AvailabilityRule::Holiday { date }).await
}

async fn store_rule(
    state: &AppState,
    stylist_id: &str,
    rule: AvailabilityRule,
) -> Result<HttpResponse, AppError> {
    if catalog::get_stylist(&state.db, stylist_id).await?.is_none() {
        return Err(AppError::not_found("Stylist"));
    }
    let id = schedule::add_rule(&state.db, stylist_id, &rule).await?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "id": id })))
}

async fn delete_rule(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    if !schedule::delete_rule(&state.db, &path).await? {
        return Err(AppError::not_found("Availability rule"));
    }
    Ok(success())
}

async fn list_bookings(
    state: web::Data<AppState>,
    query: web::Query<BookingListQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = BookingFilter {
        status: query.status,
        date: query.date,
    };
    let page = bookings::list_bookings(&state.db, &filter, query.page).await?;
    Ok(HttpResponse::Ok().json(page))
}

async fn update_booking_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<StatusForm>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse, AppError> {
    let status: BookingStatus = form
        .status
        .parse()
        .map_err(|_| AppError::validation("Invalid status."))?;
    bookings::update_status(&state.db, &path, status).await?;
    log::info!("{} marked booking {} as {status}", auth.username, path.as_str());
    Ok(success())
}

async fn delete_booking(
    state: web::Data<AppState>,
    path: web::Path<String>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse, AppError> {
    if !bookings::delete_booking(&state.db, &path).await? {
        return Err(AppError::not_found("Booking"));
    }
    log::info!("{} deleted booking {}", auth.username, path.as_str());
    Ok(success())
}

async fn list_contacts(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let messages = contacts::recent(&state.db, RECENT_CONTACTS).await?;
    Ok(HttpResponse::Ok().json(json!({ "contacts": messages })))
}

fn success() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true }))
}
