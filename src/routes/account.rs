use actix_web::{web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{user_validator, AuthUser},
    bookings,
    error::AppError,
    state::AppState,
};

#[derive(Deserialize)]
struct PageQuery {
    page: Option<i64>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/account")
            .wrap(HttpAuthentication::basic(user_validator))
            .service(web::resource("/bookings").route(web::get().to(my_bookings)))
            .service(web::resource("/bookings/{id}/cancel").route(web::post().to(cancel_booking))),
    );
}

async fn my_bookings(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let page = bookings::user_bookings(&state.db, &auth.id, query.page).await?;
    Ok(HttpResponse::Ok().json(page))
}

async fn cancel_booking(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    if !bookings::cancel_owned(&state.db, &path, &auth.id).await? {
        return Err(AppError::not_found("Booking"));
    }
    log::info!("{} cancelled booking {}", auth.username, path.as_str());
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Booking cancelled.",
    })))
}
