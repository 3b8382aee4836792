use crate::error::AppError;
use crate::models::weeklog::*;
use crate::services::weeklog as service;
use crate::AppState;
use ntex::http::{header, StatusCode};
use ntex::web::{self, HttpRequest, HttpResponse};
use std::sync::Arc;

pub async fn read_log(state: web::types::State<Arc<AppState>>) -> Result<HttpResponse, AppError> {
    let week = state.week()?;
    let entries = service::read(&state.log, &week)?;
    Ok(HttpResponse::Ok().json(&entries))
}

pub async fn add_entry(
    state: web::types::State<Arc<AppState>>,
    body: web::types::Json<AddEntryRequest>,
) -> Result<HttpResponse, AppError> {
    let week = state.week()?;
    let result = service::add(&state.log, &week, &body)?;
    Ok(HttpResponse::Ok().json(&result))
}

pub async fn remove_entry(
    state: web::types::State<Arc<AppState>>,
    body: web::types::Json<RemoveEntryRequest>,
) -> Result<HttpResponse, AppError> {
    let result = service::remove(&state.log, body.timestamp.as_ref())?;
    Ok(HttpResponse::Ok().json(&result))
}

pub async fn get_leaderboard(
    req: HttpRequest,
    state: web::types::State<Arc<AppState>>,
) -> Result<HttpResponse, AppError> {
    let week = state.week()?;
    let (digest, leaderboard) = service::reconstruct_snapshot(&state.log, &week)?;
    let etag = format!("\"{}\"", digest);

    let unchanged = req
        .headers()
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v == etag);
    if unchanged {
        return Ok(HttpResponse::build(StatusCode::NOT_MODIFIED)
            .header(header::ETAG, etag)
            .finish());
    }

    Ok(HttpResponse::Ok()
        .header(header::ETAG, etag)
        .json(&leaderboard))
}

pub async fn run_command(
    state: web::types::State<Arc<AppState>>,
    body: web::types::Json<CommandRequest>,
) -> Result<HttpResponse, AppError> {
    let output = service::dispatch(&state.log, &body.command, &body.args, || state.week())?;
    Ok(HttpResponse::Ok().json(&output))
}

pub async fn reset_log(state: web::types::State<Arc<AppState>>) -> Result<HttpResponse, AppError> {
    let week = state.week()?;
    let result = service::reset(&state.log, &week)?;
    Ok(HttpResponse::Ok().json(&result))
}
