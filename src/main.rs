mod codec;
mod config;
mod error;
mod handlers;
mod models;
mod reconstruct;
mod services;
mod store;
mod validation;

use config::WeekConfig;
use error::AppError;
use ntex::web;
use ntex_cors::Cors;
use std::path::PathBuf;
use std::sync::Arc;
use store::WeekLog;
use tracing_subscriber::EnvFilter;

pub struct AppState {
    pub log: WeekLog,
    pub week_config: PathBuf,
}

impl AppState {
    /// The week configuration is re-read on every call so a rollover can swap
    /// it underneath a running server.
    pub fn week(&self) -> Result<WeekConfig, AppError> {
        WeekConfig::load(&self.week_config)
    }
}

#[ntex::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let log_path = std::env::var("WEEKLOG_PATH").unwrap_or_else(|_| "week/week.log".into());
    let week_config = std::env::var("WEEK_CONFIG_PATH").unwrap_or_else(|_| "week/config.json".into());
    let fsync = std::env::var("WEEKLOG_FSYNC")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);

    let log = WeekLog::open(&log_path, fsync).map_err(std::io::Error::other)?;
    let state = Arc::new(AppState {
        log,
        week_config: PathBuf::from(week_config),
    });

    match state.week() {
        Ok(week) => tracing::info!(
            log = %state.log.path().display(),
            week = ?week.number,
            categories = week.registry.len(),
            start = week.clock.start,
            "week configuration loaded"
        ),
        Err(e) => tracing::warn!(error = %e, "week configuration not usable yet"),
    }

    tracing::info!("Weeklog server starting on {}:{}", host, port);

    web::HttpServer::new(move || {
        web::App::new()
            .state(state.clone())
            .wrap(
                Cors::new()
                    .allowed_origin("*")
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec!["Content-Type", "If-None-Match"])
                    .max_age(3600)
                    .finish(),
            )
            .configure(routes)
    })
    .bind(format!("{}:{}", host, port))?
    .run()
    .await
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/health", web::get().to(health))
        .service(
            web::resource("/api/weeklog")
                .route(web::get().to(handlers::weeklog::read_log))
                .route(web::post().to(handlers::weeklog::add_entry)),
        )
        .route("/api/weeklog/remove", web::post().to(handlers::weeklog::remove_entry))
        .route("/api/weeklog/command", web::post().to(handlers::weeklog::run_command))
        .route("/api/weeklog/reset", web::post().to(handlers::weeklog::reset_log))
        .route("/api/leaderboard", web::get().to(handlers::weeklog::get_leaderboard));
}

async fn health() -> web::HttpResponse {
    web::HttpResponse::Ok().json(&serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
