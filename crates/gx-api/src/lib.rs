//! # gx-api
//!
//! The web routing and orchestration layer for GhostX.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod pages;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{AppState, FeedDefaults};

use actix_web::web;

/// Mounts every page and API route.
///
/// The binary and the integration tests share this, so both see the same
/// decoder error handling.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| handlers::bad_request(err)))
        .app_data(web::QueryConfig::default().error_handler(|err, _| handlers::bad_request(err)))
        .app_data(web::PathConfig::default().error_handler(|err, _| handlers::bad_request(err)))
        .app_data(web::FormConfig::default().error_handler(|err, _| handlers::bad_request(err)))
        // Pages
        .route("/", web::get().to(pages::index))
        .route("/analyze", web::post().to(pages::analyze))
        .route("/dashboard", web::get().to(pages::dashboard))
        .service(
            web::scope("/api")
                .route("/analyze", web::post().to(handlers::analyze))
                // Per-entity widget
                .route("/entities/{id}/widget", web::get().to(handlers::widget))
                .route("/entities/{id}/replies", web::post().to(handlers::add_reply))
                .route("/entities/{id}/retweets", web::post().to(handlers::add_retweet))
                .route("/entities/{id}/likes", web::post().to(handlers::add_like))
                .route(
                    "/entities/{id}/{kind}/{index}",
                    web::delete().to(handlers::delete_annotation),
                )
                // Dashboard
                .route("/stats/{kind}", web::get().to(handlers::stats))
                .route("/feed", web::get().to(handlers::merged_feed))
                .route("/annotations/{kind}", web::get().to(handlers::list_kind))
                .route("/annotations/{kind}", web::delete().to(handlers::clear_kind))
                .route("/summary", web::get().to(handlers::summary))
                // Feed observer
                .route("/feed/discovered", web::post().to(handlers::discovered))
                .route("/feed/removed", web::post().to(handlers::removed))
                .route("/settings", web::get().to(handlers::get_settings))
                .route("/settings", web::post().to(handlers::update_settings))
                // Session
                .route("/session", web::get().to(handlers::session))
                .route("/session/login", web::post().to(handlers::login))
                .route("/session/logout", web::post().to(handlers::logout))
                .route("/groups", web::post().to(handlers::create_group))
                .route("/groups/join", web::post().to(handlers::join_group))
                .route("/groups/current", web::delete().to(handlers::leave_group)),
        );
}
