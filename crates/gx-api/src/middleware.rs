//! Standard middleware for the GhostX server.

use actix_cors::Cors;
use actix_web::middleware::{DefaultHeaders, Logger};

/// remote-ip "request-line" status-code response-size "referrer" "user-agent"
pub fn standard_middleware() -> Logger {
    Logger::default()
}

/// The API is called from a browser extension, so any origin is allowed.
pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "DELETE"])
        .allow_any_header()
        .max_age(3600)
}

pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("Referrer-Policy", "strict-origin-when-cross-origin"))
}
