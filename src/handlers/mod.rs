pub mod device_handlers;
pub mod intake_handlers;
pub mod request_handlers;

use actix_web::{HttpRequest, web};

use crate::errors::ApiError;

/// Register the /v1 API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/v1")
            .route("/device", web::post().to(device_handlers::create))
            .route("/ai/invoke", web::post().to(intake_handlers::invoke))
            .route("/ai/rank", web::post().to(request_handlers::rerank))
            .route("/requests", web::post().to(request_handlers::create))
            .route("/requests", web::get().to(request_handlers::list))
            .route("/requests/{id}", web::get().to(request_handlers::detail))
            .route("/requests/{id}/donate", web::post().to(request_handlers::donate))
            .route("/requests/{id}/claim", web::post().to(request_handlers::claim))
            .route("/requests/{id}/delivered", web::post().to(request_handlers::delivered)),
    );
}

/// Extract the caller's opaque device token. Accepted as given (no identity
/// verification, per the trust model); missing or empty is a 400.
pub fn require_device(req: &HttpRequest) -> Result<String, ApiError> {
    req.headers()
        .get("X-Device-Token")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .ok_or_else(|| ApiError::Validation("Missing X-Device-Token".to_string()))
}
