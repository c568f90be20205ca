use actix_web::HttpResponse;
use rand::Rng;
use serde_json::json;

/// POST /v1/device - Issue an opaque device token.
pub async fn create() -> HttpResponse {
    let bytes: [u8; 16] = rand::rng().random();
    HttpResponse::Ok().json(json!({ "device_token": format!("dev_{}", hex::encode(bytes)) }))
}
