//! Health endpoints
//!
//! `/health` and `/health/live` always answer 200; `/health/ready`
//! flips to 503 while the process drains during shutdown.

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::middleware::error_handler::ApiResult;
use crate::state::AppState;

/// GET /health
pub async fn health_check() -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({ "status": "ok" })))
}

/// GET /health/live
pub async fn liveness_check() -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({ "status": "ok" })))
}

/// GET /health/ready
pub async fn readiness_check(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    if data.is_ready() {
        Ok(HttpResponse::Ok().json(json!({ "status": "ok" })))
    } else {
        Ok(HttpResponse::ServiceUnavailable().json(json!({ "status": "draining" })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_health_check() {
        let app = test::init_service(
            App::new().route("/health", web::get().to(health_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ok");
    }

    #[actix_web::test]
    async fn test_liveness_check() {
        let app = test::init_service(
            App::new().route("/health/live", web::get().to(liveness_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health/live").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }
}
