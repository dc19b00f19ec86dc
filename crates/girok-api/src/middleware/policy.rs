//! Route policy guard
//!
//! Enforces the `ROUTE_POLICIES` table from `routes.rs` as a single
//! middleware: a request that lacks the material its route's policy
//! names (identity headers, session cookie or bearer token) is rejected
//! with 401 before any handler runs. Handlers still perform the full
//! validation — registry lookup for service IDs, session resolution —
//! so the guard checks presence and shape, not truth.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, ResponseError,
};
use futures_util::future::LocalBoxFuture;
use girok_core::entities::session::SESSION_COOKIE;
use std::{
    future::{ready, Ready},
    rc::Rc,
};
use uuid::Uuid;

use crate::middleware::error_handler::ApiError;
use crate::routes::{AccessPolicy, RoutePolicy, ROUTE_POLICIES};

pub struct PolicyGuard;

impl<S, B> Transform<S, ServiceRequest> for PolicyGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = PolicyGuardMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(PolicyGuardMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct PolicyGuardMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for PolicyGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(rule) = match_policy(req.method().as_str(), req.path()) {
            if !requirement_met(rule.policy, &req) {
                let (request, _) = req.into_parts();
                let response = ApiError::Unauthorized
                    .error_response()
                    .map_into_right_body();
                return Box::pin(async move { Ok(ServiceResponse::new(request, response)) });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(|res| res.map_into_left_body()) })
    }
}

/// First matching table row wins; fixed-segment rows precede their
/// `{id}` siblings in the table, mirroring route registration order.
fn match_policy(method: &str, path: &str) -> Option<&'static RoutePolicy> {
    ROUTE_POLICIES
        .iter()
        .find(|rule| rule.method == method && pattern_matches(rule.path, path))
}

/// Segment-wise match; a `{param}` segment matches any one non-empty
/// segment
fn pattern_matches(pattern: &str, path: &str) -> bool {
    let mut pattern_segments = pattern.split('/');
    let mut path_segments = path.split('/');

    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some(expected), Some(actual)) => {
                if expected.starts_with('{') && expected.ends_with('}') {
                    if actual.is_empty() {
                        return false;
                    }
                } else if expected != actual {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

fn requirement_met(policy: AccessPolicy, req: &ServiceRequest) -> bool {
    match policy {
        AccessPolicy::Public => true,
        AccessPolicy::ServiceId => has_uuid_header(req, "X-Service-Id"),
        AccessPolicy::OperatorHeader => has_uuid_header(req, "X-Operator-Id"),
        AccessPolicy::SubjectHeader => has_uuid_header(req, "X-Subject-Id"),
        AccessPolicy::Session => has_session_material(req),
    }
}

fn has_uuid_header(req: &ServiceRequest, name: &str) -> bool {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|raw| Uuid::parse_str(raw.trim()).is_ok())
        .unwrap_or(false)
}

fn has_session_material(req: &ServiceRequest) -> bool {
    if req.cookie(SESSION_COOKIE).is_some() {
        return true;
    }
    req.headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| !token.trim().is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_matching() {
        assert!(pattern_matches("/health", "/health"));
        assert!(pattern_matches(
            "/api/v1/sanctions/{id}/revoke",
            "/api/v1/sanctions/0190a8b0-0000-7000-8000-000000000000/revoke"
        ));
        assert!(!pattern_matches("/api/v1/sanctions/{id}", "/api/v1/sanctions"));
        assert!(!pattern_matches("/health", "/health/live"));
        assert!(!pattern_matches(
            "/api/v1/sanctions/{id}",
            "/api/v1/sanctions/abc/revoke"
        ));
    }

    #[test]
    fn test_fixed_segments_win_over_id_rows() {
        // /active is Public while /{id} needs the operator header; the
        // table must resolve /active to its own row
        let rule = match_policy("GET", "/api/v1/sanctions/active").unwrap();
        assert_eq!(rule.policy, AccessPolicy::Public);

        let rule = match_policy("GET", "/api/v1/dsr-requests/statistics").unwrap();
        assert_eq!(rule.policy, AccessPolicy::OperatorHeader);
        assert_eq!(rule.path, "/api/v1/dsr-requests/statistics");
    }

    #[test]
    fn test_unlisted_paths_pass_through() {
        assert!(match_policy("GET", "/definitely/not/a/route").is_none());
        assert!(match_policy("OPTIONS", "/api/v1/sanctions").is_none());
    }

    mod guarded {
        use super::super::PolicyGuard;
        use actix_web::{http::StatusCode, test, web, App, HttpResponse};
        use girok_core::entities::session::SESSION_COOKIE;
        use uuid::Uuid;

        async fn stub() -> HttpResponse {
            HttpResponse::Ok().finish()
        }

        /// A governed path with the required header reaches its handler;
        /// the same path without it stops at the guard
        #[actix_web::test]
        async fn test_operator_header_gate() {
            let app = test::init_service(
                App::new()
                    .wrap(PolicyGuard)
                    .route("/api/v1/sanctions", web::get().to(stub)),
            )
            .await;

            let bare = test::TestRequest::get()
                .uri("/api/v1/sanctions")
                .to_request();
            let resp = test::call_service(&app, bare).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

            let garbage = test::TestRequest::get()
                .uri("/api/v1/sanctions")
                .insert_header(("X-Operator-Id", "not-a-uuid"))
                .to_request();
            let resp = test::call_service(&app, garbage).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

            let with_header = test::TestRequest::get()
                .uri("/api/v1/sanctions")
                .insert_header(("X-Operator-Id", Uuid::new_v4().to_string()))
                .to_request();
            let resp = test::call_service(&app, with_header).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        #[actix_web::test]
        async fn test_subject_header_gate() {
            let path = "/api/v1/sanctions/{id}/appeal";
            let app = test::init_service(
                App::new()
                    .wrap(PolicyGuard)
                    .route(path, web::post().to(stub)),
            )
            .await;

            let uri = format!("/api/v1/sanctions/{}/appeal", Uuid::nil());
            let bare = test::TestRequest::post().uri(&uri).to_request();
            let resp = test::call_service(&app, bare).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

            let with_header = test::TestRequest::post()
                .uri(&uri)
                .insert_header(("X-Subject-Id", Uuid::new_v4().to_string()))
                .to_request();
            let resp = test::call_service(&app, with_header).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        #[actix_web::test]
        async fn test_session_gate_accepts_cookie_or_bearer() {
            let app = test::init_service(
                App::new()
                    .wrap(PolicyGuard)
                    .route("/api/v1/consents", web::get().to(stub)),
            )
            .await;

            let bare = test::TestRequest::get()
                .uri("/api/v1/consents")
                .to_request();
            let resp = test::call_service(&app, bare).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

            let with_cookie = test::TestRequest::get()
                .uri("/api/v1/consents")
                .cookie(actix_web::cookie::Cookie::new(
                    SESSION_COOKIE,
                    Uuid::new_v4().to_string(),
                ))
                .to_request();
            let resp = test::call_service(&app, with_cookie).await;
            assert_eq!(resp.status(), StatusCode::OK);

            let with_bearer = test::TestRequest::get()
                .uri("/api/v1/consents")
                .insert_header(("Authorization", "Bearer some-token"))
                .to_request();
            let resp = test::call_service(&app, with_bearer).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }
    }
}
