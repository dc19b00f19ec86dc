//! Route configuration and the authoritative access-policy table
//!
//! Auth is explicit per route. `ROUTE_POLICIES` below is the single
//! place that states what each route requires; the `PolicyGuard`
//! middleware enforces it for every request (presence and shape of the
//! required material), and handlers resolve the full requirement
//! through the helpers in `middleware::auth` (registry lookup, session
//! validation, operator context).
//!
//! Rows are ordered so fixed segments precede their `{id}` siblings,
//! matching route registration: the guard takes the first matching row.

use actix_web::{web, HttpResponse, Scope};

use crate::handlers::{auth, consent, dsr, health, legal, mfa, sanction, session};

/// What a route requires before its handler logic runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    /// No auth at all (health, liveness)
    Public,
    /// Validated `X-Service-Id` header
    ServiceId,
    /// A valid session (cookie or bearer token)
    Session,
    /// `X-Operator-Id` context header
    OperatorHeader,
    /// `X-Subject-Id` context header
    SubjectHeader,
}

/// One row of the policy table
pub struct RoutePolicy {
    pub method: &'static str,
    pub path: &'static str,
    pub policy: AccessPolicy,
}

/// The authoritative route policy table
pub const ROUTE_POLICIES: &[RoutePolicy] = &[
    RoutePolicy { method: "GET", path: "/health", policy: AccessPolicy::Public },
    RoutePolicy { method: "GET", path: "/health/live", policy: AccessPolicy::Public },
    RoutePolicy { method: "GET", path: "/health/ready", policy: AccessPolicy::Public },
    RoutePolicy { method: "POST", path: "/api/v1/auth/register", policy: AccessPolicy::ServiceId },
    RoutePolicy { method: "POST", path: "/api/v1/auth/login", policy: AccessPolicy::ServiceId },
    RoutePolicy { method: "POST", path: "/api/v1/auth/login/mfa", policy: AccessPolicy::Public },
    RoutePolicy { method: "POST", path: "/api/v1/auth/logout", policy: AccessPolicy::Public },
    RoutePolicy { method: "POST", path: "/api/v1/auth/refresh", policy: AccessPolicy::Public },
    RoutePolicy { method: "GET", path: "/api/v1/auth/me", policy: AccessPolicy::Session },
    RoutePolicy { method: "POST", path: "/api/v1/auth/password", policy: AccessPolicy::Session },
    RoutePolicy { method: "POST", path: "/api/v1/auth/mfa/setup", policy: AccessPolicy::Session },
    RoutePolicy { method: "POST", path: "/api/v1/auth/mfa/verify", policy: AccessPolicy::Session },
    RoutePolicy { method: "POST", path: "/api/v1/auth/mfa/disable", policy: AccessPolicy::Session },
    RoutePolicy { method: "POST", path: "/api/v1/auth/mfa/backup-codes/regenerate", policy: AccessPolicy::Session },
    RoutePolicy { method: "GET", path: "/api/v1/auth/sessions", policy: AccessPolicy::Session },
    RoutePolicy { method: "DELETE", path: "/api/v1/auth/sessions", policy: AccessPolicy::Session },
    RoutePolicy { method: "DELETE", path: "/api/v1/auth/sessions/{id}", policy: AccessPolicy::Session },
    RoutePolicy { method: "POST", path: "/api/v1/sanctions", policy: AccessPolicy::OperatorHeader },
    RoutePolicy { method: "GET", path: "/api/v1/sanctions", policy: AccessPolicy::OperatorHeader },
    RoutePolicy { method: "GET", path: "/api/v1/sanctions/active", policy: AccessPolicy::Public },
    RoutePolicy { method: "GET", path: "/api/v1/sanctions/{id}", policy: AccessPolicy::OperatorHeader },
    RoutePolicy { method: "POST", path: "/api/v1/sanctions/{id}/revoke", policy: AccessPolicy::OperatorHeader },
    RoutePolicy { method: "POST", path: "/api/v1/sanctions/{id}/extend", policy: AccessPolicy::OperatorHeader },
    RoutePolicy { method: "POST", path: "/api/v1/sanctions/{id}/reduce", policy: AccessPolicy::OperatorHeader },
    RoutePolicy { method: "POST", path: "/api/v1/sanctions/{id}/appeal", policy: AccessPolicy::SubjectHeader },
    RoutePolicy { method: "POST", path: "/api/v1/sanctions/{id}/appeal/review", policy: AccessPolicy::OperatorHeader },
    RoutePolicy { method: "POST", path: "/api/v1/sanctions/{id}/appeal/decision", policy: AccessPolicy::OperatorHeader },
    RoutePolicy { method: "GET", path: "/api/v1/legal/documents/latest", policy: AccessPolicy::Public },
    RoutePolicy { method: "GET", path: "/api/v1/legal/documents/{id}", policy: AccessPolicy::Public },
    RoutePolicy { method: "GET", path: "/api/v1/legal/documents/{type}/{locale}/versions", policy: AccessPolicy::Public },
    RoutePolicy { method: "POST", path: "/api/v1/legal/documents/{type}/{locale}/versions", policy: AccessPolicy::OperatorHeader },
    RoutePolicy { method: "GET", path: "/api/v1/legal/laws", policy: AccessPolicy::Public },
    RoutePolicy { method: "GET", path: "/api/v1/legal/laws/{code}", policy: AccessPolicy::Public },
    RoutePolicy { method: "GET", path: "/api/v1/legal/requirements", policy: AccessPolicy::Public },
    RoutePolicy { method: "POST", path: "/api/v1/consents", policy: AccessPolicy::Session },
    RoutePolicy { method: "GET", path: "/api/v1/consents", policy: AccessPolicy::Session },
    RoutePolicy { method: "GET", path: "/api/v1/consents/status", policy: AccessPolicy::Session },
    RoutePolicy { method: "DELETE", path: "/api/v1/consents/{id}", policy: AccessPolicy::Session },
    RoutePolicy { method: "POST", path: "/api/v1/dsr-requests", policy: AccessPolicy::Session },
    RoutePolicy { method: "GET", path: "/api/v1/dsr-requests", policy: AccessPolicy::OperatorHeader },
    RoutePolicy { method: "GET", path: "/api/v1/dsr-requests/statistics", policy: AccessPolicy::OperatorHeader },
    RoutePolicy { method: "GET", path: "/api/v1/dsr-requests/overdue", policy: AccessPolicy::OperatorHeader },
    RoutePolicy { method: "GET", path: "/api/v1/dsr-requests/{id}", policy: AccessPolicy::OperatorHeader },
    RoutePolicy { method: "GET", path: "/api/v1/dsr-requests/{id}/logs", policy: AccessPolicy::OperatorHeader },
    RoutePolicy { method: "POST", path: "/api/v1/dsr-requests/{id}/verify", policy: AccessPolicy::OperatorHeader },
    RoutePolicy { method: "POST", path: "/api/v1/dsr-requests/{id}/process", policy: AccessPolicy::OperatorHeader },
    RoutePolicy { method: "POST", path: "/api/v1/dsr-requests/{id}/extend-deadline", policy: AccessPolicy::OperatorHeader },
    RoutePolicy { method: "POST", path: "/api/v1/dsr-requests/{id}/assign", policy: AccessPolicy::OperatorHeader },
    RoutePolicy { method: "DELETE", path: "/api/v1/dsr-requests/{id}", policy: AccessPolicy::Session },
];

/// Configure all application routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health routes sit outside versioning for load balancers
        .service(health_routes())
        .service(api_v1_routes())
        .route("/", web::get().to(root_handler));
}

fn health_routes() -> Scope {
    web::scope("/health")
        .route("", web::get().to(health::health_check))
        .route("/live", web::get().to(health::liveness_check))
        .route("/ready", web::get().to(health::readiness_check))
}

fn api_v1_routes() -> Scope {
    web::scope("/api/v1")
        .service(auth_routes())
        .service(sanction_routes())
        .service(legal_routes())
        .service(consent_routes())
        .service(dsr_routes())
}

fn auth_routes() -> Scope {
    web::scope("/auth")
        .route("/register", web::post().to(auth::register))
        .route("/login", web::post().to(auth::login))
        .route("/login/mfa", web::post().to(auth::login_mfa))
        .route("/logout", web::post().to(auth::logout))
        .route("/refresh", web::post().to(session::refresh))
        .route("/me", web::get().to(auth::get_current_account))
        .route("/password", web::post().to(auth::change_password))
        .route("/mfa/setup", web::post().to(mfa::setup))
        .route("/mfa/verify", web::post().to(mfa::verify_setup))
        .route("/mfa/disable", web::post().to(mfa::disable))
        .route(
            "/mfa/backup-codes/regenerate",
            web::post().to(mfa::regenerate_backup_codes),
        )
        .route("/sessions", web::get().to(session::list_sessions))
        .route("/sessions", web::delete().to(session::revoke_other_sessions))
        .route("/sessions/{id}", web::delete().to(session::revoke_session))
}

fn sanction_routes() -> Scope {
    web::scope("/sanctions")
        .route("", web::post().to(sanction::create))
        .route("", web::get().to(sanction::list))
        // Fixed segments before the {id} matcher
        .route("/active", web::get().to(sanction::get_active))
        .route("/{id}", web::get().to(sanction::get))
        .route("/{id}/revoke", web::post().to(sanction::revoke))
        .route("/{id}/extend", web::post().to(sanction::extend))
        .route("/{id}/reduce", web::post().to(sanction::reduce))
        .route("/{id}/appeal", web::post().to(sanction::submit_appeal))
        .route(
            "/{id}/appeal/review",
            web::post().to(sanction::begin_appeal_review),
        )
        .route(
            "/{id}/appeal/decision",
            web::post().to(sanction::decide_appeal),
        )
}

fn legal_routes() -> Scope {
    web::scope("/legal")
        .route("/documents/latest", web::get().to(legal::latest_document))
        .route(
            "/documents/{type}/{locale}/versions",
            web::get().to(legal::list_versions),
        )
        .route(
            "/documents/{type}/{locale}/versions",
            web::post().to(legal::create_version),
        )
        .route("/documents/{id}", web::get().to(legal::get_document))
        .route("/laws", web::get().to(legal::list_laws))
        .route("/laws/{code}", web::get().to(legal::get_law))
        .route("/requirements", web::get().to(legal::consent_requirements))
}

fn consent_routes() -> Scope {
    web::scope("/consents")
        .route("", web::post().to(consent::grant))
        .route("", web::get().to(consent::list))
        .route("/status", web::get().to(consent::status))
        .route("/{id}", web::delete().to(consent::withdraw))
}

fn dsr_routes() -> Scope {
    web::scope("/dsr-requests")
        .route("", web::post().to(dsr::submit))
        .route("", web::get().to(dsr::list))
        // Fixed segments before the {id} matcher
        .route("/statistics", web::get().to(dsr::statistics))
        .route("/overdue", web::get().to(dsr::overdue))
        .route("/{id}", web::get().to(dsr::get))
        .route("/{id}/logs", web::get().to(dsr::logs))
        .route("/{id}/verify", web::post().to(dsr::verify))
        .route("/{id}/process", web::post().to(dsr::process))
        .route(
            "/{id}/extend-deadline",
            web::post().to(dsr::extend_deadline),
        )
        .route("/{id}/assign", web::post().to(dsr::assign))
        .route("/{id}", web::delete().to(dsr::cancel))
}

/// Root handler with basic service information
async fn root_handler() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "service": "Girok API",
        "version": env!("CARGO_PKG_VERSION"),
        "apiVersion": "v1",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::PolicyGuard;
    use actix_web::{test, App};
    use uuid::Uuid;

    /// Substitute path parameters with representative values
    fn concrete_path(pattern: &str) -> String {
        pattern
            .replace("{id}", &Uuid::nil().to_string())
            .replace("{type}", "TERMS_OF_SERVICE")
            .replace("{locale}", "en")
            .replace("{code}", "GDPR")
    }

    /// Every non-public route rejects a request carrying no auth
    /// material at the guard, before any handler or state is touched
    #[actix_web::test]
    async fn test_unauthenticated_requests_are_rejected() {
        let app = test::init_service(
            App::new().wrap(PolicyGuard).configure(configure_routes),
        )
        .await;

        for rule in ROUTE_POLICIES
            .iter()
            .filter(|rule| rule.policy != AccessPolicy::Public)
        {
            let path = concrete_path(rule.path);
            let request = match rule.method {
                "GET" => test::TestRequest::get(),
                "POST" => test::TestRequest::post(),
                "DELETE" => test::TestRequest::delete(),
                other => panic!("unexpected method {other} in policy table"),
            }
            .uri(&path)
            .to_request();

            let response = test::call_service(&app, request).await;
            assert!(
                response.status() == actix_web::http::StatusCode::UNAUTHORIZED
                    || response.status() == actix_web::http::StatusCode::FORBIDDEN,
                "{} {} answered {} without credentials",
                rule.method,
                path,
                response.status()
            );
        }
    }

    /// Public routes stay reachable with the guard in place
    #[actix_web::test]
    async fn test_guard_passes_public_routes() {
        let app = test::init_service(
            App::new().wrap(PolicyGuard).configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::get().uri("/health/live").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn test_root_handler() {
        let app =
            test::init_service(App::new().route("/", web::get().to(root_handler))).await;

        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["service"], "Girok API");
    }

    #[::core::prelude::v1::test]
    fn test_policy_table_covers_dsr_surface() {
        let dsr_paths = [
            ("POST", "/api/v1/dsr-requests"),
            ("GET", "/api/v1/dsr-requests"),
            ("GET", "/api/v1/dsr-requests/{id}"),
            ("GET", "/api/v1/dsr-requests/{id}/logs"),
            ("POST", "/api/v1/dsr-requests/{id}/verify"),
            ("POST", "/api/v1/dsr-requests/{id}/process"),
            ("POST", "/api/v1/dsr-requests/{id}/extend-deadline"),
            ("POST", "/api/v1/dsr-requests/{id}/assign"),
            ("DELETE", "/api/v1/dsr-requests/{id}"),
            ("GET", "/api/v1/dsr-requests/statistics"),
            ("GET", "/api/v1/dsr-requests/overdue"),
        ];

        for (method, path) in dsr_paths {
            assert!(
                ROUTE_POLICIES
                    .iter()
                    .any(|p| p.method == method && p.path == path),
                "missing policy row for {method} {path}"
            );
        }
    }

    #[::core::prelude::v1::test]
    fn test_moderation_header_policies() {
        let create = ROUTE_POLICIES
            .iter()
            .find(|p| p.method == "POST" && p.path == "/api/v1/sanctions")
            .unwrap();
        assert_eq!(create.policy, AccessPolicy::OperatorHeader);

        let appeal = ROUTE_POLICIES
            .iter()
            .find(|p| p.method == "POST" && p.path == "/api/v1/sanctions/{id}/appeal")
            .unwrap();
        assert_eq!(appeal.policy, AccessPolicy::SubjectHeader);
    }

    #[::core::prelude::v1::test]
    fn test_register_and_login_require_service_id() {
        for path in ["/api/v1/auth/register", "/api/v1/auth/login"] {
            let row = ROUTE_POLICIES
                .iter()
                .find(|p| p.method == "POST" && p.path == path)
                .unwrap();
            assert_eq!(row.policy, AccessPolicy::ServiceId);
        }
    }
}
