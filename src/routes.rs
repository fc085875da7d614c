use axum::{extract::State, routing::get, Json, Router};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

pub const ROOT_MESSAGE: &str = "FamEduConnect Backend API is running securely!";
pub const SECURITY_SUMMARY: &str = "helmet, cors, rate-limiting active";
pub const FIREBASE_NOT_CONFIGURED: &str = "Not configured";

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/test-firebase", get(test_firebase_handler))
}

pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": ROOT_MESSAGE,
        "status": "success",
        "security": "enabled",
        "timestamp": now_iso(),
    }))
}

pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": now_iso(),
        "environment": state.config.environment.as_str(),
        "security": SECURITY_SUMMARY,
    }))
}

/// Reports whether Firebase settings are present without echoing the key.
pub async fn test_firebase_handler(State(state): State<AppState>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "message": "Firebase configuration loaded securely",
        "projectId": config
            .firebase_project_id
            .as_deref()
            .unwrap_or(FIREBASE_NOT_CONFIGURED),
        "hasApiKey": config.firebase_api_key.is_some(),
        "environment": config.environment.as_str(),
    }))
}

pub async fn not_found_handler() -> AppError {
    AppError::RouteNotFound
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::state::AppState;
    use crate::{build_router, routes};
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::response::Response;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn test_state(pairs: &[(&str, &str)]) -> AppState {
        let table: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppState::new(Config::from_lookup(|key| table.get(key).cloned()))
    }

    fn app_with(pairs: &[(&str, &str)]) -> Router {
        build_router(test_state(pairs), routes::routes())
    }

    async fn call(app: Router, method: Method, uri: &str) -> Response {
        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    }

    async fn json_body(resp: Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn root_reports_running_status() {
        let resp = call(app_with(&[]), Method::GET, "/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["message"], routes::ROOT_MESSAGE);
        assert_eq!(body["status"], "success");
        assert_eq!(body["security"], "enabled");
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn health_reports_environment() {
        let resp = call(
            app_with(&[("NODE_ENV", "production")]),
            Method::GET,
            "/health",
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["environment"], "production");
        assert_eq!(body["security"], routes::SECURITY_SUMMARY);
    }

    #[tokio::test]
    async fn firebase_probe_hides_key_value() {
        let resp = call(
            app_with(&[
                ("FIREBASE_PROJECT_ID", "fam-edu"),
                ("FIREBASE_API_KEY", "secret-key"),
            ]),
            Method::GET,
            "/api/test-firebase",
        )
        .await;
        let body = json_body(resp).await;
        assert_eq!(body["projectId"], "fam-edu");
        assert_eq!(body["hasApiKey"], true);
        assert!(!body.to_string().contains("secret-key"));
    }

    #[tokio::test]
    async fn firebase_probe_without_settings() {
        let body = json_body(call(app_with(&[]), Method::GET, "/api/test-firebase").await).await;
        assert_eq!(body["projectId"], routes::FIREBASE_NOT_CONFIGURED);
        assert_eq!(body["hasApiKey"], false);
        assert_eq!(body["environment"], "development");
    }

    #[tokio::test]
    async fn unmatched_route_is_404_json() {
        for method in [Method::GET, Method::POST, Method::DELETE] {
            let resp = call(app_with(&[]), method, "/no/such/route").await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
            assert_eq!(json_body(resp).await["error"], "Route not found");
        }
    }

    #[tokio::test]
    async fn responses_carry_security_headers() {
        let resp = call(app_with(&[]), Method::GET, "/health").await;
        let headers = resp.headers();
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "SAMEORIGIN");
        assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
        assert!(headers.contains_key("ratelimit-remaining"));
    }

    #[tokio::test]
    async fn not_found_also_carries_security_headers() {
        let resp = call(app_with(&[]), Method::GET, "/missing").await;
        assert!(resp
            .headers()
            .contains_key(header::STRICT_TRANSPORT_SECURITY));
    }

    #[tokio::test]
    async fn rate_limit_returns_429_after_ceiling() {
        let app = app_with(&[("RATE_LIMIT_MAX", "2")]);
        for _ in 0..2 {
            let resp = call(app.clone(), Method::GET, "/").await;
            assert_eq!(resp.status(), StatusCode::OK);
        }
        let resp = call(app, Method::GET, "/").await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers()["ratelimit-remaining"], "0");
        let body = json_body(resp).await;
        assert_eq!(
            body["error"],
            "Too many requests from this IP, please try again later."
        );
    }

    #[tokio::test]
    async fn cors_allows_listed_origin_with_credentials() {
        let app = app_with(&[]);
        let resp = app
            .oneshot(
                Request::get("/health")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let headers = resp.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5173"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[tokio::test]
    async fn cors_omits_headers_for_unlisted_origin() {
        let app = app_with(&[]);
        let resp = app
            .oneshot(
                Request::get("/health")
                    .header(header::ORIGIN, "https://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(!resp
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    async fn exploding_handler() -> &'static str {
        panic!("database exploded")
    }

    fn panicking_routes() -> Router<AppState> {
        routes::routes().route("/boom", get(exploding_handler))
    }

    #[tokio::test]
    async fn handler_panic_exposes_detail_in_development() {
        let app = build_router(test_state(&[]), panicking_routes());
        let resp = call(app, Method::GET, "/boom").await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(resp).await;
        assert_eq!(body["error"], "Something went wrong!");
        assert_eq!(body["message"], "database exploded");
    }

    #[tokio::test]
    async fn handler_panic_hides_detail_in_production() {
        let app = build_router(
            test_state(&[("NODE_ENV", "production")]),
            panicking_routes(),
        );
        let body = json_body(call(app, Method::GET, "/boom").await).await;
        assert_eq!(body["message"], "Internal server error");
    }
}
