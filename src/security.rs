//! Response hardening applied to every inbound request: CORS allow-list,
//! security headers, and the panic-to-500 conversion.

use std::any::Any;

use axum::{
    http::{
        header::{self, HeaderName},
        HeaderValue, Method,
    },
    response::{IntoResponse, Response},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{error, warn};

use crate::error::AppError;

pub const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
style-src 'self' 'unsafe-inline' https://fonts.googleapis.com; \
font-src 'self' https://fonts.gstatic.com; \
img-src 'self' data: https://firebasestorage.googleapis.com; \
script-src 'self'; \
connect-src 'self' https://api.fameduconnect.xyz";

/// Header name/value pairs added to responses that do not already set them.
pub fn security_headers() -> Vec<(HeaderName, HeaderValue)> {
    vec![
        (
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ),
        (
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ),
        (header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN")),
        (header::REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
        (
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=15552000; includeSubDomains"),
        ),
        (header::X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off")),
        (header::X_XSS_PROTECTION, HeaderValue::from_static("0")),
        (
            HeaderName::from_static("cross-origin-opener-policy"),
            HeaderValue::from_static("same-origin"),
        ),
        (
            HeaderName::from_static("cross-origin-resource-policy"),
            HeaderValue::from_static("same-origin"),
        ),
        (
            HeaderName::from_static("origin-agent-cluster"),
            HeaderValue::from_static("?1"),
        ),
    ]
}

pub fn with_security_headers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    security_headers()
        .into_iter()
        .fold(router, |router, (name, value)| {
            router.layer(SetResponseHeaderLayer::if_not_present(name, value))
        })
}

/// Allow-list CORS with credentials. Origins that fail to parse as header
/// values are skipped with a warning. Requests from origins outside the list
/// get no `Access-Control-Allow-Origin` header.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

fn panic_message(err: &(dyn Any + Send)) -> String {
    if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Turn a caught handler panic into the generic 500 body. The panic text is
/// only included when `expose_details` is set.
pub fn panic_response(err: Box<dyn Any + Send + 'static>, expose_details: bool) -> Response {
    let message = panic_message(err.as_ref());
    error!("Request handler panicked: {}", message);
    AppError::Internal(expose_details.then_some(message)).into_response()
}
