//! Response middleware for the thermolog API.
//!
//! This module provides:
//! - The fixed header set stamped on every response
//! - The handler turning a panic inside a request into a 500 response

use std::any::Any;

use axum::{
    Json,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::error;

/// Headers every response carries, whatever its status.
pub const RESPONSE_HEADERS: [(HeaderName, &str); 4] = [
    (header::CONTENT_TYPE, "application/json"),
    (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "OPTIONS,POST,GET"),
];

/// Overwrite the fixed response headers.
///
/// Used with [`axum::middleware::map_response`] as the outermost layer, so
/// it also covers fallback and panic responses.
pub async fn response_headers(mut response: Response) -> Response {
    apply_response_headers(response.headers_mut());
    response
}

fn apply_response_headers(headers: &mut HeaderMap) {
    for (name, value) in RESPONSE_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
}

/// Build the response for a request whose handler panicked.
///
/// Used with [`tower_http::catch_panic::CatchPanicLayer::custom`]. The body
/// is the JSON string `"error: <panic message>"`.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic_message(panic.as_ref());
    error!("Request handler panicked: {}", message);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(format!("error: {}", message)),
    )
        .into_response()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_response_headers_overwrite_content_type() {
        let response = (
            [(header::CONTENT_TYPE, "text/plain")],
            "plain body",
        )
            .into_response();

        let response = response_headers(response).await;
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_METHODS],
            "OPTIONS,POST,GET"
        );
        assert_eq!(headers.get_all(header::CONTENT_TYPE).iter().count(), 1);
    }

    #[tokio::test]
    async fn test_panic_response_with_str_payload() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, "error: boom");
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u32), "unknown panic");
    }
}
