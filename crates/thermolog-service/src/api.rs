//! REST API endpoints for thermolog-service.
//!
//! | Method | Path | Query parameters |
//! |---|---|---|
//! | GET | `/health` | none |
//! | GET | `/locations` | `date` |
//! | GET | `/temperature` | `date`, `location` |
//! | GET | `/temperatures` | `startDate`, `endDate`, `location` |
//!
//! Dates are `YYYY-MM-DD`. Every other method or path is answered with 404.
//!
//! ## Error Handling
//!
//! Errors are rendered by [`AppError`] as a JSON string body: 422 names each
//! invalid parameter, 404 echoes the method and path, and 500 carries
//! `"error: <description>"`. Panics inside a handler become the same kind of
//! 500. Every response, including errors, carries the headers in
//! [`RESPONSE_HEADERS`](crate::middleware::RESPONSE_HEADERS).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use thermolog_service::{AppState, Config, api};
//! use thermolog_store::MemoryStore;
//!
//! let state = AppState::from_config(Arc::new(MemoryStore::new()), &Config::default());
//! let app = api::app(state);
//! # let _: axum::Router = app;
//! ```

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{Method, StatusCode, Uri},
    middleware::map_response,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use thermolog_types::{Reading, date};
use time::Date;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::middleware::{panic_response, response_headers};
use crate::query::QueryError;
use crate::state::AppState;

/// Create the API router.
///
/// Routes only; see [`app`] for the router with its middleware.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health).head(not_found).fallback(not_found))
        .route("/locations", get(get_locations).head(not_found).fallback(not_found))
        .route("/temperature", get(get_temperature).head(not_found).fallback(not_found))
        .route("/temperatures", get(get_temperatures).head(not_found).fallback(not_found))
        .fallback(not_found)
}

/// The complete application: routes, state, and middleware.
pub fn app(state: Arc<AppState>) -> Router {
    with_layers(router().with_state(state))
}

fn with_layers(router: Router) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(map_response(response_headers))
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({}))
}

/// Query parameters for `/locations`.
#[derive(Debug, Default, Deserialize)]
pub struct LocationsParams {
    pub date: Option<String>,
}

/// Query parameters for `/temperature`.
#[derive(Debug, Default, Deserialize)]
pub struct TemperatureParams {
    pub date: Option<String>,
    pub location: Option<String>,
}

/// Query parameters for `/temperatures`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperaturesParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub location: Option<String>,
}

/// Body of a `/locations` response.
#[derive(Debug, Serialize)]
pub struct LocationsResponse {
    pub locations: Vec<String>,
}

/// Distinct locations reporting on a date.
async fn get_locations(
    State(state): State<Arc<AppState>>,
    params: Result<Query<LocationsParams>, QueryRejection>,
) -> Result<Json<LocationsResponse>, AppError> {
    let Query(params) = params?;

    let mut errors = Vec::new();
    let Some(day) = required_date(&params.date, "date", &mut errors) else {
        return Err(AppError::Unprocessable(errors));
    };

    let locations = state.query.distinct_locations(day).await?;
    Ok(Json(LocationsResponse { locations }))
}

/// Most recent reading for a location on a date, or `""` when there is none.
async fn get_temperature(
    State(state): State<Arc<AppState>>,
    params: Result<Query<TemperatureParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params?;

    let mut errors = Vec::new();
    let day = required_date(&params.date, "date", &mut errors);
    let location = required(&params.location, "location", &mut errors);
    let (Some(day), Some(location)) = (day, location) else {
        return Err(AppError::Unprocessable(errors));
    };

    let response = match state.query.most_recent_reading(day, location).await? {
        Some(reading) => Json(reading).into_response(),
        None => Json("").into_response(),
    };
    Ok(response)
}

/// Readings for a location over a date range, oldest first.
async fn get_temperatures(
    State(state): State<Arc<AppState>>,
    params: Result<Query<TemperaturesParams>, QueryRejection>,
) -> Result<Json<Vec<Reading>>, AppError> {
    let Query(params) = params?;

    let mut errors = Vec::new();
    let start = required_date(&params.start_date, "startDate", &mut errors);
    let end = required_date(&params.end_date, "endDate", &mut errors);
    let location = required(&params.location, "location", &mut errors);
    let (Some(start), Some(end), Some(location)) = (start, end, location) else {
        return Err(AppError::Unprocessable(errors));
    };

    let readings = state.query.readings_in_range(start, end, location).await?;
    Ok(Json(readings))
}

/// Fallback for unknown paths and non-GET methods.
async fn not_found(method: Method, uri: Uri) -> AppError {
    AppError::NotFound(format!("{} {} not found", method, uri.path()))
}

/// A non-empty query parameter, or an error naming it.
fn required<'a>(
    value: &'a Option<String>,
    field: &str,
    errors: &mut Vec<String>,
) -> Option<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            errors.push(format!("missing required parameter '{}'", field));
            None
        }
    }
}

/// A `YYYY-MM-DD` query parameter, or an error naming it.
fn required_date(value: &Option<String>, field: &str, errors: &mut Vec<String>) -> Option<Date> {
    let raw = required(value, field, errors)?;
    match date::parse_iso_date(raw) {
        Ok(day) => Some(day),
        Err(e) => {
            errors.push(format!("invalid parameter '{}': {}", field, e));
            None
        }
    }
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// One message per invalid request parameter.
    Unprocessable(Vec<String>),
    NotFound(String),
    Internal(String),
}

impl From<QueryError> for AppError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::Validation(errors) => AppError::Unprocessable(errors),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Unprocessable(vec![rejection.body_text()])
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unprocessable(errors) => {
                (StatusCode::UNPROCESSABLE_ENTITY, errors.join("; "))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                error!("Request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, format!("error: {}", msg))
            }
        };

        (status, Json(message)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, header},
    };
    use http_body_util::BodyExt;
    use std::time::Duration;
    use thermolog_store::{MemoryStore, PartitionScanner, RetryConfig, ScanOptions};
    use tower::ServiceExt;

    use crate::query::QueryService;

    const PREFIX: &str = "rpi-temperature-";

    fn create_test_state(store: &Arc<MemoryStore>) -> Arc<AppState> {
        let options = ScanOptions {
            retry: RetryConfig::new(1)
                .initial_delay(Duration::from_millis(1))
                .jitter(false),
            ..Default::default()
        };
        let scanner = PartitionScanner::with_options(store.clone(), options);
        AppState::new(QueryService::new(scanner, PREFIX))
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let day = "rpi-temperature-2023-05-01";
        store.insert(day, Reading::new(20.0, "10:00:00 am", "A")).await;
        store.insert(day, Reading::new(22.0, "02:00:00 pm", "A")).await;
        store.insert(day, Reading::new(15.0, "03:00:00 pm", "B")).await;
        store
            .insert(
                "rpi-temperature-2023-05-02",
                Reading::new(18.0, "06:00:00 am", "A"),
            )
            .await;
        store
    }

    async fn send(app: Router, method: Method, uri: &str) -> Response {
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

    async fn get_uri(store: &Arc<MemoryStore>, uri: &str) -> Response {
        send(app(create_test_state(store)), Method::GET, uri).await
    }

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn assert_fixed_headers(response: &Response) {
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_METHODS],
            "OPTIONS,POST,GET"
        );
    }

    // ==================== Health Tests ====================

    #[tokio::test]
    async fn test_health_endpoint() {
        let store = Arc::new(MemoryStore::new());
        let response = get_uri(&store, "/health").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_fixed_headers(&response);
        assert_eq!(response_json(response).await, serde_json::json!({}));
    }

    // ==================== Locations Tests ====================

    #[tokio::test]
    async fn test_locations() {
        let store = seeded_store().await;
        let response = get_uri(&store, "/locations?date=2023-05-01").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_fixed_headers(&response);
        assert_eq!(
            response_json(response).await,
            serde_json::json!({ "locations": ["A", "B"] })
        );
    }

    #[tokio::test]
    async fn test_locations_missing_partition() {
        let store = seeded_store().await;
        let response = get_uri(&store, "/locations?date=2020-01-01").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response_json(response).await,
            serde_json::json!({ "locations": [] })
        );
    }

    #[tokio::test]
    async fn test_locations_requires_valid_date() {
        let store = seeded_store().await;

        let response = get_uri(&store, "/locations").await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_fixed_headers(&response);
        let body = response_json(response).await;
        assert!(body.as_str().unwrap().contains("'date'"));

        let response = get_uri(&store, "/locations?date=05/01/2023").await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = response_json(response).await;
        assert!(body.as_str().unwrap().contains("05/01/2023"));
    }

    // ==================== Temperature Tests ====================

    #[tokio::test]
    async fn test_temperature_most_recent() {
        let store = seeded_store().await;
        let response = get_uri(&store, "/temperature?date=2023-05-01&location=A").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_fixed_headers(&response);
        assert_eq!(
            response_json(response).await,
            serde_json::json!({ "value": 22.0, "time": "02:00:00 pm", "location": "A" })
        );
    }

    #[tokio::test]
    async fn test_temperature_none_is_empty_string() {
        let store = seeded_store().await;

        let response = get_uri(&store, "/temperature?date=2023-05-01&location=Z").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await, serde_json::json!(""));

        // Missing partition is empty too, not a server error
        let response = get_uri(&store, "/temperature?date=2020-01-01&location=A").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await, serde_json::json!(""));
    }

    #[tokio::test]
    async fn test_temperature_names_every_missing_parameter() {
        let store = seeded_store().await;
        let response = get_uri(&store, "/temperature").await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = response_json(response).await;
        let message = body.as_str().unwrap();
        assert!(message.contains("'date'"));
        assert!(message.contains("'location'"));
    }

    #[tokio::test]
    async fn test_temperature_scan_failure_is_500() {
        let store = seeded_store().await;
        store.fail_partition("rpi-temperature-2023-05-01").await;

        let response = get_uri(&store, "/temperature?date=2023-05-01&location=A").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_fixed_headers(&response);
        let body = response_json(response).await;
        assert!(body.as_str().unwrap().starts_with("error: "));
    }

    // ==================== Temperatures Tests ====================

    #[tokio::test]
    async fn test_temperatures_range() {
        let store = seeded_store().await;
        let response = get_uri(
            &store,
            "/temperatures?startDate=2023-05-01&endDate=2023-05-02&location=A",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_fixed_headers(&response);
        let body = response_json(response).await;
        let values: Vec<f64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["value"].as_f64().unwrap())
            .collect();
        assert_eq!(values, vec![20.0, 22.0, 18.0]);
    }

    #[tokio::test]
    async fn test_temperatures_end_before_start() {
        let store = seeded_store().await;
        let response = get_uri(
            &store,
            "/temperatures?startDate=2023-05-02&endDate=2023-05-01&location=A",
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_fixed_headers(&response);
        let body = response_json(response).await;
        assert!(body.as_str().unwrap().contains("endDate"));
    }

    #[tokio::test]
    async fn test_temperatures_missing_location() {
        let store = seeded_store().await;

        for uri in [
            "/temperatures?startDate=2023-05-01&endDate=2023-05-02",
            "/temperatures?startDate=2023-05-01&endDate=2023-05-02&location=",
        ] {
            let response = get_uri(&store, uri).await;
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{}", uri);
            let body = response_json(response).await;
            assert!(body.as_str().unwrap().contains("'location'"));
        }
    }

    #[tokio::test]
    async fn test_temperatures_malformed_dates() {
        let store = seeded_store().await;
        let response = get_uri(
            &store,
            "/temperatures?startDate=yesterday&endDate=2023-13-01&location=A",
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = response_json(response).await;
        let message = body.as_str().unwrap();
        assert!(message.contains("'startDate'"));
        assert!(message.contains("'endDate'"));
    }

    #[tokio::test]
    async fn test_temperatures_skip_failing_partition() {
        let store = seeded_store().await;
        store.fail_partition("rpi-temperature-2023-05-01").await;

        let response = get_uri(
            &store,
            "/temperatures?startDate=2023-05-01&endDate=2023-05-02&location=A",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["value"], 18.0);
    }

    // ==================== Routing Tests ====================

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let store = Arc::new(MemoryStore::new());
        let response = get_uri(&store, "/nope?x=1").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_fixed_headers(&response);
        assert_eq!(
            response_json(response).await,
            serde_json::json!("GET /nope not found")
        );
    }

    #[tokio::test]
    async fn test_non_get_method_is_404() {
        let store = Arc::new(MemoryStore::new());

        for method in [Method::POST, Method::DELETE, Method::OPTIONS] {
            let response = send(app(create_test_state(&store)), method.clone(), "/health").await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert_fixed_headers(&response);
            assert_eq!(
                response_json(response).await,
                serde_json::json!(format!("{} /health not found", method))
            );
        }
    }

    #[tokio::test]
    async fn test_head_is_404() {
        let store = seeded_store().await;

        for uri in [
            "/health",
            "/locations?date=2023-05-01",
            "/temperature?date=2023-05-01&location=A",
            "/temperatures?startDate=2023-05-01&endDate=2023-05-02&location=A",
        ] {
            let response = send(app(create_test_state(&store)), Method::HEAD, uri).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
            assert_fixed_headers(&response);
        }
    }

    #[tokio::test]
    async fn test_panic_is_500_with_headers() {
        async fn boom() -> &'static str {
            panic!("sensor exploded")
        }
        let app = with_layers(Router::new().route("/boom", get(boom)));

        let response = send(app, Method::GET, "/boom").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_fixed_headers(&response);
        assert_eq!(
            response_json(response).await,
            serde_json::json!("error: sensor exploded")
        );
    }

    // ==================== Error Tests ====================

    #[test]
    fn test_app_error_from_query_error() {
        let validation = AppError::from(QueryError::Validation(vec!["bad".to_string()]));
        assert!(matches!(validation, AppError::Unprocessable(ref e) if e == &["bad"]));

        let store = AppError::from(QueryError::Store(thermolog_store::Error::Unavailable(
            "down".to_string(),
        )));
        assert!(matches!(store, AppError::Internal(ref msg) if msg.contains("down")));
    }

    #[test]
    fn test_app_error_status_codes() {
        let cases = [
            (AppError::Unprocessable(vec![]), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::NotFound("x".to_string()), StatusCode::NOT_FOUND),
            (AppError::Internal("x".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
