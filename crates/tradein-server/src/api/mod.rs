mod devices;
mod options;
mod presets;
mod quotes;
mod refs;
mod trade_ins;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tradein_shopify::ShopifyDiscountClient;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// `None` when Shopify credentials are not configured (development only).
    pub discounts: Option<Arc<ShopifyDiscountClient>>,
    pub discount_prefix: String,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "service_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &tradein_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

/// Maps a unique violation to `conflict` and anything else to `internal_error`.
pub(super) fn map_write_error(
    request_id: &str,
    error: &tradein_db::DbError,
    conflict_message: &str,
) -> ApiError {
    if error.is_unique_violation() {
        return ApiError::new(request_id, "conflict", conflict_message);
    }
    map_db_error(request_id.to_owned(), error)
}

pub(super) fn validation_error(request_id: &str, message: impl Into<String>) -> ApiError {
    ApiError::new(request_id, "validation_error", message)
}

/// Trims a required text field and rejects empty or overlong values.
pub(super) fn required_text(
    request_id: &str,
    field: &str,
    value: &str,
    max_len: usize,
) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().count() > max_len {
        return Err(validation_error(
            request_id,
            format!("{field} must be 1-{max_len} characters"),
        ));
    }
    Ok(trimmed.to_owned())
}

pub(super) fn parse_device_type(
    request_id: &str,
    raw: &str,
) -> Result<tradein_core::DeviceType, ApiError> {
    raw.parse()
        .map_err(|e: tradein_core::CoreError| validation_error(request_id, e.to_string()))
}

/// Deserializes a present field (including an explicit `null`) as `Some`.
///
/// Paired with `#[serde(default)]` so an absent field stays `None`, giving
/// `Option<Option<T>>` fields keep / clear / set semantics.
pub(super) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn public_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/options/{category}", get(options::list_options))
        .route("/api/v1/devices", get(devices::list_devices))
        .route("/api/v1/devices/{model_name}", get(devices::get_device))
        .route("/api/v1/presets", get(presets::list_presets))
        .route("/api/v1/presets/{model_name}", get(presets::get_preset))
        .route("/api/v1/quotes", post(quotes::create_quote))
        .route("/api/v1/trade-ins", post(trade_ins::submit_trade_in))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

fn admin_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/admin/options/{category}",
            post(options::create_option),
        )
        .route(
            "/api/v1/admin/options/{category}/{id}",
            put(options::update_option).delete(options::delete_option),
        )
        .route("/api/v1/admin/devices", post(devices::create_device))
        .route(
            "/api/v1/admin/devices/{id}",
            put(devices::update_device).delete(devices::delete_device),
        )
        .route(
            "/api/v1/admin/devices/{id}/device-details",
            put(devices::update_device_details),
        )
        .route(
            "/api/v1/admin/devices/{id}/apply-preset",
            post(devices::apply_preset_to_device),
        )
        .route("/api/v1/admin/presets", post(presets::create_preset))
        .route(
            "/api/v1/admin/presets/{id}",
            put(presets::update_preset).delete(presets::delete_preset),
        )
        .route(
            "/api/v1/admin/trade-ins",
            get(trade_ins::list_trade_ins),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let health_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(health_routes)
        .merge(public_router(rate_limit.clone()))
        .merge(admin_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id))
                .layer(TraceLayer::new_for_http())
                .layer(build_cors()),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match tradein_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests;
