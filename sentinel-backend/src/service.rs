//! HTTP surface over the catalog manager

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use sentinel_common::NoradId;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::module::catalog::{CatalogError, CatalogManager, CatalogQuery};

const MAX_BATCH_LIMIT: usize = 1000;

type AppState = Arc<CatalogManager>;

/// JSON error body with the status the error maps to
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(error: CatalogError) -> Self {
        let status = match &error {
            CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
            CatalogError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CatalogError::Unavailable(_) | CatalogError::Upstream(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        if status == StatusCode::SERVICE_UNAVAILABLE {
            tracing::warn!("Request failed: {}", error);
        }
        Self::new(status, error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "detail": self.detail });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn default_limit() -> usize {
    50
}

fn default_true() -> bool {
    true
}

fn default_hours() -> u32 {
    24
}

#[derive(Debug, Deserialize)]
struct SatellitesParams {
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default = "default_true")]
    include_orbital: bool,
    #[serde(default = "default_true")]
    include_weather: bool,
    #[serde(default = "default_true")]
    include_risk: bool,
}

#[derive(Debug, Deserialize)]
struct ForecastParams {
    #[serde(default = "default_hours")]
    hours: u32,
}

#[derive(Debug, Deserialize)]
struct PredictParams {
    norad_id1: NoradId,
    norad_id2: NoradId,
    #[serde(default = "default_hours")]
    hours_ahead: u32,
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "sentinel-backend",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn satellites(
    State(catalog): State<AppState>,
    Query(params): Query<SatellitesParams>,
) -> ApiResult<sentinel_common::SatelliteBatch> {
    if !(1..=MAX_BATCH_LIMIT).contains(&params.limit) {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("limit must be between 1 and {}", MAX_BATCH_LIMIT),
        ));
    }

    let query = CatalogQuery {
        limit: params.limit,
        include_orbital: params.include_orbital,
        include_weather: params.include_weather,
        include_risk: params.include_risk,
    };
    Ok(Json(catalog.active_satellites(query).await?))
}

async fn satellite_count(State(catalog): State<AppState>) -> ApiResult<sentinel_common::SatelliteCount> {
    Ok(Json(catalog.satellite_count().await?))
}

async fn high_risk(State(catalog): State<AppState>) -> ApiResult<Vec<sentinel_common::SatelliteData>> {
    Ok(Json(catalog.high_risk_satellites().await?))
}

async fn type_summary(State(catalog): State<AppState>) -> ApiResult<sentinel_common::TypeSummary> {
    Ok(Json(catalog.type_summary().await?))
}

async fn satellite(
    State(catalog): State<AppState>,
    Path(norad_id): Path<NoradId>,
) -> ApiResult<sentinel_common::SatelliteData> {
    Ok(Json(catalog.satellite(norad_id).await?))
}

async fn current_weather(State(catalog): State<AppState>) -> ApiResult<sentinel_common::SpaceWeather> {
    catalog.current_weather().await.map(Json).ok_or_else(|| {
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Space weather data temporarily unavailable",
        )
    })
}

async fn weather_forecast(
    State(catalog): State<AppState>,
    Query(params): Query<ForecastParams>,
) -> ApiResult<sentinel_common::WeatherForecast> {
    Ok(Json(catalog.weather_forecast(params.hours).await?))
}

async fn predict_collision(
    State(catalog): State<AppState>,
    Query(params): Query<PredictParams>,
) -> ApiResult<sentinel_common::ConjunctionPrediction> {
    let prediction = catalog
        .predict_conjunctions(params.norad_id1, params.norad_id2, params.hours_ahead)
        .await?;
    Ok(Json(prediction))
}

async fn gateway_status(State(catalog): State<AppState>) -> Json<sentinel_common::GatewayStatus> {
    Json(catalog.gateway_status())
}

/// Build the application routes
pub fn router(catalog: Arc<CatalogManager>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/satellites", get(satellites))
        .route("/satellites/count", get(satellite_count))
        .route("/satellites/risk/high", get(high_risk))
        .route("/satellites/types/summary", get(type_summary))
        .route("/satellites/{norad_id}", get(satellite))
        .route("/weather/current", get(current_weather))
        .route("/weather/forecast", get(weather_forecast))
        .route("/collision/predict", post(predict_collision))
        .route("/gateway/status", get(gateway_status))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(catalog)
}
