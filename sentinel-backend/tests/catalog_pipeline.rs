//! Gateway, parser, cache and risk engine wired together against a local
//! stand-in for the catalog service.

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use sentinel_backend::config::{SentinelConfig, SpaceTrackConfig};
use sentinel_backend::module::catalog::{CatalogManager, CatalogQuery, CatalogSources};
use sentinel_backend::module::orbit::{PropagationError, Propagator, StateVector};
use sentinel_backend::module::tle::SpaceTrackGateway;
use sentinel_backend::service;
use sentinel_common::RiskLevel;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt;

// Third pair has a broken line 2 prefix
const UPSTREAM_BODY: &str = "\
1 25544U 98067A   24179.50000000  .00016717  00000-0  10270-3 0  9005
2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537
1 33591U 09005A   24179.25000000  .00000131  00000-0  97349-4 0  9996
2 33591  99.0993 225.6052 0013713 254.1786 105.7875 14.12941133793182
1 00005U 58002B   24179.50000000  .00000270  00000-0  34418-3 0  9990
X 00005  34.2475 290.3217 1845146 148.6233 223.5618 10.85112234368889
1 41866U 16071A   24179.75000000 -.00000261  00000-0  00000+0 0  9994
2 41866   0.0242 282.7351 0001022 150.0722 227.0601  1.00271555 27963
";

async fn spawn_upstream(queries: Arc<AtomicUsize>) -> String {
    let app = Router::new()
        .route(
            "/ajaxauth/login",
            post(|| async { ([(header::SET_COOKIE, "chocolatechip=it; path=/")], "\"\"") }),
        )
        .route(
            "/basicspacedata/query/{*rest}",
            get(move || {
                let queries = queries.clone();
                async move {
                    queries.fetch_add(1, Ordering::SeqCst);
                    UPSTREAM_BODY.into_response()
                }
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// ISS and NOAA-19 3 km apart, the GEO object far away
struct LinePropagator;

#[async_trait]
impl Propagator for LinePropagator {
    async fn position_velocity(
        &self,
        line1: &str,
        _line2: &str,
        _name: &str,
        _at: DateTime<Utc>,
    ) -> Result<StateVector, PropagationError> {
        let x = match line1.get(2..7) {
            Some("25544") => 6800.0,
            Some("33591") => 6803.0,
            Some("41866") => 42_164.0,
            other => return Err(PropagationError::Propagation(format!("unexpected {:?}", other))),
        };
        Ok(StateVector {
            position: [x, 0.0, 0.0],
            velocity: [0.0, 7.6, 0.0],
        })
    }
}

async fn catalog(queries: Arc<AtomicUsize>) -> Arc<CatalogManager> {
    let base_url = spawn_upstream(queries).await;

    let mut config = SentinelConfig::default();
    config.cache.persist = false;
    config.weather.enabled = false;
    config.space_track = SpaceTrackConfig {
        base_url,
        username: "ops@example.org".to_string(),
        password: "secret".to_string(),
        ..SpaceTrackConfig::default()
    };

    CatalogManager::new(
        CatalogSources {
            tle: Arc::new(SpaceTrackGateway::new(config.space_track.clone()).unwrap()),
            propagator: Arc::new(LinePropagator),
            weather: None,
        },
        &config,
    )
}

#[tokio::test]
async fn test_upstream_catalog_to_risk_batch() {
    let queries = Arc::new(AtomicUsize::new(0));
    let catalog = catalog(queries.clone()).await;

    let batch = catalog.active_satellites(CatalogQuery::full(50)).await.unwrap();

    let ids: Vec<u32> = batch.satellites.iter().map(|s| s.norad_id).collect();
    assert_eq!(ids, vec![25544, 33591, 41866]);
    assert_eq!(batch.high_risk_satellites, vec![25544, 33591]);
    assert!(batch.space_weather_summary.is_none());

    for satellite in &batch.satellites[..2] {
        let risk = satellite.risk.as_ref().unwrap();
        assert_eq!(risk.level, RiskLevel::Critical);
        assert!((risk.closest_km.unwrap() - 3.0).abs() < 1e-9);
        assert_eq!(satellite.data_source, "Space-Track");
    }

    let geo = batch.satellites[2].risk.as_ref().unwrap();
    assert_eq!(geo.level, RiskLevel::Low);
    assert_eq!(geo.closest_km, None);
    assert_eq!(geo.nearby_count, 0);

    // Second read is served from cache
    catalog.active_satellites(CatalogQuery::full(50)).await.unwrap();
    assert_eq!(queries.load(Ordering::SeqCst), 1);

    let status = catalog.gateway_status();
    assert!(status.configured);
    assert!(status.session_valid);
    assert_eq!(status.requests_this_hour, 1);
}

#[tokio::test]
async fn test_http_surface_over_live_gateway() {
    let queries = Arc::new(AtomicUsize::new(0));
    let app = service::router(catalog(queries.clone()).await);

    let request = Request::builder()
        .uri("/satellites/count")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["total_active_satellites"], 3);
    assert_eq!(body["data_source"], "Space-Track");

    let request = Request::builder()
        .uri("/weather/current")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
