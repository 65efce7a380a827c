//! Authenticated, rate-limited access to the upstream TLE catalog.
//!
//! The gateway owns the upstream session and quota counters. Its session
//! cycles `NO_SESSION -> VALID -> NO_SESSION` (expiry or HTTP 401) for the
//! lifetime of the process.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode, header::COOKIE};
use sentinel_common::GatewayStatus;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Mutex as AsyncMutex;

use super::error::GatewayError;
use super::rate_limit::RateLimitWindow;
use super::session::{Session, cookie_blob, login_rejected};
use crate::config::SpaceTrackConfig;

/// Bodies at or below this length carry no usable catalog
const MIN_CATALOG_BODY_LEN: usize = 100;

/// Source of raw TLE catalog text
#[async_trait]
pub trait TleSource: Send + Sync {
    /// Fetch up to `limit` non-decayed objects whose epoch is newer than
    /// `epoch_window_days` days, ordered by catalog id.
    async fn fetch_catalog(
        &self,
        limit: usize,
        epoch_window_days: u32,
    ) -> Result<String, GatewayError>;

    fn status(&self) -> GatewayStatus;

    /// Label stored as `data_source` on every satellite
    fn source_name(&self) -> &str;
}

#[derive(Debug, Default)]
struct GatewayState {
    session: Option<Session>,
    window: RateLimitWindow,
    last_request: Option<chrono::DateTime<Utc>>,
}

/// Space-Track style catalog gateway
pub struct SpaceTrackGateway {
    config: SpaceTrackConfig,
    client: Client,
    state: Mutex<GatewayState>,
    /// Serializes logins so concurrent callers never log in twice
    login_lock: AsyncMutex<()>,
}

impl SpaceTrackGateway {
    pub fn new(config: SpaceTrackConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("orbit-sentinel/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            config,
            client,
            state: Mutex::new(GatewayState::default()),
            login_lock: AsyncMutex::new(()),
        })
    }

    fn state(&self) -> MutexGuard<'_, GatewayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn valid_cookies(&self) -> Option<String> {
        let now = Utc::now();
        self.state()
            .session
            .as_ref()
            .filter(|session| session.is_valid_at(now))
            .map(|session| session.cookies.clone())
    }

    fn invalidate_session(&self) {
        self.state().session = None;
    }

    /// Return the cookies of a valid session, logging in first if needed.
    pub async fn ensure_session(&self) -> Result<String, GatewayError> {
        if let Some(cookies) = self.valid_cookies() {
            return Ok(cookies);
        }

        let _login = self.login_lock.lock().await;
        // Another caller may have logged in while we waited
        if let Some(cookies) = self.valid_cookies() {
            return Ok(cookies);
        }

        tracing::info!("Upstream session invalid, authenticating...");
        let session = self.login().await?;
        let cookies = session.cookies.clone();
        self.state().session = Some(session);
        Ok(cookies)
    }

    async fn login(&self) -> Result<Session, GatewayError> {
        if !self.config.has_credentials() {
            tracing::error!(
                "Space-Track credentials not configured. Set SPACE_TRACK_USERNAME and SPACE_TRACK_PASSWORD."
            );
            return Err(GatewayError::MissingCredentials);
        }

        let url = format!("{}/ajaxauth/login", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .timeout(std::time::Duration::from_secs(self.config.login_timeout_secs))
            .form(&[
                ("identity", self.config.username.as_str()),
                ("password", self.config.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GatewayError::UpstreamUnavailable(format!("login request failed: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::error!("Space-Track login failed with status {}", status);
            return Err(GatewayError::Auth(format!("login returned HTTP {}", status)));
        }

        let cookies = cookie_blob(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::UpstreamUnavailable(format!("login body unreadable: {}", e)))?;

        if login_rejected(&body) {
            tracing::error!("Space-Track login failed - check credentials");
            return Err(GatewayError::Auth("credentials rejected".to_string()));
        }

        let cookies = cookies
            .ok_or_else(|| GatewayError::Auth("login response carried no session cookie".to_string()))?;

        let session = Session {
            cookies,
            expires_at: Utc::now() + Duration::minutes(self.config.session_ttl_minutes),
        };
        tracing::info!(
            "Space-Track authentication successful, session valid until {}",
            session.expires_at.format("%H:%M:%S UTC")
        );
        Ok(session)
    }

    /// Reserve one request against the per-minute and per-hour quota.
    pub fn check_quota(&self) -> Result<(), GatewayError> {
        let now = Utc::now();
        let mut state = self.state();
        state.window.check(
            now,
            self.config.rate_limit_per_minute,
            self.config.rate_limit_per_hour,
        )?;
        state.last_request = Some(now);
        Ok(())
    }

    fn query_url(&self, limit: usize, epoch_window_days: u32) -> String {
        format!(
            "{}/basicspacedata/query/class/gp/decay_date/null-val/epoch/%3Enow-{}/orderby/norad_cat_id/limit/{}/format/tle",
            self.config.base_url, epoch_window_days, limit
        )
    }
}

#[async_trait]
impl TleSource for SpaceTrackGateway {
    async fn fetch_catalog(
        &self,
        limit: usize,
        epoch_window_days: u32,
    ) -> Result<String, GatewayError> {
        self.check_quota()?;
        let cookies = self.ensure_session().await?;

        tracing::info!(
            "Fetching TLE data from Space-Track (limit={}, epoch_days={})",
            limit,
            epoch_window_days
        );

        let response = self
            .client
            .get(self.query_url(limit, epoch_window_days))
            .timeout(std::time::Duration::from_secs(self.config.query_timeout_secs))
            .header(COOKIE, cookies)
            .send()
            .await
            .map_err(|e| GatewayError::UpstreamUnavailable(format!("query request failed: {}", e)))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED => {
                tracing::warn!("Space-Track session expired, will re-authenticate on next request");
                self.invalidate_session();
                return Err(GatewayError::SessionExpired);
            }
            status => {
                tracing::error!("Space-Track query failed with status {}", status);
                return Err(GatewayError::UpstreamUnavailable(format!(
                    "query returned HTTP {}",
                    status
                )));
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::UpstreamUnavailable(format!("query body unreadable: {}", e)))?;
        let content = body.trim();

        if content.len() <= MIN_CATALOG_BODY_LEN {
            tracing::warn!("Empty response from Space-Track - no data available");
            return Err(GatewayError::UpstreamUnavailable(
                "catalog response was empty".to_string(),
            ));
        }

        tracing::info!(
            "Retrieved {} TLE lines from Space-Track ({} chars)",
            content.lines().count(),
            content.len()
        );
        Ok(content.to_string())
    }

    fn status(&self) -> GatewayStatus {
        let now = Utc::now();
        let state = self.state();

        GatewayStatus {
            configured: self.config.has_credentials(),
            session_valid: state.session.as_ref().is_some_and(|s| s.is_valid_at(now)),
            session_expires: state.session.as_ref().map(|s| s.expires_at),
            requests_this_hour: state.window.count_hour,
            requests_this_minute: state.window.count_minute,
            rate_limit_hour: self.config.rate_limit_per_hour,
            rate_limit_minute: self.config.rate_limit_per_minute,
            last_request: state.last_request,
        }
    }

    fn source_name(&self) -> &str {
        "Space-Track"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Form, Router,
        extract::State,
        http::{HeaderMap, Uri, header},
        response::IntoResponse,
        routing::{get, post},
    };
    use std::collections::HashMap;
    use std::sync::Arc;

    const CATALOG: &str = "\
1 00005U 58002B   24179.50000000  .00000270  00000-0  34418-3 0  9990
2 00005  34.2475 290.3217 1845146 148.6233 223.5618 10.85112234368889
1 25544U 98067A   24179.50000000  .00016717  00000-0  10270-3 0  9005
2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537
";

    struct FakeUpstream {
        logins: u32,
        accept_login: bool,
        query_status: axum::http::StatusCode,
        query_body: String,
        last_query: Option<String>,
    }

    type Shared = Arc<Mutex<FakeUpstream>>;

    async fn login(
        State(fake): State<Shared>,
        Form(form): Form<HashMap<String, String>>,
    ) -> impl IntoResponse {
        let mut fake = fake.lock().unwrap();
        fake.logins += 1;
        let ok = fake.accept_login
            && form.get("identity").map(String::as_str) == Some("ops@example.org")
            && form.get("password").map(String::as_str) == Some("secret");
        let body = if ok { "\"\"" } else { r#"{"Login":"Failed","error":"invalid"}"# };
        ([(header::SET_COOKIE, "chocolatechip=abc123; path=/; HttpOnly")], body)
    }

    async fn query(State(fake): State<Shared>, headers: HeaderMap, uri: Uri) -> impl IntoResponse {
        let mut fake = fake.lock().unwrap();
        fake.last_query = Some(uri.path().to_string());
        let authed = headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("chocolatechip=abc123"));
        if !authed {
            return (axum::http::StatusCode::UNAUTHORIZED, String::new());
        }
        (fake.query_status, fake.query_body.clone())
    }

    async fn spawn_upstream() -> (String, Shared) {
        let fake = Arc::new(Mutex::new(FakeUpstream {
            logins: 0,
            accept_login: true,
            query_status: axum::http::StatusCode::OK,
            query_body: CATALOG.to_string(),
            last_query: None,
        }));
        let app = Router::new()
            .route("/ajaxauth/login", post(login))
            .route("/basicspacedata/query/{*rest}", get(query))
            .with_state(fake.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), fake)
    }

    fn gateway(base_url: &str) -> SpaceTrackGateway {
        SpaceTrackGateway::new(SpaceTrackConfig {
            base_url: base_url.to_string(),
            username: "ops@example.org".to_string(),
            password: "secret".to_string(),
            ..SpaceTrackConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let (base_url, fake) = spawn_upstream().await;
        let gateway = SpaceTrackGateway::new(SpaceTrackConfig {
            base_url,
            ..SpaceTrackConfig::default()
        })
        .unwrap();

        let err = gateway.fetch_catalog(10, 30).await.unwrap_err();
        assert!(matches!(err, GatewayError::MissingCredentials));
        assert!(err.is_auth());
        assert_eq!(fake.lock().unwrap().logins, 0);
        assert!(!gateway.status().configured);
    }

    #[tokio::test]
    async fn test_fetch_reuses_session() {
        let (base_url, fake) = spawn_upstream().await;
        let gateway = gateway(&base_url);

        let text = gateway.fetch_catalog(5, 30).await.unwrap();
        assert_eq!(text, CATALOG.trim());
        gateway.fetch_catalog(5, 30).await.unwrap();

        let fake = fake.lock().unwrap();
        assert_eq!(fake.logins, 1);
        let path = fake.last_query.clone().unwrap();
        assert!(path.contains("/decay_date/null-val/"));
        assert!(path.contains("/epoch/%3Enow-30/"));
        assert!(path.contains("/orderby/norad_cat_id/limit/5/format/tle"));

        let status = gateway.status();
        assert!(status.configured);
        assert!(status.session_valid);
        assert_eq!(status.requests_this_minute, 2);
        assert_eq!(status.requests_this_hour, 2);
        assert!(status.last_request.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_callers_login_once() {
        let (base_url, fake) = spawn_upstream().await;
        let gateway = gateway(&base_url);

        let (a, b) = tokio::join!(gateway.fetch_catalog(5, 30), gateway.fetch_catalog(5, 30));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(fake.lock().unwrap().logins, 1);
        assert_eq!(gateway.status().requests_this_minute, 2);
    }

    #[tokio::test]
    async fn test_unauthorized_invalidates_session() {
        let (base_url, fake) = spawn_upstream().await;
        let gateway = gateway(&base_url);
        gateway.fetch_catalog(5, 30).await.unwrap();

        fake.lock().unwrap().query_status = axum::http::StatusCode::UNAUTHORIZED;
        let err = gateway.fetch_catalog(5, 30).await.unwrap_err();
        assert!(matches!(err, GatewayError::SessionExpired));
        assert!(!gateway.status().session_valid);

        fake.lock().unwrap().query_status = axum::http::StatusCode::OK;
        gateway.fetch_catalog(5, 30).await.unwrap();
        assert_eq!(fake.lock().unwrap().logins, 2);
    }

    #[tokio::test]
    async fn test_rejected_login() {
        let (base_url, fake) = spawn_upstream().await;
        fake.lock().unwrap().accept_login = false;
        let gateway = gateway(&base_url);

        let err = gateway.fetch_catalog(5, 30).await.unwrap_err();
        assert!(matches!(err, GatewayError::Auth(_)));
        assert!(!gateway.status().session_valid);
        // The request slot is reserved before the login attempt
        assert_eq!(gateway.status().requests_this_hour, 1);
    }

    #[tokio::test]
    async fn test_short_body_and_server_error_are_unavailable() {
        let (base_url, fake) = spawn_upstream().await;
        let gateway = gateway(&base_url);

        fake.lock().unwrap().query_body = "   \n".to_string();
        let err = gateway.fetch_catalog(5, 30).await.unwrap_err();
        assert!(matches!(err, GatewayError::UpstreamUnavailable(_)));

        fake.lock().unwrap().query_status = axum::http::StatusCode::INTERNAL_SERVER_ERROR;
        let err = gateway.fetch_catalog(5, 30).await.unwrap_err();
        assert!(matches!(err, GatewayError::UpstreamUnavailable(_)));
        // A server error does not end the session
        assert!(gateway.status().session_valid);
    }

    #[tokio::test]
    async fn test_quota_exhaustion() {
        let (base_url, _fake) = spawn_upstream().await;
        let gateway = SpaceTrackGateway::new(SpaceTrackConfig {
            base_url,
            username: "ops@example.org".to_string(),
            password: "secret".to_string(),
            rate_limit_per_minute: 1,
            ..SpaceTrackConfig::default()
        })
        .unwrap();

        gateway.fetch_catalog(5, 30).await.unwrap();
        let err = gateway.fetch_catalog(5, 30).await.unwrap_err();
        assert!(matches!(err, GatewayError::RateLimited { limit: 1, .. }));
    }

    #[tokio::test]
    async fn test_exhausted_quota_skips_login() {
        let (base_url, fake) = spawn_upstream().await;
        let gateway = SpaceTrackGateway::new(SpaceTrackConfig {
            base_url,
            username: "ops@example.org".to_string(),
            password: "secret".to_string(),
            rate_limit_per_minute: 0,
            ..SpaceTrackConfig::default()
        })
        .unwrap();

        let err = gateway.fetch_catalog(5, 30).await.unwrap_err();
        assert!(matches!(err, GatewayError::RateLimited { limit: 0, .. }));
        assert_eq!(fake.lock().unwrap().logins, 0);
        assert!(!gateway.status().session_valid);
    }

    #[tokio::test]
    async fn test_expired_session_logs_in_again() {
        let (base_url, fake) = spawn_upstream().await;
        let gateway = SpaceTrackGateway::new(SpaceTrackConfig {
            base_url,
            username: "ops@example.org".to_string(),
            password: "secret".to_string(),
            session_ttl_minutes: 0,
            ..SpaceTrackConfig::default()
        })
        .unwrap();

        gateway.fetch_catalog(5, 30).await.unwrap();
        assert!(!gateway.status().session_valid);
        gateway.fetch_catalog(5, 30).await.unwrap();

        assert_eq!(fake.lock().unwrap().logins, 2);
        assert!(!gateway.status().session_valid);
    }
}
