use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{Config, ConfigError};
use crate::schedule::{DeviceToken, SchedulingRequest, TokenRegistration};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid endpoint path: {0}")]
    Endpoint(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("unexpected response ({status}): {body}")]
    InvalidResponse { status: StatusCode, body: String },
    #[error("server rejected request ({status}): {}", .error.as_deref().unwrap_or("no error given"))]
    Rejected {
        status: StatusCode,
        error: Option<String>,
    },
}

impl ApiError {
    /// Error text supplied by the server, if any.
    pub fn server_error(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { error, .. } => error.as_deref(),
            _ => None,
        }
    }
}

/// Common `{ success, error?, ... }` envelope returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationStats {
    pub total_tokens: u64,
    pub total_scheduled: u64,
    pub pending: u64,
    pub sent: u64,
    pub failed: u64,
}

/// Server clock as reported by the backend. Times are preformatted strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimezoneInfo {
    pub server_time: String,
    pub utc_time: String,
    pub timezone: String,
    pub offset_hours: i32,
    pub is_dst: bool,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct DataResponse<T> {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<T>,
}

/// Backend calls made by the orchestrator.
#[async_trait]
pub trait SchedulerApi: Send + Sync {
    async fn register_token(&self, token: &DeviceToken) -> Result<ApiResponse, ApiError>;

    async fn schedule(&self, request: &SchedulingRequest) -> Result<ApiResponse, ApiError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub save_token: String,
    pub schedule: String,
    pub status: String,
    pub timezone: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            save_token: "api/save-fcm-token/".into(),
            schedule: "api/schedule-notification/".into(),
            status: "api/notification-status/".into(),
            timezone: "api/timezone-info/".into(),
        }
    }
}

#[derive(Clone)]
pub struct SchedulerClient {
    http: Client,
    base_url: Url,
    endpoints: Endpoints,
}

impl fmt::Debug for SchedulerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl SchedulerClient {
    pub fn new(base_url: Url) -> Result<Self, ApiError> {
        Self::with_endpoints(base_url, Endpoints::default())
    }

    pub fn with_endpoints(base_url: Url, endpoints: Endpoints) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(concat!("push-reminder/", env!("CARGO_PKG_VERSION")))
            .no_proxy()
            .build()?;
        Ok(Self {
            http,
            base_url,
            endpoints,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, ApiError> {
        let base_url = cfg.base_url()?;
        let endpoints = Endpoints {
            save_token: cfg.api.save_token_path.clone(),
            schedule: cfg.api.schedule_path.clone(),
            status: cfg.api.status_path.clone(),
            timezone: cfg.api.timezone_path.clone(),
        };
        Self::with_endpoints(base_url, endpoints)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Endpoint(format!("{path}: {e}")))
    }

    pub fn build_request<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Request, ApiError> {
        let endpoint = self.endpoint(path)?;
        Ok(self
            .http
            .post(endpoint)
            .header("Content-Type", "application/json")
            .json(body)
            .build()?)
    }

    async fn execute(&self, request: reqwest::Request) -> Result<ApiResponse, ApiError> {
        debug!(url = %request.url(), "sending scheduler request");
        let res = self.http.execute(request).await?;
        let status = res.status();
        let body = res.text().await?;

        let envelope: ApiResponse = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(%status, ?err, "scheduler returned a non-JSON response");
                return Err(ApiError::InvalidResponse { status, body });
            }
        };
        if !envelope.success {
            warn!(%status, error = ?envelope.error, "scheduler rejected request");
            return Err(ApiError::Rejected {
                status,
                error: envelope.error,
            });
        }
        Ok(envelope)
    }

    pub async fn register_token(&self, token: &DeviceToken) -> Result<ApiResponse, ApiError> {
        let body = TokenRegistration {
            token: token.clone(),
        };
        let request = self.build_request(&self.endpoints.save_token, &body)?;
        let res = self.execute(request).await?;
        info!(token = %token.redacted(), created = ?res.created, "device token saved");
        Ok(res)
    }

    pub async fn schedule(&self, request: &SchedulingRequest) -> Result<ApiResponse, ApiError> {
        let http_request = self.build_request(&self.endpoints.schedule, request)?;
        let res = self.execute(http_request).await?;
        info!(
            scheduled_at = %request.scheduled_at,
            notification_id = ?res.notification_id,
            "notification scheduled"
        );
        Ok(res)
    }

    pub async fn status(&self) -> Result<NotificationStats, ApiError> {
        self.get_data(&self.endpoints.status).await
    }

    pub async fn timezone_info(&self) -> Result<TimezoneInfo, ApiError> {
        self.get_data(&self.endpoints.timezone).await
    }

    /// GET a `{ success, error?, data }` endpoint and return its `data`.
    async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        debug!(%url, "fetching backend data");
        let res = self.http.get(url).send().await?;
        let status = res.status();
        let body = res.text().await?;
        let parsed: DataResponse<T> = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(%status, ?err, "backend returned an unexpected response");
                return Err(ApiError::InvalidResponse { status, body });
            }
        };
        if !parsed.success {
            return Err(ApiError::Rejected {
                status,
                error: parsed.error,
            });
        }
        parsed
            .data
            .ok_or(ApiError::InvalidResponse { status, body })
    }
}

#[async_trait]
impl SchedulerApi for SchedulerClient {
    async fn register_token(&self, token: &DeviceToken) -> Result<ApiResponse, ApiError> {
        SchedulerClient::register_token(self, token).await
    }

    async fn schedule(&self, request: &SchedulingRequest) -> Result<ApiResponse, ApiError> {
        SchedulerClient::schedule(self, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Priority;

    fn client() -> SchedulerClient {
        SchedulerClient::new(Url::parse("http://127.0.0.1:8000/").unwrap()).unwrap()
    }

    #[test]
    fn build_request_targets_endpoint() {
        let token = DeviceToken::new("tok").unwrap();
        let request = client()
            .build_request("api/save-fcm-token/", &TokenRegistration { token })
            .unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().as_str(), "http://127.0.0.1:8000/api/save-fcm-token/");
        assert_eq!(
            request
                .headers()
                .get("Content-Type")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "application/json"
        );
    }

    #[test]
    fn build_request_serializes_schedule_body() {
        let req = SchedulingRequest {
            title: "t".into(),
            body: "b".into(),
            fcm_token: DeviceToken::new("tok").unwrap(),
            scheduled_at: "2025-01-15T14:30:00.000Z".into(),
            priority: Priority::High,
        };
        let request = client()
            .build_request("api/schedule-notification/", &req)
            .unwrap();
        let bytes = request.body().and_then(|b| b.as_bytes()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(bytes).unwrap();
        assert_eq!(value["fcm_token"], "tok");
        assert_eq!(value["priority"], "high");
    }

    #[test]
    fn envelope_tolerates_missing_optionals() {
        let res: ApiResponse = serde_json::from_str(r#"{"success":false,"error":"nope"}"#).unwrap();
        assert!(!res.success);
        assert_eq!(res.error.as_deref(), Some("nope"));
        assert!(res.notification_id.is_none());
    }

    #[test]
    fn from_config_reports_bad_base_url() {
        let mut cfg: Config = serde_yaml::from_str(crate::config::example()).unwrap();
        cfg.api.base_url = "not a url".into();
        let err = SchedulerClient::from_config(&cfg).unwrap_err();
        assert!(matches!(err, ApiError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn from_config_uses_configured_paths() {
        let mut cfg: Config = serde_yaml::from_str(crate::config::example()).unwrap();
        cfg.api.timezone_path = "v2/tz/".into();
        let client = SchedulerClient::from_config(&cfg).unwrap();
        assert_eq!(client.endpoints.timezone, "v2/tz/");
        assert_eq!(client.endpoints.schedule, "api/schedule-notification/");
    }

    #[test]
    fn rejected_exposes_server_error() {
        let err = ApiError::Rejected {
            status: StatusCode::BAD_REQUEST,
            error: Some("Invalid or inactive FCM token".into()),
        };
        assert_eq!(err.server_error(), Some("Invalid or inactive FCM token"));
        assert!(err.to_string().contains("Invalid or inactive FCM token"));
    }
}
