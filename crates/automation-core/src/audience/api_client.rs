use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use automation_types::{ConfigError, Platform};

use crate::error::{AppError, AppResult};

const ACCEPT_JSON_V3: &str = "application/vnd.urbanairship+json; version=3;";
const CONTACT_ID_HEADER: &str = "x-ua-contact-id";
const DEVICE_FAMILY_HEADER: &str = "x-ua-device-family";

/// One audience check call. `url` is the endpoint, the rest is the body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudienceCheckRequest {
    #[serde(skip)]
    pub url: String,
    pub channel_id: String,
    pub contact_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_user_id: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub context: Option<Value>,
}

fn is_absent(context: &Option<Value>) -> bool {
    context.as_ref().map_or(true, Value::is_null)
}

/// Decision returned by the endpoint. Also the cached representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudienceCheckResult {
    #[serde(rename = "allowed")]
    pub is_matched: bool,
    #[serde(rename = "cache_seconds", with = "seconds")]
    pub cache_ttl: Duration,
}

/// HTTP status plus the parsed body of a successful response.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestResult<T> {
    pub status: u16,
    pub value: Option<T>,
}

impl<T> RequestResult<T> {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

#[async_trait]
pub trait AudienceCheckApi: Send + Sync + std::fmt::Debug {
    async fn resolve(
        &self,
        request: &AudienceCheckRequest,
    ) -> AppResult<RequestResult<AudienceCheckResult>>;
}

/// `reqwest` implementation of [`AudienceCheckApi`].
#[derive(Debug, Clone)]
pub struct AudienceCheckApiClient {
    http_client: Client,
    platform: Platform,
}

impl AudienceCheckApiClient {
    /// Takes a pre-built client so TLS setup happens once, outside request paths.
    pub fn new(http_client: Client, platform: Platform) -> Self {
        Self { http_client, platform }
    }

    fn headers(&self, request: &AudienceCheckRequest) -> AppResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON_V3));
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let _ = headers.insert(DEVICE_FAMILY_HEADER, HeaderValue::from_static(self.platform.as_str()));
        let contact_id = HeaderValue::from_str(&request.contact_id).map_err(|e| {
            ConfigError::ValidationError { field: "contact_id".to_string(), message: e.to_string() }
        })?;
        let _ = headers.insert(CONTACT_ID_HEADER, contact_id);
        Ok(headers)
    }
}

#[async_trait]
impl AudienceCheckApi for AudienceCheckApiClient {
    async fn resolve(
        &self,
        request: &AudienceCheckRequest,
    ) -> AppResult<RequestResult<AudienceCheckResult>> {
        let url = url::Url::parse(&request.url).map_err(|e| ConfigError::ValidationError {
            field: "additional_audience_check.url".to_string(),
            message: e.to_string(),
        })?;

        let response = self
            .http_client
            .post(url)
            .headers(self.headers(request)?)
            .body(serde_json::to_vec(request)?)
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            tracing::debug!(status, "Audience check request rejected");
            return Ok(RequestResult { status, value: None });
        }

        let body = response.bytes().await?;
        let value: AudienceCheckResult = serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(status, error = %e, "Malformed audience check response");
            AppError::Json(e)
        })?;
        Ok(RequestResult { status, value: Some(value) })
    }
}

/// `Duration` as fractional seconds. Negative or non-finite values read as zero.
mod seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let request = AudienceCheckRequest {
            url: "https://example.com".to_string(),
            channel_id: "channel".to_string(),
            contact_id: "contact".to_string(),
            named_user_id: None,
            context: Some(Value::Null),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"channel_id": "channel", "contact_id": "contact"})
        );

        let request = AudienceCheckRequest {
            named_user_id: Some("user".to_string()),
            context: Some(json!({"tier": 3})),
            ..request
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "channel_id": "channel",
                "contact_id": "contact",
                "named_user_id": "user",
                "context": {"tier": 3}
            })
        );
    }

    #[test]
    fn test_result_parses_fractional_seconds() {
        let result: AudienceCheckResult =
            serde_json::from_value(json!({"allowed": true, "cache_seconds": 1.5})).unwrap();
        assert!(result.is_matched);
        assert_eq!(result.cache_ttl, Duration::from_millis(1_500));

        let result: AudienceCheckResult =
            serde_json::from_value(json!({"allowed": false, "cache_seconds": -4})).unwrap();
        assert_eq!(result.cache_ttl, Duration::ZERO);
    }

    #[test]
    fn test_status_classes() {
        let ok: RequestResult<()> = RequestResult { status: 204, value: None };
        let bad: RequestResult<()> = RequestResult { status: 404, value: None };
        let down: RequestResult<()> = RequestResult { status: 503, value: None };
        assert!(ok.is_success() && !ok.is_server_error());
        assert!(!bad.is_success() && !bad.is_server_error());
        assert!(!down.is_success() && down.is_server_error());
    }
}
