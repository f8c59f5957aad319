use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

use automation_types::{AdditionalAudienceCheckConfig, AudienceCheckOverrides, ConfigError};

use super::api_client::{AudienceCheckApi, AudienceCheckRequest, AudienceCheckResult};
use super::device::DeviceInfoProvider;
use crate::cache::ResultCache;
use crate::error::{AppError, AppResult};

/// Gates automations behind a remote yes/no decision with caching.
///
/// Resolutions run one at a time per resolver (FIFO), so concurrent callers
/// for the same key wait for the first one and then read its cached result.
#[derive(Debug)]
pub struct AdditionalAudienceCheckerResolver {
    cache: ResultCache,
    api: Arc<dyn AudienceCheckApi>,
    config: RwLock<Option<AdditionalAudienceCheckConfig>>,
    queue: tokio::sync::Mutex<()>,
}

impl AdditionalAudienceCheckerResolver {
    pub fn new(
        cache: ResultCache,
        api: Arc<dyn AudienceCheckApi>,
        config: Option<AdditionalAudienceCheckConfig>,
    ) -> Self {
        Self { cache, api, config: RwLock::new(config), queue: tokio::sync::Mutex::new(()) }
    }

    /// Swap in a new remote config; applies to the next `resolve`.
    pub fn set_config(&self, config: Option<AdditionalAudienceCheckConfig>) {
        *self.config.write() = config;
    }

    pub fn config(&self) -> Option<AdditionalAudienceCheckConfig> {
        self.config.read().clone()
    }

    /// Whether the device is in the additional audience.
    ///
    /// `Ok(true)` when the check is not configured, disabled, or bypassed.
    /// A 5xx answer is an `Err` that [`AppError::is_retryable`] accepts; any
    /// other rejection is a definitive `Ok(false)`.
    pub async fn resolve(
        &self,
        device_info: &dyn DeviceInfoProvider,
        overrides: Option<&AudienceCheckOverrides>,
    ) -> AppResult<bool> {
        let Some(config) = self.config().filter(|config| config.is_enabled) else {
            return Ok(true);
        };

        let url = overrides
            .and_then(|o| o.url.clone())
            .or_else(|| config.url.clone())
            .ok_or_else(|| ConfigError::Missing {
                field: "additional_audience_check.url".to_string(),
            })?;

        if overrides.is_some_and(|o| o.bypass) {
            tracing::debug!("Additional audience check bypassed");
            return Ok(true);
        }

        let context = overrides.and_then(|o| o.context.clone()).or(config.context);

        let _turn = self.queue.lock().await;

        let channel_id = device_info.channel_id().await?;
        let contact = device_info.stable_contact_info().await?;
        let key = cache_key(&url, context.as_ref(), &contact.contact_id, &channel_id);

        match self.cache.get_cached::<AudienceCheckResult>(&key).await {
            Ok(Some(cached)) => {
                tracing::debug!(key = %key, is_matched = cached.is_matched, "Audience check cache hit");
                return Ok(cached.is_matched);
            },
            Ok(None) => {},
            Err(e) => tracing::warn!(key = %key, error = %e, "Audience cache read failed"),
        }

        let request = AudienceCheckRequest {
            url,
            channel_id,
            contact_id: contact.contact_id,
            named_user_id: contact.named_user_id,
            context,
        };
        let response = self.api.resolve(&request).await?;

        if response.is_success() {
            let result = response.value.ok_or_else(|| {
                AppError::Unknown("audience check succeeded without a body".to_string())
            })?;
            if let Err(e) = self.cache.store(&result, &key, result.cache_ttl).await {
                tracing::warn!(key = %key, error = %e, "Failed to cache audience check result");
            }
            tracing::info!(
                is_matched = result.is_matched,
                cache_ttl_ms = result.cache_ttl.as_millis() as u64,
                "Audience check resolved"
            );
            return Ok(result.is_matched);
        }

        if response.is_server_error() {
            tracing::warn!(status = response.status, "Audience check server error");
            return Err(AppError::ServerError { status: response.status });
        }

        tracing::info!(status = response.status, "Audience check rejected");
        Ok(false)
    }
}

/// `url:<context as JSON>:contact_id:channel_id`
fn cache_key(url: &str, context: Option<&Value>, contact_id: &str, channel_id: &str) -> String {
    let context = context.map_or_else(|| Value::Null.to_string(), Value::to_string);
    format!("{url}:{context}:{contact_id}:{channel_id}")
}
