use async_trait::async_trait;

use automation_types::StableContactInfo;

use crate::error::AppResult;

/// Identity of this device as the audience check sees it.
#[async_trait]
pub trait DeviceInfoProvider: Send + Sync {
    async fn channel_id(&self) -> AppResult<String>;

    async fn stable_contact_info(&self) -> AppResult<StableContactInfo>;
}

/// Fixed identity, for hosts that resolve it up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticDeviceInfo {
    pub channel_id: String,
    pub contact: StableContactInfo,
}

impl StaticDeviceInfo {
    pub fn new(channel_id: impl Into<String>, contact_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            contact: StableContactInfo { contact_id: contact_id.into(), named_user_id: None },
        }
    }

    pub fn with_named_user(mut self, named_user_id: impl Into<String>) -> Self {
        self.contact.named_user_id = Some(named_user_id.into());
        self
    }
}

#[async_trait]
impl DeviceInfoProvider for StaticDeviceInfo {
    async fn channel_id(&self) -> AppResult<String> {
        Ok(self.channel_id.clone())
    }

    async fn stable_contact_info(&self) -> AppResult<StableContactInfo> {
        Ok(self.contact.clone())
    }
}
