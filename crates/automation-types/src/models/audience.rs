//! Additional audience check configuration and per-schedule overrides.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Remote-config driven settings for the additional audience check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdditionalAudienceCheckConfig {
    /// Whether the check runs at all
    #[serde(rename = "enabled", default)]
    pub is_enabled: bool,
    /// Default context sent with every check
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    /// Default endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Per-schedule overrides for the additional audience check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudienceCheckOverrides {
    /// Skip the remote check and treat the audience as matched
    #[serde(default)]
    pub bypass: bool,
    /// Context replacing the configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    /// Endpoint replacing the configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Contact identity that is not going to change mid-resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StableContactInfo {
    pub contact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named_user_id: Option<String>,
}
