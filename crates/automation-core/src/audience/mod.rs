//! Additional audience check: a remote allow/deny decision per device,
//! cached by endpoint, context and identity.

mod api_client;
mod device;
mod resolver;

#[cfg(test)]
mod tests;

pub use api_client::{
    AudienceCheckApi, AudienceCheckApiClient, AudienceCheckRequest, AudienceCheckResult,
    RequestResult,
};
pub use device::{DeviceInfoProvider, StaticDeviceInfo};
pub use resolver::AdditionalAudienceCheckerResolver;
