//! BLEnd service identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Platform;

/// Service advertised by Apple devices.
pub const SERVICE_UUID_APPLE: &str = "e0bfe0cf-02ce-4f1d-b2c0-ffb07fadd498";

/// Service advertised by Android 8.0+ devices.
pub const SERVICE_UUID_ANDROID: &str = "000085cf-bea1-419a-8721-b0bb194b8417";

/// 16-bit form of the Android service, seen from older Android devices.
pub const SERVICE_UUID_ANDROID_SHORT: &str = "85CF";

/// One of the three services a BLEnd node scans for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServiceId {
    Apple,
    Android,
    AndroidShort,
}

impl ServiceId {
    pub const ALL: [ServiceId; 3] = [ServiceId::Apple, ServiceId::Android, ServiceId::AndroidShort];

    pub fn uuid(&self) -> &'static str {
        match self {
            ServiceId::Apple => SERVICE_UUID_APPLE,
            ServiceId::Android => SERVICE_UUID_ANDROID,
            ServiceId::AndroidShort => SERVICE_UUID_ANDROID_SHORT,
        }
    }

    /// Platform whose nodes advertise this service.
    pub fn platform(&self) -> Platform {
        match self {
            ServiceId::Apple => Platform::Apple,
            ServiceId::Android | ServiceId::AndroidShort => Platform::Android,
        }
    }

    /// Match a service UUID string, ignoring case.
    pub fn from_uuid(uuid: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|service| service.uuid().eq_ignore_ascii_case(uuid))
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uuid())
    }
}

/// Services a scan should report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFilter {
    services: Vec<ServiceId>,
}

impl ServiceFilter {
    pub fn new(services: impl IntoIterator<Item = ServiceId>) -> Self {
        Self {
            services: services.into_iter().collect(),
        }
    }

    pub fn services(&self) -> &[ServiceId] {
        &self.services
    }

    pub fn matches(&self, service: ServiceId) -> bool {
        self.services.contains(&service)
    }
}

impl Default for ServiceFilter {
    /// All BLEnd services.
    fn default() -> Self {
        Self::new(ServiceId::ALL)
    }
}
