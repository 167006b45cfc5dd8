use std::error::Error;

/// A compute device as enumerated by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub platform: String,
    pub name: String,
    /// Backend-specific index used to open the device.
    pub ordinal: usize,
}

/// Platform and device name filters taken from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSelection {
    pub platform: Option<String>,
    pub device: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn name_matches(name: &str, filter: &str) -> bool {
    name.to_lowercase().contains(&filter.to_lowercase())
}

impl DeviceSelection {
    /// One positional argument names a device; two name a platform and a device.
    pub fn from_positional(first: Option<String>, second: Option<String>) -> Self {
        match (non_empty(first), non_empty(second)) {
            (Some(platform), Some(device)) => Self {
                platform: Some(platform),
                device: Some(device),
            },
            (Some(device), None) | (None, Some(device)) => Self {
                platform: None,
                device: Some(device),
            },
            (None, None) => Self::default(),
        }
    }

    pub fn description(&self) -> Option<String> {
        match (&self.platform, &self.device) {
            (Some(platform), Some(device)) => {
                Some(format!("Searching for platform {}, device {}", platform, device))
            }
            (Some(platform), None) => Some(format!("Searching for platform {}", platform)),
            (None, Some(device)) => Some(format!("Searching for device {} on default platform", device)),
            (None, None) => None,
        }
    }

    /// Pick a device from `available`, in enumeration order.
    ///
    /// Filters are case-insensitive substring matches. An unmatched platform falls back to
    /// the first platform, an unmatched device to the first device of the chosen platform.
    /// Only an empty device list is an error.
    pub fn resolve<'a>(&self, available: &'a [DeviceInfo]) -> Result<&'a DeviceInfo, Box<dyn Error + Send + Sync>> {
        let first = available.first().ok_or("No compute devices found")?;

        let platform = match &self.platform {
            Some(filter) => match available.iter().find(|d| name_matches(&d.platform, filter)) {
                Some(found) => found.platform.as_str(),
                None => {
                    log::warn!(
                        "Platform '{}' not found, falling back to default platform '{}'",
                        filter,
                        first.platform
                    );
                    first.platform.as_str()
                }
            },
            None => first.platform.as_str(),
        };

        let mut on_platform = available.iter().filter(|d| d.platform == platform);
        // The platform came from `available`, so it has at least one device.
        let default_device = on_platform.clone().next().unwrap_or(first);

        let device = match &self.device {
            Some(filter) => match on_platform.find(|d| name_matches(&d.name, filter)) {
                Some(found) => found,
                None => {
                    log::warn!(
                        "Device '{}' not found on platform '{}', falling back to '{}'",
                        filter,
                        platform,
                        default_device.name
                    );
                    default_device
                }
            },
            None => default_device,
        };

        log::debug!("Resolved device '{}' on platform '{}'", device.name, device.platform);
        Ok(device)
    }
}
