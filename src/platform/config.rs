// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Platform configuration, as the host hands it over in JSON.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::cache::MemoryStore;
use crate::dispatch::DispatchConfig;
use crate::error::ConfigError;
use crate::protocol::GatewayConfig;
use crate::sensor::SensorSettings;

/// Settings of one device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceOverride {
    /// Automation delay in seconds.
    pub delay: u64,
    /// Randomise the delay.
    pub random: bool,
    /// Number of repeats after the first command.
    pub repeats: u32,
}

/// Settings of one sensor.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SensorOverride {
    /// Polling interval in seconds.
    pub heartrate: u64,
    /// Spread the polling interval randomly.
    pub random_heartrate: bool,
    /// Added to temperature readings, °C.
    pub temperature_offset: f64,
}

impl Default for SensorOverride {
    fn default() -> Self {
        let settings = SensorSettings::default();
        Self {
            heartrate: settings.heartrate,
            random_heartrate: settings.random_heartrate,
            temperature_offset: settings.temperature_offset,
        }
    }
}

/// Configuration of the bridge platform.
///
/// # Examples
///
/// ```
/// use telldus_bridge::platform::PlatformConfig;
///
/// let config = PlatformConfig::from_json(r#"{
///     "host": "192.168.1.20",
///     "accessToken": "eyJhbGciOi...",
///     "beatRate": 10,
///     "devices": { "4": { "delay": 30, "random": true, "repeats": 2 } },
///     "sensors": { "11": { "heartrate": 60, "temperatureOffset": -0.5 } },
///     "ignoreDevices": [7]
/// }"#).unwrap();
///
/// assert_eq!(config.dispatch_config(4).repeats, 2);
/// assert_eq!(config.sensor_settings(11).heartrate, 60);
/// assert!(config.is_device_ignored(7));
/// ```
#[derive(Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlatformConfig {
    /// Gateway address, bare or as URL.
    pub host: String,
    /// Bearer token for the gateway API.
    pub access_token: String,
    /// Expiry of `access_token` in unix seconds, if known.
    pub token_expires: Option<i64>,
    /// Seconds between reconciliation passes.
    pub beat_rate: u64,
    /// Per-request timeout in seconds.
    pub timeout: u64,
    /// Lifetime of state cache entries in seconds.
    pub cache_ttl: u64,
    /// Maximum number of state cache entries.
    pub cache_max_keys: Option<usize>,
    /// Per-device settings, by gateway id.
    pub devices: HashMap<u32, DeviceOverride>,
    /// Per-sensor settings, by gateway id.
    pub sensors: HashMap<u32, SensorOverride>,
    /// Devices not to bridge.
    pub ignore_devices: Vec<u32>,
    /// Sensors not to bridge.
    pub ignore_sensors: Vec<u32>,
}

impl PlatformConfig {
    /// Default seconds between reconciliation passes.
    pub const DEFAULT_BEAT_RATE: u64 = 10;
    /// Longest allowed beat rate.
    pub const MAX_BEAT_RATE: u64 = 3600;
    /// Longest allowed request timeout in seconds.
    pub const MAX_TIMEOUT: u64 = 60;
    /// Most repeats a device may be configured with.
    pub const MAX_REPEATS: u64 = 10;
    /// Longest allowed automation delay in seconds.
    pub const MAX_DELAY: u64 = 24 * 3600;

    /// Creates a configuration for the given gateway and token.
    #[must_use]
    pub fn new(host: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            access_token: access_token.into(),
            ..Self::default()
        }
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Malformed` for invalid JSON, or any error of
    /// [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks required settings and ranges.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingHost);
        }
        if self.access_token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        check_range("beatRate", self.beat_rate, 1, Self::MAX_BEAT_RATE)?;
        check_range("timeout", self.timeout, 1, Self::MAX_TIMEOUT)?;
        check_range("cacheTtl", self.cache_ttl, 1, u64::MAX)?;

        for device in self.devices.values() {
            check_range("delay", device.delay, 0, Self::MAX_DELAY)?;
            check_range("repeats", u64::from(device.repeats), 0, Self::MAX_REPEATS)?;
        }
        for sensor in self.sensors.values() {
            check_range("heartrate", sensor.heartrate, 1, Self::MAX_DELAY)?;
        }
        Ok(())
    }

    /// Returns the platform heartbeat interval.
    #[must_use]
    pub fn beat(&self) -> Duration {
        Duration::from_secs(self.beat_rate)
    }

    /// Returns the gateway connection settings.
    #[must_use]
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::new(self.host.clone())
            .with_token(self.access_token.clone())
            .with_timeout(Duration::from_secs(self.timeout))
    }

    /// Returns a state store sized per this configuration.
    #[must_use]
    pub fn state_store(&self) -> MemoryStore {
        let store = MemoryStore::new(Duration::from_secs(self.cache_ttl));
        match self.cache_max_keys {
            Some(max) => store.with_max_keys(max),
            None => store,
        }
    }

    /// Returns the dispatch settings of a device.
    #[must_use]
    pub fn dispatch_config(&self, device_id: u32) -> DispatchConfig {
        let device = self.devices.get(&device_id).copied().unwrap_or_default();
        DispatchConfig::default()
            .with_delay(Duration::from_secs(device.delay))
            .with_random(device.random)
            .with_repeats(device.repeats)
            .with_beat_rate(self.beat())
    }

    /// Returns the polling settings of a sensor.
    #[must_use]
    pub fn sensor_settings(&self, sensor_id: u32) -> SensorSettings {
        let sensor = self.sensors.get(&sensor_id).copied().unwrap_or_default();
        SensorSettings {
            heartrate: sensor.heartrate,
            random_heartrate: sensor.random_heartrate,
            temperature_offset: sensor.temperature_offset,
        }
    }

    /// Returns true if the device is excluded from bridging.
    #[must_use]
    pub fn is_device_ignored(&self, device_id: u32) -> bool {
        self.ignore_devices.contains(&device_id)
    }

    /// Returns true if the sensor is excluded from bridging.
    #[must_use]
    pub fn is_sensor_ignored(&self, sensor_id: u32) -> bool {
        self.ignore_sensors.contains(&sensor_id)
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            access_token: String::new(),
            token_expires: None,
            beat_rate: Self::DEFAULT_BEAT_RATE,
            timeout: GatewayConfig::DEFAULT_TIMEOUT.as_secs(),
            cache_ttl: MemoryStore::DEFAULT_TTL.as_secs(),
            cache_max_keys: None,
            devices: HashMap::new(),
            sensors: HashMap::new(),
            ignore_devices: Vec::new(),
            ignore_sensors: Vec::new(),
        }
    }
}

impl std::fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("host", &self.host)
            .field("access_token", &"<redacted>")
            .field("token_expires", &self.token_expires)
            .field("beat_rate", &self.beat_rate)
            .field("timeout", &self.timeout)
            .field("devices", &self.devices)
            .field("sensors", &self.sensors)
            .field("ignore_devices", &self.ignore_devices)
            .field("ignore_sensors", &self.ignore_sensors)
            .finish_non_exhaustive()
    }
}

fn check_range(field: &'static str, actual: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if (min..=max).contains(&actual) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            min,
            max,
            actual,
        })
    }
}
