// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP implementation of the [`Gateway`] trait.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::{Error, ParseError, ProtocolError};
use crate::model::{Device, DeviceList, SensorInfo, SensorList, SystemInfo, TokenRefresh};
use crate::protocol::{ApiResponse, CallResult, Gateway};
use crate::types::Methods;

// ============================================================================
// GatewayConfig
// ============================================================================

/// Connection parameters for a gateway.
///
/// # Examples
///
/// ```
/// use telldus_bridge::protocol::GatewayConfig;
/// use std::time::Duration;
///
/// let config = GatewayConfig::new("192.168.1.20")
///     .with_token("eyJhbGciOi...")
///     .with_timeout(Duration::from_secs(3));
///
/// assert_eq!(config.base_url(), "http://192.168.1.20");
/// ```
#[derive(Clone)]
pub struct GatewayConfig {
    host: String,
    port: u16,
    use_https: bool,
    token: String,
    timeout: Duration,
}

impl GatewayConfig {
    /// Default HTTP port.
    pub const DEFAULT_PORT: u16 = 80;
    /// Default HTTPS port.
    pub const DEFAULT_HTTPS_PORT: u16 = 443;
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a configuration for the given host.
    ///
    /// The host may be a bare address or a full `http://` / `https://` URL,
    /// in which case port and scheme settings are ignored.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            use_https: false,
            token: String::new(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets a custom port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enables HTTPS.
    ///
    /// If port hasn't been explicitly set, it will be changed to 443.
    #[must_use]
    pub fn with_https(mut self) -> Self {
        self.use_https = true;
        if self.port == Self::DEFAULT_PORT {
            self.port = Self::DEFAULT_HTTPS_PORT;
        }
        self
    }

    /// Sets the bearer access token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the base URL from this configuration.
    #[must_use]
    pub fn base_url(&self) -> String {
        if self.host.starts_with("http://") || self.host.starts_with("https://") {
            return self.host.trim_end_matches('/').to_string();
        }
        let scheme = if self.use_https { "https" } else { "http" };
        let port_suffix =
            if (self.use_https && self.port == 443) || (!self.use_https && self.port == 80) {
                String::new()
            } else {
                format!(":{}", self.port)
            };
        format!("{scheme}://{}{port_suffix}", self.host)
    }

    /// Creates a [`GatewayClient`] from this configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the host is empty or the HTTP client cannot be created.
    pub fn into_client(self) -> Result<GatewayClient, ProtocolError> {
        if self.host.trim().is_empty() {
            return Err(ProtocolError::InvalidAddress("host is required".to_string()));
        }

        let base_url = self.base_url();
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(ProtocolError::Http)?;

        Ok(GatewayClient {
            base_url,
            client,
            token: Arc::new(RwLock::new(self.token)),
            timeout: self.timeout,
        })
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_https", &self.use_https)
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ============================================================================
// GatewayClient
// ============================================================================

/// HTTP client for the gateway's local REST API.
///
/// Clones share the access token, so a refresh through one clone is seen by
/// all of them.
///
/// # Examples
///
/// ```no_run
/// use telldus_bridge::protocol::{Gateway, GatewayConfig};
/// use telldus_bridge::types::Methods;
///
/// # async fn example() -> telldus_bridge::Result<()> {
/// let client = GatewayConfig::new("192.168.1.20")
///     .with_token("eyJhbGciOi...")
///     .into_client()?;
///
/// let response = client.list_devices(Methods::default()).await?;
/// if let Some(list) = response.body {
///     println!("{} devices", list.devices.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GatewayClient {
    base_url: String,
    client: Client,
    token: Arc<RwLock<String>>,
    timeout: Duration,
}

impl GatewayClient {
    /// Returns the base URL of the gateway.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the access token currently in use.
    #[must_use]
    pub fn token(&self) -> String {
        self.token.read().clone()
    }

    /// Replaces the access token.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = token.into();
    }

    /// Builds the URL for a resource and its query parameters.
    fn build_url(&self, resource: &str, query: &[(&str, String)]) -> String {
        let mut url = format!("{}/api/{resource}", self.base_url);
        for (i, (key, value)) in query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    /// Issues a GET and normalises the response.
    async fn get<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, String)],
    ) -> Result<ApiResponse<T>, ProtocolError> {
        let url = self.build_url(resource, query);
        let token = self.token();

        tracing::debug!(url = %url, "Sending gateway request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        tracing::debug!(status = status.as_u16(), body = %text, "Received gateway response");

        Ok(ApiResponse::from_parts(
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown"),
            &text,
        ))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn map_transport_error(&self, error: reqwest::Error) -> ProtocolError {
        if error.is_timeout() {
            // Safe: timeouts are configured in seconds
            ProtocolError::Timeout(self.timeout.as_millis() as u64)
        } else {
            ProtocolError::Http(error)
        }
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Gateway for GatewayClient {
    async fn system_info(&self) -> CallResult<SystemInfo> {
        self.get("system/info", &[]).await
    }

    async fn list_devices(&self, methods: Methods) -> CallResult<DeviceList> {
        self.get("devices/list", &[("supportedMethods", methods.to_string())])
            .await
    }

    async fn device_info(&self, id: u32, methods: Methods) -> CallResult<Device> {
        self.get(
            "device/info",
            &[("id", id.to_string()), ("supportedMethods", methods.to_string())],
        )
        .await
    }

    async fn list_sensors(&self) -> CallResult<SensorList> {
        self.get("sensors/list", &[]).await
    }

    async fn sensor_info(&self, id: u32) -> CallResult<SensorInfo> {
        self.get("sensor/info", &[("id", id.to_string())]).await
    }

    async fn on_off_device(&self, id: u32, on: bool) -> CallResult<serde_json::Value> {
        let resource = if on { "device/turnOn" } else { "device/turnOff" };
        self.get(resource, &[("id", id.to_string())]).await
    }

    async fn dim_device(&self, id: u32, level: u8) -> CallResult<serde_json::Value> {
        self.get(
            "device/dim",
            &[("id", id.to_string()), ("level", level.to_string())],
        )
        .await
    }

    async fn bell_device(&self, id: u32) -> CallResult<serde_json::Value> {
        self.get("device/bell", &[("id", id.to_string())]).await
    }

    async fn refresh_access_token(&self) -> Result<TokenRefresh, Error> {
        let response: ApiResponse<TokenRefresh> = self
            .get("refreshToken", &[("token", self.token())])
            .await?;
        let refresh = response.into_result("refreshToken")?;

        if refresh.expires.is_none() {
            return Err(ParseError::MissingField("expires".to_string()).into());
        }
        if let Some(token) = &refresh.token {
            self.set_token(token.clone());
        }

        Ok(refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GatewayClient {
        GatewayConfig::new("192.168.1.20")
            .with_token("secret")
            .into_client()
            .unwrap()
    }

    #[test]
    fn build_url_without_query() {
        assert_eq!(
            client().build_url("system/info", &[]),
            "http://192.168.1.20/api/system/info"
        );
    }

    #[test]
    fn build_url_with_query() {
        let url = client().build_url(
            "device/dim",
            &[("id", "4".to_string()), ("level", "128".to_string())],
        );
        assert_eq!(url, "http://192.168.1.20/api/device/dim?id=4&level=128");
    }

    #[test]
    fn build_url_encodes_values() {
        let url = client().build_url("refreshToken", &[("token", "a b/c".to_string())]);
        assert_eq!(url, "http://192.168.1.20/api/refreshToken?token=a%20b%2Fc");
    }

    #[test]
    fn config_default_values() {
        let config = GatewayConfig::new("192.168.1.20");
        assert_eq!(config.host(), "192.168.1.20");
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn config_base_url_variants() {
        assert_eq!(
            GatewayConfig::new("gw").with_port(8080).base_url(),
            "http://gw:8080"
        );
        assert_eq!(GatewayConfig::new("gw").with_https().base_url(), "https://gw");
        assert_eq!(
            GatewayConfig::new("http://127.0.0.1:3000/").base_url(),
            "http://127.0.0.1:3000"
        );
    }

    #[test]
    fn config_rejects_empty_host() {
        assert!(GatewayConfig::new("  ").into_client().is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let config = GatewayConfig::new("gw").with_token("secret");
        assert!(!format!("{config:?}").contains("secret"));
    }

    #[test]
    fn token_is_shared_between_clones() {
        let a = client();
        let b = a.clone();
        a.set_token("rotated");
        assert_eq!(b.token(), "rotated");
    }
}
