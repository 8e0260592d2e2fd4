// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Communication with the gateway's REST API.
//!
//! Every call is a single HTTP GET against `<base>/api/<resource>` carrying
//! the bearer token. Responses are normalised into an [`ApiResponse`]:
//!
//! - transport failures (connection refused, timeout) are `Err(ProtocolError)`
//! - HTTP or gateway failures (4xx/5xx, or a body with `error`) are
//!   `Ok(ApiResponse { ok: false, .. })`
//!
//! Callers must check [`ApiResponse::ok`] before using the body, or convert
//! with [`ApiResponse::into_result`].
//!
//! The [`Gateway`] trait is the seam the dispatcher, the reconciler and the
//! sensor pollers depend on. [`GatewayClient`] is the HTTP implementation.

mod http;
mod response;

pub use http::{GatewayClient, GatewayConfig};
pub use response::{ApiResponse, FailureKind};

use std::future::Future;

use crate::error::{Error, ProtocolError};
use crate::model::{Device, DeviceList, SensorInfo, SensorList, SystemInfo, TokenRefresh};
use crate::types::Methods;

/// Result of a single gateway call.
pub type CallResult<T> = Result<ApiResponse<T>, ProtocolError>;

/// Operations offered by the gateway.
pub trait Gateway: Send + Sync {
    /// Fetches `system/info`.
    fn system_info(&self) -> impl Future<Output = CallResult<SystemInfo>> + Send;

    /// Fetches `devices/list` restricted to devices supporting `methods`.
    fn list_devices(&self, methods: Methods) -> impl Future<Output = CallResult<DeviceList>> + Send;

    /// Fetches `device/info` for one device.
    fn device_info(
        &self,
        id: u32,
        methods: Methods,
    ) -> impl Future<Output = CallResult<Device>> + Send;

    /// Fetches `sensors/list`.
    fn list_sensors(&self) -> impl Future<Output = CallResult<SensorList>> + Send;

    /// Fetches `sensor/info` for one sensor.
    fn sensor_info(&self, id: u32) -> impl Future<Output = CallResult<SensorInfo>> + Send;

    /// Turns a device on (`device/turnOn`) or off (`device/turnOff`).
    fn on_off_device(
        &self,
        id: u32,
        on: bool,
    ) -> impl Future<Output = CallResult<serde_json::Value>> + Send;

    /// Dims a device to `level` (0-255) via `device/dim`.
    fn dim_device(
        &self,
        id: u32,
        level: u8,
    ) -> impl Future<Output = CallResult<serde_json::Value>> + Send;

    /// Rings a bell via `device/bell`.
    fn bell_device(&self, id: u32) -> impl Future<Output = CallResult<serde_json::Value>> + Send;

    /// Refreshes the access token via `refreshToken`.
    ///
    /// Unlike the other operations this one fails hard: a refresh response
    /// without `expires` is [`ParseError::MissingField`](crate::error::ParseError::MissingField),
    /// and `ok = false` becomes [`Error::Api`].
    fn refresh_access_token(&self) -> impl Future<Output = Result<TokenRefresh, Error>> + Send;
}
