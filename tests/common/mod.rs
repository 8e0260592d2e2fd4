// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared test helpers: an in-process gateway that records every call.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use telldus_bridge::error::{Error, ProtocolError};
use telldus_bridge::model::{Device, DeviceList, SensorInfo, SensorList, SystemInfo, TokenRefresh};
use telldus_bridge::protocol::{ApiResponse, CallResult, Gateway};
use telldus_bridge::types::Methods;

/// A gateway call, as recorded by [`FakeGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SystemInfo,
    ListDevices,
    DeviceInfo(u32),
    ListSensors,
    SensorInfo(u32),
    On(u32),
    Off(u32),
    Dim(u32, u8),
    Bell(u32),
    RefreshToken,
}

impl Call {
    pub fn is_command(&self) -> bool {
        matches!(self, Self::On(_) | Self::Off(_) | Self::Dim(..) | Self::Bell(_))
    }
}

/// Gateway double backed by in-memory devices and sensors.
#[derive(Default)]
pub struct FakeGateway {
    calls: Mutex<Vec<Call>>,
    devices: Mutex<BTreeMap<u32, Device>>,
    hidden: Mutex<Vec<u32>>,
    sensors: Mutex<BTreeMap<u32, SensorInfo>>,
    /// Commands answer with HTTP 500.
    pub fail_commands: AtomicBool,
    /// Number of upcoming `devices/list` calls that fail at the transport.
    pub failing_lists: AtomicUsize,
    /// `refreshToken` answers with HTTP 401.
    pub fail_refresh: AtomicBool,
    /// Time `turnOn`/`turnOff` take to answer, after being recorded.
    switch_latency: Mutex<Duration>,
    /// Time `sensor/info` takes to answer, after being recorded.
    sensor_latency: Mutex<Duration>,
}

pub fn device(json: serde_json::Value) -> Device {
    serde_json::from_value(json).unwrap()
}

pub fn sensor(json: serde_json::Value) -> SensorInfo {
    serde_json::from_value(json).unwrap()
}

fn ok<T: serde::de::DeserializeOwned>(body: &serde_json::Value) -> CallResult<T> {
    Ok(ApiResponse::from_parts(200, "OK", &body.to_string()))
}

fn server_error<T: serde::de::DeserializeOwned>() -> CallResult<T> {
    Ok(ApiResponse::from_parts(500, "Internal Server Error", ""))
}

fn success() -> serde_json::Value {
    serde_json::json!({ "status": "success" })
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(self, device: Device) -> Self {
        self.devices.lock().insert(device.id, device);
        self
    }

    pub fn with_sensor(self, info: SensorInfo) -> Self {
        self.sensors.lock().insert(info.id, info);
        self
    }

    pub fn with_switch_latency(self, latency: Duration) -> Self {
        *self.switch_latency.lock() = latency;
        self
    }

    pub fn with_sensor_latency(self, latency: Duration) -> Self {
        *self.sensor_latency.lock() = latency;
        self
    }

    /// Changes the state the gateway reports for a device.
    pub fn set_state(&self, id: u32, state: u32) {
        if let Some(device) = self.devices.lock().get_mut(&id) {
            device.state = telldus_bridge::types::DeviceStateCode::new(state);
        }
    }

    /// Leaves a device out of `devices/list`; `device/info` still knows it.
    pub fn hide_from_list(&self, id: u32) {
        self.hidden.lock().push(id);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn commands(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_command).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn command(&self, call: Call) -> CallResult<serde_json::Value> {
        self.record(call);
        if self.fail_commands.load(Ordering::SeqCst) {
            server_error()
        } else {
            ok(&success())
        }
    }
}

impl Gateway for FakeGateway {
    async fn system_info(&self) -> CallResult<SystemInfo> {
        self.record(Call::SystemInfo);
        ok(&serde_json::json!({ "product": "fake", "version": "1.0" }))
    }

    async fn list_devices(&self, _methods: Methods) -> CallResult<DeviceList> {
        self.record(Call::ListDevices);
        let remaining = self.failing_lists.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_lists.store(remaining - 1, Ordering::SeqCst);
            return Err(ProtocolError::InvalidAddress("unreachable".to_string()));
        }
        let hidden = self.hidden.lock().clone();
        let devices: Vec<serde_json::Value> = self
            .devices
            .lock()
            .values()
            .filter(|d| !hidden.contains(&d.id))
            .map(|d| {
                serde_json::json!({
                    "id": d.id,
                    "name": d.name,
                    "methods": d.methods.bits(),
                    "state": d.state.code(),
                    "statevalue": d.statevalue,
                })
            })
            .collect();
        ok(&serde_json::json!({ "device": devices }))
    }

    async fn device_info(&self, id: u32, _methods: Methods) -> CallResult<Device> {
        self.record(Call::DeviceInfo(id));
        let device = self.devices.lock().get(&id).cloned();
        match device {
            Some(d) => ok(&serde_json::json!({
                "id": d.id,
                "name": d.name,
                "methods": d.methods.bits(),
                "state": d.state.code(),
                "statevalue": d.statevalue,
            })),
            None => ok(&serde_json::json!({ "error": "Device not found" })),
        }
    }

    async fn list_sensors(&self) -> CallResult<SensorList> {
        self.record(Call::ListSensors);
        let sensors: Vec<serde_json::Value> = self
            .sensors
            .lock()
            .values()
            .map(|s| serde_json::json!({ "id": s.id, "name": s.name, "model": s.model }))
            .collect();
        ok(&serde_json::json!({ "sensor": sensors }))
    }

    async fn sensor_info(&self, id: u32) -> CallResult<SensorInfo> {
        self.record(Call::SensorInfo(id));
        let latency = *self.sensor_latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let info = self.sensors.lock().get(&id).cloned();
        match info {
            Some(s) => {
                let data: Vec<serde_json::Value> = s
                    .data
                    .iter()
                    .map(|v| serde_json::json!({ "name": v.name, "value": v.value }))
                    .collect();
                ok(&serde_json::json!({ "id": s.id, "name": s.name, "model": s.model, "data": data }))
            }
            None => ok(&serde_json::json!({ "error": "Sensor not found" })),
        }
    }

    async fn on_off_device(&self, id: u32, on: bool) -> CallResult<serde_json::Value> {
        let result = self.command(if on { Call::On(id) } else { Call::Off(id) });
        let latency = *self.switch_latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        result
    }

    async fn dim_device(&self, id: u32, level: u8) -> CallResult<serde_json::Value> {
        self.command(Call::Dim(id, level))
    }

    async fn bell_device(&self, id: u32) -> CallResult<serde_json::Value> {
        self.command(Call::Bell(id))
    }

    async fn refresh_access_token(&self) -> Result<TokenRefresh, Error> {
        self.record(Call::RefreshToken);
        if self.fail_refresh.load(Ordering::SeqCst) {
            let response: ApiResponse<TokenRefresh> =
                ApiResponse::from_parts(401, "Unauthorized", "");
            return Err(response.into_result("refreshToken").unwrap_err().into());
        }
        Ok(TokenRefresh {
            expires: Some(2_000_000_000),
            token: Some("rotated".to_string()),
        })
    }
}
