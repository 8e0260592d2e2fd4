// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `telldus_bridge` - Bridges a Telldus-style home-automation gateway to a
//! smart-home host.
//!
//! The gateway exposes a polling REST API (`/api/...`). This library turns it
//! into an event-driven accessory model: it polls devices and sensors, keeps
//! the host's characteristics in line with what the gateway reports, and
//! serialises the commands the host sends back.
//!
//! # Features
//!
//! - **Gateway client**: typed REST calls with bearer token and refresh
//! - **Command dispatch**: per-device delay, random delay, repeats and dim
//!   debounce on cancellable timers
//! - **Reconciliation**: a two-sided state cache (`td` observed, `pi`
//!   issued) to pick up changes made by remotes and wall switches
//! - **Sensors**: temperature, humidity, rain and wind observations
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use telldus_bridge::host::ValueStore;
//! use telldus_bridge::platform::{Platform, PlatformConfig};
//!
//! #[tokio::main]
//! async fn main() -> telldus_bridge::Result<()> {
//!     let config = PlatformConfig::from_json(
//!         r#"{"host": "192.168.1.20", "accessToken": "eyJhbGciOi..."}"#,
//!     )?;
//!     let host = Arc::new(ValueStore::new());
//!     let mut events = host.subscribe();
//!
//!     let platform = Arc::new(Platform::new(config, host)?);
//!     let runner = Arc::clone(&platform);
//!     tokio::spawn(async move { runner.run().await });
//!
//!     while let Ok(event) = events.recv().await {
//!         println!("{} {:?} = {:?}", event.accessory, event.characteristic, event.value);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Switching a device
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use telldus_bridge::host::ValueStore;
//! # use telldus_bridge::platform::{Platform, PlatformConfig};
//! # async fn example(platform: Arc<Platform<telldus_bridge::protocol::GatewayClient>>) {
//! if let Some(lamp) = platform.dispatcher(4) {
//!     lamp.set_on(true).await;
//!     lamp.set_dimmer_level(40, false).await;
//! }
//! # }
//! ```

pub mod auth;
pub mod cache;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod model;
pub mod platform;
pub mod protocol;
pub mod sensor;
pub mod types;

pub use cache::{StateCache, StateStore};
pub use dispatch::{CommandDispatcher, DispatchConfig, DispatchStatus};
pub use error::{ApiError, ConfigError, Error, ParseError, ProtocolError, Result};
pub use host::{AccessoryHost, AccessoryId, Characteristic, CharacteristicValue};
pub use platform::{Platform, PlatformConfig};
pub use protocol::{ApiResponse, Gateway, GatewayClient, GatewayConfig};
pub use sensor::SensorKind;
pub use types::{Brightness, DeviceModel, DeviceStateCode, Methods};
