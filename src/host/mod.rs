// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The host's characteristic layer, seen from the bridge.
//!
//! The smart-home host owns the accessory object model. The bridge only needs
//! to read and write characteristic values, so it depends on the
//! [`AccessoryHost`] capability trait instead of any host types. Inbound
//! writes from the host (a user flipping a switch) are plain method calls on
//! the [`CommandDispatcher`](crate::dispatch::CommandDispatcher).
//!
//! [`ValueStore`] is a ready-made implementation that keeps the latest value
//! of every characteristic and broadcasts each change on an [`EventBus`].
//!
//! # Examples
//!
//! ```
//! use telldus_bridge::host::{
//!     AccessoryHost, AccessoryId, Characteristic, CharacteristicValue, ValueStore,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = ValueStore::new();
//! let mut events = store.subscribe();
//!
//! store.set_value(AccessoryId::Device(4), Characteristic::On, CharacteristicValue::Bool(false));
//!
//! let event = events.recv().await.unwrap();
//! assert_eq!(event.characteristic, Characteristic::On);
//! assert_eq!(store.bool_value(AccessoryId::Device(4), Characteristic::On), Some(false));
//! # }
//! ```

mod event_bus;
mod value_store;

pub use event_bus::EventBus;
pub use value_store::ValueStore;

use std::fmt;

/// Identifies an accessory by what it bridges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessoryId {
    /// A controllable device, by gateway id.
    Device(u32),
    /// A sensor, by gateway id.
    Sensor(u32),
}

impl fmt::Display for AccessoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(id) => write!(f, "device {id}"),
            Self::Sensor(id) => write!(f, "sensor {id}"),
        }
    }
}

/// Characteristics the bridge reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    /// Switch state.
    On,
    /// Dimmer brightness in percent.
    Brightness,
    /// Dispatcher status text.
    Status,
    /// Unix time of the last successful command.
    LastActivation,
    /// Temperature in °C.
    CurrentTemperature,
    /// Relative humidity in percent.
    CurrentRelativeHumidity,
    /// Whether it is raining.
    Rain,
    /// Rain over the last hour, mm.
    Rain1h,
    /// Rain over the last 24 hours, mm.
    Rain24h,
    /// Wind direction as compass label.
    WindDirection,
    /// Average wind speed, m/s.
    WindSpeed,
    /// Gust wind speed, m/s.
    MaximumWindSpeed,
    /// Sensor polling interval in seconds.
    Heartrate,
}

/// A characteristic value.
#[derive(Debug, Clone, PartialEq)]
pub enum CharacteristicValue {
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// Text.
    Text(String),
}

impl CharacteristicValue {
    /// Returns the boolean, if this is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as an integer, if it is numeric.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) => Some(f.round() as i64),
            _ => None,
        }
    }

    /// Returns the value as a float, if it is numeric.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// A characteristic change, as broadcast by [`ValueStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct CharacteristicEvent {
    /// The accessory that changed.
    pub accessory: AccessoryId,
    /// The characteristic that changed.
    pub characteristic: Characteristic,
    /// The new value.
    pub value: CharacteristicValue,
}

/// Capability interface onto the host's characteristic layer.
///
/// Implementations must be cheap and non-blocking; they are called from
/// async tasks.
pub trait AccessoryHost: Send + Sync {
    /// Returns the current value of a characteristic, if known.
    fn get_value(
        &self,
        accessory: AccessoryId,
        characteristic: Characteristic,
    ) -> Option<CharacteristicValue>;

    /// Pushes a new value of a characteristic to the host.
    fn set_value(
        &self,
        accessory: AccessoryId,
        characteristic: Characteristic,
        value: CharacteristicValue,
    );
}
