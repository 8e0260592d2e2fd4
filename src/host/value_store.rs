// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory [`AccessoryHost`] implementation.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::{
    AccessoryHost, AccessoryId, Characteristic, CharacteristicEvent, CharacteristicValue, EventBus,
};

/// Keeps the latest value of every characteristic and broadcasts changes.
///
/// Writes that do not change the stored value are not broadcast, matching
/// how hosts suppress no-op characteristic updates.
#[derive(Debug, Default)]
pub struct ValueStore {
    values: RwLock<HashMap<(AccessoryId, Characteristic), CharacteristicValue>>,
    events: EventBus,
}

impl ValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to characteristic changes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CharacteristicEvent> {
        self.events.subscribe()
    }

    /// Returns a boolean characteristic.
    #[must_use]
    pub fn bool_value(&self, accessory: AccessoryId, characteristic: Characteristic) -> Option<bool> {
        self.get_value(accessory, characteristic)
            .and_then(|v| v.as_bool())
    }

    /// Returns a numeric characteristic as float.
    #[must_use]
    pub fn float_value(&self, accessory: AccessoryId, characteristic: Characteristic) -> Option<f64> {
        self.get_value(accessory, characteristic)
            .and_then(|v| v.as_float())
    }

    /// Returns a text characteristic.
    #[must_use]
    pub fn text_value(
        &self,
        accessory: AccessoryId,
        characteristic: Characteristic,
    ) -> Option<String> {
        match self.get_value(accessory, characteristic)? {
            CharacteristicValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl AccessoryHost for ValueStore {
    fn get_value(
        &self,
        accessory: AccessoryId,
        characteristic: Characteristic,
    ) -> Option<CharacteristicValue> {
        self.values.read().get(&(accessory, characteristic)).cloned()
    }

    fn set_value(
        &self,
        accessory: AccessoryId,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) {
        let previous = self
            .values
            .write()
            .insert((accessory, characteristic), value.clone());

        if previous.as_ref() != Some(&value) {
            tracing::trace!(%accessory, ?characteristic, ?value, "Characteristic updated");
            self.events.publish(CharacteristicEvent {
                accessory,
                characteristic,
                value,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_latest_value() {
        let store = ValueStore::new();
        let id = AccessoryId::Device(1);

        store.set_value(id, Characteristic::On, CharacteristicValue::Bool(true));
        store.set_value(id, Characteristic::On, CharacteristicValue::Bool(false));

        assert_eq!(store.bool_value(id, Characteristic::On), Some(false));
        assert_eq!(store.bool_value(AccessoryId::Device(2), Characteristic::On), None);
    }

    #[test]
    fn unchanged_write_is_not_broadcast() {
        let store = ValueStore::new();
        let mut rx = store.subscribe();
        let id = AccessoryId::Sensor(9);

        store.set_value(id, Characteristic::WindSpeed, CharacteristicValue::Float(0.3));
        store.set_value(id, Characteristic::WindSpeed, CharacteristicValue::Float(0.3));

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn typed_accessors() {
        let store = ValueStore::new();
        let id = AccessoryId::Sensor(9);
        store.set_value(id, Characteristic::WindDirection, CharacteristicValue::Text("ESE".into()));
        store.set_value(id, Characteristic::Heartrate, CharacteristicValue::Int(300));

        assert_eq!(store.text_value(id, Characteristic::WindDirection).as_deref(), Some("ESE"));
        assert_eq!(store.float_value(id, Characteristic::Heartrate), Some(300.0));
        assert_eq!(store.text_value(id, Characteristic::Heartrate), None);
    }
}
