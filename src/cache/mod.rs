// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! On/off state cache shared by the reconciler and the dispatchers.
//!
//! Two entries are kept per device:
//!
//! - `td<id>`: the state the gateway last reported
//! - `pi<id>`: the state the bridge last issued
//!
//! Values are normalised [`DeviceStateCode`]s, so a dimmed device is cached
//! as on. Writes are last-write-wins; each device's keys are independent.

mod memory;

pub use memory::MemoryStore;

use std::fmt;
use std::sync::Arc;

use crate::model::Device;
use crate::types::DeviceStateCode;

/// Storage backend of the [`StateCache`].
pub trait StateStore: Send + Sync {
    /// Stores a value. Returns false if the store refused the write.
    fn set(&self, key: &str, value: u32) -> bool;

    /// Returns the stored value, if present and not expired.
    fn get(&self, key: &str) -> Option<u32>;

    /// Removes every entry.
    fn flush(&self);
}

/// Namespace of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// State observed on the gateway.
    Gateway,
    /// State issued by the bridge.
    Issued,
}

impl Namespace {
    const fn prefix(self) -> &'static str {
        match self {
            Self::Gateway => "td",
            Self::Issued => "pi",
        }
    }
}

/// Key of a cache entry, rendered as `"<namespace><device id>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: Namespace,
    device_id: u32,
}

impl CacheKey {
    /// Key of the gateway-observed state of a device.
    #[must_use]
    pub const fn gateway(device_id: u32) -> Self {
        Self {
            namespace: Namespace::Gateway,
            device_id,
        }
    }

    /// Key of the bridge-issued state of a device.
    #[must_use]
    pub const fn issued(device_id: u32) -> Self {
        Self {
            namespace: Namespace::Issued,
            device_id,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.namespace.prefix(), self.device_id)
    }
}

/// The two on/off readings of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedPair {
    /// Gateway-observed state.
    pub gateway: Option<DeviceStateCode>,
    /// Bridge-issued state.
    pub issued: Option<DeviceStateCode>,
}

impl CachedPair {
    /// Returns the gateway's on/off reading when it disagrees with the issued one.
    ///
    /// Only states with an on/off meaning are compared; a missing or
    /// meaningless entry on either side is never drift.
    #[must_use]
    pub fn drift(&self) -> Option<bool> {
        let gateway = self.gateway?.as_bool()?;
        let issued = self.issued?.as_bool()?;
        (gateway != issued).then_some(gateway)
    }
}

/// Device state cache over an injected [`StateStore`].
///
/// # Examples
///
/// ```
/// use telldus_bridge::cache::{CacheKey, StateCache};
/// use telldus_bridge::model::Device;
/// use telldus_bridge::types::DeviceStateCode;
///
/// # #[tokio::main]
/// # async fn main() {
/// let cache = StateCache::in_memory();
/// let device: Device = serde_json::from_str(r#"{"id":4,"state":16}"#).unwrap();
///
/// cache.set_state_cache(&device);
/// assert_eq!(cache.get(CacheKey::gateway(4)), Some(DeviceStateCode::ON));
/// assert_eq!(cache.get(CacheKey::issued(4)), Some(DeviceStateCode::ON));
/// # }
/// ```
#[derive(Clone)]
pub struct StateCache {
    store: Arc<dyn StateStore>,
}

impl StateCache {
    /// Creates a cache over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Creates a cache over a [`MemoryStore`] with the default TTL.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()))
    }

    /// Writes a state. Failures are logged and reported as `false`.
    pub fn set(&self, key: CacheKey, state: DeviceStateCode) -> bool {
        let key = key.to_string();
        let stored = self.store.set(&key, state.normalized().code());
        if !stored {
            tracing::warn!(key = %key, state = %state, "State cache write failed, retrying next cycle");
        }
        stored
    }

    /// Returns a cached state.
    #[must_use]
    pub fn get(&self, key: CacheKey) -> Option<DeviceStateCode> {
        self.store.get(&key.to_string()).map(DeviceStateCode::new)
    }

    /// Returns both cached states of a device.
    #[must_use]
    pub fn pair(&self, device_id: u32) -> CachedPair {
        CachedPair {
            gateway: self.get(CacheKey::gateway(device_id)),
            issued: self.get(CacheKey::issued(device_id)),
        }
    }

    /// Seeds both entries of a device from a discovery poll.
    pub fn set_state_cache(&self, device: &Device) {
        let state = device.state.normalized();
        self.set(CacheKey::gateway(device.id), state);
        self.set(CacheKey::issued(device.id), state);
    }

    /// Records a reconciliation poll of a device.
    ///
    /// Only the gateway entry is written, and only when the polled state
    /// differs from the cached one or the entry is gone. Returns true if a
    /// write happened.
    pub fn update_state_cache(&self, device: &Device) -> bool {
        let key = CacheKey::gateway(device.id);
        let state = device.state.normalized();
        if self.get(key) == Some(state) {
            return false;
        }
        tracing::debug!(device_id = device.id, state = ?state, "Gateway state changed");
        self.set(key, state)
    }

    /// Records the state the bridge just issued to a device.
    pub fn set_issued(&self, device_id: u32, on: bool) -> bool {
        self.set(CacheKey::issued(device_id), DeviceStateCode::from(on))
    }

    /// Drops every entry.
    pub fn flush(&self) {
        self.store.flush();
    }
}

impl fmt::Debug for StateCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCache").finish_non_exhaustive()
    }
}
