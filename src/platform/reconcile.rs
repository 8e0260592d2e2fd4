// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device reconciliation.

use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::StateCache;
use crate::dispatch::CommandDispatcher;
use crate::host::{AccessoryHost, AccessoryId, Characteristic, CharacteristicValue};
use crate::model::Device;
use crate::protocol::Gateway;
use crate::types::{DeviceStateCode, Methods};

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Devices whose gateway state was fetched.
    pub polled: usize,
    /// Gateway cache entries that changed.
    pub changed: usize,
    /// Devices whose host state was corrected, by id.
    pub corrected: Vec<u32>,
}

/// Brings the host in line with state changes made outside the bridge.
///
/// Devices are also switched by remotes, wall switches and the gateway's own
/// schedules. Each pass polls the gateway, records the observed states in the
/// cache and, for every device without a dispatch in flight, adopts the
/// observed state when it differs from the one the bridge last issued.
pub struct Reconciler<G> {
    gateway: Arc<G>,
    cache: StateCache,
    host: Arc<dyn AccessoryHost>,
}

impl<G: Gateway> Reconciler<G> {
    /// Creates a reconciler.
    #[must_use]
    pub fn new(gateway: Arc<G>, cache: StateCache, host: Arc<dyn AccessoryHost>) -> Self {
        Self {
            gateway,
            cache,
            host,
        }
    }

    /// Runs one pass over `dispatchers`.
    ///
    /// A failed device list skips the pass. A registered device missing from
    /// the list is fetched on its own.
    pub async fn reconcile<'a, I>(&self, dispatchers: I) -> ReconcileReport
    where
        I: IntoIterator<Item = &'a CommandDispatcher<G>>,
        G: 'a,
    {
        let mut report = ReconcileReport::default();
        let dispatchers: Vec<&CommandDispatcher<G>> = dispatchers.into_iter().collect();

        let devices = match self.gateway.list_devices(Methods::default()).await {
            Ok(response) => match response.into_result("devices/list") {
                Ok(list) => list.devices,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping reconciliation, {}", e.kind.hint());
                    return report;
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Skipping reconciliation, device list failed");
                return report;
            }
        };

        let mut seen = HashSet::with_capacity(devices.len());
        for device in &devices {
            seen.insert(device.id);
            self.record(device, &mut report);
        }

        for dispatcher in dispatchers.iter().filter(|d| !seen.contains(&d.device_id())) {
            if let Some(device) = self.fetch(dispatcher.device_id()).await {
                self.record(&device, &mut report);
            }
        }

        for dispatcher in dispatchers {
            if dispatcher.is_updating() {
                continue;
            }
            let device_id = dispatcher.device_id();
            let mut pair = self.cache.pair(device_id);
            if pair.issued.is_none() {
                // expired while the device sat idle; the dispatcher still
                // knows what was last requested
                let on = dispatcher.snapshot().switch_on;
                tracing::debug!(device_id, on, "Reseeding issued state");
                self.cache.set_issued(device_id, on);
                pair.issued = Some(DeviceStateCode::from(on));
            }
            let Some(on) = pair.drift() else {
                continue;
            };

            tracing::info!(device_id, name = dispatcher.name(), on, "Device changed outside the bridge");
            self.host.set_value(
                AccessoryId::Device(device_id),
                Characteristic::On,
                CharacteristicValue::Bool(on),
            );
            dispatcher.sync_from_gateway(on);
            self.cache.set_issued(device_id, on);
            report.corrected.push(device_id);
        }

        report
    }

    fn record(&self, device: &Device, report: &mut ReconcileReport) {
        report.polled += 1;
        if self.cache.update_state_cache(device) {
            report.changed += 1;
        }
    }

    async fn fetch(&self, device_id: u32) -> Option<Device> {
        match self.gateway.device_info(device_id, Methods::default()).await {
            Ok(response) => match response.into_result("device/info") {
                Ok(device) => Some(device),
                Err(e) => {
                    tracing::warn!(device_id, error = %e, "{}", e.kind.hint());
                    None
                }
            },
            Err(e) => {
                tracing::warn!(device_id, error = %e, "Device refresh failed");
                None
            }
        }
    }
}

impl<G> std::fmt::Debug for Reconciler<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}
