// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The bridge platform: discovery and the heartbeat loop.
//!
//! [`Platform::run`] discovers devices and sensors (retrying every minute
//! until the gateway answers), then ticks once a second:
//!
//! - every `beatRate` ticks it reconciles device states and checks whether
//!   the access token needs a refresh,
//! - every `heartrate` ticks of a sensor it polls that sensor.
//!
//! [`Platform::shutdown`] stops the loop, cancels every dispatcher's timers
//! and flushes the state cache.

mod config;
mod reconcile;

pub use config::{DeviceOverride, PlatformConfig, SensorOverride};
pub use reconcile::{ReconcileReport, Reconciler};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::auth::TokenManager;
use crate::cache::StateCache;
use crate::dispatch::CommandDispatcher;
use crate::error::Error;
use crate::host::{AccessoryHost, AccessoryId, Characteristic, CharacteristicValue};
use crate::model::Device;
use crate::protocol::{Gateway, GatewayClient};
use crate::sensor::SensorPoller;
use crate::types::{DeviceModel, Methods};

/// Interval between discovery attempts while the gateway is unreachable.
pub const DISCOVERY_RETRY: Duration = Duration::from_secs(60);

/// Length of one platform tick.
pub const TICK: Duration = Duration::from_secs(1);

/// Devices and sensors found at discovery.
pub struct Registry<G> {
    dispatchers: BTreeMap<u32, Arc<CommandDispatcher<G>>>,
    pollers: BTreeMap<u32, Arc<SensorPoller<G>>>,
}

impl<G> Registry<G> {
    /// Returns the dispatcher of a device.
    #[must_use]
    pub fn dispatcher(&self, device_id: u32) -> Option<&Arc<CommandDispatcher<G>>> {
        self.dispatchers.get(&device_id)
    }

    /// Returns the poller of a sensor.
    #[must_use]
    pub fn poller(&self, sensor_id: u32) -> Option<&Arc<SensorPoller<G>>> {
        self.pollers.get(&sensor_id)
    }

    /// Iterates over all dispatchers in id order.
    pub fn dispatchers(&self) -> impl Iterator<Item = &Arc<CommandDispatcher<G>>> {
        self.dispatchers.values()
    }

    /// Iterates over all sensor pollers in id order.
    pub fn pollers(&self) -> impl Iterator<Item = &Arc<SensorPoller<G>>> {
        self.pollers.values()
    }
}

impl<G> std::fmt::Debug for Registry<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("devices", &self.dispatchers.keys().collect::<Vec<_>>())
            .field("sensors", &self.pollers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The bridge between one gateway and the host.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use telldus_bridge::host::ValueStore;
/// use telldus_bridge::platform::{Platform, PlatformConfig};
///
/// # async fn example() -> telldus_bridge::Result<()> {
/// let config = PlatformConfig::from_json(r#"{"host":"192.168.1.20","accessToken":"..."}"#)?;
/// let platform = Arc::new(Platform::new(config, Arc::new(ValueStore::new()))?);
///
/// let runner = Arc::clone(&platform);
/// tokio::spawn(async move { runner.run().await });
///
/// // later
/// platform.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct Platform<G> {
    config: PlatformConfig,
    gateway: Arc<G>,
    cache: StateCache,
    host: Arc<dyn AccessoryHost>,
    registry: RwLock<Option<Arc<Registry<G>>>>,
    shutdown: CancellationToken,
}

impl Platform<GatewayClient> {
    /// Creates a platform talking HTTP to the configured gateway.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an invalid configuration, or
    /// `Error::Protocol` if the HTTP client cannot be built.
    pub fn new(config: PlatformConfig, host: Arc<dyn AccessoryHost>) -> Result<Self, Error> {
        config.validate()?;
        let gateway = config.gateway_config().into_client()?;
        Ok(Self::with_gateway(config, Arc::new(gateway), host)?)
    }
}

impl<G: Gateway + 'static> Platform<G> {
    /// Creates a platform over any [`Gateway`] implementation.
    ///
    /// # Errors
    ///
    /// Returns the configuration error found by [`PlatformConfig::validate`].
    pub fn with_gateway(
        config: PlatformConfig,
        gateway: Arc<G>,
        host: Arc<dyn AccessoryHost>,
    ) -> Result<Self, crate::error::ConfigError> {
        config.validate()?;
        let cache = StateCache::new(Arc::new(config.state_store()));
        Ok(Self {
            config,
            gateway,
            cache,
            host,
            registry: RwLock::new(None),
            shutdown: CancellationToken::new(),
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// Returns the shared state cache.
    #[must_use]
    pub fn cache(&self) -> &StateCache {
        &self.cache
    }

    /// Returns the discovered devices and sensors, once discovery succeeded.
    #[must_use]
    pub fn registry(&self) -> Option<Arc<Registry<G>>> {
        self.registry.read().clone()
    }

    /// Returns the dispatcher of a device, once discovered.
    #[must_use]
    pub fn dispatcher(&self, device_id: u32) -> Option<Arc<CommandDispatcher<G>>> {
        self.registry()?.dispatcher(device_id).cloned()
    }

    /// Returns a reconciler over this platform's gateway, cache and host.
    #[must_use]
    pub fn reconciler(&self) -> Reconciler<G> {
        Reconciler::new(Arc::clone(&self.gateway), self.cache.clone(), Arc::clone(&self.host))
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Runs one discovery attempt and installs the resulting registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the device or sensor list cannot be fetched.
    /// Individual sensors that fail to load are skipped.
    pub async fn discover(&self) -> Result<Arc<Registry<G>>, Error> {
        match self.gateway.system_info().await {
            Ok(response) => {
                if let Some(info) = response.body {
                    tracing::info!(
                        product = info.product.as_deref().unwrap_or("unknown"),
                        version = info.version.as_deref().unwrap_or("unknown"),
                        "Connected to gateway"
                    );
                }
            }
            Err(e) => tracing::debug!(error = %e, "System info unavailable"),
        }

        let devices = self
            .gateway
            .list_devices(Methods::default())
            .await?
            .into_result("devices/list")?
            .devices;

        let mut dispatchers = BTreeMap::new();
        for device in devices {
            if self.config.is_device_ignored(device.id) {
                tracing::debug!(device_id = device.id, "Ignoring device");
                continue;
            }
            let dispatcher = self.register_device(&device);
            dispatchers.insert(device.id, Arc::new(dispatcher));
        }

        let sensors = self
            .gateway
            .list_sensors()
            .await?
            .into_result("sensors/list")?
            .sensors;

        let mut pollers = BTreeMap::new();
        for summary in sensors {
            if self.config.is_sensor_ignored(summary.id) {
                tracing::debug!(sensor_id = summary.id, "Ignoring sensor");
                continue;
            }
            let info = match self.gateway.sensor_info(summary.id).await {
                Ok(response) => match response.into_result("sensor/info") {
                    Ok(info) => info,
                    Err(e) => {
                        tracing::warn!(sensor_id = summary.id, error = %e, "Skipping sensor");
                        continue;
                    }
                },
                Err(e) => {
                    tracing::warn!(sensor_id = summary.id, error = %e, "Skipping sensor");
                    continue;
                }
            };
            let poller = SensorPoller::new(
                &info,
                Arc::clone(&self.gateway),
                Arc::clone(&self.host),
                self.config.sensor_settings(summary.id),
                &mut rand::thread_rng(),
            );
            pollers.insert(summary.id, Arc::new(poller));
        }

        tracing::info!(
            devices = dispatchers.len(),
            sensors = pollers.len(),
            "Discovery complete"
        );

        let registry = Arc::new(Registry {
            dispatchers,
            pollers,
        });
        *self.registry.write() = Some(Arc::clone(&registry));
        Ok(registry)
    }

    fn register_device(&self, device: &Device) -> CommandDispatcher<G> {
        self.cache.set_state_cache(device);

        let accessory = AccessoryId::Device(device.id);
        if let Some(on) = device.state.as_bool() {
            self.host
                .set_value(accessory, Characteristic::On, CharacteristicValue::Bool(on));
        }
        if device.model() == DeviceModel::Dimmer
            && let Some(brightness) = device.brightness()
        {
            self.host.set_value(
                accessory,
                Characteristic::Brightness,
                CharacteristicValue::Int(i64::from(brightness.percent())),
            );
        }

        let dispatcher = CommandDispatcher::new(
            device,
            Arc::clone(&self.gateway),
            self.cache.clone(),
            Arc::clone(&self.host),
            self.config.dispatch_config(device.id),
        );
        self.host.set_value(
            accessory,
            Characteristic::Status,
            CharacteristicValue::Text(dispatcher.status().to_string()),
        );
        tracing::debug!(device_id = device.id, name = %device.name, model = ?dispatcher.model(), "Device registered");
        dispatcher
    }

    /// Retries discovery every [`DISCOVERY_RETRY`] until it succeeds.
    ///
    /// Returns `None` if the platform is shut down first.
    pub async fn discover_with_retry(&self) -> Option<Arc<Registry<G>>> {
        loop {
            match self.discover().await {
                Ok(registry) => return Some(registry),
                Err(e) => {
                    tracing::warn!(error = %e, retry_in_s = DISCOVERY_RETRY.as_secs(), "Discovery failed");
                }
            }

            tokio::select! {
                () = self.shutdown.cancelled() => return None,
                () = tokio::time::sleep(DISCOVERY_RETRY) => {}
            }
        }
    }

    // =========================================================================
    // Heartbeat
    // =========================================================================

    /// Discovers, then runs the heartbeat until [`shutdown`](Self::shutdown).
    pub async fn run(&self) {
        let Some(registry) = self.discover_with_retry().await else {
            return;
        };

        let reconciler = self.reconciler();
        let mut tokens = TokenManager::new(chrono::Utc::now().timestamp(), self.config.token_expires);
        let beat_rate = self.config.beat_rate.max(1);

        let mut interval = tokio::time::interval(TICK);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;

        let mut tick: u64 = 0;
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }
            tick += 1;

            for poller in registry.pollers().filter(|p| p.is_due(tick) && !p.is_polling()) {
                let poller = Arc::clone(poller);
                tokio::spawn(async move {
                    poller.poll().await;
                });
            }

            if tick % beat_rate == 0 {
                let report = reconciler
                    .reconcile(registry.dispatchers().map(Arc::as_ref))
                    .await;
                tracing::trace!(tick, ?report, "Reconciled");

                tokens
                    .refresh_if_due(
                        self.gateway.as_ref(),
                        chrono::Utc::now().timestamp(),
                        self.config.beat(),
                    )
                    .await;
            }
        }

        tracing::debug!(tick, "Heartbeat stopped");
    }

    /// Stops the heartbeat, cancels every dispatcher's timers and flushes
    /// the state cache.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        if let Some(registry) = self.registry() {
            for dispatcher in registry.dispatchers() {
                dispatcher.shutdown();
            }
        }
        self.cache.flush();
        tracing::info!("Platform shut down");
    }

    /// Returns true once [`shutdown`](Self::shutdown) was called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl<G> std::fmt::Debug for Platform<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
