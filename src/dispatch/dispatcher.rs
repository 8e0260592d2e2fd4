// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The per-device command dispatcher.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;

use crate::cache::StateCache;
use crate::host::{AccessoryHost, AccessoryId, Characteristic, CharacteristicValue};
use crate::model::Device;
use crate::protocol::{CallResult, Gateway};
use crate::types::{Brightness, DeviceModel};

use super::{CancellableTimer, DispatchConfig, DispatchStatus, RandomOverride, WaitOutcome};

/// Snapshot of a dispatcher's mutable state.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchState {
    /// Most recently requested on/off value.
    pub switch_on: bool,
    /// The requested value before that.
    pub last_switch_on: bool,
    /// True from the start of a dispatch until its mute window ends.
    pub on_updating: bool,
    /// Last brightness requested for a dimmer.
    pub brightness: Brightness,
    /// Repeats sent so far in the running dispatch.
    pub repetitions: u32,
    /// Sequence status.
    pub status: DispatchStatus,
    /// Bumped by every `set_on`; a dispatch whose generation is stale has
    /// been superseded.
    pub generation: u64,
    /// Pending one-shot random override.
    pub random_override: Option<RandomOverride>,
    /// Timing settings.
    pub config: DispatchConfig,
}

#[derive(Debug, Default)]
struct Timers {
    mute: Arc<CancellableTimer>,
    delay: CancellableTimer,
    repeat: CancellableTimer,
    dim: CancellableTimer,
}

/// Serialises and debounces the commands of one device.
///
/// At most one dispatch per device is active: `set_on` cancels the pending
/// delay, repeat and mute timers of the previous one before starting. The
/// previous dispatch notices at its next wait, or after its in-flight gateway
/// call returns, and stops without touching the cache or the status.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use telldus_bridge::cache::StateCache;
/// use telldus_bridge::dispatch::{CommandDispatcher, DispatchConfig};
/// use telldus_bridge::host::ValueStore;
/// use telldus_bridge::protocol::{Gateway, GatewayConfig};
///
/// # async fn example() -> telldus_bridge::Result<()> {
/// let gateway = Arc::new(GatewayConfig::new("192.168.1.20").with_token("t").into_client()?);
/// let device = gateway.device_info(4, Default::default()).await?.into_result("device/info")?;
///
/// let dispatcher = CommandDispatcher::new(
///     &device,
///     gateway,
///     StateCache::in_memory(),
///     Arc::new(ValueStore::new()),
///     DispatchConfig::default(),
/// );
/// dispatcher.set_on(true).await;
/// # Ok(())
/// # }
/// ```
pub struct CommandDispatcher<G> {
    device_id: u32,
    name: String,
    model: DeviceModel,
    gateway: Arc<G>,
    cache: StateCache,
    host: Arc<dyn AccessoryHost>,
    state: Arc<Mutex<DispatchState>>,
    timers: Timers,
}

impl<G: Gateway> CommandDispatcher<G> {
    /// Creates the dispatcher of a discovered device.
    #[must_use]
    pub fn new(
        device: &Device,
        gateway: Arc<G>,
        cache: StateCache,
        host: Arc<dyn AccessoryHost>,
        config: DispatchConfig,
    ) -> Self {
        let switch_on = device.state.as_bool().unwrap_or(false);
        let brightness = device.brightness().unwrap_or_default();
        let state = DispatchState {
            switch_on,
            last_switch_on: switch_on,
            on_updating: false,
            brightness,
            repetitions: 0,
            status: DispatchStatus::Initialised,
            generation: 0,
            random_override: None,
            config,
        };

        Self {
            device_id: device.id,
            name: device.name.clone(),
            model: device.model(),
            gateway,
            cache,
            host,
            state: Arc::new(Mutex::new(state)),
            timers: Timers::default(),
        }
    }

    /// Returns the gateway id of the device.
    #[must_use]
    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    /// Returns the device name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the device model.
    #[must_use]
    pub fn model(&self) -> DeviceModel {
        self.model
    }

    /// Returns a snapshot of the dispatcher state.
    #[must_use]
    pub fn snapshot(&self) -> DispatchState {
        self.state.lock().clone()
    }

    /// Returns true while a dispatch or its mute window is running.
    #[must_use]
    pub fn is_updating(&self) -> bool {
        self.state.lock().on_updating
    }

    /// Returns the sequence status.
    #[must_use]
    pub fn status(&self) -> DispatchStatus {
        self.state.lock().status
    }

    fn accessory(&self) -> AccessoryId {
        AccessoryId::Device(self.device_id)
    }

    // =========================================================================
    // Inbound toggles
    // =========================================================================

    /// Sets the automation delay.
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().config.delay = delay;
    }

    /// Enables or disables delay randomisation.
    pub fn set_random(&self, random: bool) {
        self.state.lock().config.random = random;
    }

    /// Sets the number of repeats.
    pub fn set_repeats(&self, repeats: u32) {
        self.state.lock().config.repeats = repeats;
    }

    /// Overrides the random toggle for the next automation dispatch only.
    pub fn set_random_once(&self, random: RandomOverride) {
        self.state.lock().random_override = Some(random);
    }

    /// Adopts a state observed on the gateway as the requested one.
    pub(crate) fn sync_from_gateway(&self, on: bool) {
        let mut state = self.state.lock();
        state.last_switch_on = state.switch_on;
        state.switch_on = on;
    }

    /// Cancels all timers and ends any running dispatch.
    pub fn shutdown(&self) {
        {
            let mut state = self.state.lock();
            state.generation += 1;
            state.on_updating = false;
            state.repetitions = 0;
        }
        self.timers.mute.cancel();
        self.timers.delay.cancel();
        self.timers.repeat.cancel();
        self.timers.dim.cancel();
    }

    // =========================================================================
    // On/off dispatch
    // =========================================================================

    /// Switches the device, running the full dispatch sequence.
    ///
    /// Returns once the sequence is done or has been superseded by a later
    /// call. Gateway failures are logged and never abort the sequence.
    pub async fn set_on(&self, target: bool) {
        let (user_control, generation) = {
            let mut state = self.state.lock();
            let user_control = state.on_updating && target != state.switch_on;
            state.last_switch_on = state.switch_on;
            state.switch_on = target;
            state.on_updating = true;
            state.generation += 1;
            state.repetitions = 0;
            (user_control, state.generation)
        };

        self.timers.mute.cancel();
        self.timers.delay.cancel();
        self.timers.repeat.cancel();

        tracing::debug!(
            device_id = self.device_id,
            target,
            user_control,
            generation,
            "Dispatch started"
        );

        let end_status = if user_control {
            self.set_status(generation, DispatchStatus::ManuallyControlled);
            if self.timers.delay.wait(DispatchConfig::SETTLE).await.is_cancelled() {
                tracing::debug!(device_id = self.device_id, generation, "Dispatch superseded while settling");
                return;
            }
            DispatchStatus::ManuallyControlled
        } else {
            self.set_status(generation, DispatchStatus::Delaying);
            let delay = self.next_delay();
            tracing::debug!(device_id = self.device_id, delay = ?delay, "Delaying command");
            if self.timers.delay.wait(delay).await.is_cancelled() {
                tracing::debug!(device_id = self.device_id, generation, "Dispatch superseded while delaying");
                return;
            }
            DispatchStatus::AutomationDone
        };

        let repeats = self.state.lock().config.repeats;
        let mut sent = self.issue(target, generation).await;
        let mut repetitions = 0;

        while sent && repetitions < repeats {
            if self.is_superseded(generation) {
                return;
            }
            self.set_status(generation, DispatchStatus::Repeating);
            let pause = DispatchConfig::repeat_pause(repetitions);
            if self.timers.repeat.wait(pause).await == WaitOutcome::Cancelled {
                tracing::debug!(device_id = self.device_id, repetitions, "Repeats cancelled");
                return;
            }
            repetitions += 1;
            self.set_repetitions(generation, repetitions);
            tracing::debug!(device_id = self.device_id, repetitions, repeats, "Repeating command");
            sent = self.issue(target, generation).await;
        }

        self.finish(generation, end_status);
    }

    /// Returns the delay of the next automation dispatch, consuming any
    /// one-shot random override.
    fn next_delay(&self) -> Duration {
        let (delay, random) = {
            let mut state = self.state.lock();
            let random = match state.random_override.take() {
                Some(RandomOverride::Enable) => true,
                Some(RandomOverride::Disable) => false,
                None => state.config.random,
            };
            (state.config.delay, random)
        };

        if random && !delay.is_zero() {
            let factor = rand::thread_rng().gen_range(DispatchConfig::RANDOM_MIN_FRACTION..=1.0);
            delay.mul_f64(factor)
        } else {
            delay
        }
    }

    /// Sends the on/off (or bell) command. Returns true if the gateway
    /// accepted it and no newer dispatch started while the call was out.
    async fn issue(&self, target: bool, generation: u64) -> bool {
        let (operation, result) = match (self.model, target) {
            (DeviceModel::Bell, true) => ("device/bell", self.gateway.bell_device(self.device_id).await),
            (DeviceModel::Bell, false) => {
                tracing::debug!(device_id = self.device_id, "Bell has no off command");
                return false;
            }
            (_, true) => (
                "device/turnOn",
                self.gateway.on_off_device(self.device_id, true).await,
            ),
            (_, false) => (
                "device/turnOff",
                self.gateway.on_off_device(self.device_id, false).await,
            ),
        };

        if !self.check(operation, result) {
            return false;
        }
        if self.is_superseded(generation) {
            tracing::debug!(device_id = self.device_id, on = target, "Command answered after being superseded");
            return false;
        }

        tracing::info!(device_id = self.device_id, name = %self.name, on = target, "Command sent");
        self.host.set_value(
            self.accessory(),
            Characteristic::LastActivation,
            CharacteristicValue::Int(chrono::Utc::now().timestamp()),
        );

        if self.model == DeviceModel::Dimmer && target {
            let brightness = self.state.lock().brightness;
            self.set_dimmer_level(brightness.percent(), true).await;
        }
        true
    }

    /// Logs a failed gateway call. Returns true on success.
    fn check(&self, operation: &str, result: CallResult<serde_json::Value>) -> bool {
        match result {
            Ok(response) if response.ok => true,
            Ok(response) => {
                let kind = response
                    .failure_kind()
                    .unwrap_or(crate::protocol::FailureKind::Server);
                tracing::warn!(
                    device_id = self.device_id,
                    operation,
                    status = response.status_code,
                    error = response.error.as_deref().unwrap_or(&response.status_message),
                    "Gateway rejected command ({kind}), {}",
                    kind.hint()
                );
                false
            }
            Err(e) => {
                tracing::warn!(device_id = self.device_id, operation, error = %e, "Command failed");
                false
            }
        }
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.state.lock().generation != generation
    }

    fn set_status(&self, generation: u64, status: DispatchStatus) {
        {
            let mut state = self.state.lock();
            if state.generation != generation {
                return;
            }
            state.status = status;
        }
        self.host.set_value(
            self.accessory(),
            Characteristic::Status,
            CharacteristicValue::Text(status.to_string()),
        );
    }

    fn set_repetitions(&self, generation: u64, repetitions: u32) {
        let mut state = self.state.lock();
        if state.generation == generation {
            state.repetitions = repetitions;
        }
    }

    /// Ends a dispatch: records the issued state and arms the mute window.
    fn finish(&self, generation: u64, end_status: DispatchStatus) {
        let (target, mute) = {
            let mut state = self.state.lock();
            if state.generation != generation {
                return;
            }
            state.repetitions = 0;
            (state.switch_on, state.config.mute)
        };

        self.set_status(generation, end_status);
        self.cache.set_issued(self.device_id, target);

        let armed = self.timers.mute.arm();
        let timer = Arc::clone(&self.timers.mute);
        let state = Arc::clone(&self.state);
        let device_id = self.device_id;

        tokio::spawn(async move {
            if armed.sleep(mute).await == WaitOutcome::Completed {
                let mut state = state.lock();
                if state.generation == generation {
                    state.on_updating = false;
                    tracing::debug!(device_id, "Mute window ended");
                }
            }
            timer.disarm(&armed);
        });
    }

    // =========================================================================
    // Dimming
    // =========================================================================

    /// Dims the device to `percent`.
    ///
    /// Unless `immediate`, the command waits out a short debounce window and
    /// a newer call within that window replaces it. Returns true if the
    /// gateway accepted the command.
    pub async fn set_dimmer_level(&self, percent: u8, immediate: bool) -> bool {
        let brightness = Brightness::clamped(percent);
        self.state.lock().brightness = brightness;

        if immediate {
            self.timers.dim.cancel();
        } else if self
            .timers
            .dim
            .wait(DispatchConfig::DIM_DEBOUNCE)
            .await
            .is_cancelled()
        {
            tracing::debug!(device_id = self.device_id, %brightness, "Dim superseded");
            return false;
        }

        let level = brightness.device_level();
        let result = self.gateway.dim_device(self.device_id, level).await;
        let accepted = self.check("device/dim", result);
        if accepted {
            tracing::info!(device_id = self.device_id, %brightness, level, "Dim sent");
        }
        accepted
    }
}

impl<G> std::fmt::Debug for CommandDispatcher<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("device_id", &self.device_id)
            .field("name", &self.name)
            .field("model", &self.model)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl<G> Drop for CommandDispatcher<G> {
    fn drop(&mut self) {
        self.timers.mute.cancel();
    }
}
