// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device command dispatch.
//!
//! A [`CommandDispatcher`] turns host writes (`On`, `Brightness`) into
//! gateway commands. One dispatch is a sequence of
//!
//! 1. an optional, optionally randomised delay (skipped when the user is
//!    flipping the switch by hand),
//! 2. the on/off or bell command,
//! 3. zero or more repeats with growing pauses,
//! 4. a mute window during which the reconciler leaves the device alone,
//!    because the gateway has not caught up with the command yet.
//!
//! A new `set_on` cancels the pending timers of the previous dispatch of the
//! same device, which then returns without sending anything further. All
//! waits are [`CancellableTimer`]s.

mod dispatcher;
mod timer;

pub use dispatcher::{CommandDispatcher, DispatchState};
pub use timer::{ArmedWait, CancellableTimer, WaitOutcome};

use std::fmt;
use std::time::Duration;

/// Where a device's dispatcher is in its sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DispatchStatus {
    /// Nothing dispatched yet.
    #[default]
    Initialised,
    /// Waiting out the automation delay.
    Delaying,
    /// Repeating the last command.
    Repeating,
    /// Last dispatch was a manual override.
    ManuallyControlled,
    /// Last automation dispatch finished.
    AutomationDone,
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initialised => "Initialised",
            Self::Delaying => "Delaying",
            Self::Repeating => "Repeating",
            Self::ManuallyControlled => "Manually controlled",
            Self::AutomationDone => "Automation done",
        };
        write!(f, "{s}")
    }
}

/// One-shot override of the random-delay toggle.
///
/// Applies to the next automation dispatch only, then clears itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RandomOverride {
    /// Randomise the next delay even if random is off.
    Enable,
    /// Use the full delay next time even if random is on.
    Disable,
}

/// Timing settings of a dispatcher.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use telldus_bridge::dispatch::DispatchConfig;
///
/// let config = DispatchConfig::default()
///     .with_delay(Duration::from_secs(30))
///     .with_random(true)
///     .with_repeats(2)
///     .with_beat_rate(Duration::from_secs(10));
///
/// assert_eq!(config.mute, Duration::from_secs(20));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Delay before an automation command.
    pub delay: Duration,
    /// Randomise the delay within 20-100 % of `delay`.
    pub random: bool,
    /// Number of repeats after the first command.
    pub repeats: u32,
    /// Mute window after a dispatch.
    pub mute: Duration,
}

impl DispatchConfig {
    /// Pause before a manual override command.
    pub const SETTLE: Duration = Duration::from_millis(50);
    /// Debounce window of dim commands.
    pub const DIM_DEBOUNCE: Duration = Duration::from_millis(500);
    /// Lower bound of a randomised delay, as a fraction of the delay.
    pub const RANDOM_MIN_FRACTION: f64 = 0.2;

    /// Sets the automation delay.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Enables or disables delay randomisation.
    #[must_use]
    pub fn with_random(mut self, random: bool) -> Self {
        self.random = random;
        self
    }

    /// Sets the number of repeats.
    #[must_use]
    pub fn with_repeats(mut self, repeats: u32) -> Self {
        self.repeats = repeats;
        self
    }

    /// Derives the mute window from the platform heartbeat rate.
    #[must_use]
    pub fn with_beat_rate(mut self, beat_rate: Duration) -> Self {
        self.mute = beat_rate * 2;
        self
    }

    /// Returns the pause before repeat number `repetition + 1`.
    #[must_use]
    pub fn repeat_pause(repetition: u32) -> Duration {
        Duration::from_millis(2000 + u64::from(repetition) * 1000)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            delay: Duration::ZERO,
            random: false,
            repeats: 0,
            mute: Duration::from_secs(20),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_pause_grows_by_a_second() {
        assert_eq!(DispatchConfig::repeat_pause(0), Duration::from_secs(2));
        assert_eq!(DispatchConfig::repeat_pause(1), Duration::from_secs(3));
        assert_eq!(DispatchConfig::repeat_pause(4), Duration::from_secs(6));
    }

    #[test]
    fn status_text() {
        assert_eq!(DispatchStatus::ManuallyControlled.to_string(), "Manually controlled");
        assert_eq!(DispatchStatus::default(), DispatchStatus::Initialised);
    }
}
