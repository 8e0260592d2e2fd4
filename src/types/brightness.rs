// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Brightness type for dimmer control.
//!
//! Hosts speak percentages (0-100), the gateway speaks device levels
//! (0-255). [`Brightness`] holds the percentage and converts on the way out.

use std::fmt;

/// Brightness level as a percentage (0-100).
///
/// # Examples
///
/// ```
/// use telldus_bridge::types::Brightness;
///
/// let half = Brightness::clamped(50);
/// assert_eq!(half.percent(), 50);
/// assert_eq!(half.device_level(), 127);
///
/// assert_eq!(Brightness::clamped(150), Brightness::MAX);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Brightness(u8);

impl Brightness {
    /// Minimum brightness (0%).
    pub const MIN: Self = Self(0);

    /// Maximum brightness (100%).
    pub const MAX: Self = Self(100);

    /// Creates a brightness value, clamping to 100.
    #[must_use]
    pub const fn clamped(percent: u8) -> Self {
        if percent > 100 { Self(100) } else { Self(percent) }
    }

    /// Returns the percentage.
    #[must_use]
    pub const fn percent(self) -> u8 {
        self.0
    }

    /// Returns the gateway level, `percent * 255 / 100` truncated.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn device_level(self) -> u8 {
        // Safe: at most 100 * 255 / 100 = 255
        (self.0 as u16 * 255 / 100) as u8
    }

    /// Converts a gateway level back to a percentage, rounding to nearest.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_device_level(level: u8) -> Self {
        // Safe: at most (255 * 100 + 127) / 255 = 100
        Self(((level as u16 * 100 + 127) / 255) as u8)
    }
}

impl Default for Brightness {
    fn default() -> Self {
        Self::MAX
    }
}

impl fmt::Display for Brightness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
