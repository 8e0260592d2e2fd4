// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sixteen-point compass used for wind direction readings.

use std::fmt;

const LABELS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// A wind direction snapped to the nearest of the 16 compass points.
///
/// # Examples
///
/// ```
/// use telldus_bridge::types::CompassDirection;
///
/// assert_eq!(CompassDirection::from_degrees(112.5).label(), "ESE");
/// assert_eq!(CompassDirection::from_degrees(355.0).label(), "N");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompassDirection(u8);

impl CompassDirection {
    /// Width of one compass sector in degrees.
    pub const SECTOR: f64 = 22.5;

    /// Snaps a bearing in degrees to the nearest compass point.
    ///
    /// Bearings outside 0-360 are wrapped.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_degrees(degrees: f64) -> Self {
        let wrapped = degrees.rem_euclid(360.0);
        // Safe: wrapped / SECTOR is within [0, 16]
        let index = (wrapped / Self::SECTOR).round() as u8 % 16;
        Self(index)
    }

    /// Returns the compass label, e.g. `"NNE"`.
    #[must_use]
    pub fn label(self) -> &'static str {
        LABELS[usize::from(self.0)]
    }

    /// Returns the centre bearing of this compass point.
    #[must_use]
    pub fn degrees(self) -> f64 {
        f64::from(self.0) * Self::SECTOR
    }
}

impl fmt::Display for CompassDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
