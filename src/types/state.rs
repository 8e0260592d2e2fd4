// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state codes and device models.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Method, Methods};

/// The state a device last reported, as the gateway's method code.
///
/// The gateway reports the last method executed on a device as its state,
/// so `1` means on, `2` off, `16` dimmed and so forth.
///
/// # Examples
///
/// ```
/// use telldus_bridge::types::DeviceStateCode;
///
/// assert_eq!(DeviceStateCode::DIM.normalized(), DeviceStateCode::ON);
/// assert_eq!(DeviceStateCode::OFF.as_bool(), Some(false));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceStateCode(u32);

impl DeviceStateCode {
    /// Turned on.
    pub const ON: Self = Self(Method::TurnOn as u32);
    /// Turned off.
    pub const OFF: Self = Self(Method::TurnOff as u32);
    /// Bell rung.
    pub const BELL: Self = Self(Method::Bell as u32);
    /// Dimmed to some level.
    pub const DIM: Self = Self(Method::Dim as u32);

    /// Wraps a raw state code.
    #[must_use]
    pub const fn new(code: u32) -> Self {
        Self(code)
    }

    /// Returns the raw state code.
    #[must_use]
    pub const fn code(self) -> u32 {
        self.0
    }

    /// Returns the state used for caching. A dimmed device is on.
    #[must_use]
    pub const fn normalized(self) -> Self {
        if self.0 == Self::DIM.0 { Self::ON } else { self }
    }

    /// Returns the on/off reading of this state.
    ///
    /// Bells are momentary and read as off. States other than on, off, dim
    /// and bell carry no on/off meaning and return `None`.
    #[must_use]
    pub const fn as_bool(self) -> Option<bool> {
        match self.normalized().0 {
            1 => Some(true),
            2 | 4 => Some(false),
            _ => None,
        }
    }
}

impl From<bool> for DeviceStateCode {
    fn from(on: bool) -> Self {
        if on { Self::ON } else { Self::OFF }
    }
}

impl fmt::Debug for DeviceStateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.0 {
            1 => "ON",
            2 => "OFF",
            4 => "BELL",
            16 => "DIM",
            _ => "OTHER",
        };
        write!(f, "DeviceStateCode({}, {name})", self.0)
    }
}

impl fmt::Display for DeviceStateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of device this is, derived from the methods it supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceModel {
    /// Plain on/off switch.
    Switch,
    /// Dimmable light.
    Dimmer,
    /// Door bell or chime.
    Bell,
}

impl DeviceModel {
    /// Derives the model from a device's supported methods.
    #[must_use]
    pub fn from_methods(methods: Methods) -> Self {
        if methods.contains(Method::Dim) {
            Self::Dimmer
        } else if methods.contains(Method::Bell)
            && !methods.contains(Method::TurnOn)
            && !methods.contains(Method::TurnOff)
        {
            Self::Bell
        } else {
            Self::Switch
        }
    }
}

impl fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Switch => "switch",
            Self::Dimmer => "dimmer",
            Self::Bell => "bell",
        };
        write!(f, "{s}")
    }
}
