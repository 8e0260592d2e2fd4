// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Gateway command methods and the `supportedMethods` bitmask.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// A single command method understood by the gateway.
///
/// The discriminant is the bit the gateway uses for the method, both in the
/// `supportedMethods` query parameter and in a device's reported `state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Method {
    /// Turn on.
    TurnOn = 1,
    /// Turn off.
    TurnOff = 2,
    /// Ring a bell.
    Bell = 4,
    /// Toggle.
    Toggle = 8,
    /// Dim to a level.
    Dim = 16,
    /// Learn (pairing).
    Learn = 32,
    /// Execute a scene.
    Execute = 64,
    /// Move up.
    Up = 128,
    /// Move down.
    Down = 256,
    /// Stop moving.
    Stop = 512,
}

impl Method {
    /// Every method the gateway knows, in bit order.
    pub const ALL: [Self; 10] = [
        Self::TurnOn,
        Self::TurnOff,
        Self::Bell,
        Self::Toggle,
        Self::Dim,
        Self::Learn,
        Self::Execute,
        Self::Up,
        Self::Down,
        Self::Stop,
    ];

    /// Returns the bit of this method.
    #[must_use]
    pub const fn bit(self) -> u32 {
        self as u32
    }
}

/// A set of [`Method`]s, encoded as the gateway's bitmask.
///
/// # Examples
///
/// ```
/// use telldus_bridge::types::{Method, Methods};
///
/// let methods = Methods::from(Method::TurnOn) | Method::TurnOff;
/// assert!(methods.contains(Method::TurnOff));
/// assert_eq!(Methods::default().bits(), 1023);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Methods(u32);

impl Methods {
    /// The empty set.
    pub const NONE: Self = Self(0);

    /// Creates a set from raw bits. Unknown bits are kept as-is.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the set of every known method.
    #[must_use]
    pub fn all() -> Self {
        Method::ALL.into_iter().collect()
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if `method` is in the set.
    #[must_use]
    pub const fn contains(self, method: Method) -> bool {
        self.0 & method.bit() != 0
    }
}

impl Default for Methods {
    fn default() -> Self {
        Self::all()
    }
}

impl From<Method> for Methods {
    fn from(method: Method) -> Self {
        Self(method.bit())
    }
}

impl BitOr<Method> for Methods {
    type Output = Self;

    fn bitor(self, rhs: Method) -> Self {
        Self(self.0 | rhs.bit())
    }
}

impl BitOrAssign<Method> for Methods {
    fn bitor_assign(&mut self, rhs: Method) {
        self.0 |= rhs.bit();
    }
}

impl FromIterator<Method> for Methods {
    fn from_iter<I: IntoIterator<Item = Method>>(iter: I) -> Self {
        let mut methods = Self::NONE;
        for method in iter {
            methods |= method;
        }
        methods
    }
}

impl fmt::Debug for Methods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = Method::ALL
            .into_iter()
            .filter(|m| self.contains(*m))
            .collect();
        write!(f, "Methods({:#x}, {names:?})", self.0)
    }
}

impl fmt::Display for Methods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
