// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared across the bridge.
//!
//! - [`Method`] / [`Methods`]: gateway command bits and the `supportedMethods` mask
//! - [`DeviceStateCode`]: the state a device reports, with on/off normalisation
//! - [`DeviceModel`]: switch, dimmer or bell
//! - [`Brightness`]: dimmer percentage with gateway level conversion
//! - [`CompassDirection`]: wind bearing snapped to 16 compass points

mod brightness;
mod compass;
mod method;
mod state;

pub use brightness::Brightness;
pub use compass::CompassDirection;
pub use method::{Method, Methods};
pub use state::{DeviceModel, DeviceStateCode};
