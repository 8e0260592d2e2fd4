// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bodies of `system/info` and `refreshToken`.

use serde::Deserialize;

/// Body of `system/info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SystemInfo {
    /// Product name, e.g. `tellstick-znet-lite-v2`.
    #[serde(default)]
    pub product: Option<String>,
    /// Hardware revision.
    #[serde(default)]
    pub hardware: Option<String>,
    /// Firmware version.
    #[serde(default)]
    pub version: Option<String>,
    /// Gateway clock.
    #[serde(default)]
    pub time: Option<String>,
}

/// Body of `refreshToken`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenRefresh {
    /// Unix time the (new) token expires.
    #[serde(default)]
    pub expires: Option<i64>,
    /// The new token, if the gateway rotated it.
    #[serde(default)]
    pub token: Option<String>,
}
