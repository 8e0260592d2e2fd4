// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Access token refresh scheduling.
//!
//! Gateway tokens expire. The [`TokenManager`] refreshes the token once 80 %
//! of its lifetime has passed, checked on every platform beat. Times are unix
//! seconds, as reported by the gateway.

use std::time::Duration;

use crate::protocol::Gateway;

/// Schedules and performs access token refreshes.
///
/// # Examples
///
/// ```
/// use telldus_bridge::auth::TokenManager;
///
/// let manager = TokenManager::new(1_000, Some(2_000));
/// assert_eq!(manager.next_refresh(), 1_800);
/// assert!(!manager.is_due(1_800));
/// assert!(manager.is_due(1_801));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenManager {
    expires: Option<i64>,
    last_refresh: i64,
    next_refresh: i64,
}

impl TokenManager {
    /// Share of a token's lifetime after which it is refreshed, in percent.
    pub const REFRESH_AT_PERCENT: i64 = 80;

    /// Creates a manager for a token obtained at `now`.
    ///
    /// With an unknown expiry the token is refreshed on the first check,
    /// which also learns the expiry.
    #[must_use]
    pub fn new(now: i64, expires: Option<i64>) -> Self {
        let mut manager = Self {
            expires: None,
            last_refresh: now,
            next_refresh: now - 1,
        };
        if let Some(expires) = expires {
            manager.schedule(now, expires);
        }
        manager
    }

    /// Returns the expiry of the current token, if known.
    #[must_use]
    pub fn expires(&self) -> Option<i64> {
        self.expires
    }

    /// Returns the time of the last successful refresh.
    #[must_use]
    pub fn last_refresh(&self) -> i64 {
        self.last_refresh
    }

    /// Returns the time after which the next refresh is due.
    #[must_use]
    pub fn next_refresh(&self) -> i64 {
        self.next_refresh
    }

    /// Returns true once `now` is past the scheduled refresh.
    #[must_use]
    pub fn is_due(&self, now: i64) -> bool {
        now > self.next_refresh
    }

    /// Records a refresh at `last_refresh` yielding a token valid until `expires`.
    pub fn schedule(&mut self, last_refresh: i64, expires: i64) {
        let lifetime = (expires - last_refresh).max(0);
        self.expires = Some(expires);
        self.last_refresh = last_refresh;
        self.next_refresh = last_refresh + lifetime * Self::REFRESH_AT_PERCENT / 100;
    }

    /// Refreshes the token if due. Returns true if a refresh succeeded.
    ///
    /// A failed refresh keeps the old token and postpones the next attempt by
    /// one `beat`.
    pub async fn refresh_if_due<G: Gateway>(&mut self, gateway: &G, now: i64, beat: Duration) -> bool {
        if !self.is_due(now) {
            return false;
        }

        match gateway.refresh_access_token().await {
            Ok(refresh) => {
                // refresh_access_token guarantees `expires`
                let expires = refresh.expires.unwrap_or(now);
                self.schedule(now, expires);
                tracing::info!(expires, next_refresh = self.next_refresh, "Access token refreshed");
                true
            }
            Err(e) => {
                let beat = i64::try_from(beat.as_secs()).unwrap_or(i64::MAX).max(1);
                self.next_refresh = now.saturating_add(beat);
                tracing::warn!(error = %e, retry_at = self.next_refresh, "Access token refresh failed, keeping current token");
                false
            }
        }
    }
}
