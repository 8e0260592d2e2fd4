// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Normalised gateway responses.

use std::fmt;

use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// What a failed response most likely means, for log messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// HTTP 401: the access token is wrong or expired.
    Credentials,
    /// HTTP 404: the host is not a gateway.
    WrongHost,
    /// HTTP 408: the gateway timed out.
    Timeout,
    /// Any other HTTP error, or a body carrying `error`.
    Server,
}

impl FailureKind {
    /// Classifies an HTTP status code.
    #[must_use]
    pub const fn from_status(status_code: u16) -> Self {
        match status_code {
            401 => Self::Credentials,
            404 => Self::WrongHost,
            408 => Self::Timeout,
            _ => Self::Server,
        }
    }

    /// Returns guidance for the user.
    #[must_use]
    pub const fn hint(self) -> &'static str {
        match self {
            Self::Credentials => "check the configured access token",
            Self::WrongHost => "check the configured host, it does not look like a gateway",
            Self::Timeout => "the gateway did not answer in time, check the host and network",
            Self::Server => "the gateway reported an error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Credentials => "credential problem",
            Self::WrongHost => "wrong host",
            Self::Timeout => "timeout or host problem",
            Self::Server => "server error",
        };
        write!(f, "{s}")
    }
}

/// A gateway response, normalised to an `ok` flag plus a typed body.
///
/// # Examples
///
/// ```
/// use telldus_bridge::protocol::ApiResponse;
/// use telldus_bridge::model::DeviceList;
///
/// let ok: ApiResponse<DeviceList> =
///     ApiResponse::from_parts(200, "OK", r#"{"device":[]}"#);
/// assert!(ok.ok);
///
/// let failed: ApiResponse<DeviceList> =
///     ApiResponse::from_parts(200, "OK", r#"{"error":"Device not found"}"#);
/// assert!(!failed.ok);
/// assert_eq!(failed.error.as_deref(), Some("Device not found"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    /// True when the status is 2xx and the body carries no `error`.
    pub ok: bool,
    /// HTTP status code.
    pub status_code: u16,
    /// HTTP reason phrase.
    pub status_message: String,
    /// The gateway's `error` text, if any.
    pub error: Option<String>,
    /// The parsed body, present exactly when `ok` is true.
    pub body: Option<T>,
}

impl<T: DeserializeOwned> ApiResponse<T> {
    /// Builds a response from the raw HTTP status and body text.
    ///
    /// A successful status whose body cannot be parsed into `T` yields
    /// `ok = false`, with the parse failure as the error text.
    pub fn from_parts(status_code: u16, status_message: impl Into<String>, text: &str) -> Self {
        let json: Option<serde_json::Value> = serde_json::from_str(text).ok();
        let mut error = json.as_ref().and_then(error_text);
        let mut body = None;

        if (200..=299).contains(&status_code) && error.is_none() {
            let value = json.unwrap_or(serde_json::Value::Null);
            match serde_json::from_value(value) {
                Ok(parsed) => body = Some(parsed),
                Err(e) => error = Some(format!("unparsable response body: {e}")),
            }
        }

        Self {
            ok: body.is_some(),
            status_code,
            status_message: status_message.into(),
            error,
            body,
        }
    }
}

impl<T> ApiResponse<T> {
    /// Returns the failure classification, or `None` for a successful response.
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        if self.ok {
            None
        } else {
            Some(FailureKind::from_status(self.status_code))
        }
    }

    /// Converts the response into the body, or an [`ApiError`].
    ///
    /// # Errors
    ///
    /// Returns `ApiError` when the response is not ok.
    pub fn into_result(self, operation: &str) -> Result<T, ApiError> {
        match (self.ok, self.body) {
            (true, Some(body)) => Ok(body),
            _ => Err(ApiError {
                operation: operation.to_string(),
                status_code: self.status_code,
                kind: FailureKind::from_status(self.status_code),
                message: self.error.unwrap_or(self.status_message),
            }),
        }
    }
}

/// Extracts a truthy `error` member from a response body.
fn error_text(json: &serde_json::Value) -> Option<String> {
    match json.get("error")? {
        serde_json::Value::Null | serde_json::Value::Bool(false) => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
