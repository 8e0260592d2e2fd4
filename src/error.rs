// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the bridge.
//!
//! Transport failures, incomplete responses, configuration problems and
//! gateway-reported failures each get their own enum. Gateway-reported
//! failures are normally carried as `ok = false` in an
//! [`ApiResponse`](crate::protocol::ApiResponse) and only become an
//! [`ApiError`] when a caller asks for it.

use thiserror::Error;

use crate::protocol::FailureKind;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred while talking to the gateway.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while parsing a gateway response.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The platform configuration is unusable.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The gateway answered, but reported a failure.
    #[error("gateway error: {0}")]
    Api(#[from] ApiError),
}

/// Errors related to the HTTP transport.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Errors related to parsing gateway responses.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Expected field is missing from the response.
    #[error("missing field in response: {0}")]
    MissingField(String),
}

/// Errors in the platform configuration. These are fatal at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No gateway host configured.
    #[error("no gateway host configured, set \"host\" to the gateway's IP address")]
    MissingHost,

    /// No access token configured.
    #[error("no access token configured, request one from the gateway and set \"accessToken\"")]
    MissingToken,

    /// A numeric setting is outside its allowed range.
    #[error("{field} must be between {min} and {max}, got {actual}")]
    OutOfRange {
        /// The offending setting.
        field: &'static str,
        /// Minimum allowed value.
        min: u64,
        /// Maximum allowed value.
        max: u64,
        /// The configured value.
        actual: u64,
    },

    /// The configuration document could not be read.
    #[error("invalid configuration document: {0}")]
    Malformed(String),
}

/// A failure reported by the gateway (`ok = false`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{operation} failed with HTTP {status_code} ({kind}): {message}")]
pub struct ApiError {
    /// The operation that failed, e.g. `device/turnOn`.
    pub operation: String,
    /// HTTP status code.
    pub status_code: u16,
    /// Classification of the status code.
    pub kind: FailureKind,
    /// Gateway error text, or the HTTP reason phrase.
    pub message: String,
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
