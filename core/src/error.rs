//! Error types for the JSON:API data provider.
//!
//! # Design
//! `NotFound` gets a dedicated variant because admin screens distinguish
//! "the record does not exist" from "the server returned an unexpected
//! status." All other non-2xx responses land in `Http` with the raw status
//! code and body. Transport failures from the `HttpClient` collaborator are
//! carried unchanged in `Transport`.

use thiserror::Error;

/// Error produced by an `HttpClient` implementation. Propagated as-is.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by the client and provider.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The verb is not part of the data provider vocabulary.
    #[error("unsupported data provider request type {0}")]
    UnsupportedVerb(String),

    /// The parameters supplied for a verb do not have the expected shape.
    #[error("invalid parameters for {verb}: {message}")]
    InvalidParams { verb: String, message: String },

    /// A list-shaped response has no meta total under the configured name.
    #[error(
        "the JSON:API response did not contain the field \"{field}\" in the meta object; \
         set the \"total\" setting to null to count the returned records, point \"total\" \
         at the correct meta field, or make the server return a \"{field}\" meta property"
    )]
    MissingTotalMeta { field: String },

    /// The meta total exists but is not a non-negative integer.
    #[error("meta field \"{field}\" is not a non-negative integer: {value}")]
    InvalidTotal { field: String, value: serde_json::Value },

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The HTTP collaborator failed before a response was received.
    #[error("transport failed: {0}")]
    Transport(#[source] TransportError),

    /// The request document could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be turned into records.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// Merged settings do not describe a valid configuration.
    #[error("invalid settings: {0}")]
    Config(String),
}
