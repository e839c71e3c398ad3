//! Layered error definitions
//!
//! Categorized by source: config / transport / pipeline / command.
//!
//! Nothing on the streaming path returns these: framing corruption, header
//! corruption, checksum failures and payload corruption are absorbed into
//! counters and rate-limited diagnostics. `LinkError` covers construction,
//! configuration and transport faults only.

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum LinkError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Transport Errors =====
    /// Transport open/connect error
    #[error("transport error on '{endpoint}': {message}")]
    Transport { endpoint: String, message: String },

    /// The selected transport is not compiled in
    #[error("transport '{kind}' unavailable: {message}")]
    TransportUnavailable { kind: String, message: String },

    // ===== Pipeline Errors =====
    /// Worker channel closed unexpectedly
    #[error("pipeline channel closed: {context}")]
    ChannelClosed { context: String },

    /// Session is in the wrong state for the requested operation
    #[error("session state error: {message}")]
    SessionState { message: String },

    // ===== Command Errors =====
    /// Malformed or unknown command rejected at construction
    #[error("command rejected: {message}")]
    CommandRejected { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl LinkError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create transport error
    pub fn transport(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create channel-closed error
    pub fn channel_closed(context: impl Into<String>) -> Self {
        Self::ChannelClosed {
            context: context.into(),
        }
    }

    /// Create command-rejected error
    pub fn command_rejected(message: impl Into<String>) -> Self {
        Self::CommandRejected {
            message: message.into(),
        }
    }
}
