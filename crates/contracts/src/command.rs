//! Control-surface types: flow directives and operator commands.
//!
//! Commands are a closed enum rather than free-form JSON objects so that
//! malformed payloads are rejected at construction time, not at the gateway.

use serde::{Deserialize, Serialize};

use crate::LinkError;

/// Flow-control directive sent upstream to the transport.
///
/// Backpressure is advisory: the pipeline never blocks the transport's read
/// call, it asks the gateway to pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowDirective {
    /// Ask the gateway to pause streaming
    Pause,
    /// Ask the gateway to resume streaming
    Resume,
}

/// Operator / flow-control command, serialized as single-line JSON for the
/// gateway's command handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum LinkCommand {
    /// Pause the gateway's sample stream
    PauseStream,
    /// Resume the gateway's sample stream
    ResumeStream,
    /// Reset all pipeline statistics (diagnostic, not part of the wire
    /// protocol)
    ResetAllStats,
}

impl LinkCommand {
    /// Encode as a single-line JSON command string (newline-terminated).
    pub fn to_json_line(self) -> String {
        // A closed enum with unit variants cannot fail to serialize.
        let mut line = serde_json::to_string(&self).unwrap_or_default();
        line.push('\n');
        line
    }

    /// Parse a JSON command string, rejecting unknown or malformed input.
    pub fn parse(input: &str) -> Result<Self, LinkError> {
        serde_json::from_str(input.trim())
            .map_err(|e| LinkError::command_rejected(format!("malformed command: {e}")))
    }
}

impl From<FlowDirective> for LinkCommand {
    fn from(directive: FlowDirective) -> Self {
        match directive {
            FlowDirective::Pause => Self::PauseStream,
            FlowDirective::Resume => Self::ResumeStream,
        }
    }
}
