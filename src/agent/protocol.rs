//! Line-delimited JSON protocol spoken over an agent's stdin/stdout.
//!
//! Each line is one JSON object. Agents send a `register` handshake and
//! `response` messages; the host sends `command` messages.

use super::runtime::ToolDescriptor;
use crate::types::{format_timestamp, now};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Handshake payload of a `register` message.
///
/// Only the `type` tag is checked. Fields of the wrong JSON type fall back to
/// their defaults so a sloppy agent still comes online.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Handshake {
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::scalar_string"
    )]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub capabilities: Vec<String>,
    #[serde(deserialize_with = "lenient::tool_list")]
    pub tools: Vec<ToolDescriptor>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::scalar_string"
    )]
    pub version: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::scalar_string"
    )]
    pub protocol: Option<String>,
}

/// Deserializers that map null or mistyped values to defaults.
pub(crate) mod lenient {
    use super::ToolDescriptor;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Strings pass through; numbers and booleans are stringified.
    pub fn scalar_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }

    pub fn string_or_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(scalar_string(d)?.unwrap_or_default())
    }

    /// Non-string items are dropped; anything but an array is empty.
    pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        })
    }

    /// A bare string item is a tool with only a name. Items without a usable
    /// name are dropped.
    pub fn tool_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<ToolDescriptor>, D::Error> {
        let Value::Array(items) = Value::deserialize(d)? else {
            return Ok(Vec::new());
        };
        Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(name) => Some(ToolDescriptor::new(name, "")),
                other => serde_json::from_value::<ToolDescriptor>(other).ok(),
            })
            .filter(|tool| !tool.name.is_empty())
            .collect())
    }

    /// Only JSON objects count as a parameter schema.
    pub fn object_only<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Value>, D::Error> {
        Ok(Some(Value::deserialize(d)?).filter(Value::is_object))
    }
}

/// Reply to a host command, correlated by `requestId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl CommandResponse {
    pub fn success(request_id: impl Into<String>, result: Value) -> Self {
        Self {
            request_id: request_id.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            result: None,
            error: Some(Value::String(error.into())),
        }
    }

    /// Error text if the agent reported one. `null`, `false` and `""` count
    /// as no error.
    pub fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => Some(
                map.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
            ),
            other => Some(other.to_string()),
        }
    }

    /// Settle into the value the waiting caller receives.
    pub fn into_result(self) -> Result<Value, String> {
        match self.error_message() {
            Some(message) => Err(message),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Typed agent-to-host messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AgentMessage {
    Register(Handshake),
    Response(CommandResponse),
}

/// Host-to-agent messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HostMessage {
    Command {
        id: String,
        command: String,
        #[serde(default)]
        args: Value,
        timestamp: String,
    },
}

impl HostMessage {
    pub fn command(id: impl Into<String>, command: impl Into<String>, args: Value) -> Self {
        HostMessage::Command {
            id: id.into(),
            command: command.into(),
            args,
            timestamp: format_timestamp(&now()),
        }
    }

    /// Serialize to a single protocol line, without the trailing newline.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A parsed stdout line.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Agent(AgentMessage),
    /// Valid JSON with any other (or no) `type`.
    Other(Value),
}

/// A stdout line that could not be parsed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid agent message: {error}")]
pub struct ProtocolError {
    pub error: String,
    pub raw: String,
}

/// Parse one already-trimmed stdout line.
pub fn parse_line(line: &str) -> Result<Inbound, ProtocolError> {
    let value: Value = serde_json::from_str(line).map_err(|e| ProtocolError {
        error: e.to_string(),
        raw: line.to_string(),
    })?;

    let typed = matches!(
        value.get("type").and_then(Value::as_str),
        Some("register") | Some("response")
    );
    if !typed {
        return Ok(Inbound::Other(value));
    }

    serde_json::from_value::<AgentMessage>(value)
        .map(Inbound::Agent)
        .map_err(|e| ProtocolError {
            error: e.to_string(),
            raw: line.to_string(),
        })
}
