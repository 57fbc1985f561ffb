//! Wire codec: newline-delimited JSON with lexicographically sorted fields.
//!
//! Peers compare encoded bytes, so every object is re-keyed in sorted order
//! regardless of declaration order or map implementation.

use crate::agent::{Agent, AGENT_IDX_FIELD};
use crate::error::ProtocolError;
use crate::types::Request;
use crate::wire::{Packet, Reply};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::type_name;
use tracing::debug;

/// How agent-valued replies are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentEncoding {
    /// Bare integer index: `3`.
    #[default]
    Index,
    /// Structured object: `{"agentIdx":3}`.
    Object,
}

/// Encode any value with sorted object fields.
///
/// # Errors
/// Returns `SchemaError` if the value cannot be represented as JSON.
pub fn encode<T: Serialize>(value: &T) -> Result<String, ProtocolError> {
    let value = serde_json::to_value(value)
        .map_err(|e| ProtocolError::schema(type_name::<T>(), e))?;
    serde_json::to_string(&sort_keys(value))
        .map_err(|e| ProtocolError::schema(type_name::<T>(), e))
}

/// Decode a value, rejecting missing required fields and unknown enum names.
///
/// # Errors
/// Returns `SchemaError` naming the target type and the decoder's message.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ProtocolError> {
    serde_json::from_str(text).map_err(|e| ProtocolError::schema(type_name::<T>(), e))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, sort_keys(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Packet decoding and reply encoding for one connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct WireCodec {
    agent_encoding: AgentEncoding,
}

impl WireCodec {
    pub fn new(agent_encoding: AgentEncoding) -> Self {
        Self { agent_encoding }
    }

    /// # Errors
    /// Returns `SchemaError` when the line is not a valid packet.
    pub fn decode_packet(&self, line: &str) -> Result<Packet, ProtocolError> {
        decode::<Packet>(line.trim_end())
    }

    /// Salvage the request kind from a line that failed full decoding.
    ///
    /// Lets a lenient caller fall back to a request-only packet that reuses
    /// the previous snapshot.
    pub fn recover_request(&self, line: &str) -> Option<Request> {
        let value: Value = serde_json::from_str(line.trim_end()).ok()?;
        let request = value.get("request")?.clone();
        let request = serde_json::from_value::<Request>(request).ok()?;
        debug!("Recovered request {} from undecodable packet", request);
        Some(request)
    }

    /// Render a reply as one line, without the terminating newline.
    ///
    /// # Errors
    /// Returns `SchemaError` if an agent reply cannot be encoded.
    pub fn encode_reply(&self, reply: &Reply) -> Result<String, ProtocolError> {
        match reply {
            Reply::None | Reply::Agent(None) => Ok(String::new()),
            Reply::Text(text) => Ok(single_line(text)),
            Reply::Agent(Some(agent)) => self.encode_agent(*agent),
        }
    }

    fn encode_agent(&self, agent: Agent) -> Result<String, ProtocolError> {
        match self.agent_encoding {
            AgentEncoding::Index => encode(&agent),
            AgentEncoding::Object => {
                let mut object = Map::new();
                object.insert(AGENT_IDX_FIELD.to_string(), Value::from(agent.index()));
                encode(&Value::Object(object))
            }
        }
    }
}

fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}
