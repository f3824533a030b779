//! Frame — JSON wire types for display clients and the Room Controller.
//!
//! ARCHITECTURE
//! ============
//! Two protocols share this module:
//! - Display protocol: flat objects tagged by `type` (`{"type":"state",...}`).
//!   Each prop defines its own event and message enums; the GM controls
//!   (`activate`, `reset`, `forceSolve`, `ready`) are common to all props.
//! - Room Controller protocol: `{type, payload}` envelopes with snake_case
//!   type names and camelCase payload fields.
//!
//! DESIGN
//! ======
//! Inbound parsing never errors outward. Anything that does not decode is
//! `None` and the caller drops it.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

// =============================================================================
// DISPLAY PROTOCOL
// =============================================================================

/// Game-master controls accepted by every prop in any mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GmControl {
    Activate,
    Reset,
    ForceSolve,
    /// Display finished loading. Auto-activates in mock mode only.
    Ready,
}

/// A decoded client frame: either a GM control or a prop-specific message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound<M> {
    Control(GmControl),
    Prop(M),
}

/// Decode a client text frame. GM controls take precedence over the prop's
/// own message set.
pub fn parse_inbound<M: DeserializeOwned>(text: &str) -> Option<Inbound<M>> {
    let value: Value = serde_json::from_str(text).ok()?;
    if let Ok(control) = GmControl::deserialize(&value) {
        return Some(Inbound::Control(control));
    }
    M::deserialize(value).ok().map(Inbound::Prop)
}

/// `{"type":"config","mock":..}` merged with the prop's static manifest.
#[must_use]
pub fn config_frame(mock: bool, manifest: Value) -> String {
    let mut frame = Map::new();
    frame.insert("type".into(), json!("config"));
    frame.insert("mock".into(), json!(mock));
    if let Value::Object(fields) = manifest {
        for (key, value) in fields {
            if key != "type" {
                frame.insert(key, value);
            }
        }
    }
    Value::Object(frame).to_string()
}

/// `{"type":"state",..}` flattened from a prop snapshot.
#[must_use]
pub fn state_frame<S: Serialize>(snapshot: &S) -> String {
    let mut frame = Map::new();
    frame.insert("type".into(), json!("state"));
    if let Ok(Value::Object(fields)) = serde_json::to_value(snapshot) {
        frame.extend(fields);
    }
    Value::Object(frame).to_string()
}

/// A bare `{"type": kind}` frame (e.g. `hackMode`).
#[must_use]
pub fn signal_frame(kind: &str) -> String {
    json!({ "type": kind }).to_string()
}

// =============================================================================
// ROOM CONTROLLER PROTOCOL
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum RoomOutbound {
    PropOnline(Presence),
    PropOffline(Presence),
    PropUpdate(PropUpdate),
    CmdAck(CmdAck),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    pub prop_id: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropUpdate {
    pub prop_id: String,
    pub timestamp: u64,
    pub changes: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CmdAck {
    pub request_id: Value,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RoomOutbound {
    #[must_use]
    pub fn online(prop_id: &str) -> Self {
        Self::PropOnline(Presence { prop_id: prop_id.to_string(), timestamp: now_ms() })
    }

    #[must_use]
    pub fn offline(prop_id: &str) -> Self {
        Self::PropOffline(Presence { prop_id: prop_id.to_string(), timestamp: now_ms() })
    }

    #[must_use]
    pub fn update(prop_id: &str, changes: Value) -> Self {
        Self::PropUpdate(PropUpdate { prop_id: prop_id.to_string(), timestamp: now_ms(), changes })
    }

    #[must_use]
    pub fn ack(request_id: Value, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::CmdAck(CmdAck { request_id, success: true, error: None }),
            Err(message) => Self::CmdAck(CmdAck { request_id, success: false, error: Some(message) }),
        }
    }

    #[must_use]
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// An inbound `cmd` payload. Command-specific arguments stay in `args`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCommand {
    #[serde(default)]
    pub prop_id: Option<String>,
    #[serde(default)]
    pub request_id: Option<Value>,
    pub command: String,
    #[serde(flatten)]
    pub args: Map<String, Value>,
}

impl RoomCommand {
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self { prop_id: None, request_id: None, command: command.to_string(), args: Map::new() }
    }

    #[must_use]
    pub fn with_arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.args.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    /// Commands without a `propId` are addressed to every prop.
    #[must_use]
    pub fn is_for(&self, prop_id: &str) -> bool {
        self.prop_id.as_deref().is_none_or(|id| id == prop_id)
    }
}

/// Decode a Room Controller frame, returning the command payload when the
/// frame is a `cmd`. `hello` and unknown frames yield `None`.
#[must_use]
pub fn parse_room_command(text: &str) -> Option<RoomCommand> {
    let value: Value = serde_json::from_str(text).ok()?;
    if value.get("type").and_then(Value::as_str) != Some("cmd") {
        return None;
    }
    RoomCommand::deserialize(value.get("payload")?).ok()
}

/// Milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
