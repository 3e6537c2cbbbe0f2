use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::protocol::Frame;

/// A command submitted on the `send_cmd` tag.
///
/// Every field is optional and untyped: the relay forwards what it was given and
/// never validates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// What peers receive: only `data`, under the `dest` tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub tag: Value,
    pub data: Option<Value>,
}

impl Envelope {
    pub fn new(source: impl Into<Value>, dest: impl Into<Value>, data: Value) -> Self {
        Self {
            source: Some(source.into()),
            dest: Some(dest.into()),
            data: Some(data),
        }
    }

    /// Interprets a raw `send_cmd` payload.
    ///
    /// Absent and falsy payloads (`null`, `false`, `0`, `""`) yield `None`. An object
    /// contributes whichever of `source`, `dest` and `data` it has; any other value
    /// yields an envelope with no fields.
    pub fn from_payload(payload: Option<Value>) -> Option<Self> {
        let payload = payload?;
        if is_falsy(&payload) {
            return None;
        }
        match payload {
            Value::Object(mut map) => Some(Self {
                source: map.remove("source"),
                dest: map.remove("dest"),
                data: map.remove("data"),
            }),
            _ => Some(Self::default()),
        }
    }

    /// The `data.cmd` label, used for logging only.
    pub fn command_label(&self) -> Option<&str> {
        self.data.as_ref()?.get("cmd")?.as_str()
    }

    /// The outbound message for peers. `source` is never included.
    pub fn delivery(&self) -> Delivery {
        Delivery {
            tag: self.dest.clone().unwrap_or(Value::Null),
            data: self.data.clone(),
        }
    }
}

impl Delivery {
    pub fn to_frame(&self) -> Frame {
        let mut payload = Map::new();
        if let Some(data) = &self.data {
            payload.insert("data".to_string(), data.clone());
        }
        Frame::new(self.tag.clone(), Some(Value::Object(payload)))
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Renders an optional field for log lines.
pub(crate) fn display_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "-".to_string(),
    }
}
