//! Wire messages exchanged with the generation backend

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

use crate::error::Result;

/// Generation request sent when the user submits the form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub steps: u32,
    pub guidance: f64,
    pub width: u32,
    pub height: u32,
    pub negative: String,
    /// Empty string lets the backend pick a seed
    pub seed: String,
    /// Reference image as a base64 data URL; the key is omitted when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub strength: f64,
}

/// Control frames that carry a `type` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    Cancel,
}

/// Anything the client sends over the socket
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Generate(GenerationRequest),
    Cancel,
}

impl OutboundMessage {
    /// Serialize to the JSON text frame the backend expects
    pub fn to_json(&self) -> Result<String> {
        let text = match self {
            OutboundMessage::Generate(request) => serde_json::to_string(request)?,
            OutboundMessage::Cancel => serde_json::to_string(&ControlMessage::Cancel)?,
        };
        Ok(text)
    }
}

/// Parameters the backend reports alongside a finished image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationMeta {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub steps: Option<u32>,
    #[serde(default)]
    pub guidance: Option<f64>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    /// Kept as a JSON number so seeds beyond 64 bits survive
    #[serde(default, deserialize_with = "lenient_number")]
    pub seed: Option<Number>,
    #[serde(default)]
    pub negative: Option<String>,
    #[serde(default)]
    pub strength: Option<f64>,
}

/// Accept any JSON number; anything else decodes as `None`
fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<Number>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => Some(n),
        _ => None,
    })
}

/// Inbound frames, dispatched on their `type` field.
///
/// Decoding is lenient: fields the client does not strictly need are
/// optional, and unknown types are kept as [`ServerMessage::Unknown`] so the
/// caller can ignore them.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Ready,
    Started {
        total: Option<u32>,
    },
    Progress {
        step: Option<u32>,
        total: Option<u32>,
    },
    Final {
        image: Option<String>,
        meta: Option<GenerationMeta>,
    },
    Cancelled,
    Unknown(String),
}

/// Read a non-negative number as a step count
fn step_count(value: Option<&Value>) -> Option<u32> {
    let value = value?;
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    value
        .as_f64()
        .filter(|n| n.is_finite() && *n >= 0.0 && *n <= u32::MAX as f64)
        .map(|n| n as u32)
}

impl ServerMessage {
    /// Decode a text frame. Returns `None` for anything that is not a JSON
    /// object with a string `type`.
    pub fn parse(text: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(text).ok()?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        let kind = value.as_object()?.get("type")?.as_str()?;

        let message = match kind {
            "ready" => ServerMessage::Ready,
            "started" => ServerMessage::Started {
                total: step_count(value.get("total")),
            },
            "progress" => ServerMessage::Progress {
                step: step_count(value.get("step")),
                total: step_count(value.get("total")),
            },
            "final" => ServerMessage::Final {
                image: value
                    .get("image")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                meta: value
                    .get("meta")
                    .and_then(|m| serde_json::from_value(m.clone()).ok()),
            },
            "cancelled" => ServerMessage::Cancelled,
            other => ServerMessage::Unknown(other.to_string()),
        };

        Some(message)
    }

    /// Tag name as it appears on the wire
    pub fn kind(&self) -> &str {
        match self {
            ServerMessage::Ready => "ready",
            ServerMessage::Started { .. } => "started",
            ServerMessage::Progress { .. } => "progress",
            ServerMessage::Final { .. } => "final",
            ServerMessage::Cancelled => "cancelled",
            ServerMessage::Unknown(kind) => kind,
        }
    }
}
