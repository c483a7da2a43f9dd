use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const TOOL_EXECUTION_START: &str = "tool.execution_start";
pub const TOOL_EXECUTION_COMPLETE: &str = "tool.execution_complete";
pub const TOOL_EXECUTION_PROGRESS: &str = "tool.execution_progress";
pub const TOOL_EXECUTION_PARTIAL_RESULT: &str = "tool.execution_partial_result";
pub const ASSISTANT_MESSAGE_DELTA: &str = "assistant.message_delta";
pub const ASSISTANT_MESSAGE: &str = "assistant.message";
pub const ASSISTANT_TURN_START: &str = "assistant.turn_start";
pub const ASSISTANT_TURN_END: &str = "assistant.turn_end";
pub const SESSION_START: &str = "session.start";
pub const SESSION_ERROR: &str = "session.error";
pub const SESSION_IDLE: &str = "session.idle";

/// Event envelope as delivered by the Copilot runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// Events emitted by a session during its lifecycle
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    // Tool lifecycle events
    ToolExecutionStart(ToolData),
    ToolExecutionComplete(ToolData),
    ToolExecutionProgress(ToolData),
    ToolExecutionPartialResult(ToolData),

    // Assistant streaming events
    AssistantMessageDelta { delta_content: Option<String> },
    AssistantMessage { content: Option<String> },
    AssistantTurnStart,
    AssistantTurnEnd,

    // Session lifecycle events
    SessionStart,
    SessionError(ErrorData),
    SessionIdle,

    /// A kind this build does not know about
    Unknown { kind: String },
}

/// Payload shared by all `tool.*` events. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolData {
    #[serde(deserialize_with = "lenient_field")]
    pub tool_call_id: Option<String>,
    #[serde(deserialize_with = "lenient_field")]
    pub tool_name: Option<String>,
    #[serde(deserialize_with = "lenient_field")]
    pub mcp_server_name: Option<String>,
    #[serde(deserialize_with = "lenient_field")]
    pub mcp_tool_name: Option<String>,
    pub arguments: Option<Value>,
    #[serde(deserialize_with = "lenient_field")]
    pub result: Option<ToolResult>,
    #[serde(deserialize_with = "lenient_field")]
    pub progress_message: Option<String>,
    #[serde(deserialize_with = "lenient_field")]
    pub partial_output: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolResult {
    #[serde(deserialize_with = "lenient_field")]
    pub content: Option<String>,
}

/// Payload of a `session.error` event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorData {
    pub content: Option<String>,
    pub message: Option<String>,
    pub raw: Value,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ErrorFields {
    #[serde(deserialize_with = "lenient_field")]
    content: Option<String>,
    #[serde(deserialize_with = "lenient_field")]
    message: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct DeltaFields {
    #[serde(deserialize_with = "lenient_field")]
    delta_content: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct MessageFields {
    #[serde(deserialize_with = "lenient_field")]
    content: Option<String>,
}

impl ToolData {
    /// Human-readable label: `server/tool`, else the MCP tool name, else the generic name.
    pub fn label(&self) -> String {
        let server = non_empty(&self.mcp_server_name);
        let mcp_tool = non_empty(&self.mcp_tool_name);
        match (server, mcp_tool) {
            (Some(server), Some(tool)) => format!("{}/{}", server, tool),
            (None, Some(tool)) => tool.to_string(),
            _ => non_empty(&self.tool_name).unwrap_or("unknown").to_string(),
        }
    }

    /// Result content, if the tool produced any
    pub fn result_content(&self) -> Option<&str> {
        self.result.as_ref().and_then(|r| r.content.as_deref())
    }
}

impl ErrorData {
    /// Error text: `content`, else `message`, else the payload's string form.
    pub fn text(&self) -> String {
        if let Some(content) = non_empty(&self.content) {
            return content.to_string();
        }
        if let Some(message) = non_empty(&self.message) {
            return message.to_string();
        }
        match &self.raw {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl SessionEvent {
    /// Parse an event envelope. Never fails: unrecognized envelopes become `Unknown`.
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value::<RawEvent>(value) {
            Ok(raw) => raw.into(),
            Err(_) => SessionEvent::Unknown { kind: String::new() },
        }
    }

    /// Wire name of the event kind
    pub fn kind(&self) -> &str {
        match self {
            SessionEvent::ToolExecutionStart(_) => TOOL_EXECUTION_START,
            SessionEvent::ToolExecutionComplete(_) => TOOL_EXECUTION_COMPLETE,
            SessionEvent::ToolExecutionProgress(_) => TOOL_EXECUTION_PROGRESS,
            SessionEvent::ToolExecutionPartialResult(_) => TOOL_EXECUTION_PARTIAL_RESULT,
            SessionEvent::AssistantMessageDelta { .. } => ASSISTANT_MESSAGE_DELTA,
            SessionEvent::AssistantMessage { .. } => ASSISTANT_MESSAGE,
            SessionEvent::AssistantTurnStart => ASSISTANT_TURN_START,
            SessionEvent::AssistantTurnEnd => ASSISTANT_TURN_END,
            SessionEvent::SessionStart => SESSION_START,
            SessionEvent::SessionError(_) => SESSION_ERROR,
            SessionEvent::SessionIdle => SESSION_IDLE,
            SessionEvent::Unknown { kind } => kind.as_str(),
        }
    }

    /// Convenience constructor for a streamed message fragment
    pub fn delta(text: impl Into<String>) -> Self {
        SessionEvent::AssistantMessageDelta {
            delta_content: Some(text.into()),
        }
    }

    /// Convenience constructor for an error carrying `content`
    pub fn error(content: impl Into<String>) -> Self {
        let content = content.into();
        SessionEvent::SessionError(ErrorData {
            raw: serde_json::json!({ "content": content.clone() }),
            content: Some(content),
            message: None,
        })
    }
}

impl From<RawEvent> for SessionEvent {
    fn from(raw: RawEvent) -> Self {
        let RawEvent { kind, data } = raw;
        match kind.as_str() {
            TOOL_EXECUTION_START => SessionEvent::ToolExecutionStart(lenient(data)),
            TOOL_EXECUTION_COMPLETE => SessionEvent::ToolExecutionComplete(lenient(data)),
            TOOL_EXECUTION_PROGRESS => SessionEvent::ToolExecutionProgress(lenient(data)),
            TOOL_EXECUTION_PARTIAL_RESULT => SessionEvent::ToolExecutionPartialResult(lenient(data)),
            ASSISTANT_MESSAGE_DELTA => {
                let fields: DeltaFields = lenient(data);
                SessionEvent::AssistantMessageDelta {
                    delta_content: fields.delta_content,
                }
            }
            ASSISTANT_MESSAGE => {
                let fields: MessageFields = lenient(data);
                SessionEvent::AssistantMessage {
                    content: fields.content,
                }
            }
            ASSISTANT_TURN_START => SessionEvent::AssistantTurnStart,
            ASSISTANT_TURN_END => SessionEvent::AssistantTurnEnd,
            SESSION_START => SessionEvent::SessionStart,
            SESSION_ERROR => {
                let fields: ErrorFields = lenient(data.clone());
                SessionEvent::SessionError(ErrorData {
                    content: fields.content,
                    message: fields.message,
                    raw: data,
                })
            }
            SESSION_IDLE => SessionEvent::SessionIdle,
            _ => SessionEvent::Unknown { kind },
        }
    }
}

/// Receives session events. Implementations must not block.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &SessionEvent);
}

impl<F> EventHandler for F
where
    F: Fn(&SessionEvent) + Send + Sync,
{
    fn handle(&self, event: &SessionEvent) {
        self(event)
    }
}

// A payload that isn't an object at all is treated as empty.
fn lenient<T: for<'de> Deserialize<'de> + Default>(data: Value) -> T {
    serde_json::from_value(data).unwrap_or_default()
}

/// Reads one optional field, treating a value of the wrong type as absent
fn lenient_field<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
