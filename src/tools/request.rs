//! Tool call requests and results.
//!
//! A request names a tool and carries its arguments in whatever shape the
//! model produced them; a result carries either the raw return value or a
//! classified error, never both.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::types::{CallId, Error, ErrorKind};

// =============================================================================
// Arguments
// =============================================================================

/// Argument payload of a tool call.
///
/// On the wire it takes the shapes vendors emit: a JSON string is raw
/// argument text, `null` or an absent field means no arguments, and any other
/// value is structured. `Positional` serializes as an array, which reads back
/// as a structured array and binds the same way for multi-parameter tools.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ToolArguments {
    /// No arguments at all.
    #[default]
    None,
    /// Values bound to parameters by position.
    Positional(Vec<Value>),
    /// Parsed JSON: an object binds by parameter name, an array by position,
    /// and any other value binds to the only parameter of a unary tool.
    Structured(Value),
    /// JSON text as emitted by the model, parsed at invocation time.
    Raw(String),
}

impl ToolArguments {
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        ToolArguments::Positional(values.into_iter().map(Into::into).collect())
    }

    pub fn raw(text: impl Into<String>) -> Self {
        ToolArguments::Raw(text.into())
    }
}

impl Serialize for ToolArguments {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ToolArguments::None => serializer.serialize_none(),
            ToolArguments::Positional(values) => values.serialize(serializer),
            // A bare string would read back as raw text, so send its JSON form.
            ToolArguments::Structured(value @ Value::String(_)) => {
                serializer.serialize_str(&value.to_string())
            }
            ToolArguments::Structured(value) => value.serialize(serializer),
            ToolArguments::Raw(text) => serializer.serialize_str(text),
        }
    }
}

impl<'de> Deserialize<'de> for ToolArguments {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => ToolArguments::None,
            Value::String(text) => ToolArguments::Raw(text),
            other => ToolArguments::Structured(other),
        })
    }
}

impl From<Value> for ToolArguments {
    fn from(value: Value) -> Self {
        ToolArguments::Structured(value)
    }
}

impl From<Vec<Value>> for ToolArguments {
    fn from(values: Vec<Value>) -> Self {
        ToolArguments::Positional(values)
    }
}

// =============================================================================
// Request
// =============================================================================

/// A single tool invocation requested by the model. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    #[serde(default)]
    id: CallId,
    name: String,
    #[serde(default)]
    arguments: ToolArguments,
}

impl ToolCallRequest {
    /// New request with a generated call id.
    pub fn new(name: impl Into<String>, arguments: impl Into<ToolArguments>) -> Self {
        Self::with_id(CallId::new(), name, arguments)
    }

    /// New request carrying the call id assigned by the model provider.
    pub fn with_id(
        id: CallId,
        name: impl Into<String>,
        arguments: impl Into<ToolArguments>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Request with no arguments.
    pub fn no_args(name: impl Into<String>) -> Self {
        Self::new(name, ToolArguments::None)
    }

    pub fn id(&self) -> &CallId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &ToolArguments {
        &self.arguments
    }

    /// Decode one JSON-encoded request. A line that does not decode yields the
    /// error reply to send back instead.
    pub fn from_json_line(line: &str) -> Result<Self, ToolResultMessage> {
        serde_json::from_str(line).map_err(|e| ToolResultMessage::invalid_request(line, e))
    }
}

// =============================================================================
// Result
// =============================================================================

/// Outcome of one tool call.
#[derive(Debug)]
pub struct ToolCallResult {
    call_id: CallId,
    tool_name: String,
    outcome: Result<Value, Error>,
}

impl ToolCallResult {
    pub fn success(request: &ToolCallRequest, value: Value) -> Self {
        Self {
            call_id: request.id.clone(),
            tool_name: request.name.clone(),
            outcome: Ok(value),
        }
    }

    pub fn failure(request: &ToolCallRequest, error: Error) -> Self {
        Self {
            call_id: request.id.clone(),
            tool_name: request.name.clone(),
            outcome: Err(error),
        }
    }

    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn value(&self) -> Option<&Value> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&Error> {
        self.outcome.as_ref().err()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error().map(Error::kind)
    }

    pub fn outcome(&self) -> &Result<Value, Error> {
        &self.outcome
    }

    pub fn into_result(self) -> Result<Value, Error> {
        self.outcome
    }

    /// Render the result as the message fed back into the conversation.
    pub fn to_message(&self) -> ToolResultMessage {
        let (content, is_error) = match &self.outcome {
            Ok(Value::String(s)) => (s.clone(), false),
            Ok(value) => (value.to_string(), false),
            Err(err) => (err.to_tool_message(), true),
        };
        ToolResultMessage {
            call_id: self.call_id.clone(),
            tool_name: self.tool_name.clone(),
            content,
            is_error,
            error_kind: self.error_kind(),
        }
    }
}

/// Tool-result message handed to the orchestration layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultMessage {
    pub call_id: CallId,
    pub tool_name: String,
    pub content: String,
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_kind: Option<ErrorKind>,
}

impl ToolResultMessage {
    /// Error reply for a request that could not be decoded. The call id and
    /// tool name are echoed when the text is JSON carrying them.
    pub fn invalid_request(text: &str, reason: impl std::fmt::Display) -> Self {
        let parsed: Option<Value> = serde_json::from_str(text).ok();
        let field = |key: &str| {
            parsed
                .as_ref()
                .and_then(|v| v.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let error = Error::invalid_request(reason.to_string());
        Self {
            call_id: field("id")
                .and_then(|id| CallId::from_string(id).ok())
                .unwrap_or_default(),
            tool_name: field("name").unwrap_or_default(),
            content: error.to_tool_message(),
            is_error: true,
            error_kind: Some(error.kind()),
        }
    }
}
