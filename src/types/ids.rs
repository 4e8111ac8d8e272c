//! Strongly-typed identifiers.
//!
//! All IDs are validated at construction time and implement common traits.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest tool name accepted by the common chat-completion APIs.
pub const MAX_TOOL_NAME_LEN: usize = 64;

/// Macro to define a strongly-typed ID newtype wrapper.
///
/// Generates: struct, `as_str()`, Display, Serialize, Deserialize.
/// Deserialization always goes through `TryFrom<String>`. With the `uuid` flag
/// it also generates `new()` (UUID v4), `Default` and a non-empty
/// `from_string()` for ids assigned elsewhere.
macro_rules! define_id {
    ($name:ident, uuid) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn from_string(s: String) -> Result<Self, &'static str> {
                if s.is_empty() {
                    return Err(concat!(stringify!($name), " cannot be empty"));
                }
                Ok(Self(s))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl TryFrom<String> for $name {
            type Error = &'static str;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::from_string(s)
            }
        }

        define_id!(@common $name);
    };
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        define_id!(@common $name);
    };
    (@common $name:ident) => {
        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(CallId, uuid);
define_id!(ToolName);

impl ToolName {
    /// Validate a tool name: 1 to 64 ASCII letters, digits, `_` or `-`.
    pub fn parse(s: impl Into<String>) -> Result<Self, String> {
        let s = s.into();
        if s.is_empty() {
            return Err("tool name cannot be empty".to_string());
        }
        if s.len() > MAX_TOOL_NAME_LEN {
            return Err(format!(
                "tool name '{}' exceeds {} characters",
                s, MAX_TOOL_NAME_LEN
            ));
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(format!("tool name '{}' contains invalid character '{}'", s, c));
        }
        Ok(Self(s))
    }
}

impl TryFrom<String> for ToolName {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}
