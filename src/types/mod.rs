//! Core types for the dispatcher.
//!
//! This module provides foundational types used throughout the crate:
//! - **IDs**: Strongly-typed identifiers (ToolName, CallId)
//! - **Errors**: Error taxonomy with thiserror derives
//! - **Config**: Dispatch and observability configuration

mod config;
mod errors;
mod ids;

pub use config::{Config, DispatchConfig, ObservabilityConfig};
pub use errors::{BoxError, Error, ErrorKind, Result, ToolPanic};
pub use ids::{CallId, ToolName, MAX_TOOL_NAME_LEN};
