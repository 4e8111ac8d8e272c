//! # Jeeves Tool Dispatch - LLM tool-call routing
//!
//! Exposes methods of ordinary Rust types as tools an LLM can call:
//! - Static tool declaration with signature-derived parameter metadata
//! - Per-type registries of cached, type-erased callable handles
//! - Argument binding from positional values, named objects or raw JSON text
//! - Structured results with a stable error taxonomy for the model
//! - Routing across several tool-bearing targets
//!
//! ## Architecture
//!
//! ```text
//!                     ┌──────────────────────────────────┐
//!   ToolCallRequest → │  ToolBox (route by tool name)    │
//!                     │   ┌────────────┐ ┌────────────┐  │
//!                     │   │BoundTools<A│ │BoundTools<B│  │
//!                     │   └─────┬──────┘ └─────┬──────┘  │
//!                     │   ┌─────▼──────┐ ┌─────▼──────┐  │
//!                     │   │Registry<A> │ │Registry<B> │  │ ← RegistryCache
//!                     │   └────────────┘ └────────────┘  │
//!                     └──────────────────────────────────┘
//!                                      ↓
//!                              ToolCallResult
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod tools;
pub mod types;

// Internal utilities
pub mod observability;

pub use tools::{
    registry_for, BoundTools, Json, RegistryCache, ToolArguments, ToolBox, ToolCallRequest,
    ToolCallResult, ToolExecutor, ToolRegistry, ToolSet, ToolSetBuilder, ToolSpec,
};
pub use types::{Config, DispatchConfig, Error, ErrorKind, Result};
