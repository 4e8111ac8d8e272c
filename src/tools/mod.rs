//! Tool declaration, registration and dispatch.
//!
//! Tools are ordinary methods on a target type. The type lists them once in
//! [`ToolSet::register_tools`]; the registry converts each into a cached,
//! type-erased handle and resolves LLM tool calls against those handles.

mod binding;
pub mod executor;
pub mod handler;
pub mod output;
pub mod params;
pub mod registry;
pub mod request;
pub mod spec;

pub use executor::{BoundTools, ToolBox, ToolExecutor};
pub use handler::{BindFailure, Callable, ToolFn};
pub use output::{IntoToolOutput, Outcome};
pub use params::{Coercion, Json, ParamDef, ParamType, ToolArg};
pub use registry::{registry_for, RegistryCache, ToolRegistry, ToolSet, ToolSetBuilder};
pub use request::{ToolArguments, ToolCallRequest, ToolCallResult, ToolResultMessage};
pub use spec::{generate_prompt, ToolSpec};
