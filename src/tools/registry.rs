//! Per-type tables of cached callable handles.
//!
//! A tool-bearing type implements [`ToolSet`] and declares its tools once.
//! `ToolRegistry::register` turns those declarations into two name-keyed
//! tables (zero-argument and parameterized handles); `invoke` then resolves a
//! tool call against a target instance without any per-call lookup work
//! beyond one hash map access.
//!
//! ```text
//!   ToolCallRequest ──► normalize args ──┬─ empty ──► zero_arg[name](&target)
//!                                        └─ values ─► bind ─► parameterized[name](&target, args)
//!                                                                        │
//!   ToolCallResult ◄── Ok(value) | Err(ToolNotFound | ArgumentBinding | Execution)
//! ```

use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::Instant;

use super::binding::{self, Payload};
use super::handler::{Callable, ParamCall, ToolFn, ZeroArgCall};
use super::params::{Coercion, ParamDef};
use super::request::{ToolArguments, ToolCallRequest, ToolCallResult};
use super::spec::ToolSpec;
use crate::types::{DispatchConfig, Error, Result, ToolName, ToolPanic};

// =============================================================================
// Declaration
// =============================================================================

/// A type exposing named tools to the model.
///
/// ```ignore
/// impl ToolSet for Calculator {
///     fn register_tools(tools: &mut ToolSetBuilder<Self>) {
///         tools
///             .add("add", "Add two integers", &["a", "b"], Calculator::add)
///             .add("reset", "Reset the accumulator", &[], Calculator::reset);
///     }
/// }
/// ```
pub trait ToolSet: Send + Sync + Sized + 'static {
    fn register_tools(tools: &mut ToolSetBuilder<Self>);
}

/// Collects tool declarations for one target type.
pub struct ToolSetBuilder<T> {
    entries: Vec<(ToolSpec, Callable<T>)>,
    errors: Vec<Error>,
}

impl<T: 'static> ToolSetBuilder<T> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Declare a tool. `param_names` must name every parameter of `f` after
    /// the target reference, in order.
    ///
    /// Problems are recorded and reported by `ToolRegistry::register`.
    pub fn add<Args, F>(
        &mut self,
        name: &str,
        description: &str,
        param_names: &[&str],
        f: F,
    ) -> &mut Self
    where
        F: ToolFn<T, Args>,
    {
        match describe::<T, Args, F>(name, description, param_names) {
            Ok(spec) => self.entries.push((spec, f.into_callable())),
            Err(e) => self.errors.push(e),
        }
        self
    }

    fn build(self, config: DispatchConfig) -> Result<ToolRegistry<T>> {
        let type_name = std::any::type_name::<T>();

        if let Some(first) = self.errors.into_iter().next() {
            return Err(first);
        }
        if self.entries.is_empty() {
            return Err(Error::registration(format!("{} declares no tools", type_name)));
        }

        let mut seen = HashSet::with_capacity(self.entries.len());
        let mut zero_arg = HashMap::new();
        let mut parameterized = HashMap::new();

        for (spec, callable) in self.entries {
            if !seen.insert(spec.name.clone()) {
                return Err(Error::ambiguous_tool(spec.name));
            }
            tracing::debug!("Registered tool {}::{} (arity {})", type_name, spec.name, spec.arity());
            match callable {
                Callable::ZeroArg(call) => {
                    zero_arg.insert(spec.name.clone(), ZeroArgEntry { spec, call });
                }
                Callable::Parameterized(call) => {
                    parameterized.insert(spec.name.clone(), ParamEntry { spec, call });
                }
            }
        }

        tracing::info!(
            "Built tool registry for {}: {} zero-argument, {} parameterized",
            type_name,
            zero_arg.len(),
            parameterized.len()
        );

        Ok(ToolRegistry {
            type_name,
            zero_arg,
            parameterized,
            coercion: Coercion::from(&config),
            config,
        })
    }
}

impl<T> fmt::Debug for ToolSetBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSetBuilder")
            .field("tools", &self.entries.iter().map(|(s, _)| &s.name).collect::<Vec<_>>())
            .field("errors", &self.errors.len())
            .finish()
    }
}

fn describe<T, Args, F: ToolFn<T, Args>>(
    name: &str,
    description: &str,
    param_names: &[&str],
) -> Result<ToolSpec> {
    let name = ToolName::parse(name).map_err(Error::registration)?;
    let param_types = F::param_types();

    if param_names.len() != param_types.len() {
        return Err(Error::registration(format!(
            "tool '{}' names {} parameters but its function takes {}",
            name,
            param_names.len(),
            param_types.len()
        )));
    }

    let mut seen = HashSet::new();
    for param in param_names {
        if param.trim().is_empty() {
            return Err(Error::registration(format!(
                "tool '{}' has an empty parameter name",
                name
            )));
        }
        if !seen.insert(*param) {
            return Err(Error::registration(format!(
                "tool '{}' declares parameter '{}' twice",
                name, param
            )));
        }
    }

    Ok(ToolSpec {
        name: name.into(),
        description: description.to_string(),
        parameters: param_names
            .iter()
            .zip(param_types)
            .map(|(name, param_type)| ParamDef {
                name: name.to_string(),
                param_type,
            })
            .collect(),
    })
}

// =============================================================================
// Registry
// =============================================================================

struct ZeroArgEntry<T> {
    spec: ToolSpec,
    call: ZeroArgCall<T>,
}

struct ParamEntry<T> {
    spec: ToolSpec,
    call: ParamCall<T>,
}

/// Immutable dispatch tables for one target type.
pub struct ToolRegistry<T> {
    type_name: &'static str,
    zero_arg: HashMap<String, ZeroArgEntry<T>>,
    parameterized: HashMap<String, ParamEntry<T>>,
    coercion: Coercion,
    config: DispatchConfig,
}

impl<T: ToolSet> ToolRegistry<T> {
    /// Build the registry for `T` with default settings.
    pub fn register() -> Result<Self> {
        Self::register_with(DispatchConfig::default())
    }

    /// Build the registry for `T`. The first invalid or ambiguous declaration
    /// aborts the build.
    pub fn register_with(config: DispatchConfig) -> Result<Self> {
        let mut builder = ToolSetBuilder::new();
        T::register_tools(&mut builder);
        builder.build(config).map_err(|e| {
            tracing::error!("Tool registration failed for {}: {}", std::any::type_name::<T>(), e);
            e
        })
    }
}

impl<T> ToolRegistry<T> {
    /// Execute one tool call against `target`. Never panics: every failure,
    /// including a panic inside the tool, is returned in the result.
    pub fn invoke(&self, target: &T, request: &ToolCallRequest) -> ToolCallResult {
        let started = Instant::now();
        let outcome = self.dispatch(target, request);
        let elapsed = started.elapsed();

        match &outcome {
            Ok(_) => tracing::debug!(
                tool = request.name(),
                call_id = %request.id(),
                elapsed_us = elapsed.as_micros() as u64,
                "Tool call succeeded"
            ),
            Err(e) => tracing::warn!(
                tool = request.name(),
                call_id = %request.id(),
                kind = ?e.kind(),
                "Tool call failed: {}",
                e
            ),
        }
        if elapsed > self.config.slow_call_threshold {
            tracing::warn!(
                "Slow tool call {}::{} took {:?} (threshold {:?})",
                self.type_name,
                request.name(),
                elapsed,
                self.config.slow_call_threshold
            );
        }

        match outcome {
            Ok(value) => ToolCallResult::success(request, value),
            Err(e) => ToolCallResult::failure(request, e),
        }
    }

    /// Convenience wrapper building the request in place.
    pub fn call(
        &self,
        target: &T,
        name: &str,
        arguments: impl Into<ToolArguments>,
    ) -> ToolCallResult {
        self.invoke(target, &ToolCallRequest::new(name, arguments))
    }

    fn dispatch(&self, target: &T, request: &ToolCallRequest) -> Result<Value> {
        let name = request.name();

        let payload = match binding::normalize(
            request.arguments(),
            self.config.max_raw_argument_bytes,
        ) {
            Ok(payload) => payload,
            Err(message) if self.parameterized.contains_key(name) => {
                return Err(Error::argument_binding(name, message));
            }
            Err(_) => return Err(self.not_found(name)),
        };

        if let Payload::Empty = payload {
            let entry = self.zero_arg.get(name).ok_or_else(|| self.not_found(name))?;
            let outcome = catch_panic(name, || (entry.call)(target))?;
            return outcome.map_err(|source| Error::Execution {
                tool: name.to_string(),
                source,
            });
        }

        let entry = self
            .parameterized
            .get(name)
            .ok_or_else(|| self.not_found(name))?;
        let params = &entry.spec.parameters;
        let values = binding::bind(payload, params, self.config.allow_unknown_arguments)
            .map_err(|message| Error::argument_binding(name, message))?;

        let bound = catch_panic(name, || (entry.call)(target, &values, self.coercion))?;
        let outcome = bound.map_err(|failure| {
            let param = params
                .get(failure.index)
                .map(|p| p.name.as_str())
                .unwrap_or("?");
            Error::argument_binding(name, format!("parameter '{}': {}", param, failure.message))
        })?;
        outcome.map_err(|source| Error::Execution {
            tool: name.to_string(),
            source,
        })
    }

    fn not_found(&self, name: &str) -> Error {
        if self.zero_arg.contains_key(name) {
            tracing::debug!("Tool {} takes no arguments but arguments were supplied", name);
        } else if self.parameterized.contains_key(name) {
            tracing::debug!("Tool {} requires arguments but none were supplied", name);
        }
        Error::tool_not_found(name)
    }

    /// Descriptions of every tool, sorted by name.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self
            .zero_arg
            .values()
            .map(|e| e.spec.clone())
            .chain(self.parameterized.values().map(|e| e.spec.clone()))
            .collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    pub fn spec(&self, name: &str) -> Option<&ToolSpec> {
        self.zero_arg
            .get(name)
            .map(|e| &e.spec)
            .or_else(|| self.parameterized.get(name).map(|e| &e.spec))
    }

    /// List all tool names, sorted.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .zero_arg
            .keys()
            .chain(self.parameterized.keys())
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn has_zero_arg_tool(&self, name: &str) -> bool {
        self.zero_arg.contains_key(name)
    }

    pub fn has_parameterized_tool(&self, name: &str) -> bool {
        self.parameterized.contains_key(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.has_zero_arg_tool(name) || self.has_parameterized_tool(name)
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.zero_arg.len() + self.parameterized.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> fmt::Debug for ToolRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut zero: Vec<&String> = self.zero_arg.keys().collect();
        let mut param: Vec<&String> = self.parameterized.keys().collect();
        zero.sort();
        param.sort();
        f.debug_struct("ToolRegistry")
            .field("type_name", &self.type_name)
            .field("zero_arg", &zero)
            .field("parameterized", &param)
            .finish()
    }
}

fn catch_panic<R>(tool: &str, f: impl FnOnce() -> R) -> Result<R> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let cause = ToolPanic::from_payload(payload);
        tracing::error!("panic_recovered: tool={}, panic={}", tool, cause.message());
        Error::execution(tool, cause)
    })
}

// =============================================================================
// Cache
// =============================================================================

/// At most one registry per target type.
///
/// Registries are built outside the lock; if two threads race on the first
/// build, the first insert wins and the other copy is dropped, so every caller
/// ends up sharing the same `Arc`. Failed builds are not cached.
#[derive(Debug, Default)]
pub struct RegistryCache {
    config: DispatchConfig,
    registries: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl RegistryCache {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            registries: RwLock::new(HashMap::new()),
        }
    }

    /// Process-wide cache using default settings.
    pub fn global() -> &'static RegistryCache {
        static GLOBAL: OnceLock<RegistryCache> = OnceLock::new();
        GLOBAL.get_or_init(RegistryCache::default)
    }

    pub fn get_or_register<T: ToolSet>(&self) -> Result<Arc<ToolRegistry<T>>> {
        if let Some(registry) = self.get::<T>() {
            return Ok(registry);
        }

        let built: Arc<ToolRegistry<T>> = Arc::new(ToolRegistry::register_with(self.config.clone())?);

        let stored = {
            let mut registries = self.registries.write().unwrap_or_else(PoisonError::into_inner);
            registries
                .entry(TypeId::of::<T>())
                .or_insert_with(|| built as Arc<dyn Any + Send + Sync>)
                .clone()
        };
        downcast::<T>(stored)
    }

    /// Registry for `T` if one was already built.
    pub fn get<T: ToolSet>(&self) -> Option<Arc<ToolRegistry<T>>> {
        let stored = self
            .registries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<T>())
            .cloned()?;
        downcast::<T>(stored).ok()
    }

    pub fn len(&self) -> usize {
        self.registries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn downcast<T: ToolSet>(stored: Arc<dyn Any + Send + Sync>) -> Result<Arc<ToolRegistry<T>>> {
    stored.downcast::<ToolRegistry<T>>().map_err(|_| {
        Error::registration(format!(
            "cached registry has unexpected type for {}",
            std::any::type_name::<T>()
        ))
    })
}

/// Shared registry for `T` from the process-wide cache.
pub fn registry_for<T: ToolSet>() -> Result<Arc<ToolRegistry<T>>> {
    RegistryCache::global().get_or_register::<T>()
}

// =============================================================================
// Tests
// =============================================================================
