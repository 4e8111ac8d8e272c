//! Registries bound to live targets, and routing across them.
//!
//! A `ToolRegistry<T>` knows how to call tools on *some* `T`; a
//! [`BoundTools<T>`] pairs it with *the* `T` the model is talking to. A
//! [`ToolBox`] routes calls by name across any number of bound targets so the
//! orchestration layer sees one flat tool namespace.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::registry::{registry_for, ToolRegistry, ToolSet};
use super::request::{ToolCallRequest, ToolCallResult};
use super::spec::{generate_prompt, ToolSpec};
use crate::types::{Error, Result};

/// Object-safe tool executor.
pub trait ToolExecutor: Send + Sync {
    /// Tools this executor answers for.
    fn specs(&self) -> Vec<ToolSpec>;

    fn execute(&self, request: &ToolCallRequest) -> ToolCallResult;
}

// =============================================================================
// BoundTools
// =============================================================================

/// A target instance together with the registry for its type.
pub struct BoundTools<T> {
    target: Arc<T>,
    registry: Arc<ToolRegistry<T>>,
}

impl<T: ToolSet> BoundTools<T> {
    /// Bind `target` using the process-wide registry cache.
    pub fn new(target: T) -> Result<Self> {
        Ok(Self::with_registry(Arc::new(target), registry_for::<T>()?))
    }
}

impl<T> BoundTools<T> {
    pub fn with_registry(target: Arc<T>, registry: Arc<ToolRegistry<T>>) -> Self {
        Self { target, registry }
    }

    pub fn target(&self) -> &Arc<T> {
        &self.target
    }

    pub fn registry(&self) -> &Arc<ToolRegistry<T>> {
        &self.registry
    }
}

impl<T: Send + Sync> ToolExecutor for BoundTools<T> {
    fn specs(&self) -> Vec<ToolSpec> {
        self.registry.specs()
    }

    fn execute(&self, request: &ToolCallRequest) -> ToolCallResult {
        self.registry.invoke(&self.target, request)
    }
}

impl<T> Clone for BoundTools<T> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T> fmt::Debug for BoundTools<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundTools")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// ToolBox
// =============================================================================

/// Routes tool calls by name across several executors.
#[derive(Default)]
pub struct ToolBox {
    executors: Vec<Arc<dyn ToolExecutor>>,
    routes: HashMap<String, usize>,
}

impl ToolBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an executor. Rejected as a whole if any of its tool names is
    /// already routed.
    pub fn add(&mut self, executor: Arc<dyn ToolExecutor>) -> Result<()> {
        let specs = executor.specs();

        let mut incoming: Vec<&str> = Vec::with_capacity(specs.len());
        for spec in &specs {
            if self.routes.contains_key(&spec.name) || incoming.contains(&spec.name.as_str()) {
                return Err(Error::ambiguous_tool(spec.name.clone()));
            }
            incoming.push(&spec.name);
        }

        let index = self.executors.len();
        for name in incoming {
            self.routes.insert(name.to_string(), index);
        }
        self.executors.push(executor);

        tracing::debug!("Added executor #{} with {} tools", index, specs.len());
        Ok(())
    }

    /// Bind `target` through the global registry cache and add it.
    pub fn add_target<T: ToolSet>(&mut self, target: T) -> Result<()> {
        self.add(Arc::new(BoundTools::new(target)?))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn execute(&self, request: &ToolCallRequest) -> ToolCallResult {
        match self.routes.get(request.name()) {
            Some(&index) => self.executors[index].execute(request),
            None => {
                tracing::warn!("No executor routes tool {}", request.name());
                ToolCallResult::failure(request, Error::tool_not_found(request.name()))
            }
        }
    }

    /// Execute each request independently, results in request order.
    pub fn execute_all(&self, requests: &[ToolCallRequest]) -> Vec<ToolCallResult> {
        requests.iter().map(|r| self.execute(r)).collect()
    }

    /// Run one call on tokio's blocking pool.
    pub async fn execute_blocking(self: Arc<Self>, request: ToolCallRequest) -> ToolCallResult {
        let fallback = request.clone();
        match tokio::task::spawn_blocking(move || self.execute(&request)).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Blocking tool task for {} failed: {}", fallback.name(), e);
                ToolCallResult::failure(&fallback, Error::execution(fallback.name(), e))
            }
        }
    }

    /// All routed tools, sorted by name.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self
            .executors
            .iter()
            .flat_map(|executor| executor.specs())
            .collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    pub fn generate_prompt(&self) -> String {
        generate_prompt(&self.specs())
    }
}

impl fmt::Debug for ToolBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.routes.keys().collect();
        names.sort();
        f.debug_struct("ToolBox")
            .field("executors", &self.executors.len())
            .field("tools", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::registry::ToolSetBuilder;
    use crate::tools::request::ToolArguments;
    use crate::types::ErrorKind;
    use serde_json::json;

    struct Greeter {
        greeting: String,
    }

    impl Greeter {
        fn greet(&self, name: String) -> String {
            format!("{}, {}!", self.greeting, name)
        }
    }

    impl ToolSet for Greeter {
        fn register_tools(tools: &mut ToolSetBuilder<Self>) {
            tools.add("greet", "Greet someone", &["name"], Greeter::greet);
        }
    }

    struct Maths;

    impl Maths {
        fn double(&self, x: f64) -> f64 {
            x * 2.0
        }

        fn pi(&self) -> f64 {
            std::f64::consts::PI
        }
    }

    impl ToolSet for Maths {
        fn register_tools(tools: &mut ToolSetBuilder<Self>) {
            tools
                .add("double", "Double a number", &["x"], Maths::double)
                .add("pi", "The constant pi", &[], Maths::pi);
        }
    }

    fn toolbox() -> ToolBox {
        let mut toolbox = ToolBox::new();
        toolbox
            .add_target(Greeter {
                greeting: "Hello".into(),
            })
            .unwrap();
        toolbox.add_target(Maths).unwrap();
        toolbox
    }

    #[test]
    fn test_routes_by_name() {
        let toolbox = toolbox();
        assert_eq!(toolbox.len(), 3);

        let result = toolbox.execute(&ToolCallRequest::new("greet", json!({"name": "Ada"})));
        assert_eq!(result.value(), Some(&json!("Hello, Ada!")));

        let result = toolbox.execute(&ToolCallRequest::new("double", ToolArguments::positional([2.5])));
        assert_eq!(result.value(), Some(&json!(5.0)));

        let result = toolbox.execute(&ToolCallRequest::no_args("missing"));
        assert_eq!(result.error_kind(), Some(ErrorKind::ToolNotFound));
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let mut toolbox = toolbox();
        let err = toolbox
            .add_target(Greeter {
                greeting: "Hi".into(),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousTool);
        assert_eq!(toolbox.len(), 3);

        let result = toolbox.execute(&ToolCallRequest::new("greet", json!({"name": "Ada"})));
        assert_eq!(result.value(), Some(&json!("Hello, Ada!")));
    }

    #[test]
    fn test_execute_all_preserves_order() {
        let toolbox = toolbox();
        let requests = vec![
            ToolCallRequest::no_args("pi"),
            ToolCallRequest::no_args("nope"),
            ToolCallRequest::new("double", json!({"x": 1})),
        ];
        let results = toolbox.execute_all(&requests);
        let names: Vec<&str> = results.iter().map(|r| r.tool_name()).collect();
        assert_eq!(names, vec!["pi", "nope", "double"]);
        assert!(results[0].is_success());
        assert!(!results[1].is_success());
        assert_eq!(results[2].value(), Some(&json!(2.0)));
        for (request, result) in requests.iter().zip(&results) {
            assert_eq!(request.id(), result.call_id());
        }
    }

    #[test]
    fn test_prompt_lists_every_tool() {
        let prompt = toolbox().generate_prompt();
        assert_eq!(
            prompt,
            "Available tools:\n\
             - double(x: number): Double a number\n\
             - greet(name: string): Greet someone\n\
             - pi(): The constant pi"
        );
    }

    #[tokio::test]
    async fn test_execute_blocking() {
        let toolbox = Arc::new(toolbox());
        let result = toolbox
            .execute_blocking(ToolCallRequest::new("greet", ToolArguments::positional(["Grace"])))
            .await;
        assert_eq!(result.value(), Some(&json!("Hello, Grace!")));
    }
}
