//! Tool descriptions: typed metadata and prompt generation.
//!
//! A `ToolSpec` is what gets advertised to the model: name, description and
//! declared parameters. It is derived from the registered function signature,
//! so it cannot drift from what the dispatcher actually binds.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::params::ParamDef;

/// Complete tool description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamDef>,
}

impl ToolSpec {
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// Generate a prompt line for this tool.
    ///
    /// Format: `- tool_name(param1: type, param2?: type): description`
    pub fn to_prompt_line(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| {
                let optional = if p.is_required() { "" } else { "?" };
                format!("{}{}: {}", p.name, optional, p.param_type.display_name())
            })
            .collect();

        format!("- {}({}): {}", self.name, params.join(", "), self.description)
    }

    /// JSON-schema object for the parameters, in the shape chat-completion
    /// APIs expect for function definitions.
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in &self.parameters {
            properties.insert(param.name.clone(), param.param_type.json_schema());
            if param.is_required() {
                required.push(Value::String(param.name.clone()));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Generate a formatted tool section for LLM consumption.
pub fn generate_prompt<'a>(specs: impl IntoIterator<Item = &'a ToolSpec>) -> String {
    let lines: Vec<String> = specs.into_iter().map(ToolSpec::to_prompt_line).collect();
    if lines.is_empty() {
        return String::new();
    }
    format!("Available tools:\n{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::params::ParamType;

    fn sample_spec() -> ToolSpec {
        ToolSpec {
            name: "search_web".to_string(),
            description: "Search the web for information".to_string(),
            parameters: vec![
                ParamDef {
                    name: "query".to_string(),
                    param_type: ParamType::String,
                },
                ParamDef {
                    name: "max_results".to_string(),
                    param_type: ParamType::Optional(Box::new(ParamType::Int)),
                },
            ],
        }
    }

    #[test]
    fn test_prompt_line_format() {
        assert_eq!(
            sample_spec().to_prompt_line(),
            "- search_web(query: string, max_results?: integer): Search the web for information"
        );
    }

    #[test]
    fn test_parameters_schema() {
        let schema = sample_spec().parameters_schema();
        assert_eq!(
            schema,
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "max_results": {"type": "integer"},
                },
                "required": ["query"],
            })
        );
    }

    #[test]
    fn test_generate_prompt() {
        let specs = vec![sample_spec()];
        let prompt = generate_prompt(&specs);
        assert!(prompt.starts_with("Available tools:\n- search_web("));
        assert!(generate_prompt(&Vec::<ToolSpec>::new()).is_empty());
    }
}
