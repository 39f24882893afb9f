//! Tools the model may call, and the registry that looks them up by name.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use jsonschema::{Draft, Validator};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::backend::{BackendError, TaskBackend, WeatherSource};
use crate::chat::{ChatMessage, FunctionSpec};

pub mod tasks;
pub mod weather;

/// Per-request collaborators handed to an executor.
#[derive(Clone)]
pub struct ToolContext {
    pub tasks: Arc<dyn TaskBackend>,
    pub weather: Arc<dyn WeatherSource>,
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Arguments passed the schema but still could not be read. Reported
    /// to the model like a backend failure.
    #[error("invalid arguments: {0}")]
    Arguments(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Runs one tool. Returns the text of the system message that reports the
/// outcome to the model.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(
        &self,
        ctx: &ToolContext,
        args: Value,
        conversation: &[ChatMessage],
    ) -> Result<String, ToolError>;
}

pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    pub executor: Arc<dyn ToolExecutor>,
}

impl ToolDefinition {
    pub fn function_spec(&self) -> FunctionSpec {
        FunctionSpec {
            name: self.name.to_string(),
            description: self.description.to_string(),
            parameters: self.input_schema.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("tool '{0}' is registered more than once")]
    DuplicateTool(String),
    #[error("tool '{tool}' has an invalid parameter schema: {reason}")]
    InvalidSchema { tool: String, reason: String },
}

pub struct RegisteredTool {
    pub definition: ToolDefinition,
    validator: Validator,
}

impl RegisteredTool {
    /// Schema violations as readable messages; empty when `args` is valid.
    pub fn schema_errors(&self, args: &Value) -> Vec<String> {
        self.validator
            .iter_errors(args)
            .map(|err| err.to_string())
            .collect()
    }
}

/// Read-only after construction. Keeps registration order for advertising.
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    by_name: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    pub fn new(definitions: Vec<ToolDefinition>) -> Result<Self, RegistryError> {
        let mut tools = Vec::with_capacity(definitions.len());
        let mut by_name = HashMap::with_capacity(definitions.len());

        for definition in definitions {
            if by_name.contains_key(definition.name) {
                return Err(RegistryError::DuplicateTool(definition.name.to_string()));
            }
            let validator = jsonschema::options()
                .with_draft(Draft::Draft202012)
                .build(&definition.input_schema)
                .map_err(|err| RegistryError::InvalidSchema {
                    tool: definition.name.to_string(),
                    reason: err.to_string(),
                })?;
            by_name.insert(definition.name, tools.len());
            tools.push(RegisteredTool {
                definition,
                validator,
            });
        }

        Ok(Self { tools, by_name })
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.by_name.get(name).map(|&i| &self.tools[i])
    }

    pub fn definitions(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.iter().map(|t| &t.definition)
    }

    pub fn function_specs(&self) -> Vec<FunctionSpec> {
        self.definitions().map(ToolDefinition::function_spec).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

/// The task and weather tools the agent offers.
pub fn default_registry() -> Result<ToolRegistry, RegistryError> {
    ToolRegistry::new(vec![
        tasks::list_tasks(),
        tasks::get_task(),
        tasks::add_task(),
        tasks::update_task(),
        tasks::delete_task(),
        weather::get_weather(),
    ])
}

/// Deserialize already schema-checked arguments into a typed struct.
pub(crate) fn typed_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::Arguments(e.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct Echo;

    #[async_trait]
    impl ToolExecutor for Echo {
        async fn execute(
            &self,
            _ctx: &ToolContext,
            args: Value,
            _conversation: &[ChatMessage],
        ) -> Result<String, ToolError> {
            Ok(args.to_string())
        }
    }

    fn echo_tool(name: &'static str, schema: Value) -> ToolDefinition {
        ToolDefinition {
            name,
            description: "echo",
            input_schema: schema,
            executor: Arc::new(Echo),
        }
    }

    #[test]
    fn default_registry_offers_six_tools_in_order() {
        let registry = default_registry().expect("built-in tools are valid");
        let names: Vec<&str> = registry.definitions().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec!["list_tasks", "get_task", "add_task", "update_task", "delete_task", "get_weather"]
        );
        assert!(registry.get("add_task").is_some());
        assert!(registry.get("launch_rocket").is_none());
    }

    #[test]
    fn every_built_in_schema_is_an_object_schema() {
        let registry = default_registry().expect("built-in tools are valid");
        for spec in registry.function_specs() {
            assert_eq!(spec.parameters["type"], "object", "{}", spec.name);
            assert!(!spec.description.is_empty());
        }
    }

    #[test]
    fn duplicate_names_are_refused() {
        let result = ToolRegistry::new(vec![
            echo_tool("echo", json!({"type": "object"})),
            echo_tool("echo", json!({"type": "object"})),
        ]);
        assert_eq!(
            result.err(),
            Some(RegistryError::DuplicateTool("echo".to_string()))
        );
    }

    #[test]
    fn invalid_schema_is_refused() {
        let result = ToolRegistry::new(vec![echo_tool("echo", json!({"type": 12}))]);
        assert!(matches!(
            result.err(),
            Some(RegistryError::InvalidSchema { ref tool, .. }) if tool == "echo"
        ));
    }

    #[test]
    fn schema_errors_name_the_problem() {
        let registry = default_registry().expect("built-in tools are valid");
        let add = registry.get("add_task").expect("add_task is registered");
        assert!(add.schema_errors(&json!({"title": "Buy milk"})).is_empty());
        assert!(!add.schema_errors(&json!({"description": "no title"})).is_empty());
        assert!(!add.schema_errors(&json!({"title": 7})).is_empty());
    }
}
