//! The boundary handed to the downstream agent runtime.
//!
//! The agent itself (tool selection, reasoning) is an external collaborator;
//! this module only packages what it consumes: the tool list, a system
//! prompt carrying the resource listing, and a live client to route calls
//! through. Call failures are converted to textual results so the agent can
//! react to them conversationally instead of crashing its loop.

use crate::mcp::{ActiveClient, OrchestrationResult, ResourceReader, READ_RESOURCE_TOOL};
use crate::traffic_log;
use serde_json::Value;

/// A callable tool as advertised to the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: Option<String>,
    /// JSON schema for the tool's named arguments.
    pub input_schema: Value,
}

/// Everything an agent needs from a completed orchestration.
pub struct AgentBundle {
    tools: Vec<ToolDefinition>,
    system_prompt: String,
    client: ActiveClient,
    reader: ResourceReader,
}

impl AgentBundle {
    /// Package an orchestration result for agent construction. The catalog's
    /// tools are joined by the `read_resource` facade so the agent can read
    /// resources like it calls any other tool.
    pub fn new(result: &OrchestrationResult) -> Self {
        let mut tools: Vec<ToolDefinition> = result
            .catalog
            .tools
            .iter()
            .map(|tool| ToolDefinition {
                name: tool.name.clone(),
                description: tool.description.clone(),
                input_schema: tool.input_schema.clone(),
            })
            .collect();
        tools.push(ResourceReader::tool_definition());

        let system_prompt = format!(
            "You are a helpful assistant that can use available tools to answer questions.\n\
             You have access to the following resources (use read_resource to read them):\n{}",
            result.catalog.resource_summary()
        );

        Self {
            tools,
            system_prompt,
            client: result.client.clone(),
            reader: ResourceReader::new(result.client.clone()),
        }
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn client(&self) -> &ActiveClient {
        &self.client
    }

    /// Invoke a tool by name with a JSON object of named arguments.
    ///
    /// Never fails: connection problems, unknown tools, and tool-reported
    /// errors all come back as `Error: ...` text.
    pub async fn invoke(&self, name: &str, arguments: Value) -> String {
        traffic_log::log_tool_request(name, &arguments);

        if name == READ_RESOURCE_TOOL {
            let content = match arguments.get("uri").and_then(Value::as_str) {
                Some(uri) => self.reader.read(uri).await,
                None => "Error: read_resource requires a 'uri' argument.".to_string(),
            };
            traffic_log::log_tool_response(name, &content);
            return content;
        }

        match self
            .client
            .call_tool(name, None, arguments.as_object().cloned())
            .await
        {
            Ok(text) => {
                traffic_log::log_tool_response(name, &text);
                text
            }
            Err(e) => {
                let message = format!("Error: {e:#}");
                traffic_log::log_tool_error(name, &message);
                message
            }
        }
    }
}
