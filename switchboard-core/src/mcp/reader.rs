//! Resource reads exposed as an ordinary callable tool.

use crate::mcp::orchestrator::ActiveClient;
use serde_json::json;

/// Name under which the reader appears in the agent's tool list.
pub const READ_RESOURCE_TOOL: &str = "read_resource";

/// On-demand resource read path handed to the agent.
///
/// The reader holds an injected handle to the orchestration result rather
/// than reaching into shared state, so separate orchestrator instances never
/// collide. Failures come back as descriptive strings: inside an agent's
/// tool-use loop a broken read should read like a tool result, not crash the
/// loop.
#[derive(Clone)]
pub struct ResourceReader {
    client: Option<ActiveClient>,
}

impl ResourceReader {
    pub fn new(client: ActiveClient) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// A reader with no live client, for wiring paths where orchestration
    /// never completed.
    pub fn disconnected() -> Self {
        Self { client: None }
    }

    /// Read a resource by URI. Never fails; errors are reported in the
    /// returned text.
    pub async fn read(&self, uri: &str) -> String {
        let Some(client) = &self.client else {
            return "Error: client not initialized.".to_string();
        };
        match client.read_resource(uri).await {
            Ok(content) => content,
            Err(e) => format!("Error reading resource: {e:#}"),
        }
    }

    /// The tool-list entry describing this reader, schema included.
    pub fn tool_definition() -> crate::agent::ToolDefinition {
        crate::agent::ToolDefinition {
            name: READ_RESOURCE_TOOL.to_string(),
            description: Some(
                "Read a resource from a connected tool server. \
                 Use this tool to read the content of a resource by URI."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "uri": { "type": "string", "description": "Resource URI to read" }
                },
                "required": ["uri"]
            }),
        }
    }
}
