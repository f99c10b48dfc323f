//! Per-server discovery and the shared catalog data model.

use crate::mcp::config::ServerEntry;
use crate::mcp::transport::{Connect, ToolServer};
use serde_json::Value;

/// A tool as listed by one server, before it is attributed to an origin.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    /// JSON schema for the tool's arguments, as published by the server.
    pub input_schema: Value,
}

/// A tool in the aggregated catalog, attributed to the server that offers it.
///
/// Names are not unique across servers; `server` disambiguates.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInfo {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
    /// Registry name of the originating server.
    pub server: String,
}

/// A readable resource in the aggregated catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceInfo {
    /// Scheme-qualified opaque identifier, e.g. `weather://alerts`.
    pub uri: String,
    /// Registry name of the originating server.
    pub server: String,
}

/// The merged view of everything the connected servers offer.
///
/// Entries appear in registry declaration order, server by server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub tools: Vec<ToolInfo>,
    pub resources: Vec<ResourceInfo>,
}

impl Catalog {
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.resources.is_empty()
    }

    /// Newline-joined listing of resource URIs, one per resource, for use in
    /// an agent's instructions.
    pub fn resource_summary(&self) -> String {
        self.resources
            .iter()
            .map(|r| format!("- {}", r.uri))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Result of one server's discovery pass. A failure here is scoped to that
/// server alone and never aborts its siblings.
pub enum DiscoveryOutcome {
    Success {
        server: Box<dyn ToolServer>,
        tools: Vec<ToolInfo>,
        resources: Vec<ResourceInfo>,
    },
    Failure {
        error: String,
    },
}

/// Extract a resource URI from a raw listing entry.
///
/// Servers publish resource identity in one of two shapes: nested under a
/// `metadata` mapping, or as a top-level `uri` field. The nested form takes
/// priority. `None` means the entry carries neither.
pub fn resource_uri(raw: &Value) -> Option<String> {
    if let Some(uri) = raw
        .get("metadata")
        .and_then(|m| m.get("uri"))
        .and_then(Value::as_str)
    {
        return Some(uri.to_string());
    }
    raw.get("uri").and_then(Value::as_str).map(str::to_string)
}

/// Connect to one server and list its tools and resources.
///
/// Any failure at connection establishment or at either listing call yields
/// a `Failure` for this server only. A single malformed resource entry is
/// skipped with a warning rather than failing the server.
pub async fn discover(connector: &dyn Connect, entry: &ServerEntry) -> DiscoveryOutcome {
    let server = match connector.connect(entry).await {
        Ok(server) => server,
        Err(e) => {
            return DiscoveryOutcome::Failure {
                error: format!("connect: {e:#}"),
            };
        }
    };

    let tool_specs = match server.list_tools().await {
        Ok(specs) => specs,
        Err(e) => {
            return DiscoveryOutcome::Failure {
                error: format!("list tools: {e:#}"),
            };
        }
    };

    let raw_resources = match server.list_resources().await {
        Ok(raw) => raw,
        Err(e) => {
            return DiscoveryOutcome::Failure {
                error: format!("list resources: {e:#}"),
            };
        }
    };

    let tools = tool_specs
        .into_iter()
        .map(|spec| ToolInfo {
            name: spec.name,
            description: spec.description,
            input_schema: spec.input_schema,
            server: entry.name.clone(),
        })
        .collect();

    let mut resources = Vec::new();
    for raw in &raw_resources {
        match resource_uri(raw) {
            Some(uri) => resources.push(ResourceInfo {
                uri,
                server: entry.name.clone(),
            }),
            None => {
                tracing::warn!(
                    "Server '{}' listed a resource without a URI, skipping: {}",
                    entry.name,
                    raw
                );
            }
        }
    }

    DiscoveryOutcome::Success {
        server,
        tools,
        resources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::test_support::{MockConnector, MockServer, entry};
    use serde_json::json;

    #[test]
    fn metadata_uri_takes_priority() {
        let raw = json!({"metadata": {"uri": "weather://alerts"}, "uri": "weather://other"});
        assert_eq!(resource_uri(&raw).as_deref(), Some("weather://alerts"));
    }

    #[test]
    fn direct_uri_is_the_fallback() {
        let raw = json!({"uri": "weather://alerts", "name": "alerts"});
        assert_eq!(resource_uri(&raw).as_deref(), Some("weather://alerts"));
    }

    #[test]
    fn missing_uri_yields_none() {
        let raw = json!({"name": "alerts"});
        assert_eq!(resource_uri(&raw), None);
    }

    #[tokio::test]
    async fn both_shapes_normalize_to_the_same_resource() {
        let connector = MockConnector::new().with_server(
            "weather",
            MockServer::new()
                .with_raw_resource(json!({"metadata": {"uri": "weather://alerts"}}))
                .with_raw_resource(json!({"uri": "weather://alerts"})),
        );
        match discover(&connector, &entry("weather")).await {
            DiscoveryOutcome::Success { resources, .. } => {
                assert_eq!(resources.len(), 2);
                for resource in resources {
                    assert_eq!(resource.uri, "weather://alerts");
                    assert_eq!(resource.server, "weather");
                }
            }
            DiscoveryOutcome::Failure { error } => panic!("unexpected failure: {error}"),
        }
    }

    #[tokio::test]
    async fn malformed_resource_is_skipped_not_fatal() {
        let connector = MockConnector::new().with_server(
            "weather",
            MockServer::new()
                .with_tool("get_weather", "Get the weather of a city")
                .with_raw_resource(json!({"name": "no uri here"}))
                .with_raw_resource(json!({"uri": "weather://alerts"})),
        );
        match discover(&connector, &entry("weather")).await {
            DiscoveryOutcome::Success {
                tools, resources, ..
            } => {
                assert_eq!(tools.len(), 1);
                assert_eq!(resources.len(), 1);
                assert_eq!(resources[0].uri, "weather://alerts");
            }
            DiscoveryOutcome::Failure { error } => panic!("unexpected failure: {error}"),
        }
    }

    #[tokio::test]
    async fn unreachable_server_is_a_scoped_failure() {
        let connector = MockConnector::new();
        match discover(&connector, &entry("weather")).await {
            DiscoveryOutcome::Failure { error } => assert!(error.contains("connect")),
            DiscoveryOutcome::Success { .. } => panic!("expected failure"),
        }
    }
}
