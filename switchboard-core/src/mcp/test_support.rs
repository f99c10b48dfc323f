//! Mock connectors and servers shared by the mcp module tests.

use crate::mcp::config::{ServerEntry, TransportConfig};
use crate::mcp::discovery::ToolSpec;
use crate::mcp::transport::{Connect, ToolServer};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

/// Declarative description of a fake server's catalog and behavior.
#[derive(Clone, Default)]
pub struct MockServer {
    tools: Vec<(String, String)>,
    raw_resources: Vec<Value>,
    responses: HashMap<String, String>,
    contents: HashMap<String, String>,
    always_fail: Option<String>,
    fail_first: u32,
}

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, name: &str, description: &str) -> Self {
        self.tools.push((name.to_string(), description.to_string()));
        self
    }

    /// Add a resource listed in the direct `{ "uri": ... }` shape, readable
    /// with placeholder content.
    pub fn with_resource(mut self, uri: &str) -> Self {
        self.raw_resources.push(json!({ "uri": uri }));
        self.contents
            .insert(uri.to_string(), format!("content of {uri}"));
        self
    }

    /// Add a raw resource listing entry verbatim, without readable content.
    pub fn with_raw_resource(mut self, raw: Value) -> Self {
        self.raw_resources.push(raw);
        self
    }

    pub fn with_response(mut self, tool: &str, result: &str) -> Self {
        self.responses.insert(tool.to_string(), result.to_string());
        self
    }

    pub fn with_content(mut self, uri: &str, content: &str) -> Self {
        self.contents.insert(uri.to_string(), content.to_string());
        self
    }

    pub fn failing(mut self, error: &str) -> Self {
        self.always_fail = Some(error.to_string());
        self
    }

    /// Fail the first `n` connection attempts, then succeed.
    pub fn fail_first(mut self, n: u32) -> Self {
        self.fail_first = n;
        self
    }
}

/// A [`Connect`] implementation serving [`MockServer`] descriptions and
/// counting connection attempts per server.
#[derive(Default)]
pub struct MockConnector {
    servers: HashMap<String, MockServer>,
    attempts: Mutex<HashMap<String, u32>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server(mut self, name: &str, server: MockServer) -> Self {
        self.servers.insert(name.to_string(), server);
        self
    }

    pub fn with_failing_server(self, name: &str, error: &str) -> Self {
        self.with_server(name, MockServer::new().failing(error))
    }

    /// How many times `connect` has been attempted against `name`.
    pub fn attempts(&self, name: &str) -> u32 {
        *self.attempts.lock().unwrap().get(name).unwrap_or(&0)
    }
}

#[async_trait]
impl Connect for MockConnector {
    async fn connect(&self, entry: &ServerEntry) -> Result<Box<dyn ToolServer>> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let counter = attempts.entry(entry.name.clone()).or_insert(0);
            *counter += 1;
            *counter
        };

        let Some(spec) = self.servers.get(&entry.name) else {
            anyhow::bail!("connect: unknown server '{}'", entry.name);
        };
        if let Some(error) = &spec.always_fail {
            anyhow::bail!("connect: {error}");
        }
        if attempt <= spec.fail_first {
            anyhow::bail!("connect: transient failure on attempt {attempt}");
        }

        Ok(Box::new(MockToolServer { spec: spec.clone() }))
    }
}

struct MockToolServer {
    spec: MockServer,
}

#[async_trait]
impl ToolServer for MockToolServer {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>> {
        Ok(self
            .spec
            .tools
            .iter()
            .map(|(name, description)| ToolSpec {
                name: name.clone(),
                description: Some(description.clone()),
                input_schema: json!({ "type": "object", "properties": {} }),
            })
            .collect())
    }

    async fn list_resources(&self) -> Result<Vec<Value>> {
        Ok(self.spec.raw_resources.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        _arguments: Option<serde_json::Map<String, Value>>,
    ) -> Result<String> {
        self.spec
            .responses
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Tool '{name}' has no canned response"))
    }

    async fn read_resource(&self, uri: &str) -> Result<String> {
        self.spec
            .contents
            .get(uri)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Resource '{uri}' not found"))
    }

    async fn shutdown(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// A stdio-transport registry entry for tests that only need a name.
pub fn entry(name: &str) -> ServerEntry {
    ServerEntry {
        name: name.to_string(),
        transport: TransportConfig::Stdio {
            command: "python".to_string(),
            args: vec![format!("{name}.py")],
            cwd: None,
        },
        fallback: false,
    }
}

pub fn entries(names: &[&str]) -> Vec<ServerEntry> {
    names.iter().map(|name| entry(name)).collect()
}
