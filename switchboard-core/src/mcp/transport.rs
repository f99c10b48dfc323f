//! Transport connectors for tool servers.
//!
//! Two kinds of server are supported: a subprocess spoken to over its
//! standard streams, and a streamable-HTTP endpoint. Both are exposed
//! through the uniform [`ToolServer`] call surface; [`Connect`] is the seam
//! that lets discovery run against mock servers in tests.

use crate::mcp::config::{ServerEntry, TransportConfig};
use crate::mcp::discovery::ToolSpec;
use anyhow::Result;
use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParam, RawContent, ReadResourceRequestParam, ResourceContents},
    service::RunningService,
    transport::{
        streamable_http_client::StreamableHttpClientTransport, ConfigureCommandExt,
        TokioChildProcess,
    },
    RoleClient, ServiceExt,
};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// Uniform call surface over one connected tool server.
#[async_trait]
pub trait ToolServer: Send + Sync {
    /// List the tools this server offers.
    async fn list_tools(&self) -> Result<Vec<ToolSpec>>;

    /// List this server's resources as raw entries. Shapes vary between
    /// servers; `discovery::resource_uri` normalizes them.
    async fn list_resources(&self) -> Result<Vec<Value>>;

    /// Invoke a tool by name, returning its textual result.
    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<serde_json::Map<String, Value>>,
    ) -> Result<String>;

    /// Read a resource's content by URI.
    async fn read_resource(&self, uri: &str) -> Result<String>;

    /// Close the connection, terminating any owned subprocess.
    async fn shutdown(self: Box<Self>) -> Result<()>;
}

/// Opens a connection to a registered server.
#[async_trait]
pub trait Connect: Send + Sync {
    async fn connect(&self, entry: &ServerEntry) -> Result<Box<dyn ToolServer>>;
}

/// Production connector backed by the rmcp client.
pub struct RmcpConnector {
    call_timeout: Duration,
}

impl RmcpConnector {
    pub fn new(call_timeout: Duration) -> Self {
        Self { call_timeout }
    }
}

#[async_trait]
impl Connect for RmcpConnector {
    async fn connect(&self, entry: &ServerEntry) -> Result<Box<dyn ToolServer>> {
        let service = match &entry.transport {
            TransportConfig::Stdio { command, args, cwd } => {
                // The child is owned by the transport: it is killed when the
                // service is cancelled or dropped, so cleanup happens exactly
                // once on every exit path.
                let transport = TokioChildProcess::new(
                    tokio::process::Command::new(command).configure(|cmd| {
                        cmd.args(args).stderr(std::process::Stdio::inherit());
                        if let Some(dir) = cwd {
                            cmd.current_dir(dir);
                        }
                    }),
                )?;
                bounded(self.call_timeout, "handshake", ().serve(transport)).await?
            }
            TransportConfig::StreamableHttp { url } => {
                // The transport reconnects on demand; a single underlying
                // connection is not assumed to survive the whole session.
                let transport = StreamableHttpClientTransport::from_uri(url.as_str());
                bounded(self.call_timeout, "handshake", ().serve(transport)).await?
            }
        };

        Ok(Box::new(ConnectedServer {
            service,
            call_timeout: self.call_timeout,
        }))
    }
}

/// A live rmcp connection to one server.
pub struct ConnectedServer {
    service: RunningService<RoleClient, ()>,
    call_timeout: Duration,
}

#[async_trait]
impl ToolServer for ConnectedServer {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>> {
        let result = bounded(
            self.call_timeout,
            "list tools",
            self.service.list_tools(Default::default()),
        )
        .await?;

        Ok(result
            .tools
            .iter()
            .map(|tool| ToolSpec {
                name: tool.name.to_string(),
                description: tool.description.as_ref().map(|d| d.to_string()),
                input_schema: serde_json::to_value(&*tool.input_schema)
                    .unwrap_or_else(|_| Value::Object(Default::default())),
            })
            .collect())
    }

    async fn list_resources(&self) -> Result<Vec<Value>> {
        let result = bounded(
            self.call_timeout,
            "list resources",
            self.service.list_resources(Default::default()),
        )
        .await?;

        result
            .resources
            .iter()
            .map(|resource| Ok(serde_json::to_value(resource)?))
            .collect()
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<serde_json::Map<String, Value>>,
    ) -> Result<String> {
        let result = bounded(
            self.call_timeout,
            "call tool",
            self.service.call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments,
            }),
        )
        .await?;

        let text = result
            .content
            .iter()
            .filter_map(|content| match &content.raw {
                RawContent::Text(text) => Some(text.text.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if result.is_error.unwrap_or(false) {
            anyhow::bail!("Tool '{}' reported an error: {}", name, text);
        }
        Ok(text)
    }

    async fn read_resource(&self, uri: &str) -> Result<String> {
        let result = bounded(
            self.call_timeout,
            "read resource",
            self.service.read_resource(ReadResourceRequestParam {
                uri: uri.to_string(),
            }),
        )
        .await?;

        let parts: Vec<String> = result
            .contents
            .into_iter()
            .map(|contents| match contents {
                ResourceContents::TextResourceContents { text, .. } => text,
                ResourceContents::BlobResourceContents {
                    blob, mime_type, ..
                } => format!(
                    "[binary resource: {}, {} base64 bytes]",
                    mime_type.as_deref().unwrap_or("application/octet-stream"),
                    blob.len()
                ),
            })
            .collect();

        Ok(parts.join("\n"))
    }

    async fn shutdown(self: Box<Self>) -> Result<()> {
        self.service.cancel().await?;
        Ok(())
    }
}

/// Bound a transport call with the configured timeout. Exceeding it is
/// treated like any other per-server failure.
async fn bounded<T, E>(
    timeout: Duration,
    what: &str,
    fut: impl Future<Output = Result<T, E>>,
) -> Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => anyhow::bail!("{} timed out after {:?}", what, timeout),
    }
}
