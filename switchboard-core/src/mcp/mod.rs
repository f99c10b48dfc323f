//! MCP (Model Context Protocol) orchestration over multiple tool servers
//!
//! The pieces compose leaf-first: a [`Connect`] transport opens one server,
//! [`discover`](discovery::discover) lists its catalog, [`aggregate`] merges
//! every server's catalog while tolerating partial failure, and the
//! [`Orchestrator`] wraps the whole attempt in bounded retry with
//! degradation to a declared fallback subset.

mod aggregate;
mod config;
mod discovery;
mod orchestrator;
mod reader;
#[cfg(test)]
pub(crate) mod test_support;
mod transport;

pub use aggregate::{aggregate, AggregateOutcome};
pub use config::{RegistryConfig, ServerEntry, TransportConfig, DEFAULT_CALL_TIMEOUT_SECS};
pub use discovery::{
    discover, resource_uri, Catalog, DiscoveryOutcome, ResourceInfo, ToolInfo, ToolSpec,
};
pub use orchestrator::{
    ActiveClient, OrchestrationResult, Orchestrator, OrchestratorState, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_RETRY_DELAY,
};
pub use reader::{ResourceReader, READ_RESOURCE_TOOL};
pub use transport::{Connect, ConnectedServer, RmcpConnector, ToolServer};
