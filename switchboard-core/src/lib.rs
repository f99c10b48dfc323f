//! Core orchestration for the switchboard tool-server layer
//!
//! This crate provides:
//! - **Registry**: `RegistryConfig`, `ServerEntry`: a declarative, ordered
//!   registry of tool servers and how to reach each one
//! - **Transports**: `RmcpConnector`, `ToolServer` over subprocess-stdio and
//!   streamable-HTTP MCP servers
//! - **Discovery**: per-server `discover` with resource-shape normalization,
//!   `aggregate` merging every server's catalog with partial-failure
//!   bookkeeping
//! - **Orchestration**: `Orchestrator` for bounded retry over the full
//!   registry, then degradation to the declared fallback subset
//! - **Agent boundary**: `AgentBundle`, `ResourceReader`: the tool list,
//!   system prompt, and call routing handed to a downstream agent
//!
//! # Example
//!
//! ```ignore
//! use switchboard_core::mcp::{Orchestrator, RegistryConfig, RmcpConnector};
//!
//! let registry = RegistryConfig::load()?;
//! let connector = RmcpConnector::new(Duration::from_secs(registry.call_timeout_secs));
//! let mut orchestrator = Orchestrator::new(connector, registry);
//! let result = orchestrator.initialize().await?;
//! let bundle = AgentBundle::new(&result);
//! ```
pub mod agent;
pub mod mcp;
pub mod traffic_log;

pub use agent::{AgentBundle, ToolDefinition};
pub use mcp::{
    ActiveClient, Catalog, OrchestrationResult, Orchestrator, OrchestratorState, RegistryConfig,
    ResourceReader, RmcpConnector, ServerEntry, TransportConfig,
};
