//! Retry and degradation orchestration for full-registry discovery.
//!
//! Discovery is driven as an explicit state machine:
//!
//! ```text
//! Idle -> Attempting -> (Succeeded | Degrading | Failed)
//! ```
//!
//! Each attempt re-discovers the whole registry. A previously failed server
//! may have come back and a previously reachable one may have dropped, so
//! nothing from an abandoned attempt is carried forward. When the retry
//! budget is exhausted, one pass runs against the declared fallback subset;
//! only if that also fails does initialization fail outright.

use crate::mcp::aggregate::{aggregate, AggregateOutcome};
use crate::mcp::config::RegistryConfig;
use crate::mcp::discovery::Catalog;
use crate::mcp::transport::{Connect, ToolServer};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Bounded attempt count for full-registry discovery.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Fixed delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Observable orchestration state.
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorState {
    /// No initialization requested yet.
    Idle,
    /// A full-registry discovery pass is in flight.
    Attempting { attempt: u32 },
    /// Terminal: a usable catalog exists.
    Succeeded { degraded: bool },
    /// The retry budget is exhausted; the fallback subset is being tried.
    Degrading,
    /// Terminal: no usable catalog could be established.
    Failed,
}

/// The single owner of all live server connections after orchestration.
///
/// Cloneable handle; the agent's tool-invocation path and the resource
/// reader both route through it. `shutdown` must complete before any
/// re-initialization installs a replacement.
#[derive(Clone)]
pub struct ActiveClient {
    inner: Arc<Mutex<Option<ClientInner>>>,
}

struct ClientInner {
    servers: Vec<(String, Box<dyn ToolServer>)>,
    catalog: Catalog,
}

impl ActiveClient {
    pub(crate) fn new(servers: Vec<(String, Box<dyn ToolServer>)>, catalog: Catalog) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(ClientInner { servers, catalog }))),
        }
    }

    /// Call a tool by name with named arguments.
    ///
    /// Tool names are not unique across servers; `origin` routes the call to
    /// a specific server when the caller needs to disambiguate. Without it,
    /// the first server in registry order that advertises the name wins.
    pub async fn call_tool(
        &self,
        name: &str,
        origin: Option<&str>,
        arguments: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<String> {
        let guard = self.inner.lock().await;
        let inner = guard
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Client has been shut down"))?;

        let origin = match origin {
            Some(server) => {
                if !inner
                    .catalog
                    .tools
                    .iter()
                    .any(|t| t.name == name && t.server == server)
                {
                    anyhow::bail!("Tool '{}' not found on server '{}'", name, server);
                }
                server.to_string()
            }
            None => inner
                .catalog
                .tools
                .iter()
                .find(|t| t.name == name)
                .map(|t| t.server.clone())
                .ok_or_else(|| {
                    anyhow::anyhow!("Tool '{}' not found on any connected server", name)
                })?,
        };

        let (_, server) = inner
            .servers
            .iter()
            .find(|(n, _)| *n == origin)
            .ok_or_else(|| anyhow::anyhow!("No live connection to server '{}'", origin))?;

        server.call_tool(name, arguments).await
    }

    /// Read a resource by URI, routed to the server that advertised it.
    pub async fn read_resource(&self, uri: &str) -> Result<String> {
        let guard = self.inner.lock().await;
        let inner = guard
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Client has been shut down"))?;

        let origin = inner
            .catalog
            .resources
            .iter()
            .find(|r| r.uri == uri)
            .map(|r| r.server.clone())
            .ok_or_else(|| anyhow::anyhow!("Resource '{}' not found in the catalog", uri))?;

        let (_, server) = inner
            .servers
            .iter()
            .find(|(n, _)| *n == origin)
            .ok_or_else(|| anyhow::anyhow!("No live connection to server '{}'", origin))?;

        server.read_resource(uri).await
    }

    /// Tear down every owned connection. Idempotent.
    pub async fn shutdown(&self) -> Result<()> {
        let inner = self.inner.lock().await.take();
        if let Some(inner) = inner {
            for (name, server) in inner.servers {
                if let Err(e) = server.shutdown().await {
                    tracing::warn!("Error disconnecting from '{}': {:#}", name, e);
                }
            }
        }
        Ok(())
    }
}

/// The long-lived product of a successful orchestration.
pub struct OrchestrationResult {
    pub catalog: Catalog,
    /// True when only the fallback subset is connected.
    pub degraded: bool,
    /// Servers that failed discovery on the final full-registry attempt.
    /// Empty when `degraded` is false.
    pub failed_servers: Vec<String>,
    pub client: ActiveClient,
}

impl std::fmt::Debug for OrchestrationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestrationResult")
            .field("catalog", &self.catalog)
            .field("degraded", &self.degraded)
            .field("failed_servers", &self.failed_servers)
            .finish_non_exhaustive()
    }
}

/// Drives discovery across the registry with bounded retry and degradation.
pub struct Orchestrator<C: Connect> {
    connector: C,
    registry: RegistryConfig,
    max_attempts: u32,
    retry_delay: Duration,
    cancel: CancellationToken,
    state: OrchestratorState,
}

impl<C: Connect> Orchestrator<C> {
    pub fn new(connector: C, registry: RegistryConfig) -> Self {
        Self {
            connector,
            registry,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            cancel: CancellationToken::new(),
            state: OrchestratorState::Idle,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Token that aborts the wait between attempts when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    /// Run discovery to a terminal state and hand over the live client.
    ///
    /// The one fatal condition is the fallback subset also failing after the
    /// retry budget is exhausted; every other failure is scoped to a server
    /// or recovered by retrying.
    pub async fn initialize(&mut self) -> Result<OrchestrationResult> {
        if self.registry.servers.is_empty() {
            self.state = OrchestratorState::Failed;
            anyhow::bail!("No servers registered");
        }

        let mut last_failed: Vec<String> = Vec::new();

        for attempt in 1..=self.max_attempts {
            self.state = OrchestratorState::Attempting { attempt };
            tracing::info!(
                "Discovery attempt {}/{} across {} servers",
                attempt,
                self.max_attempts,
                self.registry.servers.len()
            );

            let outcome = aggregate(&self.connector, &self.registry.servers).await;
            if outcome.failed.is_empty() {
                tracing::info!("Connected to all {} servers", self.registry.servers.len());
                self.state = OrchestratorState::Succeeded { degraded: false };
                return Ok(Self::install(outcome, false, Vec::new()));
            }

            tracing::warn!(
                "Attempt {}/{} left servers unreachable: {}",
                attempt,
                self.max_attempts,
                outcome.failed.join(", ")
            );
            last_failed = outcome.failed.clone();
            // The catalog is rebuilt wholesale next attempt; nothing from
            // this pass may survive into it.
            outcome.teardown().await;

            if attempt < self.max_attempts {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        self.state = OrchestratorState::Failed;
                        anyhow::bail!("Initialization cancelled while waiting to retry");
                    }
                    _ = tokio::time::sleep(self.retry_delay) => {}
                }
            }
        }

        self.state = OrchestratorState::Degrading;
        let fallback = self.registry.fallback_servers();
        if fallback.is_empty() {
            self.state = OrchestratorState::Failed;
            anyhow::bail!(
                "Discovery failed for [{}] after {} attempts and no fallback servers are declared",
                last_failed.join(", "),
                self.max_attempts
            );
        }

        let fallback_names: Vec<&str> = fallback.iter().map(|s| s.name.as_str()).collect();
        tracing::warn!(
            "Retry budget exhausted, degrading to fallback servers: {}",
            fallback_names.join(", ")
        );

        let outcome = aggregate(&self.connector, &fallback).await;
        if outcome.failed.is_empty() {
            tracing::warn!(
                "Running degraded: only [{}] connected, [{}] unavailable",
                fallback_names.join(", "),
                last_failed.join(", ")
            );
            self.state = OrchestratorState::Succeeded { degraded: true };
            return Ok(Self::install(outcome, true, last_failed));
        }

        let fallback_failed = outcome.failed.clone();
        outcome.teardown().await;
        self.state = OrchestratorState::Failed;
        anyhow::bail!(
            "No usable catalog: full registry failed {} attempts and fallback servers [{}] also failed",
            self.max_attempts,
            fallback_failed.join(", ")
        )
    }

    fn install(
        outcome: AggregateOutcome,
        degraded: bool,
        failed_servers: Vec<String>,
    ) -> OrchestrationResult {
        let catalog = outcome.catalog.clone();
        let client = ActiveClient::new(outcome.connections, outcome.catalog);
        OrchestrationResult {
            catalog,
            degraded,
            failed_servers,
            client,
        }
    }
}
