//! Catalog aggregation across every registered server.

use crate::mcp::config::ServerEntry;
use crate::mcp::discovery::{discover, Catalog, DiscoveryOutcome};
use crate::mcp::transport::{Connect, ToolServer};
use futures::future::join_all;

/// One full aggregation pass: the merged catalog, the live connections it
/// came from, and the servers that failed discovery.
pub struct AggregateOutcome {
    pub catalog: Catalog,
    /// Live handles in registry order, one per successful server. The caller
    /// owns their teardown.
    pub connections: Vec<(String, Box<dyn ToolServer>)>,
    pub failed: Vec<String>,
}

impl AggregateOutcome {
    /// Close every connection from this pass. Used when a pass is abandoned
    /// so that no handle from a failed attempt leaks into the next one.
    pub async fn teardown(self) {
        for (name, server) in self.connections {
            if let Err(e) = server.shutdown().await {
                tracing::warn!("Error disconnecting from '{}': {:#}", name, e);
            }
        }
    }
}

/// Discover every server concurrently and merge the results.
///
/// All per-server outcomes are awaited before anything is merged. Entries
/// land in the catalog in registry declaration order, tools then resources
/// per server. Tool names colliding across servers are preserved as distinct
/// entries; the origin field disambiguates.
pub async fn aggregate(connector: &dyn Connect, servers: &[ServerEntry]) -> AggregateOutcome {
    let outcomes = join_all(servers.iter().map(|entry| discover(connector, entry))).await;

    let mut catalog = Catalog::default();
    let mut connections = Vec::new();
    let mut failed = Vec::new();

    for (entry, outcome) in servers.iter().zip(outcomes) {
        match outcome {
            DiscoveryOutcome::Success {
                server,
                tools,
                resources,
            } => {
                tracing::info!(
                    "Discovered {} tools and {} resources from '{}'",
                    tools.len(),
                    resources.len(),
                    entry.name
                );
                catalog.tools.extend(tools);
                catalog.resources.extend(resources);
                connections.push((entry.name.clone(), server));
            }
            DiscoveryOutcome::Failure { error } => {
                tracing::warn!("Discovery failed for '{}': {}", entry.name, error);
                failed.push(entry.name.clone());
            }
        }
    }

    AggregateOutcome {
        catalog,
        connections,
        failed,
    }
}
