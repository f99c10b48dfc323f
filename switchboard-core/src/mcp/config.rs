use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default per-call timeout applied to connection and RPC calls.
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

/// How to reach a single tool server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum TransportConfig {
    /// Spawn a subprocess and talk to it over stdin/stdout.
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        /// Working directory for the child. Relative `args` paths are the
        /// server's own concern; this only anchors the spawn.
        #[serde(skip_serializing_if = "Option::is_none")]
        cwd: Option<PathBuf>,
    },
    /// Connect to a streamable-HTTP endpoint.
    StreamableHttp { url: String },
}

impl TransportConfig {
    /// Whether this transport needs no external network reachability.
    pub fn is_local(&self) -> bool {
        matches!(self, TransportConfig::Stdio { .. })
    }
}

/// One registered tool server: a unique name, a transport, and whether the
/// server belongs to the minimal always-available fallback subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEntry {
    pub name: String,
    #[serde(flatten)]
    pub transport: TransportConfig,
    /// Part of the subset used when full-registry discovery never succeeds.
    #[serde(default)]
    pub fallback: bool,
}

/// Ordered registry of tool servers. Declaration order is preserved and
/// determines catalog order; names must be unique.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
    /// Timeout in seconds for each connection attempt and RPC call.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

fn default_call_timeout() -> u64 {
    DEFAULT_CALL_TIMEOUT_SECS
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self {
            servers: Vec::new(),
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
        }
    }

    /// Add a server entry, rejecting duplicate names.
    pub fn add_server(&mut self, entry: ServerEntry) -> Result<()> {
        if self.servers.iter().any(|s| s.name == entry.name) {
            anyhow::bail!("Server '{}' is already registered", entry.name);
        }
        self.servers.push(entry);
        Ok(())
    }

    /// Builder-style variant of [`add_server`](Self::add_server).
    pub fn with_server(mut self, entry: ServerEntry) -> Result<Self> {
        self.add_server(entry)?;
        Ok(self)
    }

    pub fn get_server(&self, name: &str) -> Option<&ServerEntry> {
        self.servers.iter().find(|s| s.name == name)
    }

    /// The declared fallback subset, in registry order. When no entry is
    /// marked `fallback`, the convention is the subprocess-transport entries,
    /// since those require no external reachability.
    pub fn fallback_servers(&self) -> Vec<ServerEntry> {
        let declared: Vec<ServerEntry> = self
            .servers
            .iter()
            .filter(|s| s.fallback)
            .cloned()
            .collect();
        if !declared.is_empty() {
            return declared;
        }
        self.servers
            .iter()
            .filter(|s| s.transport.is_local())
            .cloned()
            .collect()
    }

    /// Get the default registry file path (~/.switchboard/servers.toml)
    pub fn default_path() -> Option<PathBuf> {
        directories::UserDirs::new()
            .map(|dirs| dirs.home_dir().join(".switchboard").join("servers.toml"))
    }

    /// Load the registry from the default path, or an empty registry if the
    /// file does not exist.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::new()),
        }
    }

    /// Load the registry from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RegistryConfig = toml::from_str(&content)?;
        let mut seen = std::collections::HashSet::new();
        for server in &config.servers {
            if !seen.insert(server.name.as_str()) {
                anyhow::bail!("Duplicate server '{}' in {}", server.name, path.display());
            }
        }
        Ok(config)
    }

    /// Save the registry to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
