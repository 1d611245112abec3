//! Simulation configuration for the nanomesh CLI.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use nanomesh_core::{DEFAULT_PRIORITY, MAX_PRIORITY, MIN_PRIORITY, RouterConfig};

/// Sample configuration printed by `nanomesh example-config`
pub const EXAMPLE_CONFIG: &str = r#"# A hub with two edges. Each edge announces its own name; the hub
# forwards by the first four bytes of every message body.

[logging]
level = "info"

[[nodes]]
name = "hub"
local_name = "HUB!"

[[nodes]]
name = "east"
local_name = "EAST"

[[nodes]]
name = "west"
local_name = "WEST"
exclusion = "skip_excluded"

[[links]]
from = "hub"
to = "east"

[[links]]
from = "hub"
to = "west"
priority = 2

[[messages]]
from = "hub"
body = "EASThello east"

[[messages]]
from = "hub"
body = "WESThello west"

[[messages]]
from = "east"
body = "HUB!ack from east"

[[messages]]
from = "west"
body = "NOPEnobody is called this"
"#;

/// Mesh simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MeshConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Sockets in the mesh
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
    /// Connections between sockets
    #[serde(default)]
    pub links: Vec<LinkConfig>,
    /// Messages sent once the handshake has settled, in order
    #[serde(default)]
    pub messages: Vec<MessageConfig>,
}

/// One routing socket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Label used by links and messages
    pub name: String,
    /// Socket options
    #[serde(flatten)]
    pub router: RouterConfig,
}

/// A connection between two sockets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Label of the first socket
    pub from: String,
    /// Label of the second socket
    pub to: String,
    /// Receive priority of both ends
    #[serde(default = "default_priority")]
    pub priority: u8,
}

/// A message injected into the mesh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageConfig {
    /// Label of the sending socket
    pub from: String,
    /// Message body; its first four bytes select the recipients
    pub body: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl MeshConfig {
    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration.
    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> anyhow::Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            );
        }

        if self.nodes.is_empty() {
            anyhow::bail!("Configuration defines no nodes");
        }

        let mut names = HashSet::new();
        for node in &self.nodes {
            if node.name.is_empty() {
                anyhow::bail!("Node name must not be empty");
            }
            if !names.insert(node.name.as_str()) {
                anyhow::bail!("Duplicate node name: {}", node.name);
            }
        }

        for link in &self.links {
            for end in [&link.from, &link.to] {
                if !names.contains(end.as_str()) {
                    anyhow::bail!("Link {} -> {} names unknown node {}", link.from, link.to, end);
                }
            }
            if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&link.priority) {
                anyhow::bail!(
                    "Link {} -> {} priority {} must be between {} and {}",
                    link.from,
                    link.to,
                    link.priority,
                    MIN_PRIORITY,
                    MAX_PRIORITY
                );
            }
        }

        for msg in &self.messages {
            if !names.contains(msg.from.as_str()) {
                anyhow::bail!("Message sender {} is not a node", msg.from);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanomesh_core::{ExclusionPolicy, PeerName};

    #[test]
    fn test_example_config_is_valid() {
        let config = MeshConfig::parse(EXAMPLE_CONFIG).unwrap();
        config.validate().unwrap();

        assert_eq!(config.nodes.len(), 3);
        assert_eq!(config.links.len(), 2);
        assert_eq!(config.messages.len(), 4);
        assert_eq!(config.nodes[1].router.local_name, Some(PeerName::from("EAST")));
        assert_eq!(config.nodes[2].router.exclusion, ExclusionPolicy::SkipExcluded);
        assert_eq!(config.links[0].priority, DEFAULT_PRIORITY);
        assert_eq!(config.links[1].priority, 2);
    }

    #[test]
    fn test_default_config() {
        let config = MeshConfig::default();
        assert_eq!(config.logging.level, "info");
        assert!(config.nodes.is_empty());
        // No nodes, nothing to simulate.
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = MeshConfig::parse(EXAMPLE_CONFIG).unwrap();
        assert!(config.validate().is_ok());

        // Invalid log level
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
        config.logging.level = "debug".to_string();

        // Unknown link endpoint
        config.links[0].to = "north".to_string();
        assert!(config.validate().is_err());
        config.links[0].to = "east".to_string();

        // Priority out of range
        config.links[0].priority = 0;
        assert!(config.validate().is_err());
        config.links[0].priority = 16;
        assert!(config.validate().is_ok());

        // Duplicate node
        config.nodes[1].name = "hub".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_sender_rejected() {
        let mut config = MeshConfig::parse(EXAMPLE_CONFIG).unwrap();
        config.messages[0].from = "ghost".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mesh.toml");
        fs::write(&path, EXAMPLE_CONFIG).unwrap();

        let config = MeshConfig::load(&path).unwrap();
        assert_eq!(config.nodes[0].name, "hub");
        assert!(MeshConfig::load(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_toml_serialization() {
        let config = MeshConfig::parse(EXAMPLE_CONFIG).unwrap();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized = MeshConfig::parse(&toml_str).unwrap();

        assert_eq!(deserialized.nodes.len(), config.nodes.len());
        assert_eq!(deserialized.nodes[0].router, config.nodes[0].router);
        assert_eq!(deserialized.messages[2].body, config.messages[2].body);
    }
}
