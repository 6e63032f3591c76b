// Configuration management for the feedmesh CLI
//
// Cross-platform config stored in:
// - macOS: ~/Library/Application Support/feedmesh/config.json
// - Linux: ~/.config/feedmesh/config.json
// - Windows: %APPDATA%\feedmesh\config.json

use anyhow::{Context, Result};
use feedmesh_core::config::{DEFAULT_STRATEGY, ROOT_NODE};
use feedmesh_core::{RegistryConfig, Scope};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// This node's id in the mesh
    pub node_id: String,

    /// Directory of the local registry tables
    pub storage_path: Option<String>,

    /// Pseudo-node standing for the mesh root
    pub root_node: String,

    /// Strategy behind synthesized `factory=` routes
    pub default_strategy: String,

    /// Scope feed route queries run in
    pub feed_route_scope: Scope,

    /// Other nodes' registry directories, joined into the distributed scope
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    pub id: String,
    pub storage_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_id: "localhost".to_string(),
            storage_path: None,
            root_node: ROOT_NODE.to_string(),
            default_strategy: DEFAULT_STRATEGY.to_string(),
            feed_route_scope: Scope::Distributed,
            peers: Vec::new(),
        }
    }
}

impl Config {
    /// Get the config directory path (cross-platform)
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join("feedmesh");

        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        Ok(config_dir)
    }

    /// Get the data directory path (cross-platform)
    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to determine data directory")?
            .join("feedmesh");

        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        Ok(data_dir)
    }

    /// Get the config file path
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load config from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
            let config: Config =
                serde_json::from_str(&contents).context("Failed to parse config file")?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    /// Set a config value
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "node_id" => self.node_id = value.to_string(),
            "storage_path" => {
                self.storage_path = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            "root_node" => self.root_node = value.to_string(),
            "default_strategy" => self.default_strategy = value.to_string(),
            "feed_route_scope" => {
                self.feed_route_scope = value
                    .parse()
                    .context("Invalid scope (expected local or distributed)")?;
            }
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        self.registry_config(PathBuf::new())
            .validate()
            .with_context(|| format!("Invalid value for {}", key))?;
        Ok(())
    }

    /// Get a config value
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "node_id" => Some(self.node_id.clone()),
            "storage_path" => self.storage_path.clone(),
            "root_node" => Some(self.root_node.clone()),
            "default_strategy" => Some(self.default_strategy.clone()),
            "feed_route_scope" => Some(self.feed_route_scope.to_string()),
            _ => None,
        }
    }

    /// List all config values
    pub fn list(&self) -> Vec<(String, String)> {
        vec![
            ("node_id".to_string(), self.node_id.clone()),
            (
                "storage_path".to_string(),
                self.storage_path.clone().unwrap_or_else(|| "(auto)".to_string()),
            ),
            ("root_node".to_string(), self.root_node.clone()),
            ("default_strategy".to_string(), self.default_strategy.clone()),
            ("feed_route_scope".to_string(), self.feed_route_scope.to_string()),
            ("peers".to_string(), self.peers.len().to_string()),
        ]
    }

    /// Add or re-point a peer
    pub fn add_peer(&mut self, id: String, storage_path: String) {
        self.peers.retain(|p| p.id != id);
        self.peers.push(PeerConfig { id, storage_path });
    }

    pub fn remove_peer(&mut self, id: &str) -> bool {
        let before = self.peers.len();
        self.peers.retain(|p| p.id != id);
        self.peers.len() != before
    }

    /// Core registry settings; `default_storage` is used when no storage
    /// path is configured.
    pub fn registry_config(&self, default_storage: PathBuf) -> RegistryConfig {
        let mut config = RegistryConfig::new(self.node_id.clone());
        config.root_node = self.root_node.clone();
        config.default_strategy = self.default_strategy.clone();
        config.feed_route_scope = self.feed_route_scope;
        config.storage_path = Some(
            self.storage_path
                .clone()
                .unwrap_or_else(|| default_storage.to_string_lossy().into_owned()),
        );
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.root_node, "$FABRIC");
        assert_eq!(config.feed_route_scope, Scope::Distributed);
        assert!(config.peers.is_empty());
    }

    #[test]
    fn test_load_creates_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        config.set("node_id", "nodeA").unwrap();
        config.set("feed_route_scope", "local").unwrap();
        config.add_peer("nodeB".into(), "/var/lib/feedmesh/nodeB".into());
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.get("node_id").as_deref(), Some("nodeA"));
        assert_eq!(reloaded.feed_route_scope, Scope::Local);
        assert_eq!(reloaded.peers.len(), 1);
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.set("feed_route_scope", "global").is_err());
        assert!(config.set("node_id", "*").is_err());
        assert!(config.set("listen_port", "80").is_err());
    }

    #[test]
    fn test_peers_replace_and_remove() {
        let mut config = Config::default();
        config.add_peer("n2".into(), "/a".into());
        config.add_peer("n2".into(), "/b".into());
        assert_eq!(config.peers.len(), 1);
        assert_eq!(config.peers[0].storage_path, "/b");
        assert!(config.remove_peer("n2"));
        assert!(!config.remove_peer("n2"));
    }
}
