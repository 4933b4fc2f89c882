use crate::types::{NewsError, OutletDescriptor, Result};
use crate::utils::url::is_valid_feed_url;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

const BUILTIN_REGISTRY: &str = include_str!("../news_registry.json");

/// The list of outlets the dashboard knows about. Registry order is display order.
#[derive(Debug, Clone, PartialEq)]
pub struct OutletRegistry {
    outlets: Vec<OutletDescriptor>,
}

impl OutletRegistry {
    pub fn new(outlets: Vec<OutletDescriptor>) -> Result<Self> {
        let registry = Self { outlets };
        registry.validate()?;
        Ok(registry)
    }

    /// Registry bundled with the binary
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_REGISTRY)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let outlets: Vec<OutletDescriptor> = serde_json::from_str(json)
            .map_err(|e| NewsError::Registry(format!("Invalid registry JSON: {}", e)))?;
        Self::new(outlets)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let registry = Self::from_json_str(&contents)?;
        info!("Loaded {} outlets from {}", registry.len(), path.display());
        Ok(registry)
    }

    pub fn validate(&self) -> Result<()> {
        if self.outlets.is_empty() {
            return Err(NewsError::Registry("Registry contains no outlets".to_string()));
        }

        let mut seen = HashSet::new();
        for outlet in &self.outlets {
            let name = outlet.name.trim();
            if name.is_empty() {
                return Err(NewsError::Registry(format!(
                    "Outlet with feed {} has an empty name",
                    outlet.feed_url
                )));
            }
            if !seen.insert(name.to_lowercase()) {
                return Err(NewsError::Registry(format!("Duplicate outlet name: {}", name)));
            }
            if !is_valid_feed_url(&outlet.feed_url) {
                return Err(NewsError::Registry(format!(
                    "Outlet {} has an invalid feed URL: {}",
                    name, outlet.feed_url
                )));
            }
        }

        Ok(())
    }

    pub fn outlets(&self) -> &[OutletDescriptor] {
        &self.outlets
    }

    pub fn len(&self) -> usize {
        self.outlets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outlets.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&OutletDescriptor> {
        let name = name.trim();
        self.outlets.iter().find(|o| o.name.trim().eq_ignore_ascii_case(name))
    }

    /// Outlets whose names appear in `names`, in registry order.
    /// An empty selection means every outlet.
    pub fn select(&self, names: &[String]) -> Vec<OutletDescriptor> {
        if names.is_empty() {
            return self.outlets.clone();
        }

        for name in names {
            if self.get(name).is_none() {
                warn!("Ignoring unknown outlet: {}", name);
            }
        }

        self.outlets
            .iter()
            .filter(|o| names.iter().any(|n| o.name.trim().eq_ignore_ascii_case(n.trim())))
            .cloned()
            .collect()
    }
}
