//! Effective tool configuration.
//!
//! Resolution is an explicit pipeline over plain maps:
//!
//!   1. `merge_layers`: defaults, then the tool's own settings, then
//!      service overrides; each later layer replaces same-named keys.
//!   2. `expand_all`: every value is substituted against the merged table
//!      itself, as it stood before any expansion.

use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use super::ConfigError;
use super::reader::read_conf;
use crate::param::{SymbolTable, substitute};

pub const TOOL_DOT_CONF: &str = "tool.conf";
pub const SERVICES_DOT_CONF: &str = "services.conf";

type ConfMap = BTreeMap<String, String>;

/// Overlay `tool` on `defaults`, then `services` on the result.
pub fn merge_layers(defaults: Option<&ConfMap>, tool: &ConfMap, services: &ConfMap) -> ConfMap {
    let mut merged = defaults.cloned().unwrap_or_default();
    merged.extend(tool.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged.extend(services.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Service-level keys scoped to `tool_type` (prefix `tool-<type>-`),
/// kept under their full names.
pub fn service_overrides(services: &ConfMap, tool_type: &str) -> ConfMap {
    let prefix = format!("tool-{tool_type}-");
    services
        .iter()
        .filter(|(k, _)| k.starts_with(&prefix))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Expand every value against the unexpanded table.
pub fn expand_all(merged: &ConfMap) -> Result<ConfMap, ConfigError> {
    let symbols = SymbolTable::from(merged);
    merged
        .iter()
        .map(|(key, value)| {
            substitute(value, &symbols)
                .map(|expanded| (key.clone(), expanded))
                .map_err(|source| ConfigError::Expand {
                    key: key.clone(),
                    source,
                })
        })
        .collect()
}

/// Effective key/value settings of one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    values: ConfMap,
}

impl ToolConfig {
    /// Read `tool.conf`, its optional `tool-defaults` document and the
    /// optional `services.conf` from `input_dir`, and resolve them.
    pub fn load(input_dir: &Path) -> Result<Self, ConfigError> {
        let tool = read_conf(&input_dir.join(TOOL_DOT_CONF))?;

        let defaults = match tool.get("tool-defaults") {
            Some(name) => Some(read_conf(&input_dir.join(name))?),
            None => None,
        };

        let services_file = input_dir.join(SERVICES_DOT_CONF);
        let services = if services_file.is_file() {
            read_conf(&services_file)?
        } else {
            ConfMap::new()
        };

        Self::resolve(defaults.as_ref(), &tool, &services)
    }

    /// Run the merge-then-expand pipeline over already-read layers.
    pub fn resolve(
        defaults: Option<&ConfMap>,
        tool: &ConfMap,
        services: &ConfMap,
    ) -> Result<Self, ConfigError> {
        let base = merge_layers(defaults, tool, &ConfMap::new());
        let tool_type = base
            .get("tool-type")
            .ok_or_else(|| ConfigError::Missing("tool-type".to_string()))?;

        let overrides = service_overrides(services, tool_type);
        debug!(count = overrides.len(), "service overrides for {}", tool_type);

        let merged = merge_layers(defaults, tool, &overrides);
        Ok(Self {
            values: expand_all(&merged)?,
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    pub fn tool_type(&self) -> &str {
        self.get("tool-type").unwrap_or_default()
    }

    /// Whether `key` holds the literal text `true`.
    pub fn is_true(&self, key: &str) -> bool {
        self.get(key) == Some("true")
    }

    /// Replace a derived value, such as the resolved executable path.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn values(&self) -> &ConfMap {
        &self.values
    }

    pub fn symbols(&self) -> SymbolTable {
        SymbolTable::from(&self.values)
    }
}
