use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngramError, Result};

/// Where each domain database lives. Every store gets its own file under
/// `data_dir` unless an explicit path overrides it.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    pub data_dir: Option<String>,
    pub conversations_path: Option<String>,
    pub memories_path: Option<String>,
    pub schedule_path: Option<String>,
    pub projects_path: Option<String>,
    pub telemetry_path: Option<String>,
}

impl StorageConfig {
    pub fn with_data_dir(dir: impl Into<String>) -> Self {
        Self {
            data_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    pub fn conversations(&self) -> String {
        self.resolve(&self.conversations_path, "conversations.db")
    }

    pub fn memories(&self) -> String {
        self.resolve(&self.memories_path, "memories.db")
    }

    pub fn schedule(&self) -> String {
        self.resolve(&self.schedule_path, "schedule.db")
    }

    pub fn projects(&self) -> String {
        self.resolve(&self.projects_path, "projects.db")
    }

    pub fn telemetry(&self) -> String {
        self.resolve(&self.telemetry_path, "tool_calls.db")
    }

    fn resolve(&self, override_path: &Option<String>, file_name: &str) -> String {
        if let Some(path) = override_path {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
        let dir = self
            .data_dir
            .clone()
            .unwrap_or_else(default_data_dir);
        Path::new(&dir).join(file_name).to_string_lossy().into_owned()
    }
}

pub fn default_data_dir() -> String {
    "./data/engram".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| EngramError::Config(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| EngramError::Config(e.to_string()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win_over_data_dir() {
        let mut storage = StorageConfig::with_data_dir("/tmp/engram");
        assert!(storage.conversations().ends_with("conversations.db"));
        storage.conversations_path = Some("/elsewhere/conv.db".to_string());
        assert_eq!(storage.conversations(), "/elsewhere/conv.db");
        assert!(storage.telemetry().starts_with("/tmp/engram"));
    }
}
