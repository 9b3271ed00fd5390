//! Project configuration stored in `.isy/config.json`
//!
//! ```json
//! {
//!   "project_name": "isy",
//!   "author": "ACME",
//!   "language_and_framework": "Rust",
//!   "description": "AI coding assistant",
//!   "api_key": "sk-...",
//!   "response_language": "en"
//! }
//! ```
//!
//! Updates go through [`ConfigUpdate`], one optional field per mutable
//! attribute, so unknown keys cannot exist.

use crate::error::{IsyError, Result};
use crate::types::ProjectInfo;
use crate::utils::atomic_write;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// Environment variable overriding the configured API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Project configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Project name
    pub project_name: String,
    /// Author or company
    #[serde(default)]
    pub author: String,
    /// Language and/or framework in use
    #[serde(default)]
    pub language_and_framework: String,
    /// Free-form description (goals, features, ...)
    #[serde(default)]
    pub description: String,
    /// Chat endpoint API key
    #[serde(default)]
    pub api_key: String,
    /// Language the assistant should answer in (`en`, `it`, ...)
    #[serde(default, alias = "ia_model_response_language")]
    pub response_language: String,
}

/// Typed partial update of a [`Config`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    /// New project name
    pub project_name: Option<String>,
    /// New author
    pub author: Option<String>,
    /// New language/framework
    pub language_and_framework: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New API key
    pub api_key: Option<String>,
    /// New response language
    pub response_language: Option<String>,
}

impl Config {
    /// Load the configuration
    ///
    /// # Errors
    ///
    /// - [`IsyError::ConfigNotFound`] if the file does not exist
    /// - [`IsyError::Json`] if it is not valid configuration JSON
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => IsyError::ConfigNotFound(path.to_path_buf()),
            _ => IsyError::Io(e),
        })?;
        let config: Config = serde_json::from_slice(&data)?;
        debug!("Loaded configuration for {:?}", config.project_name);
        Ok(config)
    }

    /// Save the configuration as indented JSON, atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut json = serde_json::to_vec_pretty(self)?;
        json.push(b'\n');
        atomic_write(path, &json)
    }

    /// Apply an update in place
    pub fn apply(&mut self, update: ConfigUpdate) {
        let ConfigUpdate {
            project_name,
            author,
            language_and_framework,
            description,
            api_key,
            response_language,
        } = update;

        if let Some(v) = project_name {
            self.project_name = v;
        }
        if let Some(v) = author {
            self.author = v;
        }
        if let Some(v) = language_and_framework {
            self.language_and_framework = v;
        }
        if let Some(v) = description {
            self.description = v;
        }
        if let Some(v) = api_key {
            self.api_key = v;
        }
        if let Some(v) = response_language {
            self.response_language = v;
        }
    }

    /// Load, apply `update` and save back
    pub fn update(path: &Path, update: ConfigUpdate) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply(update);
        config.save(path)?;
        Ok(config)
    }

    /// Metadata printed at the top of the context document
    pub fn project_info(&self) -> ProjectInfo {
        ProjectInfo::new(self.project_name.clone(), self.description.clone())
    }

    /// API key, preferring the environment over the file
    ///
    /// # Errors
    ///
    /// - [`IsyError::Config`] if neither holds a key
    pub fn resolve_api_key(&self) -> Result<String> {
        resolve_api_key(std::env::var(API_KEY_ENV).ok(), &self.api_key)
    }
}

fn resolve_api_key(from_env: Option<String>, from_file: &str) -> Result<String> {
    match from_env.filter(|k| !k.trim().is_empty()) {
        Some(key) => Ok(key),
        None if !from_file.trim().is_empty() => Ok(from_file.to_string()),
        None => Err(IsyError::config(format!(
            "no API key: set {} or run 'isy init'",
            API_KEY_ENV
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Config {
        Config {
            project_name: "isy".to_string(),
            author: "ACME".to_string(),
            language_and_framework: "Rust".to_string(),
            description: "AI coding assistant".to_string(),
            api_key: "sk-test".to_string(),
            response_language: "en".to_string(),
        }
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");

        sample().save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), sample());

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"project_name\": \"isy\""));
    }

    #[test]
    fn test_missing_config() {
        let temp_dir = TempDir::new().unwrap();
        let err = Config::load(&temp_dir.path().join("config.json")).unwrap_err();
        assert!(matches!(err, IsyError::ConfigNotFound(_)));
    }

    #[test]
    fn test_update_touches_only_given_fields() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        sample().save(&path).unwrap();

        let updated = Config::update(
            &path,
            ConfigUpdate {
                description: Some("New description".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(updated.description, "New description");
        assert_eq!(updated.project_name, "isy");
        assert_eq!(Config::load(&path).unwrap(), updated);
    }

    #[test]
    fn test_legacy_fields() {
        let json = r#"{
            "project_name": "old",
            "description": "d",
            "files": [],
            "ia_model_response_language": "it"
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.response_language, "it");
        assert_eq!(config.project_info(), ProjectInfo::new("old", "d"));
    }

    #[test]
    fn test_api_key_resolution() {
        assert_eq!(resolve_api_key(Some("env".into()), "file").unwrap(), "env");
        assert_eq!(resolve_api_key(Some("  ".into()), "file").unwrap(), "file");
        assert_eq!(resolve_api_key(None, "file").unwrap(), "file");
        assert!(matches!(resolve_api_key(None, ""), Err(IsyError::Config(_))));
    }
}
