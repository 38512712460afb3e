//! `.coderag.yaml` configuration schema (spec.md §6).
//!
//! Reimplements `infrastructure::config::loader::ConfigLoader`'s layering
//! (embedded defaults, then a file, then environment variables) on top of
//! this crate's YAML schema instead of the teacher's TOML one, using the
//! teacher's own `figment` layering crate (the teacher migrated off the
//! `config` crate onto `figment` in ADR-025) and the same `CODERAG__`-prefixed,
//! `__`-separated environment convention. Values are validated the same way
//! the teacher validates its deserialized config (`validator::Validate`).

use crate::domain::error::{Error, Result};
use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

/// `project.languages`: either an explicit list or the literal `"auto"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LanguageSelector {
    Auto(String),
    List(Vec<String>),
}

impl Default for LanguageSelector {
    fn default() -> Self {
        Self::Auto("auto".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProjectSection {
    #[serde(default = "default_project_name")]
    pub name: String,
    #[serde(default)]
    pub languages: LanguageSelector,
}

fn default_project_name() -> String {
    "default".to_string()
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            name: default_project_name(),
            languages: LanguageSelector::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestionSection {
    #[serde(default = "default_max_tokens_per_chunk")]
    pub max_tokens_per_chunk: usize,
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_max_tokens_per_chunk() -> usize {
    512
}

impl Default for IngestionSection {
    fn default() -> Self {
        Self {
            max_tokens_per_chunk: default_max_tokens_per_chunk(),
            exclude: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EmbeddingSection {
    #[serde(default)]
    pub provider: crate::domain::types::EmbeddingProviderKind,
    #[validate(length(min = 1))]
    pub model: String,
    pub dimensions: usize,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            provider: crate::domain::types::EmbeddingProviderKind::default(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SearchSection {
    #[validate(range(min = 1, max = 100))]
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f32,
    #[serde(default = "default_bm25_weight")]
    pub bm25_weight: f32,
}

fn default_top_k() -> usize {
    10
}
fn default_vector_weight() -> f32 {
    0.7
}
fn default_bm25_weight() -> f32 {
    0.3
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            vector_weight: default_vector_weight(),
            bm25_weight: default_bm25_weight(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StorageSection {
    #[serde(default = "default_storage_path")]
    pub path: String,
}

fn default_storage_path() -> String {
    ".coderag".to_string()
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

/// Top-level `.coderag.yaml` document (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EngineConfig {
    pub version: String,
    #[serde(default)]
    pub project: ProjectSection,
    #[serde(default)]
    pub ingestion: IngestionSection,
    #[validate(nested)]
    pub embedding: EmbeddingSection,
    #[serde(default)]
    pub search: SearchSection,
    #[serde(default)]
    pub storage: StorageSection,
}

const SUPPORTED_VERSION: &str = "1";

impl EngineConfig {
    /// Parse and validate a `.coderag.yaml` document, rejecting any
    /// `version` other than the one this build understands.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text).map_err(|e| Error::config(e.to_string()))?;
        if config.version != SUPPORTED_VERSION {
            return Err(Error::config(format!(
                "unsupported .coderag.yaml version {:?}, expected \"{SUPPORTED_VERSION}\"",
                config.version
            )));
        }
        config
            .validate()
            .map_err(|e| Error::config(format!("configuration validation failed: {e}")))?;
        Ok(config)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_yaml(&text)
    }

    /// Load `.coderag.yaml` layered under `CODERAG__`-prefixed environment
    /// overrides (e.g. `CODERAG__SEARCH__TOP_K=20`), the file taking
    /// precedence over embedded defaults and env vars taking precedence
    /// over the file, mirroring the teacher's config-loading order.
    pub fn load_layered(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::new()
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("CODERAG__").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::config(e.to_string()))?;
        if config.version != SUPPORTED_VERSION {
            return Err(Error::config(format!(
                "unsupported .coderag.yaml version {:?}, expected \"{SUPPORTED_VERSION}\"",
                config.version
            )));
        }
        config
            .validate()
            .map_err(|e| Error::config(format!("configuration validation failed: {e}")))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_document_with_defaults() {
        let yaml = r#"
version: "1"
embedding:
  model: "nomic-embed-text"
  dimensions: 768
"#;
        let config = EngineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.search.top_k, 10);
        assert_eq!(config.search.vector_weight, 0.7);
        assert_eq!(config.storage.path, ".coderag");
    }

    #[test]
    fn rejects_unknown_version() {
        let yaml = r#"
version: "2"
embedding:
  model: "x"
  dimensions: 8
"#;
        assert!(EngineConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn languages_accepts_auto_literal_and_explicit_list() {
        let yaml = r#"
version: "1"
project:
  name: foo
  languages: auto
embedding:
  model: "x"
  dimensions: 8
"#;
        let config = EngineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.project.languages, LanguageSelector::Auto("auto".to_string()));

        let yaml2 = r#"
version: "1"
project:
  languages: ["rust", "python"]
embedding:
  model: "x"
  dimensions: 8
"#;
        let config2 = EngineConfig::from_yaml(yaml2).unwrap();
        assert_eq!(
            config2.project.languages,
            LanguageSelector::List(vec!["rust".to_string(), "python".to_string()])
        );
    }

    #[test]
    fn load_layered_applies_env_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".coderag.yaml");
        std::fs::write(
            &path,
            r#"
version: "1"
embedding:
  model: "nomic-embed-text"
  dimensions: 768
search:
  top_k: 10
"#,
        )
        .unwrap();

        std::env::set_var("CODERAG__SEARCH__TOP_K", "25");
        let config = EngineConfig::load_layered(&path).unwrap();
        std::env::remove_var("CODERAG__SEARCH__TOP_K");

        assert_eq!(config.search.top_k, 25);
        assert_eq!(config.embedding.model, "nomic-embed-text");
    }

    #[test]
    fn rejects_top_k_out_of_range() {
        let yaml = r#"
version: "1"
search:
  top_k: 500
embedding:
  model: "x"
  dimensions: 8
"#;
        assert!(EngineConfig::from_yaml(yaml).is_err());
    }
}
