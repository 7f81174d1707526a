//! JSON application config: models plus the resources served over them.
//!
//! ```json
//! {
//!   "models": [
//!     { "name": "authors", "table": "authors", "columns": ["id", "uuid", "handle", "name"],
//!       "alias_column": "handle", "uuid_column": "uuid" },
//!     { "name": "posts", "table": "posts", "columns": ["id", "title", "author_id"],
//!       "relations": [{ "name": "author", "model": "authors", "foreign_key": "author_id" }] }
//!   ],
//!   "resources": [
//!     { "model": "posts", "scope_models": "authors", "search_fields": ["title"], "include": "author" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::{ModelDef, ModelRegistry, Options};
use crate::errors::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub models: Vec<ModelDef>,
    #[serde(default)]
    pub resources: Vec<Options>,
}

impl AppConfig {
    /// # Errors
    /// Returns `ConfigError::Parse` for malformed JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    /// Returns `ConfigError::Io` when the file cannot be read, `Parse` when it
    /// is not valid config JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading config");
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Options configured for `model`, if it is served
    #[must_use]
    pub fn resource(&self, model: &str) -> Option<&Options> {
        self.resources.iter().find(|r| r.model == model)
    }

    /// Register every model and check every resource against the result.
    ///
    /// # Errors
    /// Returns the first `ConfigError` found in a model, relation or resource.
    pub fn build_registry(&self) -> Result<ModelRegistry, ConfigError> {
        let mut registry = ModelRegistry::new();
        for model in &self.models {
            registry.register(model.clone())?;
        }
        registry.validate()?;
        for resource in &self.resources {
            resource.validate(&registry)?;
        }
        tracing::debug!(
            models = self.models.len(),
            resources = self.resources.len(),
            "config validated"
        );
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOG: &str = r#"{
        "models": [
            {"name": "authors", "table": "authors", "columns": ["id", "uuid", "handle"],
             "alias_column": "handle", "uuid_column": "uuid"},
            {"name": "posts", "table": "posts", "columns": ["id", "title", "author_id"],
             "relations": [{"name": "author", "model": "authors", "foreign_key": "author_id"}]}
        ],
        "resources": [
            {"model": "posts", "scope_models": "authors", "search_fields": "title", "page_size": 10}
        ]
    }"#;

    #[test]
    fn test_parse_and_build_registry() {
        let config = AppConfig::from_json_str(BLOG).unwrap();
        let registry = config.build_registry().unwrap();

        assert!(registry.contains("authors"));
        let posts = config.resource("posts").unwrap();
        assert_eq!(posts.scope_models, vec!["authors".to_string()]);
        assert_eq!(posts.search_fields, vec!["title".to_string()]);
        assert_eq!(posts.page_size, 10);
        assert_eq!(posts.max_page_size, crate::core::options::DEFAULT_MAX_PAGE_SIZE);
        assert!(config.resource("authors").is_none());
    }

    #[test]
    fn test_unknown_search_field_rejected() {
        let json = BLOG.replace(r#""search_fields": "title""#, r#""search_fields": "body""#);
        let err = AppConfig::from_json_str(&json).unwrap().build_registry().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownColumn { ref column, .. } if column == "body"));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            AppConfig::from_json_str("{\"models\": ["),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            AppConfig::from_path("/nonexistent/restcontroller.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
