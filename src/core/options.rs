use serde::{Deserialize, Serialize};
use serde_with::{OneOrMany, formats::PreferMany, serde_as};

use super::model::{ModelDef, ModelRegistry};
use crate::errors::ConfigError;

pub const DEFAULT_PAGE_SIZE: u64 = 25;
pub const DEFAULT_MAX_PAGE_SIZE: u64 = 100;

fn default_id_column() -> String {
    "id".to_string()
}

const fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

const fn default_max_page_size() -> u64 {
    DEFAULT_MAX_PAGE_SIZE
}

/// Per-resource configuration, fixed at controller construction.
///
/// List fields accept a single string or an array in config files:
///
/// ```json
/// { "model": "posts", "search_fields": "title", "scope_models": ["authors"] }
/// ```
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// Name of the model this resource serves
    pub model: String,
    /// Relations loaded on every `index`/`show`
    #[serde_as(as = "OneOrMany<_, PreferMany>")]
    #[serde(default)]
    pub include: Vec<String>,
    /// Fields a client may never set on create/update
    #[serde_as(as = "OneOrMany<_, PreferMany>")]
    #[serde(default)]
    pub restricted_fields: Vec<String>,
    /// Fields presented to clients and usable for filtering; empty means all
    #[serde_as(as = "OneOrMany<_, PreferMany>")]
    #[serde(default)]
    pub allowed_fields: Vec<String>,
    /// Related models that narrow list queries when present in params
    #[serde_as(as = "OneOrMany<_, PreferMany>")]
    #[serde(default)]
    pub scope_models: Vec<String>,
    /// Fields matched by the `q` parameter
    #[serde_as(as = "OneOrMany<_, PreferMany>")]
    #[serde(default)]
    pub search_fields: Vec<String>,
    /// Column matched against the `id` route parameter
    #[serde(default = "default_id_column")]
    pub id_column: String,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
}

impl Options {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            include: Vec::new(),
            restricted_fields: Vec::new(),
            allowed_fields: Vec::new(),
            scope_models: Vec::new(),
            search_fields: Vec::new(),
            id_column: default_id_column(),
            page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn include<I: Into<String>>(mut self, relations: impl IntoIterator<Item = I>) -> Self {
        self.include = relations.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn restricted_fields<I: Into<String>>(mut self, fields: impl IntoIterator<Item = I>) -> Self {
        self.restricted_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn allowed_fields<I: Into<String>>(mut self, fields: impl IntoIterator<Item = I>) -> Self {
        self.allowed_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn scope_models<I: Into<String>>(mut self, models: impl IntoIterator<Item = I>) -> Self {
        self.scope_models = models.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn search_fields<I: Into<String>>(mut self, fields: impl IntoIterator<Item = I>) -> Self {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = column.into();
        self
    }

    #[must_use]
    pub const fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub const fn max_page_size(mut self, max_page_size: u64) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    /// Whether `field` may be shown to clients and used in filters
    #[must_use]
    pub fn is_visible(&self, field: &str) -> bool {
        self.allowed_fields.is_empty() || self.allowed_fields.iter().any(|f| f == field)
    }

    #[must_use]
    pub fn is_restricted(&self, field: &str) -> bool {
        self.restricted_fields.iter().any(|f| f == field)
    }

    /// Columns usable for filtering and sorting
    #[must_use]
    pub fn filterable_columns<'a>(&self, model: &'a ModelDef) -> Vec<&'a str> {
        model
            .columns
            .iter()
            .map(String::as_str)
            .filter(|column| self.is_visible(column))
            .collect()
    }

    /// Check every name against the registry and resolve the served model.
    ///
    /// # Errors
    /// Returns `ConfigError` for unknown models, columns, relations or scopes,
    /// and for zero page sizes.
    pub fn validate(&self, registry: &ModelRegistry) -> Result<(), ConfigError> {
        let model = registry.get(&self.model)?;

        let column_lists: [(&'static str, &[String]); 3] = [
            ("restricted_fields", &self.restricted_fields),
            ("allowed_fields", &self.allowed_fields),
            ("search_fields", &self.search_fields),
        ];
        for (context, columns) in column_lists {
            for column in columns {
                if !model.has_column(column) {
                    return Err(ConfigError::UnknownColumn {
                        model: model.name.clone(),
                        column: column.clone(),
                        context,
                    });
                }
            }
        }
        if !model.has_column(&self.id_column) {
            return Err(ConfigError::UnknownColumn {
                model: model.name.clone(),
                column: self.id_column.clone(),
                context: "id_column",
            });
        }

        for relation in &self.include {
            if model.relation(relation).is_none() {
                return Err(ConfigError::UnknownRelation {
                    model: model.name.clone(),
                    relation: relation.clone(),
                });
            }
        }
        for scope in &self.scope_models {
            if model.scope_relation(scope).is_none() {
                return Err(ConfigError::UnrelatedScope {
                    model: model.name.clone(),
                    scope: scope.clone(),
                });
            }
        }

        if self.page_size == 0 || self.max_page_size == 0 {
            return Err(ConfigError::InvalidOption(
                "page_size and max_page_size must be positive".to_string(),
            ));
        }
        if self.page_size > self.max_page_size {
            return Err(ConfigError::InvalidOption(format!(
                "page_size {} exceeds max_page_size {}",
                self.page_size, self.max_page_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        registry
            .register(
                ModelDef::new("authors", "authors", ["id", "handle"]).alias_column("handle"),
            )
            .unwrap()
            .register(
                ModelDef::new("posts", "posts", ["id", "title", "body", "author_id"])
                    .belongs_to("author", "authors", "author_id"),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_defaults_from_json() {
        let options: Options = serde_json::from_str(r#"{"model": "posts"}"#).unwrap();
        assert_eq!(options, Options::new("posts"));
        assert_eq!(options.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(options.id_column, "id");
    }

    #[test]
    fn test_single_string_lists() {
        let options: Options = serde_json::from_str(
            r#"{"model": "posts", "search_fields": "title", "scope_models": ["authors"]}"#,
        )
        .unwrap();
        assert_eq!(options.search_fields, vec!["title"]);
        assert_eq!(options.scope_models, vec!["authors"]);
    }

    #[test]
    fn test_validate_accepts_consistent_options() {
        let options = Options::new("posts")
            .search_fields(["title", "body"])
            .scope_models(["authors"])
            .include(["author"])
            .restricted_fields(["author_id"]);
        options.validate(&registry()).unwrap();
    }

    #[test]
    fn test_validate_rejects_unknown_names() {
        let registry = registry();

        let err = Options::new("comments").validate(&registry).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownModel(_)));

        let err = Options::new("posts")
            .search_fields(["summary"])
            .validate(&registry)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownColumn { context: "search_fields", .. }));

        let err = Options::new("posts")
            .include(["editor"])
            .validate(&registry)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRelation { .. }));

        let err = Options::new("posts")
            .scope_models(["tags"])
            .validate(&registry)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnrelatedScope { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_page_sizes() {
        let registry = registry();
        assert!(Options::new("posts").page_size(0).validate(&registry).is_err());
        assert!(
            Options::new("posts")
                .page_size(50)
                .max_page_size(10)
                .validate(&registry)
                .is_err()
        );
    }

    #[test]
    fn test_visibility() {
        let options = Options::new("posts").allowed_fields(["id", "title"]);
        assert!(options.is_visible("title"));
        assert!(!options.is_visible("body"));
        assert!(Options::new("posts").is_visible("body"));
    }
}
