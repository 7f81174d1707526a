//! Model definitions for the dynamic query layer.
//!
//! Every resource is backed by one table described by a [`ModelDef`]. Models
//! refer to each other through belongs-to [`Relation`]s, which drive scoping,
//! includes and foreign-key resolution.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::ConfigError;

fn default_primary_key() -> String {
    "id".to_string()
}

/// A belongs-to relation: `foreign_key` on this table points at the primary
/// key of `model`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Name used in payloads, route params and includes (e.g. "author")
    pub name: String,
    /// Target model name (e.g. "authors")
    pub model: String,
    /// Column on this table holding the target's primary key (e.g. "author_id")
    pub foreign_key: String,
}

/// Table-level description of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDef {
    pub name: String,
    pub table: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    pub columns: Vec<String>,
    /// Human-readable unique handle (slug, username) accepted in place of ids
    #[serde(default)]
    pub alias_column: Option<String>,
    /// Externally visible UUID accepted in place of ids
    #[serde(default)]
    pub uuid_column: Option<String>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl ModelDef {
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            primary_key: default_primary_key(),
            columns: columns.into_iter().map(Into::into).collect(),
            alias_column: None,
            uuid_column: None,
            relations: Vec::new(),
        }
    }

    #[must_use]
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    #[must_use]
    pub fn alias_column(mut self, column: impl Into<String>) -> Self {
        self.alias_column = Some(column.into());
        self
    }

    #[must_use]
    pub fn uuid_column(mut self, column: impl Into<String>) -> Self {
        self.uuid_column = Some(column.into());
        self
    }

    #[must_use]
    pub fn belongs_to(
        mut self,
        name: impl Into<String>,
        model: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.relations.push(Relation {
            name: name.into(),
            model: model.into(),
            foreign_key: foreign_key.into(),
        });
        self
    }

    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Relation used to scope by `scope`, matched by relation name or target model
    #[must_use]
    pub fn scope_relation(&self, scope: &str) -> Option<&Relation> {
        self.relation(scope)
            .or_else(|| self.relations.iter().find(|r| r.model == scope))
    }

    fn require_column(&self, column: &str, context: &'static str) -> Result<(), ConfigError> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(ConfigError::UnknownColumn {
                model: self.name.clone(),
                column: column.to_string(),
                context,
            })
        }
    }

    fn validate_columns(&self) -> Result<(), ConfigError> {
        self.require_column(&self.primary_key, "primary_key")?;
        if let Some(alias) = &self.alias_column {
            self.require_column(alias, "alias_column")?;
        }
        if let Some(uuid) = &self.uuid_column {
            self.require_column(uuid, "uuid_column")?;
        }
        for relation in &self.relations {
            self.require_column(&relation.foreign_key, "relations.foreign_key")?;
        }
        Ok(())
    }
}

/// All models known to an application, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<ModelDef>>,
}

impl ModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model after checking its own columns. Relation targets are
    /// checked by [`ModelRegistry::validate`] once every model is present.
    ///
    /// # Errors
    /// Returns `ConfigError` on undeclared columns or a duplicate name.
    pub fn register(&mut self, model: ModelDef) -> Result<&mut Self, ConfigError> {
        model.validate_columns()?;
        if self.models.contains_key(&model.name) {
            return Err(ConfigError::DuplicateModel(model.name));
        }
        self.models.insert(model.name.clone(), Arc::new(model));
        Ok(self)
    }

    /// # Errors
    /// Returns `ConfigError::UnknownModel` when no model has this name.
    pub fn get(&self, name: &str) -> Result<Arc<ModelDef>, ConfigError> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownModel(name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Check that every relation points at a registered model.
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownModel` for the first dangling relation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for model in self.models.values() {
            for relation in &model.relations {
                if !self.contains(&relation.model) {
                    return Err(ConfigError::UnknownModel(relation.model.clone()));
                }
            }
        }
        Ok(())
    }

    pub fn models(&self) -> impl Iterator<Item = &Arc<ModelDef>> {
        self.models.values()
    }
}
