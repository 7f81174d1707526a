use sea_orm::{DatabaseBackend, sea_query::Value};
use uuid::Uuid;

use super::values::string_value;
use crate::core::ModelDef;
use crate::errors::ApiError;

/// An externally supplied reference to a record: its numeric id, its uuid or
/// its alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Id(i64),
    Uuid(Uuid),
    Alias(String),
}

impl Identifier {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(id) = trimmed.parse::<i64>() {
            Self::Id(id)
        } else if let Ok(uuid) = Uuid::parse_str(trimmed) {
            Self::Uuid(uuid)
        } else {
            Self::Alias(trimmed.to_string())
        }
    }

    /// Parse a JSON payload value; `None` for values that cannot identify a row
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().map(Self::Id),
            serde_json::Value::String(s) => Some(Self::parse(s)),
            _ => None,
        }
    }

    /// Column and bound value that locate this identifier in `model`'s table.
    ///
    /// # Errors
    /// Returns 400 when the model declares no column for this kind of
    /// identifier (e.g. an alias for a model without `alias_column`).
    pub fn lookup(&self, model: &ModelDef, backend: DatabaseBackend) -> Result<(String, Value), ApiError> {
        match self {
            Self::Id(id) => Ok((model.primary_key.clone(), Value::BigInt(Some(*id)))),
            Self::Uuid(uuid) => {
                let column = model.uuid_column.clone().ok_or_else(|| {
                    ApiError::bad_request(format!("{} cannot be referenced by uuid", model.name))
                })?;
                Ok((column, string_value(&uuid.to_string(), backend)))
            }
            Self::Alias(alias) => {
                let column = model.alias_column.clone().ok_or_else(|| {
                    ApiError::bad_request(format!("{} cannot be referenced by '{alias}'", model.name))
                })?;
                Ok((column, string_value(alias, backend)))
            }
        }
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Uuid(uuid) => write!(f, "{uuid}"),
            Self::Alias(alias) => write!(f, "{alias}"),
        }
    }
}
