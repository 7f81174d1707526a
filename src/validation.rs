//! Restricted-field guard
//!
//! Resources may declare `restricted_fields`: columns a client can never
//! mass-assign through create/update (ownership columns, roles, counters).
//! The guard runs on the raw client payload before hooks, foreign-key
//! resolution or any database access.
//!
//! ```rust,ignore
//! let options = Options::new("posts").restricted_fields(["author_id", "published"]);
//! // {"title": "x", "published": true} -> 403 "Field(s) not writable: published"
//! ```

use crate::core::{ModelDef, Options};
use crate::database::Record;
use crate::errors::ApiError;

/// Reject a payload carrying any restricted field.
///
/// A restricted foreign key is also denied under its relation name, since the
/// foreign-key resolver would otherwise translate it back into the column.
///
/// # Errors
/// Returns `ApiError::RestrictedFields` naming every offending key.
pub fn check_restricted_fields(payload: &Record, options: &Options, model: &ModelDef) -> Result<(), ApiError> {
    let offending: Vec<String> = payload
        .keys()
        .filter(|key| {
            options.is_restricted(key)
                || model
                    .relation(key)
                    .is_some_and(|relation| options.is_restricted(&relation.foreign_key))
        })
        .cloned()
        .collect();

    if offending.is_empty() {
        Ok(())
    } else {
        tracing::debug!(fields = ?offending, model = %model.name, "restricted fields in payload");
        Err(ApiError::restricted_fields(offending))
    }
}

/// Drop keys that are neither columns nor relation names, logging each one.
pub fn retain_known_fields(payload: &mut Record, model: &ModelDef) {
    payload.retain(|key, _| {
        let known = model.has_column(key) || model.relation(key).is_some();
        if !known {
            tracing::debug!(field = %key, model = %model.name, "ignoring unknown field");
        }
        known
    });
}

/// Reject integers no column can hold (outside the `i64` range).
///
/// # Errors
/// Returns `ApiError::ValidationFailed` (422) naming every offending field.
pub fn check_integer_ranges(payload: &Record) -> Result<(), ApiError> {
    let errors: Vec<String> = payload
        .iter()
        .filter(|(_, value)| value.as_u64().is_some_and(|n| i64::try_from(n).is_err()))
        .map(|(key, _)| format!("{key} is out of range"))
        .collect();

    if errors.is_empty() { Ok(()) } else { Err(ApiError::validation_failed(errors)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model() -> ModelDef {
        ModelDef::new("posts", "posts", ["id", "title", "published", "author_id"])
            .belongs_to("author", "authors", "author_id")
    }

    fn payload(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_allows_clean_payload() {
        let options = Options::new("posts").restricted_fields(["published"]);
        let body = payload(json!({"title": "Hello"}));
        assert!(check_restricted_fields(&body, &options, &model()).is_ok());
    }

    #[test]
    fn test_rejects_every_restricted_field() {
        let options = Options::new("posts").restricted_fields(["published", "id"]);
        let body = payload(json!({"id": 9, "title": "Hello", "published": true}));

        let err = check_restricted_fields(&body, &options, &model()).unwrap_err();
        match err {
            ApiError::RestrictedFields { fields } => {
                assert_eq!(fields, vec!["id".to_string(), "published".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_restricted_foreign_key_blocks_relation_name() {
        let options = Options::new("posts").restricted_fields(["author_id"]);
        let body = payload(json!({"title": "Hello", "author": "ada"}));
        assert!(check_restricted_fields(&body, &options, &model()).is_err());
    }

    #[test]
    fn test_null_value_still_counts() {
        let options = Options::new("posts").restricted_fields(["published"]);
        let body = payload(json!({"published": null}));
        assert!(check_restricted_fields(&body, &options, &model()).is_err());
    }

    #[test]
    fn test_retain_known_fields() {
        let mut body = payload(json!({"title": "x", "author": "ada", "bogus": 1}));
        retain_known_fields(&mut body, &model());
        assert!(body.contains_key("title"));
        assert!(body.contains_key("author"));
        assert!(!body.contains_key("bogus"));
    }

    #[test]
    fn test_integer_ranges() {
        let body = payload(json!({"priority": i64::MAX, "floor": i64::MIN, "ratio": 1.5}));
        assert!(check_integer_ranges(&body).is_ok());

        let body = payload(json!({"title": "x", "priority": u64::MAX}));
        match check_integer_ranges(&body).unwrap_err() {
            ApiError::ValidationFailed { errors } => {
                assert_eq!(errors, vec!["priority is out of range".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
