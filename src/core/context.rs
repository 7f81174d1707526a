use axum::http::{Extensions, StatusCode};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::filtering::PageInfo;

/// String-keyed request parameters. Ordered so generated links are stable.
pub type Params = BTreeMap<String, String>;

/// Merge query-string and route parameters into one lookup.
///
/// Route parameters win on collision: `/authors/7/posts?author=3` is scoped to
/// author 7.
#[must_use]
pub fn merge_params(query: &Params, route: &Params) -> Params {
    let mut merged = query.clone();
    for (key, value) in route {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Output slot populated by the controller for a presenter to serialize.
#[derive(Debug, Clone, Default)]
pub struct ContextState {
    pub data: Option<Value>,
    pub page: Option<PageInfo>,
    pub status: Option<StatusCode>,
}

/// Inbound request carrier handed to every controller action.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Request path without the query string, used to build page links
    pub path: String,
    pub query: Params,
    pub params: Params,
    pub body: Option<Value>,
    /// Request extensions, e.g. the principal inserted by an auth middleware
    pub extensions: Extensions,
    pub state: ContextState,
}

impl RequestContext {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_query<K, V>(mut self, query: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(query.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    #[must_use]
    pub fn with_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    /// Query and route parameters combined, route taking precedence
    #[must_use]
    pub fn merged_params(&self) -> Params {
        merge_params(&self.query, &self.params)
    }
}
