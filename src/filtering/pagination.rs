use hyper::HeaderMap;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use utoipa::ToSchema;

use crate::core::{Options, Params};
use crate::errors::ApiError;

/// Largest offset the database drivers bind (signed 64-bit)
const MAX_OFFSET: u64 = i64::MAX.unsigned_abs();

/// Resolved page window for one list request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page number
    pub page: u64,
    pub limit: u64,
    pub offset: u64,
}

/// Page-info envelope returned alongside list results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total: u64,
    pub pages: u64,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
    pub offset: u64,
    pub limit: u64,
}

fn parse_positive(params: &Params, key: &str) -> Result<Option<u64>, ApiError> {
    let Some(raw) = params.get(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(ApiError::bad_request(format!(
            "'{key}' must be a positive integer, got '{raw}'"
        ))),
        Ok(value) => Ok(Some(value)),
    }
}

/// Read `page`, `limit` (or `per_page`) and `offset` from the merged params.
///
/// `limit` defaults to the resource page size and is clamped to its maximum.
/// An explicit `offset` wins over `page`.
///
/// # Errors
/// Returns 400 for non-numeric or zero `page`/`limit` values and non-numeric
/// offsets.
pub fn parse_pagination(params: &Params, options: &Options) -> Result<Pagination, ApiError> {
    let limit = match parse_positive(params, "limit")? {
        Some(limit) => Some(limit),
        None => parse_positive(params, "per_page")?,
    }
    .unwrap_or(options.page_size)
    .min(options.max_page_size);

    if let Some(raw) = params.get("offset") {
        let offset = raw.trim().parse::<u64>().map_err(|_| {
            ApiError::bad_request(format!("'offset' must be a non-negative integer, got '{raw}'"))
        })?;
        if offset > MAX_OFFSET {
            return Err(ApiError::bad_request(format!("'offset' is too large, got '{raw}'")));
        }
        return Ok(Pagination {
            page: offset / limit + 1,
            limit,
            offset,
        });
    }

    let page = parse_positive(params, "page")?.unwrap_or(1);
    let offset = (page - 1)
        .checked_mul(limit)
        .filter(|offset| *offset <= MAX_OFFSET)
        .ok_or_else(|| ApiError::bad_request(format!("'page' is too large, got '{page}'")))?;
    Ok(Pagination { page, limit, offset })
}

/// Total number of pages for `total` rows
#[must_use]
pub const fn page_count(total: u64, limit: u64) -> u64 {
    if limit == 0 { 0 } else { total.div_ceil(limit) }
}

fn page_link(path: &str, query: &Params, page: u64, limit: u64) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in query {
        if matches!(key.as_str(), "page" | "offset" | "limit" | "per_page") {
            continue;
        }
        serializer.append_pair(key, value);
    }
    serializer.append_pair("page", &page.to_string());
    serializer.append_pair("limit", &limit.to_string());
    format!("{path}?{}", serializer.finish())
}

/// Build the page-info envelope.
///
/// `query` is the original query string only (not route params), so links
/// reproduce the client's filters. A page past the end links back to the last
/// page.
#[must_use]
pub fn page_info(total: u64, pagination: &Pagination, path: &str, query: &Params) -> PageInfo {
    let pages = page_count(total, pagination.limit);
    let current = pagination.page;

    let prev_url = (current > 1 && pages > 0)
        .then(|| page_link(path, query, (current - 1).min(pages), pagination.limit));
    let next_url = (current < pages).then(|| page_link(path, query, current + 1, pagination.limit));

    PageInfo {
        total,
        pages,
        prev_url,
        next_url,
        offset: pagination.offset,
        limit: pagination.limit,
    }
}

/// Sanitize resource name by removing control characters for HTTP headers
fn sanitize_resource_name(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii() && !c.is_ascii_control()).collect()
}

/// Build the `Content-Range` header for a list response, e.g. `posts 0-24/310`.
#[must_use]
pub fn calculate_content_range(offset: u64, limit: u64, total_count: u64, resource_name: &str) -> HeaderMap {
    let last = offset
        .saturating_add(limit)
        .saturating_sub(1)
        .min(total_count.saturating_sub(1));
    let safe_name = sanitize_resource_name(resource_name);

    let mut headers = HeaderMap::new();
    if let Ok(value) = format!("{safe_name} {offset}-{last}/{total_count}").parse() {
        headers.insert("Content-Range", value);
    }
    headers
}
