//! # Request-to-Query Translation
//!
//! Everything that turns merged request parameters into sea-query fragments
//! for list queries.
//!
//! ## Query Parameter Examples
//!
//! ```text
//! GET /posts?title_like=rust&priority_gte=3      column filters
//! GET /posts?author_id=null                      IS NULL
//! GET /posts?id=1,2,3                            IN (...)
//! GET /posts?q=async                             search across search_fields
//! GET /posts?sort=-created_at                    descending sort
//! GET /posts?sort=title&order=DESC               explicit order
//! GET /posts?page=2&limit=10                     page window
//! GET /authors/ada/posts                         relation scope (author = ada)
//! GET /posts?include=author                      nest related records
//! ```

pub mod conditions;
pub mod pagination;
pub mod scope;
pub mod search;
pub mod sort;

// Re-export commonly used items
pub use conditions::{FilterOperator, RESERVED_PARAMS, apply_filters};
pub use pagination::{PageInfo, Pagination, calculate_content_range, page_count, page_info, parse_pagination};
pub use scope::{FilterInclude, build_filter_includes, scope_param_keys};
pub use search::{build_like_condition, build_search_condition};
pub use sort::{SortConfig, parse_sorting};
