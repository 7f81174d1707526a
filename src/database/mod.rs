//! Thin execution layer over Sea-ORM: statements are built with sea-query and
//! rows come back as JSON records.

pub mod foreign_keys;
pub mod identifiers;
pub mod records;
pub mod values;

// Re-export commonly used items
pub use foreign_keys::{lookup_id, resolve_foreign_keys};
pub use identifiers::Identifier;
pub use records::{Record, count, fetch_all, fetch_one};
pub use values::{json_to_expr, json_to_value, param_to_value, value_key};
