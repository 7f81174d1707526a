// Building blocks shared by the query handler and the controller:
// request context, model definitions and per-resource options.

pub mod context;
pub mod model;
pub mod options;

// Re-export commonly used items
pub use context::{ContextState, Params, RequestContext, merge_params};
pub use model::{ModelDef, ModelRegistry, Relation};
pub use options::Options;
