//! # restcontroller
//!
//! Convention-over-configuration REST controllers over SeaORM.
//!
//! A resource is a model (table, columns, relations) plus [`Options`]. The
//! [`Controller`] serves `index`, `show`, `create`, `update` and `destroy`
//! through a [`RestQuery`], adding an authorization call-out, lifecycle hooks
//! and a non-blocking event channel. [`routes::router`] mounts it on axum.
//!
//! ```rust,ignore
//! let config = AppConfig::from_path("blog.json")?;
//! let registry = Arc::new(config.build_registry()?);
//! let options = config.resource("posts").cloned().unwrap_or_else(|| Options::new("posts"));
//!
//! let posts = Arc::new(Controller::new(RestQuery::new(db, registry, options)?));
//! let app = Router::new()
//!     .nest("/posts", router(posts.clone()))
//!     .nest("/authors/{author}/posts", router(posts));
//! ```

pub mod config;
pub mod controller;
pub mod core;
pub mod database;
pub mod errors;
pub mod filtering;
pub mod operations;
pub mod routes;
pub mod validation;

pub use config::AppConfig;
pub use controller::{
    Action, AllowAll, Authorize, Controller, ControllerEvent, ControllerHooks, EventEmitter, NoHooks, Phase,
};
pub use crate::core::{ContextState, ModelDef, ModelRegistry, Options, Params, Relation, RequestContext, merge_params};
pub use database::Record;
pub use errors::{ApiError, ConfigError};
pub use filtering::PageInfo;
pub use operations::RestQuery;
pub use routes::router;
pub use serde_with;
