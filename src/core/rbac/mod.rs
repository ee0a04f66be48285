//! Role/permission administration module

pub mod api;
pub mod service;

pub use api::{AdminApiState, admin_api_router, require_admin};
pub use service::{RbacError, RoleService};
