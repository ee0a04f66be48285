//! Database repositories
//!
//! Repositories encapsulate data access for the credential store: pure
//! lookups and single-statement mutations, no policy.

pub mod permission;
pub mod role;
pub mod user;

pub use permission::{PermissionRepository, PermissionRepositoryError};
pub use role::{RoleRepository, RoleRepositoryError};
pub use user::{UserRepository, UserRepositoryError};
