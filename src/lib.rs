//! Warden - stateless token authentication and role-based authorization
//!
//! Issues HMAC-signed session tokens at login, authenticates every inbound
//! request from the token alone, and administers the users/roles/permissions
//! graph behind the access-control decisions.

pub mod core;
