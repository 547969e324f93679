//! Token authentication for the four account roles.

pub mod handlers;
pub mod middleware;
pub mod password;
pub mod token;

pub use middleware::{require_role, AuthContext, RoleGate};
