/// Admin role management
pub mod roles;

pub use roles::{AdminRole, AdminRoleManager, Role};
