pub mod database;
pub mod group;
pub mod permission;
pub mod registry;
pub mod token;
pub mod user;

pub use database::Database;
pub use group::{GroupSearchFilters, GroupUpdate, PermissionGroupRepository, PermissionGroupService};
pub use permission::{PermissionRepository, PermissionService};
pub use registry::{ServiceRegistry, ServiceRepository};
pub use token::{TokenClaims, TokenResponse, TokenService};
pub use user::{PasswordHasher, UserRepository, UserService};
