//! Tracking domain models

pub mod cost_center;
pub mod project;
pub mod role;
pub mod session;
pub mod user;

// Re-export for convenience
pub use cost_center::{CostCenter, CostCenterPayload};
pub use project::{Project, ProjectPayload};
pub use role::Role;
pub use session::{ActiveSession, CompletedSession, NewActiveSession, NewCompletedSession};
pub use user::{Credentials, NewUser, UpdateUser, User};
