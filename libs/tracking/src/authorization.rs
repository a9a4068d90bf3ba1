//! Role based authorization
//!
//! All permission decisions go through [`authorize`]; the engine itself does
//! not branch on roles except for the kiosk actor rule.

use uuid::Uuid;

use crate::{
    error::{TrackingError, TrackingResult},
    models::Role,
};

/// Operations guarded by role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ManageUsers,
    ManageCostCenters,
    ManageProjects,
    ViewEvaluation,
    ViewAllSessions,
    ControlOwnSession,
    ControlAnySession,
    ExportSessions,
}

/// Whether `role` holds `permission`
pub fn is_allowed(role: Role, permission: Permission) -> bool {
    match permission {
        Permission::ManageUsers | Permission::ManageCostCenters => role == Role::Admin,
        Permission::ManageProjects
        | Permission::ViewEvaluation
        | Permission::ViewAllSessions
        | Permission::ControlAnySession
        | Permission::ExportSessions => role.is_privileged(),
        Permission::ControlOwnSession => true,
    }
}

/// Fail with `Forbidden` unless `role` holds `permission`
pub fn authorize(role: Role, permission: Permission) -> TrackingResult<()> {
    if is_allowed(role, permission) {
        Ok(())
    } else {
        Err(TrackingError::Forbidden)
    }
}

/// Start/stop on behalf of `target` is allowed for oneself, or for anyone
/// with `ControlAnySession`
pub fn authorize_session_control(role: Role, actor_id: Uuid, target: Uuid) -> TrackingResult<()> {
    if actor_id == target {
        authorize(role, Permission::ControlOwnSession)
    } else {
        authorize(role, Permission::ControlAnySession)
    }
}
