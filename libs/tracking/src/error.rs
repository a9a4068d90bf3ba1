//! Error taxonomy of the tracking core
//!
//! Every expected failure of the session lifecycle is a variant here; only
//! `Database` represents an unexpected condition.

use common::error::DatabaseError;
use thiserror::Error;

/// Error type for all tracking operations
#[derive(Error, Debug)]
pub enum TrackingError {
    /// Username/password pair does not match a user, or the user is blocked
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// QR-identified user does not exist or is blocked
    #[error("User is unknown or blocked")]
    UnknownOrBlockedUser,

    /// Scanned payload carries no known prefix
    #[error("Unrecognized QR code format")]
    UnrecognizedQrFormat,

    /// The user already holds an active session
    #[error("User already has an active session")]
    SessionAlreadyActive,

    /// The project is closed for new sessions
    #[error("Project is closed")]
    ProjectClosed,

    /// The project does not exist
    #[error("Unknown project")]
    UnknownProject,

    /// Stop requested for a user without an active session
    #[error("No active session for this user")]
    NoActiveSession,

    /// Username is already used by another user
    #[error("Username is already taken")]
    DuplicateUsername,

    /// Generic CRUD lookup failure
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Missing or malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// A project token was scanned before anyone logged in
    #[error("Log in before selecting a project")]
    LoginRequired,

    /// The acting role may not perform the operation
    #[error("Operation not permitted for this role")]
    Forbidden,

    /// The user may only start sessions by scanning a project QR code
    #[error("Manual project selection is not enabled for this user")]
    ManualSelectionNotAllowed,

    /// Manually selected project belongs to a cost center the user is not in
    #[error("Project is outside the user's cost centers")]
    ProjectNotInCostCenter,

    /// Storage failure
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl TrackingError {
    /// Stable machine-readable identifier of the error kind
    pub fn code(&self) -> &'static str {
        match self {
            TrackingError::InvalidCredentials => "invalid_credentials",
            TrackingError::UnknownOrBlockedUser => "unknown_or_blocked_user",
            TrackingError::UnrecognizedQrFormat => "unrecognized_qr_format",
            TrackingError::SessionAlreadyActive => "session_already_active",
            TrackingError::ProjectClosed => "project_closed",
            TrackingError::UnknownProject => "unknown_project",
            TrackingError::NoActiveSession => "no_active_session",
            TrackingError::DuplicateUsername => "duplicate_username",
            TrackingError::NotFound(_) => "not_found",
            TrackingError::Validation(_) => "validation_error",
            TrackingError::LoginRequired => "login_required",
            TrackingError::Forbidden => "forbidden",
            TrackingError::ManualSelectionNotAllowed => "manual_selection_not_allowed",
            TrackingError::ProjectNotInCostCenter => "project_not_in_cost_center",
            TrackingError::Database(_) => "database_error",
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        TrackingError::Validation(message.into())
    }
}

/// Type alias for tracking results
pub type TrackingResult<T> = Result<T, TrackingError>;
