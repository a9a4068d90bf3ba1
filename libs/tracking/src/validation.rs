//! Input validation for registry payloads

use regex::Regex;
use std::sync::OnceLock;

use crate::{
    error::{TrackingError, TrackingResult},
    models::{CostCenterPayload, NewUser, ProjectPayload},
};

/// Validate a required free-text field
pub fn validate_required(field: &str, value: &str) -> TrackingResult<()> {
    if value.trim().is_empty() {
        return Err(TrackingError::validation(format!("{} is required", field)));
    }

    if value.chars().count() > 200 {
        return Err(TrackingError::validation(format!(
            "{} must be at most 200 characters long",
            field
        )));
    }

    Ok(())
}

/// Validate username
pub fn validate_username(username: &str) -> TrackingResult<()> {
    if username.is_empty() {
        return Err(TrackingError::validation("Username is required"));
    }

    if username.len() < 3 {
        return Err(TrackingError::validation(
            "Username must be at least 3 characters long",
        ));
    }

    if username.len() > 32 {
        return Err(TrackingError::validation(
            "Username must be at most 32 characters long",
        ));
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_.\-]+$").expect("Failed to compile username regex")
    });

    if !regex.is_match(username) {
        return Err(TrackingError::validation(
            "Username can only contain letters, numbers, dots, dashes and underscores",
        ));
    }

    Ok(())
}

/// Validate a password; only presence is enforced
pub fn validate_password(password: &str) -> TrackingResult<()> {
    if password.is_empty() {
        return Err(TrackingError::validation("Password is required"));
    }

    Ok(())
}

pub fn validate_new_user(user: &NewUser) -> TrackingResult<()> {
    validate_required("Name", &user.name)?;
    validate_username(&user.username)?;
    validate_password(&user.password)
}

pub fn validate_cost_center(payload: &CostCenterPayload) -> TrackingResult<()> {
    validate_required("Cost center name", &payload.name)
}

pub fn validate_project(payload: &ProjectPayload) -> TrackingResult<()> {
    validate_required("Project name", &payload.name)?;

    if !payload.budget.is_finite() || payload.budget < 0.0 {
        return Err(TrackingError::validation(
            "Budget must be a non-negative amount",
        ));
    }

    if let Some(hours) = payload.estimated_hours {
        if !hours.is_finite() || hours <= 0.0 {
            return Err(TrackingError::validation(
                "Estimated hours must be a positive number",
            ));
        }
    }

    Ok(())
}
