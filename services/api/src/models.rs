//! API models for request and response payloads

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracking::{KioskState, RunningTimer, models::User};
use uuid::Uuid;

/// Response for a successful login
#[derive(Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

/// Request to open a session for a user
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub user_id: Uuid,
    pub project_id: Uuid,
}

/// Raw QR payload scanned at a kiosk
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub payload: String,
}

/// Project picked from the kiosk list instead of scanned
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectProjectRequest {
    pub project_id: Uuid,
}

/// Optional inclusive date range of an evaluation
#[derive(Debug, Default, Deserialize)]
pub struct EvaluationQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl EvaluationQuery {
    /// Both bounds absent selects the lifetime mode
    pub fn is_lifetime(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// What a kiosk screen shows right now
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KioskView {
    pub state: KioskState,
    pub user: Option<User>,
    pub active_session: Option<RunningTimer>,
}
