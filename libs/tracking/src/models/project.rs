//! Project model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Project entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub budget: f64,
    pub deadline: NaiveDate,
    pub closed: bool,
    pub estimated_hours: Option<f64>,
    pub cost_center_id: Option<Uuid>,
}

impl Project {
    /// Whether the project may receive new active sessions
    pub fn is_open(&self) -> bool {
        !self.closed
    }
}

/// Project creation/update payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPayload {
    pub name: String,
    pub budget: f64,
    pub deadline: NaiveDate,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub cost_center_id: Option<Uuid>,
}
