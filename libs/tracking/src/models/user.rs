//! User model and related functionality

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// User entity
///
/// The password is an opaque credential compared verbatim at login and is
/// never serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    pub blocked: bool,
    pub can_select_project_manually: bool,
    pub cost_center_ids: Vec<Uuid>,
}

impl User {
    pub fn belongs_to_cost_center(&self, cost_center_id: Uuid) -> bool {
        self.cost_center_ids.contains(&cost_center_id)
    }
}

/// New user creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub can_select_project_manually: bool,
    #[serde(default)]
    pub cost_center_ids: Vec<Uuid>,
}

/// User update payload
///
/// `password` is applied only when present and non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub blocked: Option<bool>,
    pub can_select_project_manually: Option<bool>,
    pub cost_center_ids: Option<Vec<Uuid>>,
}

/// User login credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}
