//! Cost center model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Organisational grouping of projects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostCenter {
    pub id: Uuid,
    pub name: String,
}

/// Cost center creation/update payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostCenterPayload {
    pub name: String,
}
