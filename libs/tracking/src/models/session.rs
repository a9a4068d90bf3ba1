//! Active and completed work session models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::format;

/// In-progress work interval of one user on one project
///
/// `user_name` and `project_name` are snapshots taken when the session
/// started; renaming the user or project later does not touch them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    pub id: i64,
    pub user_id: Uuid,
    pub user_name: String,
    pub project_id: Uuid,
    pub project_name: String,
    pub start_time: DateTime<Utc>,
}

impl ActiveSession {
    /// Whole seconds elapsed since the session started, never negative
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        format::elapsed_seconds(now, self.start_time)
    }
}

/// Active session insertion payload; the store assigns the id
#[derive(Debug, Clone, PartialEq)]
pub struct NewActiveSession {
    pub user_id: Uuid,
    pub user_name: String,
    pub project_id: Uuid,
    pub project_name: String,
    pub start_time: DateTime<Utc>,
}

/// Immutable record of a finished session
///
/// `timestamp` is the instant the work began, not when it was stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSession {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub employee_id: Uuid,
    pub employee_name: String,
    pub project_id: Uuid,
    pub project_name: String,
    pub duration_minutes: i64,
    pub duration_formatted: String,
}

/// Completed session insertion payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCompletedSession {
    pub timestamp: DateTime<Utc>,
    pub employee_id: Uuid,
    pub employee_name: String,
    pub project_id: Uuid,
    pub project_name: String,
    pub duration_minutes: i64,
    pub duration_formatted: String,
}

impl NewCompletedSession {
    /// Convert a stopped active session into its ledger record
    pub fn from_active(active: &ActiveSession, duration_minutes: i64) -> Self {
        Self {
            timestamp: active.start_time,
            employee_id: active.user_id,
            employee_name: active.user_name.clone(),
            project_id: active.project_id,
            project_name: active.project_name.clone(),
            duration_minutes,
            duration_formatted: format::format_duration_minutes(duration_minutes),
        }
    }

    pub fn with_id(self, id: i64) -> CompletedSession {
        CompletedSession {
            id,
            timestamp: self.timestamp,
            employee_id: self.employee_id,
            employee_name: self.employee_name,
            project_id: self.project_id,
            project_name: self.project_name,
            duration_minutes: self.duration_minutes,
            duration_formatted: self.duration_formatted,
        }
    }
}

impl NewActiveSession {
    pub fn with_id(self, id: i64) -> ActiveSession {
        ActiveSession {
            id,
            user_id: self.user_id,
            user_name: self.user_name,
            project_id: self.project_id,
            project_name: self.project_name,
            start_time: self.start_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn active() -> ActiveSession {
        ActiveSession {
            id: 7,
            user_id: Uuid::new_v4(),
            user_name: "Peter".to_string(),
            project_id: Uuid::new_v4(),
            project_name: "Warehouse".to_string(),
            start_time: Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_completed_record_keeps_start_time_and_snapshots() {
        let active = active();
        let record = NewCompletedSession::from_active(&active, 95);

        assert_eq!(record.timestamp, active.start_time);
        assert_eq!(record.employee_name, "Peter");
        assert_eq!(record.project_name, "Warehouse");
        assert_eq!(record.duration_formatted, "1h 35m");
    }

    #[test]
    fn test_elapsed_is_clamped_before_start() {
        let active = active();
        assert_eq!(active.elapsed_seconds(active.start_time - Duration::seconds(5)), 0);
        assert_eq!(active.elapsed_seconds(active.start_time + Duration::seconds(61)), 61);
    }
}
