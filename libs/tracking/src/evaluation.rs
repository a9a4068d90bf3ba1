//! Project evaluation engine
//!
//! Pure, read-only aggregation of completed sessions per project. Time
//! totals respect the requested window while cost, variance and progress
//! always use the project's whole history, since budget consumption is
//! cumulative.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use crate::{
    error::{TrackingError, TrackingResult},
    models::{CompletedSession, Project},
};

/// Inclusive instant range used to filter sessions by their start timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvaluationWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl EvaluationWindow {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> TrackingResult<Self> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(TrackingError::Validation(
                    "Window start must not be after its end".to_string(),
                ));
            }
        }
        Ok(Self { start, end })
    }

    /// Window covering whole calendar days (UTC), both ends inclusive
    pub fn from_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> TrackingResult<Self> {
        let start = start.map(|d| d.and_time(NaiveTime::MIN).and_utc());
        let end = end
            .and_then(|d| d.and_hms_nano_opt(23, 59, 59, 999_999_999))
            .map(|dt| dt.and_utc());
        Self::new(start, end)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| start <= instant) && self.end.is_none_or(|end| instant <= end)
    }
}

/// Per-employee totals inside the window
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBreakdown {
    /// Name on the most recent session
    pub name: String,
    pub total_time: i64,
    pub session_count: usize,
}

/// Derived metrics of one project; never stored
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEvaluation {
    pub project_id: Uuid,
    pub project_name: String,
    pub budget: f64,
    pub deadline: NaiveDate,
    pub closed: bool,
    pub estimated_hours: Option<f64>,
    /// Minutes worked inside the window
    pub total_time: i64,
    pub unique_users: usize,
    pub session_count: usize,
    pub average_session_minutes: f64,
    pub user_breakdown: BTreeMap<Uuid, UserBreakdown>,
    pub total_lifetime_hours: f64,
    pub cost_per_hour: f64,
    /// Lifetime hours against the estimate in percent, unclamped
    pub work_progress_percentage: Option<f64>,
    /// Lifetime hours minus estimate; positive is an overrun
    pub time_variance: Option<f64>,
}

impl ProjectEvaluation {
    /// Progress clamped to `[0, 100]` for progress bars
    pub fn progress_for_display(&self) -> Option<f64> {
        self.work_progress_percentage.map(|p| p.clamp(0.0, 100.0))
    }
}

/// Evaluate one project against the session ledger
pub fn evaluate_project(
    project: &Project,
    sessions: &[CompletedSession],
    window: Option<&EvaluationWindow>,
) -> ProjectEvaluation {
    let lifetime: Vec<&CompletedSession> = sessions
        .iter()
        .filter(|s| s.project_id == project.id)
        .collect();

    let mut in_window: Vec<&CompletedSession> = lifetime
        .iter()
        .copied()
        .filter(|s| window.is_none_or(|w| w.contains(s.timestamp)))
        .collect();
    // Oldest first so the last write per employee carries the latest name.
    in_window.sort_by_key(|s| (s.timestamp, s.id));

    let total_time: i64 = in_window.iter().map(|s| s.duration_minutes).sum();
    let session_count = in_window.len();
    let unique_users = in_window
        .iter()
        .map(|s| s.employee_id)
        .collect::<HashSet<_>>()
        .len();
    let average_session_minutes = if session_count > 0 {
        total_time as f64 / session_count as f64
    } else {
        0.0
    };

    let mut user_breakdown: BTreeMap<Uuid, UserBreakdown> = BTreeMap::new();
    for session in &in_window {
        let entry = user_breakdown
            .entry(session.employee_id)
            .or_insert_with(|| UserBreakdown {
                name: String::new(),
                total_time: 0,
                session_count: 0,
            });
        entry.name = session.employee_name.clone();
        entry.total_time += session.duration_minutes;
        entry.session_count += 1;
    }

    let lifetime_minutes: i64 = lifetime.iter().map(|s| s.duration_minutes).sum();
    let total_lifetime_hours = lifetime_minutes as f64 / 60.0;

    let cost_per_hour = if total_lifetime_hours > 0.0 {
        project.budget / total_lifetime_hours
    } else {
        0.0
    };

    let time_variance = project
        .estimated_hours
        .map(|estimate| total_lifetime_hours - estimate);

    let work_progress_percentage = project
        .estimated_hours
        .filter(|estimate| *estimate != 0.0)
        .map(|estimate| total_lifetime_hours * 100.0 / estimate);

    ProjectEvaluation {
        project_id: project.id,
        project_name: project.name.clone(),
        budget: project.budget,
        deadline: project.deadline,
        closed: project.closed,
        estimated_hours: project.estimated_hours,
        total_time,
        unique_users,
        session_count,
        average_session_minutes,
        user_breakdown,
        total_lifetime_hours,
        cost_per_hour,
        work_progress_percentage,
        time_variance,
    }
}

/// Evaluate every project
///
/// With `window = None` (lifetime mode) every project is returned, including
/// those without sessions. With a window, projects that have no session in
/// it are omitted. Results are ordered by project name.
pub fn evaluate_projects(
    projects: &[Project],
    sessions: &[CompletedSession],
    window: Option<&EvaluationWindow>,
) -> Vec<ProjectEvaluation> {
    let mut evaluations: Vec<ProjectEvaluation> = projects
        .iter()
        .map(|project| evaluate_project(project, sessions, window))
        .filter(|evaluation| window.is_none() || evaluation.session_count > 0)
        .collect();

    evaluations.sort_by(|a, b| {
        a.project_name
            .to_lowercase()
            .cmp(&b.project_name.to_lowercase())
            .then(a.project_id.cmp(&b.project_id))
    });
    evaluations
}
