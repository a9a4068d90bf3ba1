//! Storage seam of the tracking core
//!
//! The engine only talks to a [`TrackingStore`]. Implementations must make
//! `insert_active_session` and `complete_active_session` atomic: the first
//! never lets a user hold two active sessions, the second never leaves a
//! window where both (or neither) of the active and completed records exist.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::TrackingResult,
    models::{
        ActiveSession, CompletedSession, CostCenter, NewActiveSession, NewCompletedSession,
        Project, User,
    },
};

pub mod memory;

pub use memory::MemoryStore;

#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// All users ordered by name
    async fn list_users(&self) -> TrackingResult<Vec<User>>;

    async fn find_user(&self, id: Uuid) -> TrackingResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> TrackingResult<Option<User>>;

    /// Insert a user; fails with `DuplicateUsername`
    async fn create_user(&self, user: &User) -> TrackingResult<User>;

    /// Replace a user; fails with `NotFound` or `DuplicateUsername`
    async fn update_user(&self, user: &User) -> TrackingResult<User>;

    /// Delete a user together with its active and completed sessions
    async fn delete_user(&self, id: Uuid) -> TrackingResult<()>;

    async fn list_cost_centers(&self) -> TrackingResult<Vec<CostCenter>>;

    async fn find_cost_center(&self, id: Uuid) -> TrackingResult<Option<CostCenter>>;

    async fn create_cost_center(&self, cost_center: &CostCenter) -> TrackingResult<CostCenter>;

    async fn update_cost_center(&self, cost_center: &CostCenter) -> TrackingResult<CostCenter>;

    /// Delete a cost center; projects lose the link and users lose membership
    async fn delete_cost_center(&self, id: Uuid) -> TrackingResult<()>;

    /// All projects ordered by name
    async fn list_projects(&self) -> TrackingResult<Vec<Project>>;

    async fn find_project(&self, id: Uuid) -> TrackingResult<Option<Project>>;

    async fn create_project(&self, project: &Project) -> TrackingResult<Project>;

    async fn update_project(&self, project: &Project) -> TrackingResult<Project>;

    /// Delete a project together with its active and completed sessions
    async fn delete_project(&self, id: Uuid) -> TrackingResult<()>;

    /// All active sessions ordered by start time
    async fn list_active_sessions(&self) -> TrackingResult<Vec<ActiveSession>>;

    async fn find_active_session(&self, user_id: Uuid) -> TrackingResult<Option<ActiveSession>>;

    /// Insert an active session; fails with `SessionAlreadyActive` when the
    /// user already holds one
    async fn insert_active_session(&self, session: NewActiveSession)
    -> TrackingResult<ActiveSession>;

    /// Remove the active session `active_id` of `user_id` and append
    /// `completed` in one step; fails with `NoActiveSession` when that
    /// active session is gone
    async fn complete_active_session(
        &self,
        user_id: Uuid,
        active_id: i64,
        completed: NewCompletedSession,
    ) -> TrackingResult<CompletedSession>;

    /// Completed sessions, newest first
    async fn list_completed_sessions(&self) -> TrackingResult<Vec<CompletedSession>>;

    /// Append a completed session without touching active sessions
    async fn append_completed_session(
        &self,
        session: NewCompletedSession,
    ) -> TrackingResult<CompletedSession>;
}
