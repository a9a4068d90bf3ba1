//! PostgreSQL repositories backing the tracking store

use async_trait::async_trait;
use common::error::DatabaseError;
use sqlx::PgPool;
use tracking::{
    TrackingError, TrackingResult,
    models::{
        ActiveSession, CompletedSession, CostCenter, NewActiveSession, NewCompletedSession,
        Project, User,
    },
    store::TrackingStore,
};
use uuid::Uuid;

pub mod cost_centers;
pub mod projects;
pub mod sessions;
pub mod users;

pub use cost_centers::CostCenterRepository;
pub use projects::ProjectRepository;
pub use sessions::SessionRepository;
pub use users::UserRepository;

/// Map a query failure, translating the constraint violations the engine
/// cares about into their domain errors
pub(crate) fn map_query_error(e: sqlx::Error) -> TrackingError {
    if let Some(db_error) = e.as_database_error() {
        if db_error.is_unique_violation() {
            match db_error.constraint() {
                Some("active_sessions_one_per_user") => {
                    return TrackingError::SessionAlreadyActive;
                }
                Some("users_username_key") => return TrackingError::DuplicateUsername,
                _ => {}
            }
        }
        if db_error.is_foreign_key_violation() {
            return TrackingError::Validation(format!(
                "Referenced record does not exist ({})",
                db_error.constraint().unwrap_or("foreign key")
            ));
        }
    }
    TrackingError::Database(DatabaseError::Query(e))
}

/// Tracking store over PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    users: UserRepository,
    cost_centers: CostCenterRepository,
    projects: ProjectRepository,
    sessions: SessionRepository,
}

impl PgStore {
    /// Create a new store sharing one connection pool between repositories
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            cost_centers: CostCenterRepository::new(pool.clone()),
            projects: ProjectRepository::new(pool.clone()),
            sessions: SessionRepository::new(pool),
        }
    }
}

#[async_trait]
impl TrackingStore for PgStore {
    async fn list_users(&self) -> TrackingResult<Vec<User>> {
        self.users.get_all().await
    }

    async fn find_user(&self, id: Uuid) -> TrackingResult<Option<User>> {
        self.users.find_by_id(id).await
    }

    async fn find_user_by_username(&self, username: &str) -> TrackingResult<Option<User>> {
        self.users.find_by_username(username).await
    }

    async fn create_user(&self, user: &User) -> TrackingResult<User> {
        self.users.create(user).await
    }

    async fn update_user(&self, user: &User) -> TrackingResult<User> {
        self.users.update(user).await
    }

    async fn delete_user(&self, id: Uuid) -> TrackingResult<()> {
        self.users.delete(id).await
    }

    async fn list_cost_centers(&self) -> TrackingResult<Vec<CostCenter>> {
        self.cost_centers.get_all().await
    }

    async fn find_cost_center(&self, id: Uuid) -> TrackingResult<Option<CostCenter>> {
        self.cost_centers.find_by_id(id).await
    }

    async fn create_cost_center(&self, cost_center: &CostCenter) -> TrackingResult<CostCenter> {
        self.cost_centers.create(cost_center).await
    }

    async fn update_cost_center(&self, cost_center: &CostCenter) -> TrackingResult<CostCenter> {
        self.cost_centers.update(cost_center).await
    }

    async fn delete_cost_center(&self, id: Uuid) -> TrackingResult<()> {
        self.cost_centers.delete(id).await
    }

    async fn list_projects(&self) -> TrackingResult<Vec<Project>> {
        self.projects.get_all().await
    }

    async fn find_project(&self, id: Uuid) -> TrackingResult<Option<Project>> {
        self.projects.find_by_id(id).await
    }

    async fn create_project(&self, project: &Project) -> TrackingResult<Project> {
        self.projects.create(project).await
    }

    async fn update_project(&self, project: &Project) -> TrackingResult<Project> {
        self.projects.update(project).await
    }

    async fn delete_project(&self, id: Uuid) -> TrackingResult<()> {
        self.projects.delete(id).await
    }

    async fn list_active_sessions(&self) -> TrackingResult<Vec<ActiveSession>> {
        self.sessions.get_active().await
    }

    async fn find_active_session(&self, user_id: Uuid) -> TrackingResult<Option<ActiveSession>> {
        self.sessions.find_active_by_user(user_id).await
    }

    async fn insert_active_session(
        &self,
        session: NewActiveSession,
    ) -> TrackingResult<ActiveSession> {
        self.sessions.insert_active(session).await
    }

    async fn complete_active_session(
        &self,
        user_id: Uuid,
        active_id: i64,
        completed: NewCompletedSession,
    ) -> TrackingResult<CompletedSession> {
        self.sessions.complete(user_id, active_id, completed).await
    }

    async fn list_completed_sessions(&self) -> TrackingResult<Vec<CompletedSession>> {
        self.sessions.get_completed().await
    }

    async fn append_completed_session(
        &self,
        session: NewCompletedSession,
    ) -> TrackingResult<CompletedSession> {
        self.sessions.insert_completed(session).await
    }
}
