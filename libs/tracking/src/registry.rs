//! Identity & access and project registry
//!
//! Administrative CRUD over users, cost centers and projects, with payload
//! validation. Permission checks belong to the caller (see
//! [`crate::authorization`]).

use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{TrackingError, TrackingResult},
    models::{
        ActiveSession, CompletedSession, CostCenter, CostCenterPayload, NewUser, Project,
        ProjectPayload, UpdateUser, User,
    },
    store::TrackingStore,
    validation,
};

/// Everything a fresh client needs to render its first screen
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialData {
    pub users: Vec<User>,
    pub projects: Vec<Project>,
    pub cost_centers: Vec<CostCenter>,
    pub completed_sessions: Vec<CompletedSession>,
    pub active_sessions: Vec<ActiveSession>,
}

/// Registry service
#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn TrackingStore>,
}

impl Registry {
    /// Create a new registry
    pub fn new(store: Arc<dyn TrackingStore>) -> Self {
        Self { store }
    }

    async fn ensure_cost_centers_exist(&self, ids: &[Uuid]) -> TrackingResult<()> {
        for id in ids {
            if self.store.find_cost_center(*id).await?.is_none() {
                return Err(TrackingError::Validation(format!(
                    "Unknown cost center {}",
                    id
                )));
            }
        }
        Ok(())
    }

    pub async fn list_users(&self) -> TrackingResult<Vec<User>> {
        self.store.list_users().await
    }

    pub async fn get_user(&self, id: Uuid) -> TrackingResult<User> {
        self.store
            .find_user(id)
            .await?
            .ok_or(TrackingError::NotFound("User"))
    }

    /// Create a user
    pub async fn create_user(&self, payload: NewUser) -> TrackingResult<User> {
        validation::validate_new_user(&payload)?;
        let mut cost_center_ids = payload.cost_center_ids;
        cost_center_ids.sort_unstable();
        cost_center_ids.dedup();
        self.ensure_cost_centers_exist(&cost_center_ids).await?;

        let user = User {
            id: Uuid::new_v4(),
            name: payload.name.trim().to_string(),
            username: payload.username,
            password: payload.password,
            role: payload.role,
            blocked: payload.blocked,
            can_select_project_manually: payload.can_select_project_manually,
            cost_center_ids,
        };

        info!("Creating user {} ({})", user.username, user.role);
        self.store.create_user(&user).await
    }

    /// Update a user; the password changes only when a non-empty one is given
    pub async fn update_user(&self, id: Uuid, payload: UpdateUser) -> TrackingResult<User> {
        let mut user = self.get_user(id).await?;

        if let Some(name) = payload.name {
            validation::validate_required("Name", &name)?;
            user.name = name.trim().to_string();
        }
        if let Some(username) = payload.username {
            validation::validate_username(&username)?;
            user.username = username;
        }
        if let Some(password) = payload.password.filter(|p| !p.is_empty()) {
            user.password = password;
        }
        if let Some(role) = payload.role {
            user.role = role;
        }
        if let Some(blocked) = payload.blocked {
            user.blocked = blocked;
        }
        if let Some(flag) = payload.can_select_project_manually {
            user.can_select_project_manually = flag;
        }
        if let Some(mut ids) = payload.cost_center_ids {
            ids.sort_unstable();
            ids.dedup();
            self.ensure_cost_centers_exist(&ids).await?;
            user.cost_center_ids = ids;
        }

        info!("Updating user {}", id);
        self.store.update_user(&user).await
    }

    /// Delete a user and, with it, their session history
    pub async fn delete_user(&self, id: Uuid) -> TrackingResult<()> {
        info!("Deleting user {}", id);
        self.store.delete_user(id).await
    }

    pub async fn list_cost_centers(&self) -> TrackingResult<Vec<CostCenter>> {
        self.store.list_cost_centers().await
    }

    pub async fn create_cost_center(
        &self,
        payload: CostCenterPayload,
    ) -> TrackingResult<CostCenter> {
        validation::validate_cost_center(&payload)?;
        let cost_center = CostCenter {
            id: Uuid::new_v4(),
            name: payload.name.trim().to_string(),
        };
        self.store.create_cost_center(&cost_center).await
    }

    pub async fn update_cost_center(
        &self,
        id: Uuid,
        payload: CostCenterPayload,
    ) -> TrackingResult<CostCenter> {
        validation::validate_cost_center(&payload)?;
        self.store
            .update_cost_center(&CostCenter {
                id,
                name: payload.name.trim().to_string(),
            })
            .await
    }

    pub async fn delete_cost_center(&self, id: Uuid) -> TrackingResult<()> {
        info!("Deleting cost center {}", id);
        self.store.delete_cost_center(id).await
    }

    pub async fn list_projects(&self) -> TrackingResult<Vec<Project>> {
        self.store.list_projects().await
    }

    pub async fn get_project(&self, id: Uuid) -> TrackingResult<Project> {
        self.store
            .find_project(id)
            .await?
            .ok_or(TrackingError::UnknownProject)
    }

    fn project_from_payload(&self, id: Uuid, payload: ProjectPayload) -> Project {
        Project {
            id,
            name: payload.name.trim().to_string(),
            budget: payload.budget,
            deadline: payload.deadline,
            closed: payload.closed,
            estimated_hours: payload.estimated_hours,
            cost_center_id: payload.cost_center_id,
        }
    }

    pub async fn create_project(&self, payload: ProjectPayload) -> TrackingResult<Project> {
        validation::validate_project(&payload)?;
        if let Some(cost_center_id) = payload.cost_center_id {
            self.ensure_cost_centers_exist(&[cost_center_id]).await?;
        }

        let project = self.project_from_payload(Uuid::new_v4(), payload);
        info!("Creating project {}", project.name);
        self.store.create_project(&project).await
    }

    pub async fn update_project(
        &self,
        id: Uuid,
        payload: ProjectPayload,
    ) -> TrackingResult<Project> {
        validation::validate_project(&payload)?;
        if let Some(cost_center_id) = payload.cost_center_id {
            self.ensure_cost_centers_exist(&[cost_center_id]).await?;
        }

        let project = self.project_from_payload(id, payload);
        self.store.update_project(&project).await
    }

    /// Flip the closed flag; running sessions are not affected
    pub async fn toggle_project_status(&self, id: Uuid) -> TrackingResult<Project> {
        let mut project = self.get_project(id).await?;
        project.closed = !project.closed;
        info!(
            "Project {} is now {}",
            id,
            if project.closed { "closed" } else { "open" }
        );
        self.store.update_project(&project).await
    }

    /// Delete a project together with its sessions
    pub async fn delete_project(&self, id: Uuid) -> TrackingResult<()> {
        info!("Deleting project {}", id);
        self.store.delete_project(id).await
    }

    pub async fn initial_data(&self) -> TrackingResult<InitialData> {
        Ok(InitialData {
            users: self.store.list_users().await?,
            projects: self.store.list_projects().await?,
            cost_centers: self.store.list_cost_centers().await?,
            completed_sessions: self.store.list_completed_sessions().await?,
            active_sessions: self.store.list_active_sessions().await?,
        })
    }
}
