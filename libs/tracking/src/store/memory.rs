//! In-memory store
//!
//! Every operation runs under one `RwLock`, which makes the check-and-insert
//! of active sessions atomic.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::TrackingStore;
use crate::{
    error::{TrackingError, TrackingResult},
    models::{
        ActiveSession, CompletedSession, CostCenter, NewActiveSession, NewCompletedSession,
        Project, User,
    },
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    cost_centers: HashMap<Uuid, CostCenter>,
    projects: HashMap<Uuid, Project>,
    active_sessions: HashMap<Uuid, ActiveSession>,
    completed_sessions: Vec<CompletedSession>,
    next_active_id: i64,
    next_completed_id: i64,
}

impl Tables {
    fn username_taken(&self, username: &str, except: Uuid) -> bool {
        self.users
            .values()
            .any(|u| u.id != except && u.username == username)
    }
}

/// Store keeping all collections in process memory
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by_name<T>(values: impl Iterator<Item = T>, name: impl Fn(&T) -> String) -> Vec<T> {
    let mut values: Vec<T> = values.collect();
    values.sort_by_key(|v| name(v));
    values
}

#[async_trait]
impl TrackingStore for MemoryStore {
    async fn list_users(&self) -> TrackingResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(sorted_by_name(tables.users.values().cloned(), |u| {
            u.name.to_lowercase()
        }))
    }

    async fn find_user(&self, id: Uuid) -> TrackingResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> TrackingResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_user(&self, user: &User) -> TrackingResult<User> {
        let mut tables = self.tables.write().await;
        if tables.username_taken(&user.username, user.id) {
            return Err(TrackingError::DuplicateUsername);
        }
        tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn update_user(&self, user: &User) -> TrackingResult<User> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user.id) {
            return Err(TrackingError::NotFound("User"));
        }
        if tables.username_taken(&user.username, user.id) {
            return Err(TrackingError::DuplicateUsername);
        }
        tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> TrackingResult<()> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Err(TrackingError::NotFound("User"));
        }
        tables.active_sessions.remove(&id);
        tables.completed_sessions.retain(|s| s.employee_id != id);
        Ok(())
    }

    async fn list_cost_centers(&self) -> TrackingResult<Vec<CostCenter>> {
        let tables = self.tables.read().await;
        Ok(sorted_by_name(tables.cost_centers.values().cloned(), |c| {
            c.name.to_lowercase()
        }))
    }

    async fn find_cost_center(&self, id: Uuid) -> TrackingResult<Option<CostCenter>> {
        Ok(self.tables.read().await.cost_centers.get(&id).cloned())
    }

    async fn create_cost_center(&self, cost_center: &CostCenter) -> TrackingResult<CostCenter> {
        let mut tables = self.tables.write().await;
        tables
            .cost_centers
            .insert(cost_center.id, cost_center.clone());
        Ok(cost_center.clone())
    }

    async fn update_cost_center(&self, cost_center: &CostCenter) -> TrackingResult<CostCenter> {
        let mut tables = self.tables.write().await;
        match tables.cost_centers.get_mut(&cost_center.id) {
            Some(existing) => {
                *existing = cost_center.clone();
                Ok(cost_center.clone())
            }
            None => Err(TrackingError::NotFound("Cost center")),
        }
    }

    async fn delete_cost_center(&self, id: Uuid) -> TrackingResult<()> {
        let mut tables = self.tables.write().await;
        if tables.cost_centers.remove(&id).is_none() {
            return Err(TrackingError::NotFound("Cost center"));
        }
        for project in tables.projects.values_mut() {
            if project.cost_center_id == Some(id) {
                project.cost_center_id = None;
            }
        }
        for user in tables.users.values_mut() {
            user.cost_center_ids.retain(|c| *c != id);
        }
        Ok(())
    }

    async fn list_projects(&self) -> TrackingResult<Vec<Project>> {
        let tables = self.tables.read().await;
        Ok(sorted_by_name(tables.projects.values().cloned(), |p| {
            p.name.to_lowercase()
        }))
    }

    async fn find_project(&self, id: Uuid) -> TrackingResult<Option<Project>> {
        Ok(self.tables.read().await.projects.get(&id).cloned())
    }

    async fn create_project(&self, project: &Project) -> TrackingResult<Project> {
        let mut tables = self.tables.write().await;
        tables.projects.insert(project.id, project.clone());
        Ok(project.clone())
    }

    async fn update_project(&self, project: &Project) -> TrackingResult<Project> {
        let mut tables = self.tables.write().await;
        match tables.projects.get_mut(&project.id) {
            Some(existing) => {
                *existing = project.clone();
                Ok(project.clone())
            }
            None => Err(TrackingError::NotFound("Project")),
        }
    }

    async fn delete_project(&self, id: Uuid) -> TrackingResult<()> {
        let mut tables = self.tables.write().await;
        if tables.projects.remove(&id).is_none() {
            return Err(TrackingError::NotFound("Project"));
        }
        tables.active_sessions.retain(|_, s| s.project_id != id);
        tables.completed_sessions.retain(|s| s.project_id != id);
        Ok(())
    }

    async fn list_active_sessions(&self) -> TrackingResult<Vec<ActiveSession>> {
        let tables = self.tables.read().await;
        let mut sessions: Vec<ActiveSession> = tables.active_sessions.values().cloned().collect();
        sessions.sort_by_key(|s| (s.start_time, s.id));
        Ok(sessions)
    }

    async fn find_active_session(&self, user_id: Uuid) -> TrackingResult<Option<ActiveSession>> {
        Ok(self
            .tables
            .read()
            .await
            .active_sessions
            .get(&user_id)
            .cloned())
    }

    async fn insert_active_session(
        &self,
        session: NewActiveSession,
    ) -> TrackingResult<ActiveSession> {
        let mut tables = self.tables.write().await;
        if tables.active_sessions.contains_key(&session.user_id) {
            return Err(TrackingError::SessionAlreadyActive);
        }

        tables.next_active_id += 1;
        let session = session.with_id(tables.next_active_id);
        tables
            .active_sessions
            .insert(session.user_id, session.clone());
        Ok(session)
    }

    async fn complete_active_session(
        &self,
        user_id: Uuid,
        active_id: i64,
        completed: NewCompletedSession,
    ) -> TrackingResult<CompletedSession> {
        let mut tables = self.tables.write().await;
        match tables.active_sessions.get(&user_id) {
            Some(active) if active.id == active_id => {}
            _ => return Err(TrackingError::NoActiveSession),
        }

        tables.active_sessions.remove(&user_id);
        tables.next_completed_id += 1;
        let completed = completed.with_id(tables.next_completed_id);
        tables.completed_sessions.push(completed.clone());
        Ok(completed)
    }

    async fn list_completed_sessions(&self) -> TrackingResult<Vec<CompletedSession>> {
        let tables = self.tables.read().await;
        let mut sessions = tables.completed_sessions.clone();
        sessions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(sessions)
    }

    async fn append_completed_session(
        &self,
        session: NewCompletedSession,
    ) -> TrackingResult<CompletedSession> {
        let mut tables = self.tables.write().await;
        tables.next_completed_id += 1;
        let session = session.with_id(tables.next_completed_id);
        tables.completed_sessions.push(session.clone());
        Ok(session)
    }
}
