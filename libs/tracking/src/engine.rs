//! Session engine
//!
//! Owns the lifecycle of active sessions: identifying users from credentials
//! or QR payloads, opening a session against an open project, and converting
//! a stopped session into a completed-session record. It is the only writer
//! of active and completed sessions.

use serde::Serialize;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex, PoisonError, Weak},
};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::{TrackingError, TrackingResult},
    evaluation::{self, EvaluationWindow, ProjectEvaluation},
    format,
    models::{
        ActiveSession, CompletedSession, Credentials, NewActiveSession, NewCompletedSession, User,
    },
    qr::QrToken,
    store::TrackingStore,
    validation,
};

/// How a user identifies at a kiosk or login form
#[derive(Debug, Clone)]
pub enum AuthRequest {
    Credentials(Credentials),
    Qr(String),
}

/// Outcome of a successful identification
///
/// A user who already runs a session is not logged in; they become the
/// target of a stop confirmation instead.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Identification {
    LoggedIn { user: User },
    PendingStop { user: User, session: ActiveSession },
}

impl Identification {
    pub fn user(&self) -> &User {
        match self {
            Identification::LoggedIn { user } | Identification::PendingStop { user, .. } => user,
        }
    }
}

/// Active session with its timer values at a given instant
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningTimer {
    #[serde(flatten)]
    pub session: ActiveSession,
    pub elapsed_seconds: i64,
    pub elapsed_formatted: String,
}

/// Session lifecycle service
#[derive(Clone)]
pub struct SessionEngine {
    store: Arc<dyn TrackingStore>,
    clock: Arc<dyn Clock>,
    user_locks: Arc<StdMutex<HashMap<Uuid, Weak<Mutex<()>>>>>,
}

impl SessionEngine {
    /// Create a new session engine
    pub fn new(store: Arc<dyn TrackingStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            user_locks: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &Arc<dyn TrackingStore> {
        &self.store
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    // Start and stop for the same user are serialised through this lock so
    // the one-session check and the write never interleave. The map only
    // holds weak handles; entries nobody holds are dropped on the next miss.
    fn user_lock(&self, user_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = locks.get(&user_id).and_then(Weak::upgrade) {
            return lock;
        }

        locks.retain(|_, lock| lock.strong_count() > 0);
        let lock = Arc::new(Mutex::new(()));
        locks.insert(user_id, Arc::downgrade(&lock));
        lock
    }

    /// Verify a username/password pair
    ///
    /// Passwords are compared verbatim against the stored value.
    pub async fn login(&self, credentials: &Credentials) -> TrackingResult<User> {
        info!("Login attempt for user: {}", credentials.username);

        match self
            .store
            .find_user_by_username(&credentials.username)
            .await?
        {
            Some(user) if !user.blocked && user.password == credentials.password => Ok(user),
            _ => Err(TrackingError::InvalidCredentials),
        }
    }

    /// Resolve a user id to a known, unblocked user
    pub async fn identify_by_id(&self, user_id: Uuid) -> TrackingResult<User> {
        match self.store.find_user(user_id).await? {
            Some(user) if !user.blocked => Ok(user),
            _ => Err(TrackingError::UnknownOrBlockedUser),
        }
    }

    /// Identify a user and decide between login and stop confirmation
    pub async fn authenticate(&self, request: AuthRequest) -> TrackingResult<Identification> {
        let user = match request {
            AuthRequest::Credentials(credentials) => self.login(&credentials).await?,
            AuthRequest::Qr(payload) => match payload.parse::<QrToken>()? {
                QrToken::User(id) => self.identify_by_id(id).await?,
                QrToken::Project(_) => return Err(TrackingError::LoginRequired),
            },
        };

        match self.store.find_active_session(user.id).await? {
            Some(session) => {
                info!("User {} identified with a running session", user.id);
                Ok(Identification::PendingStop { user, session })
            }
            None => Ok(Identification::LoggedIn { user }),
        }
    }

    /// Open an active session for `user_id` on `project_id`
    pub async fn start_session(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> TrackingResult<ActiveSession> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let user = self.identify_by_id(user_id).await?;
        let project = self
            .store
            .find_project(project_id)
            .await?
            .ok_or(TrackingError::UnknownProject)?;

        if project.closed {
            return Err(TrackingError::ProjectClosed);
        }

        if self.store.find_active_session(user_id).await?.is_some() {
            return Err(TrackingError::SessionAlreadyActive);
        }

        let session = self
            .store
            .insert_active_session(NewActiveSession {
                user_id: user.id,
                user_name: user.name,
                project_id: project.id,
                project_name: project.name,
                start_time: self.clock.now(),
            })
            .await?;

        info!(
            "Started session {} for user {} on project {}",
            session.id, session.user_id, session.project_id
        );
        Ok(session)
    }

    /// Stop the active session of `user_id` and record it
    pub async fn stop_session(&self, user_id: Uuid) -> TrackingResult<CompletedSession> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let active = self
            .store
            .find_active_session(user_id)
            .await?
            .ok_or(TrackingError::NoActiveSession)?;

        let now = self.clock.now();
        let minutes = format::rounded_minutes(active.start_time, now).unwrap_or_else(|| {
            warn!(
                "Session {} of user {} stopped before it started ({} < {}), recording 0 minutes",
                active.id, user_id, now, active.start_time
            );
            0
        });

        let completed = self
            .store
            .complete_active_session(
                user_id,
                active.id,
                NewCompletedSession::from_active(&active, minutes),
            )
            .await?;

        info!(
            "Stopped session {} for user {} on project {} after {} minutes",
            active.id, user_id, active.project_id, completed.duration_minutes
        );
        Ok(completed)
    }

    pub async fn active_sessions(&self) -> TrackingResult<Vec<ActiveSession>> {
        self.store.list_active_sessions().await
    }

    pub async fn active_session_for(&self, user_id: Uuid) -> TrackingResult<Option<ActiveSession>> {
        self.store.find_active_session(user_id).await
    }

    /// Active sessions with elapsed time computed against the engine clock
    pub async fn running_timers(&self) -> TrackingResult<Vec<RunningTimer>> {
        let now = self.clock.now();
        let timers = self
            .store
            .list_active_sessions()
            .await?
            .into_iter()
            .map(|session| {
                let elapsed_seconds = session.elapsed_seconds(now);
                RunningTimer {
                    session,
                    elapsed_seconds,
                    elapsed_formatted: format::format_elapsed(elapsed_seconds),
                }
            })
            .collect();
        Ok(timers)
    }

    /// Completed sessions, newest first
    pub async fn completed_sessions(&self) -> TrackingResult<Vec<CompletedSession>> {
        self.store.list_completed_sessions().await
    }

    /// Append a completed session directly, bypassing the active-session flow
    ///
    /// `duration_formatted` is always rederived from `duration_minutes`.
    pub async fn record_completed_session(
        &self,
        mut session: NewCompletedSession,
    ) -> TrackingResult<CompletedSession> {
        validation::validate_required("Employee name", &session.employee_name)?;
        validation::validate_required("Project name", &session.project_name)?;

        if session.duration_minutes < 0 {
            return Err(TrackingError::Validation(
                "Duration must not be negative".to_string(),
            ));
        }

        if self.store.find_user(session.employee_id).await?.is_none() {
            return Err(TrackingError::NotFound("User"));
        }
        if self.store.find_project(session.project_id).await?.is_none() {
            return Err(TrackingError::UnknownProject);
        }

        session.duration_formatted = format::format_duration_minutes(session.duration_minutes);
        self.store.append_completed_session(session).await
    }

    /// Evaluate all projects; `None` is the lifetime mode
    pub async fn evaluate(
        &self,
        window: Option<&EvaluationWindow>,
    ) -> TrackingResult<Vec<ProjectEvaluation>> {
        let projects = self.store.list_projects().await?;
        let sessions = self.store.list_completed_sessions().await?;
        Ok(evaluation::evaluate_projects(&projects, &sessions, window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        models::{Project, Role},
        store::MemoryStore,
    };
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use tokio_test::{assert_err, assert_ok};

    struct Fixture {
        engine: SessionEngine,
        clock: ManualClock,
        store: Arc<MemoryStore>,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 4, 2, 7, 0, 0).unwrap());
        let engine = SessionEngine::new(store.clone(), Arc::new(clock.clone()));
        Fixture {
            engine,
            clock,
            store,
        }
    }

    async fn add_user(store: &MemoryStore, username: &str, role: Role, blocked: bool) -> User {
        let user = User {
            id: Uuid::new_v4(),
            name: format!("{} name", username),
            username: username.to_string(),
            password: "pw".to_string(),
            role,
            blocked,
            can_select_project_manually: false,
            cost_center_ids: vec![],
        };
        store.create_user(&user).await.unwrap()
    }

    async fn add_project(store: &MemoryStore, closed: bool) -> Project {
        let project = Project {
            id: Uuid::new_v4(),
            name: "Assembly".to_string(),
            budget: 1000.0,
            deadline: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            closed,
            estimated_hours: Some(10.0),
            cost_center_id: None,
        };
        store.create_project(&project).await.unwrap()
    }

    #[tokio::test]
    async fn test_login_checks_password_and_blocked_flag() {
        let f = fixture().await;
        add_user(&f.store, "jana", Role::Employee, false).await;
        add_user(&f.store, "boris", Role::Employee, true).await;

        let ok = f
            .engine
            .login(&Credentials {
                username: "jana".to_string(),
                password: "pw".to_string(),
            })
            .await;
        assert_ok!(ok);

        for (username, password) in [("jana", "wrong"), ("boris", "pw"), ("nobody", "pw")] {
            let result = f
                .engine
                .login(&Credentials {
                    username: username.to_string(),
                    password: password.to_string(),
                })
                .await;
            assert!(matches!(result, Err(TrackingError::InvalidCredentials)));
        }
    }

    #[tokio::test]
    async fn test_authenticate_by_qr_turns_into_pending_stop() {
        let f = fixture().await;
        let user = add_user(&f.store, "jana", Role::Employee, false).await;
        let project = add_project(&f.store, false).await;

        let first = f
            .engine
            .authenticate(AuthRequest::Qr(format!("USER_ID:{}", user.id)))
            .await
            .unwrap();
        assert!(matches!(first, Identification::LoggedIn { .. }));

        f.engine.start_session(user.id, project.id).await.unwrap();

        let second = f
            .engine
            .authenticate(AuthRequest::Qr(format!("USER_ID:{}", user.id)))
            .await
            .unwrap();
        assert!(matches!(second, Identification::PendingStop { .. }));
        assert_eq!(second.user().id, user.id);
    }

    #[tokio::test]
    async fn test_authenticate_rejects_blocked_unknown_and_project_tokens() {
        let f = fixture().await;
        let blocked = add_user(&f.store, "boris", Role::Employee, true).await;

        let blocked = f
            .engine
            .authenticate(AuthRequest::Qr(format!("USER_ID:{}", blocked.id)))
            .await;
        assert!(matches!(blocked, Err(TrackingError::UnknownOrBlockedUser)));

        let unknown = f
            .engine
            .authenticate(AuthRequest::Qr(format!("USER_ID:{}", Uuid::new_v4())))
            .await;
        assert!(matches!(unknown, Err(TrackingError::UnknownOrBlockedUser)));

        let project = f
            .engine
            .authenticate(AuthRequest::Qr(format!("PROJECT_ID:{}", Uuid::new_v4())))
            .await;
        assert!(matches!(project, Err(TrackingError::LoginRequired)));

        let garbage = f.engine.authenticate(AuthRequest::Qr("hello".to_string())).await;
        assert!(matches!(garbage, Err(TrackingError::UnrecognizedQrFormat)));
    }

    #[tokio::test]
    async fn test_start_session_guards() {
        let f = fixture().await;
        let user = add_user(&f.store, "jana", Role::Admin, false).await;
        let blocked = add_user(&f.store, "boris", Role::Employee, true).await;
        let closed = add_project(&f.store, true).await;
        let open = add_project(&f.store, false).await;

        assert!(matches!(
            f.engine.start_session(user.id, closed.id).await,
            Err(TrackingError::ProjectClosed)
        ));
        assert!(matches!(
            f.engine.start_session(user.id, Uuid::new_v4()).await,
            Err(TrackingError::UnknownProject)
        ));
        assert!(matches!(
            f.engine.start_session(blocked.id, open.id).await,
            Err(TrackingError::UnknownOrBlockedUser)
        ));

        assert_ok!(f.engine.start_session(user.id, open.id).await);
        assert!(matches!(
            f.engine.start_session(user.id, open.id).await,
            Err(TrackingError::SessionAlreadyActive)
        ));
    }

    #[tokio::test]
    async fn test_stop_converts_with_start_timestamp() {
        let f = fixture().await;
        let user = add_user(&f.store, "jana", Role::Employee, false).await;
        let project = add_project(&f.store, false).await;

        let active = f.engine.start_session(user.id, project.id).await.unwrap();
        f.clock.advance(Duration::minutes(30) + Duration::seconds(20));

        let completed = f.engine.stop_session(user.id).await.unwrap();
        assert_eq!(completed.timestamp, active.start_time);
        assert_eq!(completed.duration_minutes, 30);
        assert_eq!(completed.duration_formatted, "30m");
        assert!(f.engine.active_sessions().await.unwrap().is_empty());

        assert!(matches!(
            f.engine.stop_session(user.id).await,
            Err(TrackingError::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn test_stop_clamps_negative_duration() {
        let f = fixture().await;
        let user = add_user(&f.store, "jana", Role::Employee, false).await;
        let project = add_project(&f.store, false).await;

        f.engine.start_session(user.id, project.id).await.unwrap();
        f.clock.advance(Duration::minutes(-5));

        let completed = f.engine.stop_session(user.id).await.unwrap();
        assert_eq!(completed.duration_minutes, 0);
    }

    #[tokio::test]
    async fn test_rename_does_not_touch_running_snapshot() {
        let f = fixture().await;
        let mut user = add_user(&f.store, "jana", Role::Employee, false).await;
        let project = add_project(&f.store, false).await;

        f.engine.start_session(user.id, project.id).await.unwrap();
        user.name = "Jana Renamed".to_string();
        f.store.update_user(&user).await.unwrap();

        let active = f.engine.active_session_for(user.id).await.unwrap().unwrap();
        assert_eq!(active.user_name, "jana name");

        let completed = f.engine.stop_session(user.id).await.unwrap();
        assert_eq!(completed.employee_name, "jana name");
    }

    #[tokio::test]
    async fn test_concurrent_starts_leave_one_session() {
        let f = fixture().await;
        let user = add_user(&f.store, "jana", Role::Employee, false).await;
        let project = add_project(&f.store, false).await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let engine = f.engine.clone();
            handles.push(tokio::spawn(async move {
                engine.start_session(user.id, project.id).await
            }));
        }

        let mut started = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => started += 1,
                Err(TrackingError::SessionAlreadyActive) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(started, 1);
        assert_eq!(f.engine.active_sessions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_user_locks_are_released_after_use() {
        let f = fixture().await;
        let project = add_project(&f.store, false).await;

        for i in 0..50 {
            let user = add_user(&f.store, &format!("worker{}", i), Role::Employee, false).await;
            f.engine.start_session(user.id, project.id).await.unwrap();
            f.clock.advance(Duration::minutes(5));
            f.engine.stop_session(user.id).await.unwrap();
        }

        let held = f.engine.user_lock(Uuid::new_v4());
        let locks = f.engine.user_locks.lock().unwrap();
        assert_eq!(locks.len(), 1);
        assert!(locks.values().all(|lock| lock.upgrade().is_some()));
        drop(held);
    }

    #[tokio::test]
    async fn test_held_user_lock_is_shared() {
        let f = fixture().await;
        let user_id = Uuid::new_v4();

        let first = f.engine.user_lock(user_id);
        let second = f.engine.user_lock(user_id);
        assert!(Arc::ptr_eq(&first, &second));

        drop(first);
        drop(second);
        let third = f.engine.user_lock(user_id);
        assert_eq!(Arc::strong_count(&third), 1);
    }

    #[tokio::test]
    async fn test_running_timers_use_engine_clock() {
        let f = fixture().await;
        let user = add_user(&f.store, "jana", Role::Employee, false).await;
        let project = add_project(&f.store, false).await;

        f.engine.start_session(user.id, project.id).await.unwrap();
        f.clock.advance(Duration::seconds(3_725));

        let timers = f.engine.running_timers().await.unwrap();
        assert_eq!(timers.len(), 1);
        assert_eq!(timers[0].elapsed_seconds, 3_725);
        assert_eq!(timers[0].elapsed_formatted, "01:02:05");
    }

    #[tokio::test]
    async fn test_record_completed_session_validates() {
        let f = fixture().await;
        let user = add_user(&f.store, "jana", Role::Employee, false).await;
        let project = add_project(&f.store, false).await;

        let mut session = NewCompletedSession {
            timestamp: f.clock.now(),
            employee_id: user.id,
            employee_name: user.name.clone(),
            project_id: project.id,
            project_name: project.name.clone(),
            duration_minutes: -1,
            duration_formatted: String::new(),
        };
        assert_err!(f.engine.record_completed_session(session.clone()).await);

        session.duration_minutes = 125;
        let stored = f.engine.record_completed_session(session).await.unwrap();
        assert_eq!(stored.duration_formatted, "2h 5m");
    }
}
