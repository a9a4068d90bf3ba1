//! End-to-end lifecycle tests against the in-memory store
//!
//! These follow the day of a single employee from an empty system through
//! start, stop and evaluation.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use std::sync::Arc;
use tracking::{
    EvaluationWindow, KioskState, Registry, SessionEngine, TrackingError,
    clock::ManualClock,
    models::{NewUser, ProjectPayload, Role, UpdateUser},
    store::MemoryStore,
};

struct System {
    engine: SessionEngine,
    registry: Registry,
    clock: ManualClock,
}

fn system() -> System {
    let store = Arc::new(MemoryStore::new());
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 9, 2, 7, 0, 0).unwrap());
    System {
        engine: SessionEngine::new(store.clone(), Arc::new(clock.clone())),
        registry: Registry::new(store),
        clock,
    }
}

fn employee(username: &str) -> NewUser {
    NewUser {
        name: format!("Employee {}", username),
        username: username.to_string(),
        password: "pw".to_string(),
        role: Role::Employee,
        blocked: false,
        can_select_project_manually: false,
        cost_center_ids: vec![],
    }
}

fn project(name: &str) -> ProjectPayload {
    ProjectPayload {
        name: name.to_string(),
        budget: 1000.0,
        deadline: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        closed: false,
        estimated_hours: Some(10.0),
        cost_center_id: None,
    }
}

#[tokio::test]
async fn test_start_stop_evaluate_scenario() {
    let sys = system();
    let u1 = sys.registry.create_user(employee("u1")).await.unwrap();
    let p1 = sys.registry.create_project(project("P1")).await.unwrap();

    sys.engine.start_session(u1.id, p1.id).await.unwrap();
    assert_eq!(sys.engine.active_sessions().await.unwrap().len(), 1);

    let again = sys.engine.start_session(u1.id, p1.id).await;
    assert!(matches!(again, Err(TrackingError::SessionAlreadyActive)));

    sys.clock.advance(Duration::minutes(30));
    let completed = sys.engine.stop_session(u1.id).await.unwrap();
    assert_eq!(completed.duration_minutes, 30);
    assert!(sys.engine.active_sessions().await.unwrap().is_empty());
    assert_eq!(sys.engine.completed_sessions().await.unwrap().len(), 1);

    let evaluation = sys.engine.evaluate(None).await.unwrap();
    let p1_eval = evaluation.iter().find(|e| e.project_id == p1.id).unwrap();
    assert_eq!(p1_eval.total_lifetime_hours, 0.5);
    assert_eq!(p1_eval.cost_per_hour, 2000.0);
    assert_eq!(p1_eval.time_variance, Some(-9.5));
    assert_eq!(p1_eval.work_progress_percentage, Some(5.0));
}

#[tokio::test]
async fn test_closed_project_rejects_every_role() {
    let sys = system();
    let p1 = sys.registry.create_project(project("P1")).await.unwrap();
    sys.registry.toggle_project_status(p1.id).await.unwrap();

    for (username, role) in [
        ("emp", Role::Employee),
        ("man", Role::Manager),
        ("adm", Role::Admin),
    ] {
        let mut payload = employee(username);
        payload.role = role;
        let user = sys.registry.create_user(payload).await.unwrap();

        let result = sys.engine.start_session(user.id, p1.id).await;
        assert!(matches!(result, Err(TrackingError::ProjectClosed)));
    }
    assert!(sys.engine.active_sessions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_project_qr_without_actor_fails() {
    let sys = system();
    let p1 = sys.registry.create_project(project("P1")).await.unwrap();

    let result = KioskState::LoggedOut
        .scan(&sys.engine, &format!("PROJECT_ID:{}", p1.id))
        .await;
    assert!(matches!(result, Err(TrackingError::LoginRequired)));
}

#[tokio::test]
async fn test_every_stop_appends_exactly_one_record() {
    let sys = system();
    let p1 = sys.registry.create_project(project("P1")).await.unwrap();
    let mut users = Vec::new();
    for i in 0..5 {
        users.push(sys.registry.create_user(employee(&format!("worker{}", i))).await.unwrap());
    }

    for user in &users {
        sys.engine.start_session(user.id, p1.id).await.unwrap();
        sys.clock.advance(Duration::minutes(7));
    }

    for (stopped, user) in users.iter().enumerate() {
        let before = sys.engine.active_sessions().await.unwrap().len();
        sys.engine.stop_session(user.id).await.unwrap();
        let after = sys.engine.active_sessions().await.unwrap().len();

        assert_eq!(before - after, 1);
        assert_eq!(sys.engine.completed_sessions().await.unwrap().len(), stopped + 1);
    }
}

#[tokio::test]
async fn test_windowed_evaluation_and_lifetime_cost() {
    let sys = system();
    let u1 = sys.registry.create_user(employee("u1")).await.unwrap();
    let p1 = sys.registry.create_project(project("P1")).await.unwrap();
    let p2 = sys.registry.create_project(project("P2")).await.unwrap();

    // Monday on P2, Tuesday on P1.
    sys.engine.start_session(u1.id, p2.id).await.unwrap();
    sys.clock.advance(Duration::hours(2));
    sys.engine.stop_session(u1.id).await.unwrap();

    sys.clock.set(Utc.with_ymd_and_hms(2024, 9, 3, 7, 0, 0).unwrap());
    sys.engine.start_session(u1.id, p1.id).await.unwrap();
    sys.clock.advance(Duration::hours(1));
    sys.engine.stop_session(u1.id).await.unwrap();

    let tuesday = NaiveDate::from_ymd_opt(2024, 9, 3).unwrap();
    let window = EvaluationWindow::from_dates(Some(tuesday), Some(tuesday)).unwrap();
    let windowed = sys.engine.evaluate(Some(&window)).await.unwrap();

    assert_eq!(windowed.len(), 1);
    assert_eq!(windowed[0].project_id, p1.id);
    assert_eq!(windowed[0].total_time, 60);

    let lifetime = sys.engine.evaluate(None).await.unwrap();
    assert_eq!(lifetime.len(), 2);

    // Evaluation is read-only.
    assert_eq!(sys.engine.evaluate(Some(&window)).await.unwrap(), windowed);
}

#[tokio::test]
async fn test_blocking_user_prevents_new_sessions_but_allows_stop() {
    let sys = system();
    let u1 = sys.registry.create_user(employee("u1")).await.unwrap();
    let p1 = sys.registry.create_project(project("P1")).await.unwrap();

    sys.engine.start_session(u1.id, p1.id).await.unwrap();
    sys.registry
        .update_user(
            u1.id,
            UpdateUser {
                blocked: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // An administrator can still close the running session.
    sys.clock.advance(Duration::minutes(10));
    sys.engine.stop_session(u1.id).await.unwrap();

    let result = sys.engine.start_session(u1.id, p1.id).await;
    assert!(matches!(result, Err(TrackingError::UnknownOrBlockedUser)));
}

#[tokio::test]
async fn test_deleting_project_cascades_sessions() {
    let sys = system();
    let u1 = sys.registry.create_user(employee("u1")).await.unwrap();
    let p1 = sys.registry.create_project(project("P1")).await.unwrap();

    sys.engine.start_session(u1.id, p1.id).await.unwrap();
    sys.clock.advance(Duration::minutes(10));
    sys.engine.stop_session(u1.id).await.unwrap();
    sys.engine.start_session(u1.id, p1.id).await.unwrap();

    sys.registry.delete_project(p1.id).await.unwrap();

    assert!(sys.engine.active_sessions().await.unwrap().is_empty());
    assert!(sys.engine.completed_sessions().await.unwrap().is_empty());
}
