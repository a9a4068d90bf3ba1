//! API service routes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde_json::json;
use tracing::{info, warn};
use tracking::{
    EvaluationWindow, InitialData, KioskState, KioskTransition, RunningTimer, TrackingError,
    authorization::{Permission, authorize, authorize_session_control},
    export, format,
    models::{
        CostCenterPayload, Credentials, NewCompletedSession, NewUser, ProjectPayload, UpdateUser,
    },
};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::{AuthUser, auth_middleware},
    models::{
        EvaluationQuery, KioskView, LoginResponse, ScanRequest, SelectProjectRequest,
        StartSessionRequest,
    },
    state::AppState,
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/users", get(get_users).post(create_user))
        .route("/users/:id", put(update_user).delete(delete_user))
        .route("/projects", get(get_projects).post(create_project))
        .route("/projects/:id", put(update_project).delete(delete_project))
        .route("/projects/:id/toggle-status", put(toggle_project_status))
        .route("/cost-centers", get(get_cost_centers).post(create_cost_center))
        .route(
            "/cost-centers/:id",
            put(update_cost_center).delete(delete_cost_center),
        )
        .route(
            "/active-sessions",
            get(get_active_sessions).post(start_session),
        )
        .route("/active-sessions/:user_id", delete(stop_session))
        .route("/sessions", get(get_sessions).post(record_session))
        .route("/sessions/export", get(export_sessions))
        .route("/evaluation", get(get_evaluation))
        .route("/evaluation/export", get(export_evaluation))
        .route("/initial-data", get(get_initial_data))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let kiosk_routes = Router::new()
        .route("/:kiosk_id", get(get_kiosk))
        .route("/:kiosk_id/scan", post(kiosk_scan))
        .route("/:kiosk_id/login", post(kiosk_login))
        .route("/:kiosk_id/project", post(kiosk_select_project))
        .route("/:kiosk_id/confirm-stop", post(kiosk_confirm_stop))
        .route("/:kiosk_id/cancel-stop", post(kiosk_cancel_stop))
        .route("/:kiosk_id/logout", post(kiosk_logout));

    Router::new()
        .route("/health", get(health_check))
        .route("/login", post(login))
        .nest("/kiosk", kiosk_routes)
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool)
        .await
        .unwrap_or(false);

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if database { "ok" } else { "degraded" },
            "service": "worktime-api",
            "database": database,
        })),
    )
}

async fn check_login_rate(state: &AppState, username: &str) -> ApiResult<()> {
    if state
        .login_limiter
        .is_allowed(&username.to_lowercase())
        .await
    {
        Ok(())
    } else {
        warn!("Login rate limit hit for {}", username);
        Err(ApiError::TooManyRequests)
    }
}

/// Log in with username and password
pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<impl IntoResponse> {
    check_login_rate(&state, &credentials.username).await?;

    let user = state.engine.login(&credentials).await?;
    state
        .login_limiter
        .reset(&credentials.username.to_lowercase())
        .await;

    let token = state.tokens.issue(&user)?;
    info!("User {} logged in", user.id);

    Ok(Json(LoginResponse { user, token }))
}

// Users

pub async fn get_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    authorize(auth.role, Permission::ManageUsers)?;
    Ok(Json(state.registry.list_users().await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<NewUser>,
) -> ApiResult<impl IntoResponse> {
    authorize(auth.role, Permission::ManageUsers)?;
    let user = state.registry.create_user(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Update a user; an empty or missing password keeps the current one
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUser>,
) -> ApiResult<impl IntoResponse> {
    authorize(auth.role, Permission::ManageUsers)?;
    Ok(Json(state.registry.update_user(id, payload).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    authorize(auth.role, Permission::ManageUsers)?;
    if id == auth.id {
        return Err(ApiError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }
    state.registry.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Projects

/// Every role may list projects; kiosks need them for manual selection
pub async fn get_projects(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.registry.list_projects().await?))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<ProjectPayload>,
) -> ApiResult<impl IntoResponse> {
    authorize(auth.role, Permission::ManageProjects)?;
    let project = state.registry.create_project(payload).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProjectPayload>,
) -> ApiResult<impl IntoResponse> {
    authorize(auth.role, Permission::ManageProjects)?;
    Ok(Json(state.registry.update_project(id, payload).await?))
}

pub async fn toggle_project_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    authorize(auth.role, Permission::ManageProjects)?;
    Ok(Json(state.registry.toggle_project_status(id).await?))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    authorize(auth.role, Permission::ManageProjects)?;
    state.registry.delete_project(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Cost centers

pub async fn get_cost_centers(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.registry.list_cost_centers().await?))
}

pub async fn create_cost_center(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<CostCenterPayload>,
) -> ApiResult<impl IntoResponse> {
    authorize(auth.role, Permission::ManageCostCenters)?;
    let cost_center = state.registry.create_cost_center(payload).await?;
    Ok((StatusCode::CREATED, Json(cost_center)))
}

pub async fn update_cost_center(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CostCenterPayload>,
) -> ApiResult<impl IntoResponse> {
    authorize(auth.role, Permission::ManageCostCenters)?;
    Ok(Json(state.registry.update_cost_center(id, payload).await?))
}

pub async fn delete_cost_center(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    authorize(auth.role, Permission::ManageCostCenters)?;
    state.registry.delete_cost_center(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Sessions

/// Running sessions with timers; employees only see their own
pub async fn get_active_sessions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let mut timers = state.engine.running_timers().await?;
    if authorize(auth.role, Permission::ViewAllSessions).is_err() {
        timers.retain(|timer| timer.session.user_id == auth.id);
    }
    Ok(Json(timers))
}

pub async fn start_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<StartSessionRequest>,
) -> ApiResult<impl IntoResponse> {
    authorize_session_control(auth.role, auth.id, payload.user_id)?;
    let session = state
        .engine
        .start_session(payload.user_id, payload.project_id)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn stop_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    authorize_session_control(auth.role, auth.id, user_id)?;
    Ok(Json(state.engine.stop_session(user_id).await?))
}

/// Completed sessions, newest first; employees only see their own
pub async fn get_sessions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let mut sessions = state.engine.completed_sessions().await?;
    if authorize(auth.role, Permission::ViewAllSessions).is_err() {
        sessions.retain(|session| session.employee_id == auth.id);
    }
    Ok(Json(sessions))
}

/// Append a completed session directly; reserved for privileged roles
pub async fn record_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<NewCompletedSession>,
) -> ApiResult<impl IntoResponse> {
    authorize(auth.role, Permission::ControlAnySession)?;
    let session = state.engine.record_completed_session(payload).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

fn csv_response(filename: &str, body: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
}

pub async fn export_sessions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    authorize(auth.role, Permission::ExportSessions)?;
    let sessions = state.engine.completed_sessions().await?;
    Ok(csv_response(
        "sessions.csv",
        export::completed_sessions_csv(&sessions),
    ))
}

// Evaluation

fn evaluation_window(query: &EvaluationQuery) -> ApiResult<Option<EvaluationWindow>> {
    if query.is_lifetime() {
        return Ok(None);
    }
    Ok(Some(EvaluationWindow::from_dates(query.start, query.end)?))
}

/// Per-project metrics; without `start`/`end` every project over its lifetime
pub async fn get_evaluation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<EvaluationQuery>,
) -> ApiResult<impl IntoResponse> {
    authorize(auth.role, Permission::ViewEvaluation)?;
    let window = evaluation_window(&query)?;
    Ok(Json(state.engine.evaluate(window.as_ref()).await?))
}

pub async fn export_evaluation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<EvaluationQuery>,
) -> ApiResult<impl IntoResponse> {
    authorize(auth.role, Permission::ViewEvaluation)?;
    let window = evaluation_window(&query)?;
    let evaluations = state.engine.evaluate(window.as_ref()).await?;
    Ok(csv_response(
        "evaluation.csv",
        export::evaluation_csv(&evaluations),
    ))
}

/// Bootstrap snapshot; employees receive only their own records
pub async fn get_initial_data(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let mut data: InitialData = state.registry.initial_data().await?;

    if authorize(auth.role, Permission::ViewAllSessions).is_err() {
        data.users.retain(|user| user.id == auth.id);
        data.completed_sessions
            .retain(|session| session.employee_id == auth.id);
        data.active_sessions
            .retain(|session| session.user_id == auth.id);
    }

    Ok(Json(data))
}

// Kiosk

async fn save_transition(
    state: &AppState,
    kiosk_id: &str,
    transition: KioskTransition,
) -> ApiResult<Json<KioskTransition>> {
    state.kiosks.set(kiosk_id, transition.state).await?;
    Ok(Json(transition))
}

/// Current kiosk screen
///
/// A kiosk whose user was blocked or deleted meanwhile falls back to the
/// logged-out screen.
pub async fn get_kiosk(
    State(state): State<AppState>,
    Path(kiosk_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let _guard = state.kiosks.lock(&kiosk_id).await?;
    let mut kiosk = state.kiosks.get(&kiosk_id).await?;

    let user = match kiosk.current_user_id() {
        Some(user_id) => match state.engine.identify_by_id(user_id).await {
            Ok(user) => Some(user),
            Err(TrackingError::UnknownOrBlockedUser) => {
                kiosk = KioskState::LoggedOut;
                state.kiosks.set(&kiosk_id, kiosk).await?;
                None
            }
            Err(e) => return Err(e.into()),
        },
        None => None,
    };

    let active_session = match &user {
        Some(user) => state
            .engine
            .active_session_for(user.id)
            .await?
            .map(|session| {
                let elapsed_seconds = session.elapsed_seconds(state.engine.now());
                RunningTimer {
                    session,
                    elapsed_seconds,
                    elapsed_formatted: format::format_elapsed(elapsed_seconds),
                }
            }),
        None => None,
    };

    Ok(Json(KioskView {
        state: kiosk,
        user,
        active_session,
    }))
}

pub async fn kiosk_scan(
    State(state): State<AppState>,
    Path(kiosk_id): Path<String>,
    Json(payload): Json<ScanRequest>,
) -> ApiResult<impl IntoResponse> {
    let _guard = state.kiosks.lock(&kiosk_id).await?;
    let kiosk = state.kiosks.get(&kiosk_id).await?;
    let transition = kiosk.scan(&state.engine, &payload.payload).await?;
    save_transition(&state, &kiosk_id, transition).await
}

pub async fn kiosk_login(
    State(state): State<AppState>,
    Path(kiosk_id): Path<String>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<impl IntoResponse> {
    check_login_rate(&state, &credentials.username).await?;
    let username = credentials.username.to_lowercase();

    let _guard = state.kiosks.lock(&kiosk_id).await?;
    let kiosk = state.kiosks.get(&kiosk_id).await?;
    let transition = kiosk.login(&state.engine, credentials).await?;
    state.login_limiter.reset(&username).await;

    save_transition(&state, &kiosk_id, transition).await
}

pub async fn kiosk_select_project(
    State(state): State<AppState>,
    Path(kiosk_id): Path<String>,
    Json(payload): Json<SelectProjectRequest>,
) -> ApiResult<impl IntoResponse> {
    let _guard = state.kiosks.lock(&kiosk_id).await?;
    let kiosk = state.kiosks.get(&kiosk_id).await?;
    let transition = kiosk
        .select_project(&state.engine, payload.project_id)
        .await?;
    save_transition(&state, &kiosk_id, transition).await
}

pub async fn kiosk_confirm_stop(
    State(state): State<AppState>,
    Path(kiosk_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let _guard = state.kiosks.lock(&kiosk_id).await?;
    let kiosk = state.kiosks.get(&kiosk_id).await?;
    let transition = kiosk.confirm_stop(&state.engine).await?;
    save_transition(&state, &kiosk_id, transition).await
}

pub async fn kiosk_cancel_stop(
    State(state): State<AppState>,
    Path(kiosk_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let _guard = state.kiosks.lock(&kiosk_id).await?;
    let kiosk = state.kiosks.get(&kiosk_id).await?;
    let transition = kiosk.cancel_stop(&state.engine).await?;
    save_transition(&state, &kiosk_id, transition).await
}

pub async fn kiosk_logout(
    State(state): State<AppState>,
    Path(kiosk_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let _guard = state.kiosks.lock(&kiosk_id).await?;
    let kiosk = state.kiosks.get(&kiosk_id).await?;
    save_transition(&state, &kiosk_id, kiosk.logout()).await
}
