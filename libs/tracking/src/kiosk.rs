//! Kiosk interaction state machine
//!
//! A kiosk is a shared device where people log in (QR scan or credentials),
//! pick a project and later stop their shift. The machine never terminates:
//!
//! ```text
//! LoggedOut ──identify, no session──▶ LoggedIn
//! LoggedOut ──identify, has session──▶ AwaitingStopConfirmation
//! LoggedIn ──project──▶ LoggedOut (employee) | LoggedIn (manager/admin)
//! AwaitingStopConfirmation ──confirm──▶ LoggedOut
//! AwaitingStopConfirmation ──cancel──▶ LoggedOut (employee) | LoggedIn (manager/admin)
//! ```
//!
//! Only user ids are kept in the state; users are re-read on every step so
//! blocking takes effect immediately.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    engine::{AuthRequest, Identification, SessionEngine},
    error::{TrackingError, TrackingResult},
    models::{ActiveSession, CompletedSession, Credentials, User},
    qr::QrToken,
};

/// Current state of one kiosk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum KioskState {
    #[default]
    LoggedOut,
    #[serde(rename_all = "camelCase")]
    LoggedIn { user_id: Uuid },
    #[serde(rename_all = "camelCase")]
    AwaitingStopConfirmation { user_id: Uuid },
}

/// What happened during a transition
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum KioskEvent {
    LoggedIn {
        user: User,
    },
    StopPending {
        user: User,
        session: ActiveSession,
    },
    SessionStarted {
        session: ActiveSession,
    },
    SessionStopped {
        session: CompletedSession,
    },
    /// The pending stop was dismissed; `resumed_as` is set when a privileged
    /// user is logged in by the cancellation
    #[serde(rename_all = "camelCase")]
    StopCancelled {
        resumed_as: Option<User>,
    },
    LoggedOut,
}

/// Result of a kiosk step
#[derive(Debug, Clone, Serialize)]
pub struct KioskTransition {
    pub state: KioskState,
    #[serde(flatten)]
    pub event: KioskEvent,
}

impl KioskTransition {
    fn new(state: KioskState, event: KioskEvent) -> Self {
        Self { state, event }
    }
}

impl KioskState {
    pub fn current_user_id(&self) -> Option<Uuid> {
        match self {
            KioskState::LoggedOut => None,
            KioskState::LoggedIn { user_id }
            | KioskState::AwaitingStopConfirmation { user_id } => Some(*user_id),
        }
    }

    /// Handle a scanned QR payload
    ///
    /// User tokens identify in every state. Project tokens start a session
    /// for the logged-in user and fail with `LoginRequired` otherwise.
    pub async fn scan(
        &self,
        engine: &SessionEngine,
        payload: &str,
    ) -> TrackingResult<KioskTransition> {
        match payload.parse::<QrToken>()? {
            QrToken::User(_) => {
                let identification = engine
                    .authenticate(AuthRequest::Qr(payload.to_string()))
                    .await?;
                Ok(Self::identified(identification))
            }
            QrToken::Project(project_id) => match self {
                KioskState::LoggedIn { user_id } => {
                    self.start(engine, *user_id, project_id).await
                }
                _ => Err(TrackingError::LoginRequired),
            },
        }
    }

    /// Handle manual username/password entry
    pub async fn login(
        &self,
        engine: &SessionEngine,
        credentials: Credentials,
    ) -> TrackingResult<KioskTransition> {
        let identification = engine
            .authenticate(AuthRequest::Credentials(credentials))
            .await?;
        Ok(Self::identified(identification))
    }

    /// Start a session on a manually picked project
    ///
    /// Requires the manual-selection flag and a project inside one of the
    /// user's cost centers.
    pub async fn select_project(
        &self,
        engine: &SessionEngine,
        project_id: Uuid,
    ) -> TrackingResult<KioskTransition> {
        let KioskState::LoggedIn { user_id } = self else {
            return Err(TrackingError::LoginRequired);
        };

        let user = engine.identify_by_id(*user_id).await?;
        if !user.can_select_project_manually {
            return Err(TrackingError::ManualSelectionNotAllowed);
        }

        let project = engine
            .store()
            .find_project(project_id)
            .await?
            .ok_or(TrackingError::UnknownProject)?;

        match project.cost_center_id {
            Some(cost_center_id) if user.belongs_to_cost_center(cost_center_id) => {}
            _ => return Err(TrackingError::ProjectNotInCostCenter),
        }

        self.start(engine, *user_id, project_id).await
    }

    /// Confirm the pending stop
    pub async fn confirm_stop(&self, engine: &SessionEngine) -> TrackingResult<KioskTransition> {
        let KioskState::AwaitingStopConfirmation { user_id } = self else {
            return Err(TrackingError::Validation(
                "No stop confirmation is pending".to_string(),
            ));
        };

        let session = engine.stop_session(*user_id).await?;
        Ok(KioskTransition::new(
            KioskState::LoggedOut,
            KioskEvent::SessionStopped { session },
        ))
    }

    /// Dismiss the pending stop without touching the session
    ///
    /// Managers and admins are logged in by the cancellation so they can
    /// keep using privileged views; employees return to the logged-out
    /// screen. Outside a pending stop this is a no-op.
    pub async fn cancel_stop(&self, engine: &SessionEngine) -> TrackingResult<KioskTransition> {
        let KioskState::AwaitingStopConfirmation { user_id } = self else {
            return Ok(KioskTransition::new(
                *self,
                KioskEvent::StopCancelled { resumed_as: None },
            ));
        };

        match engine.identify_by_id(*user_id).await {
            Ok(user) if user.role.is_privileged() => Ok(KioskTransition::new(
                KioskState::LoggedIn { user_id: user.id },
                KioskEvent::StopCancelled {
                    resumed_as: Some(user),
                },
            )),
            Ok(_) | Err(TrackingError::UnknownOrBlockedUser) => Ok(KioskTransition::new(
                KioskState::LoggedOut,
                KioskEvent::StopCancelled { resumed_as: None },
            )),
            Err(e) => Err(e),
        }
    }

    pub fn logout(&self) -> KioskTransition {
        KioskTransition::new(KioskState::LoggedOut, KioskEvent::LoggedOut)
    }

    async fn start(
        &self,
        engine: &SessionEngine,
        user_id: Uuid,
        project_id: Uuid,
    ) -> TrackingResult<KioskTransition> {
        let user = engine.identify_by_id(user_id).await?;
        let session = engine.start_session(user_id, project_id).await?;

        // An employee's shift is now running; they cannot act further until
        // they come back to stop it.
        let next = if user.role.is_privileged() {
            KioskState::LoggedIn { user_id }
        } else {
            info!("Employee {} logged out after starting a session", user_id);
            KioskState::LoggedOut
        };

        Ok(KioskTransition::new(next, KioskEvent::SessionStarted { session }))
    }

    fn identified(identification: Identification) -> KioskTransition {
        match identification {
            Identification::LoggedIn { user } => KioskTransition::new(
                KioskState::LoggedIn { user_id: user.id },
                KioskEvent::LoggedIn { user },
            ),
            Identification::PendingStop { user, session } => KioskTransition::new(
                KioskState::AwaitingStopConfirmation { user_id: user.id },
                KioskEvent::StopPending { user, session },
            ),
        }
    }
}
