//! Work-session tracking core
//!
//! Users identify at a kiosk (QR code or credentials), open a timed session
//! against a project and later stop it, producing an immutable completed
//! session record. Completed sessions are aggregated on demand into per
//! project time, cost and progress figures.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tracking::{SessionEngine, clock::SystemClock, store::MemoryStore};
//!
//! # async fn run(user_id: uuid::Uuid, project_id: uuid::Uuid) -> tracking::TrackingResult<()> {
//! let engine = SessionEngine::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock));
//! engine.start_session(user_id, project_id).await?;
//! let record = engine.stop_session(user_id).await?;
//! println!("worked {}", record.duration_formatted);
//! # Ok(())
//! # }
//! ```

pub mod authorization;
pub mod clock;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod export;
pub mod format;
pub mod kiosk;
pub mod models;
pub mod qr;
pub mod registry;
pub mod store;
pub mod validation;

pub use engine::{AuthRequest, Identification, RunningTimer, SessionEngine};
pub use error::{TrackingError, TrackingResult};
pub use evaluation::{EvaluationWindow, ProjectEvaluation};
pub use kiosk::{KioskEvent, KioskState, KioskTransition};
pub use registry::{InitialData, Registry};
