#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod error;
pub mod practice;
pub mod practice_service;
pub mod reconciler;
pub mod sampler;
pub mod study_set_service;

pub use hanzi_core::Clock;

pub use app_services::AppServices;
pub use config::PracticeConfig;
pub use error::{AppServicesError, SessionError, StudySetServiceError};
pub use practice::{
    Effect, Phase, PracticeInput, PracticeMode, PracticeRunner, PracticeSession,
    PracticeSnapshot, Rejected, RunnerStep, SessionOptions,
};
pub use practice_service::{PracticeService, Selection, StudyOptions, SuggestedItem};
pub use reconciler::{CompletionReconciler, ProgressCache, ReconcileOutcome};
pub use study_set_service::{CommitOutcome, StudySetService};
