//! Shared error types for the services crate.

use thiserror::Error;

use hanzi_core::{ImportError, model::StudySetError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use storage::supabase::SupabaseConfigError;

/// Errors emitted while starting a practice session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no items available for session")]
    Empty,
    #[error("select at least one character to practice")]
    EmptySelection,
    #[error("no starred cards in this set")]
    NoStarredCards,
    #[error("sign in to continue")]
    NotSignedIn,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `StudySetService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudySetServiceError {
    #[error("sign in to manage study sets")]
    NotSignedIn,
    #[error("study set not found")]
    NotFound,
    #[error("a study set with this title already exists")]
    DuplicateTitle,
    #[error(transparent)]
    Draft(#[from] StudySetError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for StudySetServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => Self::NotFound,
            StorageError::Conflict => Self::DuplicateTitle,
            other => Self::Storage(other),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Supabase(#[from] SupabaseConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
