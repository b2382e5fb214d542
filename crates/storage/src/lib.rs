#![forbid(unsafe_code)]

pub mod catalog;
pub mod repository;
pub mod sqlite;
pub mod supabase;

pub use catalog::{common_catalog, starter_badges};
pub use repository::{
    AuthSession, BadgeRule, CatalogEntry, CatalogRepository, InMemoryRepository, ProgressRepository,
    StaticAuth, Storage, StorageError, StudySetRepository,
};
