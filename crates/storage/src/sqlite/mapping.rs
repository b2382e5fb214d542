use std::str::FromStr;

use hanzi_core::model::{Flashcard, ProgressState, StudySet};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Map a write failure, turning unique-constraint violations into `Conflict`.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => conn(e),
    }
}

pub(crate) fn parse_id<T>(field: &'static str, raw: &str) -> Result<T, StorageError>
where
    T: FromStr,
{
    raw.parse::<T>()
        .map_err(|_| StorageError::Serialization(format!("invalid {field}: {raw}")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} out of range: {v}")))
}

pub(crate) fn parse_state(s: &str) -> Result<ProgressState, StorageError> {
    ProgressState::parse(s)
        .ok_or_else(|| StorageError::Serialization(format!("invalid state: {s}")))
}

pub(crate) fn map_set_row(row: &SqliteRow) -> Result<StudySet, StorageError> {
    Ok(StudySet {
        id: parse_id("set id", &row.try_get::<String, _>("id").map_err(ser)?)?,
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        card_count: u32_from_i64("card_count", row.try_get("card_count").map_err(ser)?)?,
        is_public: row.try_get::<i64, _>("is_public").map_err(ser)? != 0,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_card_row(row: &SqliteRow) -> Result<Flashcard, StorageError> {
    Ok(Flashcard {
        id: parse_id("card id", &row.try_get::<String, _>("id").map_err(ser)?)?,
        set_id: parse_id("set id", &row.try_get::<String, _>("set_id").map_err(ser)?)?,
        term: row.try_get("term").map_err(ser)?,
        definition: row.try_get("definition").map_err(ser)?,
        position: u32_from_i64("position", row.try_get("position").map_err(ser)?)?,
        starred: row.try_get::<i64, _>("starred").map_err(ser)? != 0,
        mastered: row.try_get::<i64, _>("mastered").map_err(ser)? != 0,
        times_correct: u32_from_i64("times_correct", row.try_get("times_correct").map_err(ser)?)?,
        times_incorrect: u32_from_i64(
            "times_incorrect",
            row.try_get("times_incorrect").map_err(ser)?,
        )?,
        last_practiced: row.try_get("last_practiced").map_err(ser)?,
    })
}
