use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use super::SqliteInitError;

/// Runs the versioned schema migrations in order.
///
/// Creates the catalog, per-user progress, profile aggregates, study sets and badges.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS characters (
                    id TEXT PRIMARY KEY,
                    hanzi TEXT NOT NULL UNIQUE,
                    pinyin TEXT NOT NULL,
                    meaning TEXT NOT NULL,
                    frequency_rank INTEGER NOT NULL CHECK (frequency_rank >= 0)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS user_character_progress (
                    user_id TEXT NOT NULL,
                    character_id TEXT NOT NULL,
                    state TEXT NOT NULL CHECK (state IN ('new', 'learning', 'mastered')),
                    times_practiced INTEGER NOT NULL CHECK (times_practiced >= 0),
                    last_practiced TEXT NOT NULL,
                    PRIMARY KEY (user_id, character_id),
                    FOREIGN KEY (character_id) REFERENCES characters(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS practice_days (
                    user_id TEXT NOT NULL,
                    day TEXT NOT NULL,
                    PRIMARY KEY (user_id, day)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS user_profile (
                    user_id TEXT PRIMARY KEY,
                    level INTEGER NOT NULL CHECK (level >= 1),
                    mastered INTEGER NOT NULL CHECK (mastered >= 0),
                    learning INTEGER NOT NULL CHECK (learning >= 0),
                    streak_days INTEGER NOT NULL CHECK (streak_days >= 0),
                    updated_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS flashcard_sets (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    title TEXT NOT NULL,
                    description TEXT,
                    is_public INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    UNIQUE (user_id, title)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS flashcards (
                    id TEXT PRIMARY KEY,
                    set_id TEXT NOT NULL,
                    term TEXT NOT NULL,
                    definition TEXT NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    starred INTEGER NOT NULL DEFAULT 0,
                    mastered INTEGER NOT NULL DEFAULT 0,
                    times_correct INTEGER NOT NULL DEFAULT 0 CHECK (times_correct >= 0),
                    times_incorrect INTEGER NOT NULL DEFAULT 0 CHECK (times_incorrect >= 0),
                    last_practiced TEXT,
                    FOREIGN KEY (set_id) REFERENCES flashcard_sets(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_progress_user_state_practiced
                    ON user_character_progress (user_id, state, last_practiced);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_flashcards_set_position
                    ON flashcards (set_id, position);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_flashcard_sets_user_created
                    ON flashcard_sets (user_id, created_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(version = 1, "applied sqlite migration");
    }

    // Version 2: badges and lifetime completion count.
    if !is_applied(pool, 2).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                ALTER TABLE user_profile
                    ADD COLUMN total_practiced INTEGER NOT NULL DEFAULT 0 CHECK (total_practiced >= 0);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS badges (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE,
                    description TEXT NOT NULL,
                    icon TEXT NOT NULL,
                    criterion_kind TEXT NOT NULL CHECK (criterion_kind IN ('mastered', 'streak', 'practiced')),
                    threshold INTEGER NOT NULL CHECK (threshold >= 0)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS user_badges (
                    user_id TEXT NOT NULL,
                    badge_id TEXT NOT NULL,
                    earned_at TEXT NOT NULL,
                    PRIMARY KEY (user_id, badge_id),
                    FOREIGN KEY (badge_id) REFERENCES badges(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(2_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(version = 2, "applied sqlite migration");
    }

    Ok(())
}
