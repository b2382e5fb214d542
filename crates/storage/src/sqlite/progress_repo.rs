use chrono::NaiveDate;
use hanzi_core::model::{
    Badge, BadgeCriterion, BadgeStatus, ItemId, ProgressRecord, UserId, UserProgressSnapshot,
    snapshot_from,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::debug;

use super::SqliteRepository;
use super::mapping::{conn, parse_id, parse_state, ser, u32_from_i64};
use crate::repository::{ProgressRepository, StorageError};

fn record_from_row(row: &SqliteRow) -> Result<ProgressRecord, StorageError> {
    let state: String = row.try_get("state").map_err(ser)?;
    Ok(ProgressRecord {
        state: parse_state(&state)?,
        times_practiced: u32_from_i64("times_practiced", row.try_get("times_practiced").map_err(ser)?)?,
        last_practiced: row.try_get("last_practiced").map_err(ser)?,
    })
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn record_completion(&self, user: UserId, item: ItemId) -> Result<(), StorageError> {
        let now = self.clock.now();
        let user_key = user.to_string();
        let item_key = item.to_string();
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let known = sqlx::query("SELECT 1 FROM characters WHERE id = ?1")
            .bind(&item_key)
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn)?;
        if known.is_none() {
            return Err(StorageError::NotFound);
        }

        let existing = sqlx::query(
            r"
            SELECT state, times_practiced, last_practiced
            FROM user_character_progress
            WHERE user_id = ?1 AND character_id = ?2
            ",
        )
        .bind(&user_key)
        .bind(&item_key)
        .fetch_optional(&mut *tx)
        .await
        .map_err(conn)?
        .as_ref()
        .map(record_from_row)
        .transpose()?;

        let next = ProgressRecord::advance(existing, now);
        sqlx::query(
            r"
            INSERT INTO user_character_progress (user_id, character_id, state, times_practiced, last_practiced)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id, character_id) DO UPDATE SET
                state = excluded.state,
                times_practiced = excluded.times_practiced,
                last_practiced = excluded.last_practiced
            ",
        )
        .bind(&user_key)
        .bind(&item_key)
        .bind(next.state.as_str())
        .bind(i64::from(next.times_practiced))
        .bind(next.last_practiced)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO practice_days (user_id, day)
            VALUES (?1, ?2)
            ON CONFLICT(user_id, day) DO NOTHING
            ",
        )
        .bind(&user_key)
        .bind(now.date_naive())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;
        debug!(
            user_id = %user,
            item_id = %item,
            state = next.state.as_str(),
            times_practiced = next.times_practiced,
            "completion recorded"
        );
        Ok(())
    }

    async fn refresh_profile(&self, user: UserId) -> Result<UserProgressSnapshot, StorageError> {
        let now = self.clock.now();
        let user_key = user.to_string();
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let records: Vec<ProgressRecord> = sqlx::query(
            r"
            SELECT state, times_practiced, last_practiced
            FROM user_character_progress
            WHERE user_id = ?1
            ",
        )
        .bind(&user_key)
        .fetch_all(&mut *tx)
        .await
        .map_err(conn)?
        .iter()
        .map(record_from_row)
        .collect::<Result<_, _>>()?;

        let days: Vec<NaiveDate> = sqlx::query("SELECT day FROM practice_days WHERE user_id = ?1")
            .bind(&user_key)
            .fetch_all(&mut *tx)
            .await
            .map_err(conn)?
            .iter()
            .map(|row| row.try_get::<NaiveDate, _>("day").map_err(ser))
            .collect::<Result<_, _>>()?;

        let snapshot = snapshot_from(records, days, now.date_naive());

        sqlx::query(
            r"
            INSERT INTO user_profile (user_id, level, mastered, learning, streak_days, total_practiced, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(user_id) DO UPDATE SET
                level = excluded.level,
                mastered = excluded.mastered,
                learning = excluded.learning,
                streak_days = excluded.streak_days,
                total_practiced = excluded.total_practiced,
                updated_at = excluded.updated_at
            ",
        )
        .bind(&user_key)
        .bind(i64::from(snapshot.level))
        .bind(i64::from(snapshot.mastered))
        .bind(i64::from(snapshot.learning))
        .bind(i64::from(snapshot.streak_days))
        .bind(i64::from(snapshot.total_practiced))
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        let rules = sqlx::query("SELECT id, criterion_kind, threshold FROM badges")
            .fetch_all(&mut *tx)
            .await
            .map_err(conn)?;
        let mut awarded = 0_u32;
        for row in &rules {
            let kind: String = row.try_get("criterion_kind").map_err(ser)?;
            let threshold = u32_from_i64("threshold", row.try_get("threshold").map_err(ser)?)?;
            let criterion = BadgeCriterion::from_parts(&kind, threshold).ok_or_else(|| {
                StorageError::Serialization(format!("invalid badge criterion: {kind}"))
            })?;
            if !criterion.is_met(&snapshot) {
                continue;
            }
            let badge_id: String = row.try_get("id").map_err(ser)?;
            let inserted = sqlx::query(
                r"
                INSERT INTO user_badges (user_id, badge_id, earned_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(user_id, badge_id) DO NOTHING
                ",
            )
            .bind(&user_key)
            .bind(&badge_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
            if inserted.rows_affected() > 0 {
                awarded += 1;
            }
        }

        tx.commit().await.map_err(conn)?;
        if awarded > 0 {
            debug!(user_id = %user, awarded, "badges awarded");
        }
        Ok(snapshot)
    }

    async fn fetch_profile(
        &self,
        user: UserId,
    ) -> Result<Option<UserProgressSnapshot>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT level, mastered, learning, streak_days, total_practiced
            FROM user_profile
            WHERE user_id = ?1
            ",
        )
        .bind(user.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.map(|row| {
            Ok(UserProgressSnapshot {
                level: u32_from_i64("level", row.try_get("level").map_err(ser)?)?,
                mastered: u32_from_i64("mastered", row.try_get("mastered").map_err(ser)?)?,
                learning: u32_from_i64("learning", row.try_get("learning").map_err(ser)?)?,
                streak_days: u32_from_i64("streak_days", row.try_get("streak_days").map_err(ser)?)?,
                total_practiced: u32_from_i64(
                    "total_practiced",
                    row.try_get("total_practiced").map_err(ser)?,
                )?,
            })
        })
        .transpose()
    }

    async fn list_badges(&self, user: UserId) -> Result<Vec<BadgeStatus>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT b.id, b.name, b.description, b.icon, ub.earned_at
            FROM badges b
            LEFT JOIN user_badges ub ON ub.badge_id = b.id AND ub.user_id = ?1
            ORDER BY b.name ASC
            ",
        )
        .bind(user.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| {
                Ok(BadgeStatus {
                    badge: Badge {
                        id: parse_id("badge id", &row.try_get::<String, _>("id").map_err(ser)?)?,
                        name: row.try_get("name").map_err(ser)?,
                        description: row.try_get("description").map_err(ser)?,
                        icon: row.try_get("icon").map_err(ser)?,
                    },
                    earned_at: row.try_get("earned_at").map_err(ser)?,
                })
            })
            .collect()
    }
}
