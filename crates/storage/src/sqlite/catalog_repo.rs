use hanzi_core::model::{PracticeItem, RecentPractice, UserId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{conn, parse_id, parse_state, ser, write_err};
use crate::repository::{BadgeRule, CatalogEntry, CatalogRepository, StorageError};

impl SqliteRepository {
    /// Insert or update catalog characters, keyed by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a glyph is already stored under another id.
    pub async fn upsert_catalog(&self, entries: &[CatalogEntry]) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        for entry in entries {
            sqlx::query(
                r"
                INSERT INTO characters (id, hanzi, pinyin, meaning, frequency_rank)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    hanzi = excluded.hanzi,
                    pinyin = excluded.pinyin,
                    meaning = excluded.meaning,
                    frequency_rank = excluded.frequency_rank
                ",
            )
            .bind(entry.id.to_string())
            .bind(&entry.hanzi)
            .bind(&entry.pinyin)
            .bind(&entry.meaning)
            .bind(i64::from(entry.frequency_rank))
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
        }
        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    /// Insert badges that are not stored yet; existing rows are left alone.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a badge name is taken by another id.
    pub async fn ensure_badges(&self, rules: &[BadgeRule]) -> Result<u64, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let mut inserted = 0_u64;
        for rule in rules {
            let done = sqlx::query(
                r"
                INSERT INTO badges (id, name, description, icon, criterion_kind, threshold)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(id) DO NOTHING
                ",
            )
            .bind(rule.badge.id.to_string())
            .bind(&rule.badge.name)
            .bind(&rule.badge.description)
            .bind(&rule.badge.icon)
            .bind(rule.criterion.kind())
            .bind(i64::from(rule.criterion.threshold()))
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
            inserted += done.rows_affected();
        }
        tx.commit().await.map_err(conn)?;
        Ok(inserted)
    }
}

fn item_from_row(row: &SqliteRow) -> Result<PracticeItem, StorageError> {
    let hanzi: String = row.try_get("hanzi").map_err(ser)?;
    let pinyin: String = row.try_get("pinyin").map_err(ser)?;
    let meaning: String = row.try_get("meaning").map_err(ser)?;
    Ok(PracticeItem::character(
        parse_id("character id", &row.try_get::<String, _>("id").map_err(ser)?)?,
        &hanzi,
        &pinyin,
        &meaning,
    ))
}

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn fetch_catalog_items(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<PracticeItem>, StorageError> {
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map_or(-1, i64::from);
        let rows = sqlx::query(
            r"
            SELECT id, hanzi, pinyin, meaning
            FROM characters
            ORDER BY frequency_rank ASC, id ASC
            LIMIT ?1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(item_from_row).collect()
    }

    async fn fetch_learning_items(&self, user: UserId) -> Result<Vec<PracticeItem>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT c.id, c.hanzi, c.pinyin, c.meaning
            FROM user_character_progress p
            JOIN characters c ON c.id = p.character_id
            WHERE p.user_id = ?1 AND p.state = 'learning'
            ORDER BY p.last_practiced ASC, c.id ASC
            ",
        )
        .bind(user.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(item_from_row).collect()
    }

    async fn recent_practice(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<RecentPractice>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT c.id, c.hanzi, c.pinyin, c.meaning, p.state, p.last_practiced
            FROM user_character_progress p
            JOIN characters c ON c.id = p.character_id
            WHERE p.user_id = ?1
            ORDER BY p.last_practiced DESC
            LIMIT ?2
            ",
        )
        .bind(user.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut recent = Vec::with_capacity(rows.len());
        for row in rows {
            let state: String = row.try_get("state").map_err(ser)?;
            recent.push(RecentPractice {
                item: item_from_row(&row)?,
                state: parse_state(&state)?,
                last_practiced: row.try_get("last_practiced").map_err(ser)?,
            });
        }
        Ok(recent)
    }
}
