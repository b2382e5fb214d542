use hanzi_core::model::{Flashcard, ItemId, SetId, StudySet, TermPair, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, map_card_row, map_set_row, ser, write_err};
use crate::repository::{StorageError, StudySetRepository, apply_answer};

const CARD_COLUMNS: &str = "id, set_id, term, definition, position, starred, mastered, \
     times_correct, times_incorrect, last_practiced";

impl SqliteRepository {
    async fn card_by_id(&self, card: ItemId) -> Result<Flashcard, StorageError> {
        let row = sqlx::query(&format!("SELECT {CARD_COLUMNS} FROM flashcards WHERE id = ?1"))
            .bind(card.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        map_card_row(&row)
    }
}

#[async_trait::async_trait]
impl StudySetRepository for SqliteRepository {
    async fn create_set(
        &self,
        user: UserId,
        title: &str,
        description: Option<&str>,
    ) -> Result<SetId, StorageError> {
        let id = SetId::random();
        sqlx::query(
            r"
            INSERT INTO flashcard_sets (id, user_id, title, description, is_public, created_at)
            VALUES (?1, ?2, ?3, ?4, 0, ?5)
            ",
        )
        .bind(id.to_string())
        .bind(user.to_string())
        .bind(title)
        .bind(description)
        .bind(self.clock.now())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(id)
    }

    async fn update_set(
        &self,
        set_id: SetId,
        title: &str,
        description: Option<&str>,
    ) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE flashcard_sets SET title = ?2, description = ?3
            WHERE id = ?1
            ",
        )
        .bind(set_id.to_string())
        .bind(title)
        .bind(description)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn add_items(
        &self,
        set_id: SetId,
        items: &[TermPair],
    ) -> Result<Vec<ItemId>, StorageError> {
        let set_key = set_id.to_string();
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let known = sqlx::query("SELECT 1 FROM flashcard_sets WHERE id = ?1")
            .bind(&set_key)
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn)?;
        if known.is_none() {
            return Err(StorageError::NotFound);
        }

        let start: i64 = sqlx::query(
            "SELECT COALESCE(MAX(position), 0) AS top FROM flashcards WHERE set_id = ?1",
        )
        .bind(&set_key)
        .fetch_one(&mut *tx)
        .await
        .map_err(conn)?
        .try_get("top")
        .map_err(ser)?;

        let mut ids = Vec::with_capacity(items.len());
        for (offset, pair) in (1_i64..).zip(items) {
            let id = ItemId::random();
            sqlx::query(
                r"
                INSERT INTO flashcards (id, set_id, term, definition, position)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(id.to_string())
            .bind(&set_key)
            .bind(&pair.term)
            .bind(&pair.definition)
            .bind(start + offset)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
            ids.push(id);
        }

        tx.commit().await.map_err(conn)?;
        Ok(ids)
    }

    async fn clear_items(&self, set_id: SetId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM flashcards WHERE set_id = ?1")
            .bind(set_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }

    async fn delete_set(&self, set_id: SetId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM flashcard_sets WHERE id = ?1")
            .bind(set_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_sets(&self, user: UserId) -> Result<Vec<StudySet>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT s.id, s.title, s.description, s.is_public, s.created_at,
                   (SELECT COUNT(*) FROM flashcards f WHERE f.set_id = s.id) AS card_count
            FROM flashcard_sets s
            WHERE s.user_id = ?1
            ORDER BY s.created_at DESC, s.rowid DESC
            ",
        )
        .bind(user.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_set_row).collect()
    }

    async fn get_set_items(&self, set_id: SetId) -> Result<Vec<Flashcard>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {CARD_COLUMNS} FROM flashcards WHERE set_id = ?1 ORDER BY position ASC"
        ))
        .bind(set_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_card_row).collect()
    }

    async fn remove_item(&self, item: ItemId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM flashcards WHERE id = ?1")
            .bind(item.to_string())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn record_answer(&self, card: ItemId, correct: bool) -> Result<(), StorageError> {
        let mut stored = self.card_by_id(card).await?;
        apply_answer(&mut stored, correct, self.clock.now());

        sqlx::query(
            r"
            UPDATE flashcards
            SET times_correct = ?2, times_incorrect = ?3, mastered = ?4, last_practiced = ?5
            WHERE id = ?1
            ",
        )
        .bind(card.to_string())
        .bind(i64::from(stored.times_correct))
        .bind(i64::from(stored.times_incorrect))
        .bind(i64::from(stored.mastered))
        .bind(stored.last_practiced)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn toggle_star(&self, card: ItemId) -> Result<bool, StorageError> {
        let row = sqlx::query(
            r"
            UPDATE flashcards SET starred = 1 - starred
            WHERE id = ?1
            RETURNING starred
            ",
        )
        .bind(card.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;
        Ok(row.try_get::<i64, _>("starred").map_err(ser)? != 0)
    }
}
