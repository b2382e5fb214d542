//! Supabase (PostgREST) backend.
//!
//! Table reads go through `/rest/v1/<table>`; writes with server-side
//! bookkeeping go through `/rest/v1/rpc/<function>`.

use std::sync::Arc;

use async_trait::async_trait;
use hanzi_core::model::{
    BadgeStatus, EarnedBadge, Flashcard, ItemId, PracticeItem, RecentPractice, SetId, StudySet,
    TermPair, UserId, UserProgressSnapshot, badge_board,
};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::repository::{
    AuthSession, CatalogRepository, ProgressRepository, Storage, StorageError,
    StudySetRepository,
};

mod rows;

use rows::{
    BadgeRow, CardRow, CharacterRow, EarnedBadgeRow, IdRow, NewCardBody, NewSetBody, PositionRow,
    ProfileRow, ProgressRow, SetRow,
};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SupabaseConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("invalid SUPABASE_USER_ID: {0}")]
    InvalidUserId(String),

    #[error(transparent)]
    Client(#[from] reqwest::Error),
}

/// Project endpoint and credentials.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    /// Session JWT; requests fall back to the anon key without one.
    pub access_token: Option<String>,
    pub user_id: Option<UserId>,
}

impl SupabaseConfig {
    /// Read `SUPABASE_URL`, `SUPABASE_ANON_KEY`, `SUPABASE_ACCESS_TOKEN` and
    /// `SUPABASE_USER_ID`.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseConfigError::Missing` when the URL or key is absent and
    /// `SupabaseConfigError::InvalidUserId` for a malformed user id.
    pub fn from_env() -> Result<Self, SupabaseConfigError> {
        let url = non_empty_env("SUPABASE_URL").ok_or(SupabaseConfigError::Missing("SUPABASE_URL"))?;
        let anon_key = non_empty_env("SUPABASE_ANON_KEY")
            .ok_or(SupabaseConfigError::Missing("SUPABASE_ANON_KEY"))?;
        let user_id = non_empty_env("SUPABASE_USER_ID")
            .map(|raw| {
                raw.parse::<UserId>()
                    .map_err(|_| SupabaseConfigError::InvalidUserId(raw))
            })
            .transpose()?;
        Ok(Self {
            url,
            anon_key,
            access_token: non_empty_env("SUPABASE_ACCESS_TOKEN"),
            user_id,
        })
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{path}", self.url.trim_end_matches('/'))
    }

    fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.anon_key)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Session derived from the configured user id.
#[derive(Debug, Clone, Copy)]
pub struct SupabaseAuth {
    user: Option<UserId>,
}

impl AuthSession for SupabaseAuth {
    fn current_user_id(&self) -> Option<UserId> {
        self.user
    }
}

#[derive(Clone)]
pub struct SupabaseRepository {
    client: reqwest::Client,
    config: Arc<SupabaseConfig>,
}

impl SupabaseRepository {
    /// # Errors
    ///
    /// Returns `SupabaseConfigError::Client` if the HTTP client cannot be built.
    pub fn new(config: SupabaseConfig) -> Result<Self, SupabaseConfigError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.config.rest_url(path))
            .header("apikey", &self.config.anon_key)
            .header("Authorization", format!("Bearer {}", self.config.bearer()))
    }

    fn rpc(&self, function: &str, body: &serde_json::Value) -> RequestBuilder {
        self.request(Method::POST, &format!("rpc/{function}")).json(body)
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, StorageError> {
        let response = request
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        debug!(%status, bytes = body.len(), "supabase response");
        check_status(status, body)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StorageError> {
        let body = self.send(request).await?;
        decode(&body)
    }
}

fn check_status(status: StatusCode, body: String) -> Result<String, StorageError> {
    if status.is_success() {
        return Ok(body);
    }
    match status {
        StatusCode::NOT_FOUND => Err(StorageError::NotFound),
        StatusCode::CONFLICT => Err(StorageError::Conflict),
        other => Err(StorageError::Remote {
            status: other.as_u16(),
            message: body,
        }),
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, StorageError> {
    serde_json::from_str(body).map_err(|e| {
        StorageError::Serialization(format!("failed to parse response: {e}; body: {body}"))
    })
}

/// First row of a `return=representation` write, or `NotFound` when nothing matched.
fn first_row<T>(rows: Vec<T>) -> Result<T, StorageError> {
    rows.into_iter().next().ok_or(StorageError::NotFound)
}

const PREFER_RETURN: (&str, &str) = ("Prefer", "return=representation");

#[async_trait]
impl CatalogRepository for SupabaseRepository {
    async fn fetch_catalog_items(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<PracticeItem>, StorageError> {
        let mut path =
            String::from("characters?select=id,character,pinyin,meaning&order=frequency_rank.asc");
        if let Some(limit) = limit {
            path.push_str(&format!("&limit={limit}"));
        }
        let rows: Vec<CharacterRow> = self.fetch(self.request(Method::GET, &path)).await?;
        Ok(rows.into_iter().map(CharacterRow::into_item).collect())
    }

    async fn fetch_learning_items(&self, user: UserId) -> Result<Vec<PracticeItem>, StorageError> {
        let path = format!(
            "user_character_progress?select=state,last_practiced,characters(id,character,pinyin,meaning)\
             &user_id=eq.{user}&state=eq.learning&order=last_practiced.asc"
        );
        let rows: Vec<ProgressRow> = self.fetch(self.request(Method::GET, &path)).await?;
        Ok(rows.into_iter().map(|r| r.characters.into_item()).collect())
    }

    async fn recent_practice(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<RecentPractice>, StorageError> {
        let path = format!(
            "user_character_progress?select=state,last_practiced,characters(id,character,pinyin,meaning)\
             &user_id=eq.{user}&order=last_practiced.desc&limit={limit}"
        );
        let rows: Vec<ProgressRow> = self.fetch(self.request(Method::GET, &path)).await?;
        rows.into_iter().map(ProgressRow::into_recent).collect()
    }
}

#[async_trait]
impl ProgressRepository for SupabaseRepository {
    async fn record_completion(&self, user: UserId, item: ItemId) -> Result<(), StorageError> {
        let body = json!({ "p_user_id": user, "p_character_id": item });
        self.send(self.rpc("complete_character", &body)).await?;
        Ok(())
    }

    async fn refresh_profile(&self, user: UserId) -> Result<UserProgressSnapshot, StorageError> {
        let body = json!({ "p_user_id": user });
        self.send(self.rpc("update_profile_after_completion", &body))
            .await?;
        self.fetch_profile(user).await?.ok_or(StorageError::NotFound)
    }

    async fn fetch_profile(
        &self,
        user: UserId,
    ) -> Result<Option<UserProgressSnapshot>, StorageError> {
        let path = format!(
            "user_profile?select=level,mastered,learning,streak,total_characters_practiced\
             &user_id=eq.{user}"
        );
        let rows: Vec<ProfileRow> = self.fetch(self.request(Method::GET, &path)).await?;
        Ok(rows.into_iter().next().map(UserProgressSnapshot::from))
    }

    async fn list_badges(&self, user: UserId) -> Result<Vec<BadgeStatus>, StorageError> {
        let badges: Vec<BadgeRow> = self
            .fetch(self.request(
                Method::GET,
                "badges?select=id,name,description,icon_emoji&order=name.asc",
            ))
            .await?;
        let path = format!("user_badges?select=badge_id,earned_at&user_id=eq.{user}");
        let earned: Vec<EarnedBadgeRow> = self.fetch(self.request(Method::GET, &path)).await?;
        let earned: Vec<EarnedBadge> = earned.into_iter().map(EarnedBadge::from).collect();
        Ok(badge_board(
            badges.into_iter().map(BadgeRow::into_badge).collect(),
            &earned,
        ))
    }
}

#[async_trait]
impl StudySetRepository for SupabaseRepository {
    async fn create_set(
        &self,
        user: UserId,
        title: &str,
        description: Option<&str>,
    ) -> Result<SetId, StorageError> {
        let body = NewSetBody {
            user_id: user.to_string(),
            title,
            description,
        };
        let request = self
            .request(Method::POST, "flashcard_sets?select=id")
            .header(PREFER_RETURN.0, PREFER_RETURN.1)
            .json(&body);
        let rows: Vec<IdRow<SetId>> = self.fetch(request).await?;
        first_row(rows).map(|r| r.id)
    }

    async fn update_set(
        &self,
        set_id: SetId,
        title: &str,
        description: Option<&str>,
    ) -> Result<(), StorageError> {
        let request = self
            .request(Method::PATCH, &format!("flashcard_sets?id=eq.{set_id}&select=id"))
            .header(PREFER_RETURN.0, PREFER_RETURN.1)
            .json(&json!({ "title": title, "description": description }));
        let rows: Vec<IdRow<SetId>> = self.fetch(request).await?;
        first_row(rows).map(|_| ())
    }

    async fn add_items(
        &self,
        set_id: SetId,
        items: &[TermPair],
    ) -> Result<Vec<ItemId>, StorageError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let path = format!(
            "flashcards?select=position&set_id=eq.{set_id}&order=position.desc&limit=1"
        );
        let top: Vec<PositionRow> = self.fetch(self.request(Method::GET, &path)).await?;
        let start = top.first().map_or(0, |r| r.position);

        let body: Vec<NewCardBody<'_>> = (1_u32..)
            .zip(items)
            .map(|(offset, pair)| NewCardBody {
                set_id: set_id.to_string(),
                term: &pair.term,
                definition: &pair.definition,
                position: start + offset,
            })
            .collect();
        let request = self
            .request(Method::POST, "flashcards?select=id")
            .header(PREFER_RETURN.0, PREFER_RETURN.1)
            .json(&body);
        let rows: Vec<IdRow<ItemId>> = self.fetch(request).await?;
        Ok(rows.into_iter().map(|r| r.id).collect())
    }

    async fn clear_items(&self, set_id: SetId) -> Result<(), StorageError> {
        self.send(self.request(Method::DELETE, &format!("flashcards?set_id=eq.{set_id}")))
            .await?;
        Ok(())
    }

    async fn delete_set(&self, set_id: SetId) -> Result<(), StorageError> {
        let request = self
            .request(Method::DELETE, &format!("flashcard_sets?id=eq.{set_id}&select=id"))
            .header(PREFER_RETURN.0, PREFER_RETURN.1);
        let rows: Vec<IdRow<SetId>> = self.fetch(request).await?;
        first_row(rows).map(|_| ())
    }

    async fn list_sets(&self, user: UserId) -> Result<Vec<StudySet>, StorageError> {
        let path = format!(
            "flashcard_sets?select=id,title,description,is_public,created_at,flashcards(count)\
             &user_id=eq.{user}&order=created_at.desc"
        );
        let rows: Vec<SetRow> = self.fetch(self.request(Method::GET, &path)).await?;
        Ok(rows.into_iter().map(StudySet::from).collect())
    }

    async fn get_set_items(&self, set_id: SetId) -> Result<Vec<Flashcard>, StorageError> {
        let body = json!({ "p_set_id": set_id });
        let mut rows: Vec<CardRow> = self
            .fetch(self.rpc("get_flashcards_with_progress", &body))
            .await?;
        rows.sort_by_key(|r| r.position);
        Ok(rows.into_iter().map(Flashcard::from).collect())
    }

    async fn remove_item(&self, item: ItemId) -> Result<(), StorageError> {
        let request = self
            .request(Method::DELETE, &format!("flashcards?id=eq.{item}&select=id"))
            .header(PREFER_RETURN.0, PREFER_RETURN.1);
        let rows: Vec<IdRow<ItemId>> = self.fetch(request).await?;
        first_row(rows).map(|_| ())
    }

    async fn record_answer(&self, card: ItemId, correct: bool) -> Result<(), StorageError> {
        let body = json!({ "p_flashcard_id": card, "p_is_correct": correct });
        self.send(self.rpc("record_flashcard_answer", &body)).await?;
        Ok(())
    }

    async fn toggle_star(&self, card: ItemId) -> Result<bool, StorageError> {
        let body = json!({ "p_flashcard_id": card });
        self.fetch(self.rpc("toggle_flashcard_star", &body)).await
    }
}

impl Storage {
    /// Build a `Storage` backed by a Supabase project.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseConfigError` if the HTTP client cannot be built.
    pub fn supabase(config: SupabaseConfig) -> Result<Self, SupabaseConfigError> {
        let auth: Arc<dyn AuthSession> = Arc::new(SupabaseAuth {
            user: config.user_id,
        });
        let repo = SupabaseRepository::new(config)?;
        Ok(Self::from_repository(repo, auth))
    }
}
