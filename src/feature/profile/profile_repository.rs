//! Types and functions for storing and loading profiles from the database.

use crate::infra::{
    database::DbPool,
    error::{ApiResult, ClientError},
    pagination::PaginationParams,
    validation::Valid,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;
use validator::Validate;

/// A new profile, or the new contents of an existing one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    /// A unique handle.
    #[schema(example = "ada")]
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    /// The name shown to other users.
    #[schema(example = "Ada Lovelace")]
    #[validate(length(min = 1, max = 64))]
    pub display_name: String,
    /// A short free-form description.
    #[schema(example = "Analyst, metaphysician, and founder of scientific computing")]
    #[validate(length(max = 280))]
    #[serde(default)]
    pub bio: Option<String>,
}

/// A stored profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// The profile's id.
    pub id: i64,
    /// A unique handle.
    #[schema(example = "ada")]
    pub username: String,
    /// The name shown to other users.
    #[schema(example = "Ada Lovelace")]
    pub display_name: String,
    /// A short free-form description.
    pub bio: Option<String>,
    /// When the profile was created.
    pub created_at: DateTime<Utc>,
    /// When the profile was last changed.
    pub updated_at: DateTime<Utc>,
}

/// Anything that can store and load profiles.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Stores a new profile.
    async fn create_profile(&self, new_profile: Valid<NewProfile>) -> ApiResult<Profile>;

    /// Fetches a profile by id.
    async fn fetch_profile(&self, id: i64) -> ApiResult<Option<Profile>>;

    /// Lists one page of profiles, oldest first.
    async fn list_profiles(&self, params: PaginationParams) -> ApiResult<Vec<Profile>>;

    /// Replaces the contents of a profile.
    async fn update_profile(&self, id: i64, new_profile: Valid<NewProfile>) -> ApiResult<Profile>;

    /// Deletes a profile.
    async fn delete_profile(&self, id: i64) -> ApiResult<()>;
}

/// A profile repository backed by postgres.
#[derive(Clone, Debug)]
pub struct PgProfileRepository {
    db: DbPool,
}

impl PgProfileRepository {
    /// Creates a new repository.
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl ProfileRepository for PgProfileRepository {
    #[instrument(skip(self))]
    async fn create_profile(&self, new_profile: Valid<NewProfile>) -> ApiResult<Profile> {
        let new_profile = new_profile.into_inner();
        tracing::info!("Creating profile {}", new_profile.username);
        let profile = sqlx::query_as::<_, Profile>(
            r#"
                INSERT INTO profiles (username, display_name, bio)
                VALUES ($1, $2, $3)
                RETURNING id, username, display_name, bio, created_at, updated_at
            "#,
        )
        .bind(new_profile.username)
        .bind(new_profile.display_name)
        .bind(new_profile.bio)
        .fetch_one(&self.db)
        .await?;
        tracing::info!("Created profile {}", profile.id);
        Ok(profile)
    }

    #[instrument(skip(self))]
    async fn fetch_profile(&self, id: i64) -> ApiResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
                SELECT id, username, display_name, bio, created_at, updated_at
                FROM profiles
                WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(profile)
    }

    #[instrument(skip(self))]
    async fn list_profiles(&self, params: PaginationParams) -> ApiResult<Vec<Profile>> {
        let profiles = sqlx::query_as::<_, Profile>(
            r#"
                SELECT id, username, display_name, bio, created_at, updated_at
                FROM profiles
                ORDER BY id
                LIMIT $1 OFFSET $2
            "#,
        )
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.db)
        .await?;
        tracing::debug!("Listed {} profiles", profiles.len());
        Ok(profiles)
    }

    #[instrument(skip(self))]
    async fn update_profile(&self, id: i64, new_profile: Valid<NewProfile>) -> ApiResult<Profile> {
        let new_profile = new_profile.into_inner();
        let profile = sqlx::query_as::<_, Profile>(
            r#"
                UPDATE profiles
                SET username = $2, display_name = $3, bio = $4, updated_at = now()
                WHERE id = $1
                RETURNING id, username, display_name, bio, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(new_profile.username)
        .bind(new_profile.display_name)
        .bind(new_profile.bio)
        .fetch_one(&self.db)
        .await?;
        Ok(profile)
    }

    #[instrument(skip(self))]
    async fn delete_profile(&self, id: i64) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ClientError::NotFound.into());
        }
        Ok(())
    }
}
