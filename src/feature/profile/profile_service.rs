//! A service for interacting with profiles.

use super::profile_repository::{NewProfile, Profile, ProfileRepository};
use crate::infra::{
    error::{ApiResult, ClientError},
    pagination::PaginationParams,
    validation::Valid,
};
use std::{fmt, sync::Arc};
use tracing::instrument;

/// Business logic for profiles.
#[derive(Clone)]
pub struct ProfileService {
    repository: Arc<dyn ProfileRepository>,
}

impl fmt::Debug for ProfileService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileService").finish_non_exhaustive()
    }
}

impl ProfileService {
    /// Creates a service on top of a repository.
    pub fn new(repository: Arc<dyn ProfileRepository>) -> Self {
        Self { repository }
    }

    /// Creates a new profile.
    #[instrument(skip(self))]
    pub async fn create_profile(&self, new_profile: Valid<NewProfile>) -> ApiResult<Profile> {
        self.repository.create_profile(new_profile).await
    }

    /// Reads a profile, failing with [`ClientError::NotFound`] if it does not exist.
    #[instrument(skip(self))]
    pub async fn read_profile(&self, id: i64) -> ApiResult<Profile> {
        let profile = self
            .repository
            .fetch_profile(id)
            .await?
            .ok_or(ClientError::NotFound)?;
        Ok(profile)
    }

    /// Lists one page of profiles.
    #[instrument(skip(self))]
    pub async fn list_profiles(&self, params: PaginationParams) -> ApiResult<Vec<Profile>> {
        self.repository.list_profiles(params).await
    }

    /// Replaces the contents of a profile.
    #[instrument(skip(self))]
    pub async fn update_profile(&self, id: i64, new_profile: Valid<NewProfile>) -> ApiResult<Profile> {
        self.repository.update_profile(id, new_profile).await
    }

    /// Deletes a profile.
    #[instrument(skip(self))]
    pub async fn delete_profile(&self, id: i64) -> ApiResult<()> {
        self.repository.delete_profile(id).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        feature::profile::profile_repository::MockProfileRepository, infra::error::ApiError,
    };
    use chrono::{TimeZone, Utc};
    use mockall::predicate::eq;

    pub(crate) fn profile(id: i64, username: &str) -> Profile {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        Profile {
            id,
            username: username.to_string(),
            display_name: username.to_uppercase(),
            bio: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn service(repository: MockProfileRepository) -> ProfileService {
        ProfileService::new(Arc::new(repository))
    }

    #[tokio::test]
    async fn create_profile_stores_validated_input() {
        let mut repository = MockProfileRepository::new();
        repository
            .expect_create_profile()
            .withf(|new_profile| new_profile.inner().username == "ada")
            .times(1)
            .returning(|_| Ok(profile(1, "ada")));

        let new_profile = Valid::new(NewProfile {
            username: "ada".to_string(),
            display_name: "Ada".to_string(),
            bio: None,
        })
        .unwrap();
        let created = service(repository).create_profile(new_profile).await.unwrap();

        assert_eq!(profile(1, "ada"), created);
    }

    #[tokio::test]
    async fn missing_profile_is_not_found() {
        let mut repository = MockProfileRepository::new();
        repository
            .expect_fetch_profile()
            .with(eq(7))
            .returning(|_| Ok(None));

        let result = service(repository).read_profile(7).await;

        assert!(matches!(
            result,
            Err(ApiError::ClientError(ClientError::NotFound))
        ));
    }

    #[tokio::test]
    async fn list_passes_pagination_through() {
        let mut repository = MockProfileRepository::new();
        repository
            .expect_list_profiles()
            .with(eq(PaginationParams::new(1, 2)))
            .returning(|_| Ok(vec![profile(3, "grace"), profile(4, "linus")]));

        let profiles = service(repository)
            .list_profiles(PaginationParams::new(1, 2))
            .await
            .unwrap();

        assert_eq!(2, profiles.len());
    }
}
