//! Global application state.
//!
//! Gives handlers access to the database pool, the profile service, and
//! whether shutdown has begun.

use super::database::DbPool;
use crate::feature::profile::{
    profile_repository::PgProfileRepository, profile_service::ProfileService,
};
use axum::extract::FromRef;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Global application state.
#[derive(Clone, Debug, FromRef)]
pub struct AppState {
    db: DbPool,
    profiles: ProfileService,
    shutdown: CancellationToken,
}

impl AppState {
    /// Constructs a new [`AppState`] backed by postgres.
    pub fn new(db: DbPool) -> Self {
        let repository = PgProfileRepository::new(db.clone());
        let profiles = ProfileService::new(Arc::new(repository));
        Self::with_profiles(db, profiles)
    }

    /// Constructs a new [`AppState`] with a custom profile service.
    pub fn with_profiles(db: DbPool, profiles: ProfileService) -> Self {
        Self {
            db,
            profiles,
            shutdown: CancellationToken::new(),
        }
    }

    /// Uses `shutdown` to tell handlers that the service is stopping.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Returns the database pool.
    pub fn db(&self) -> &DbPool {
        &self.db
    }

    /// Returns the profile service.
    pub fn profiles(&self) -> &ProfileService {
        &self.profiles
    }

    /// Whether shutdown has begun.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
