//! OpenAPI configuration.

use crate::feature::{
    info::info_api,
    profile::{profile_api, profile_repository},
};
use utoipa::OpenApi;

/// OpenApi configuration.
#[derive(OpenApi)]
#[openapi(
    paths(
        info_api::info,
        info_api::health,
        profile_api::create_profile,
        profile_api::list_profiles,
        profile_api::get_profile,
        profile_api::update_profile,
        profile_api::delete_profile,
    ),
    components(
        schemas(
            info_api::AppInfo,
            info_api::Health,
            info_api::HealthStatus,
            profile_repository::NewProfile,
            profile_repository::Profile,
            crate::infra::error::ErrorBody
        )
    )
)]
#[derive(Clone, Copy, Debug)]
pub struct ApiDoc;
