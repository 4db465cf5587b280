//! The axum application: routes, documentation, and middleware.

use crate::{
    feature::{info::info_api, profile::profile_api},
    infra::{
        error::PanicHandler, middleware::MakeRequestIdSpan, openapi::ApiDoc, state::AppState,
    },
};
use axum::{response::Redirect, routing::get, Router};
use http::header::AUTHORIZATION;
use std::{iter::once, time::Duration};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
    timeout::TimeoutLayer,
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Longest a single request may take before it is answered with a timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Most requests handled at once.
const MAX_CONCURRENT_REQUESTS: usize = 100;

/// Constructs the full REST API including middleware.
pub fn rest_api(state: AppState) -> Router {
    Router::new()
        .merge(info_api::routes())
        .merge(profile_api::routes())
        .with_state(state)
        // Layers
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(MakeRequestIdSpan)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO))
                .on_failure(()),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(SetSensitiveRequestHeadersLayer::new(once(AUTHORIZATION)))
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .layer(CatchPanicLayer::custom(PanicHandler))
}

/// Constructs the full axum application.
pub fn app(state: AppState) -> Router {
    let swagger_path = "/swagger-ui";
    Router::new()
        .route("/", get(move || async move { Redirect::permanent(swagger_path) }))
        // OpenAPI document
        .merge(SwaggerUi::new(swagger_path).url("/api-docs/openapi.json", ApiDoc::openapi()))
        // API
        .nest("/api", rest_api(state))
}
