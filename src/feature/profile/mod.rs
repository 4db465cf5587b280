//! User profiles: storage, business logic, and the REST API.

pub mod profile_api;
pub mod profile_repository;
pub mod profile_service;
