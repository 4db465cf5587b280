//! Application features, each with its own API, service, and repository.

pub mod info;
pub mod profile;
