//! A social network REST service.
//!
//! Profiles are stored in postgres and served over a JSON API. On SIGINT or
//! SIGTERM the server stops accepting, finishes in-flight requests, and only
//! then closes the database. See [`lifecycle`].

pub mod app;
pub mod feature;
pub mod infra;
pub mod lifecycle;
