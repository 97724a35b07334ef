//! HTTP handlers for refshelf-api.

pub mod health;
pub mod keywords;
pub mod maintenance;
pub mod references;
