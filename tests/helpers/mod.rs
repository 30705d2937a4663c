//! Shared fixtures for the integration tests.

#![allow(dead_code)]

pub mod project_fixtures;
pub mod usage_assertions;
