//! Blimu CLI - manage authorization definitions
//!
//! Loads and validates the `.blimu/` definition files of a project, syncs them
//! with the Blimu API and drives SDK generation. The modules are exposed for
//! the binary and for integration tests.

pub mod api;
pub mod commands;
pub mod definitions;
pub mod errors;
pub mod oauth;
pub mod openapi;
pub mod sdkgen;
pub mod session;
pub mod settings;
