// ABOUTME: Library root for sinker - exposes the engine and its collaborators.
// ABOUTME: The main binary is in main.rs.

pub mod auth;
pub mod config;
pub mod error;
pub mod manifest;
pub mod output;
pub mod runtime;
pub mod sync;
pub mod types;
