// Scribe - Library root for testing

pub mod api;
pub mod auth;
pub mod autosave;
pub mod client;
pub mod config;
pub mod error;
pub mod store;
