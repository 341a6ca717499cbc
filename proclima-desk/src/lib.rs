//! Proclima desk library
//!
//! This library exposes the API client, the derived views and the services
//! behind the `proclima-desk` CLI, for testing and reuse.

pub mod api;
pub mod app;
pub mod commands;
pub mod config;
pub mod error;
pub mod services;
pub mod text;
