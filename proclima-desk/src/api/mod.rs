//! Back-office API access
//!
//! HTTP client, wire models, session context and the typed repository.

pub mod client;
pub mod models;
pub mod repository;
pub mod session;

pub use client::{build_http_client, ApiClient};
pub use models::*;
pub use repository::Repository;
pub use session::{Session, SessionContext};
