//! parapet-client — remote and persistent backends for the engine.
//!
//! Two seams live here, both async traits so the engine can run against
//! scripted fakes in tests:
//!
//! - [`AuthApi`]: the authorization service endpoints (permission checks,
//!   permission refresh, access-pattern telemetry, token refresh, logout).
//! - [`CredentialStore`]: durable storage for the access/refresh token
//!   pair, with a SQLite backend for real deployments and an in-memory
//!   backend for tests.

pub mod api;
pub mod credentials;
pub mod http;
pub mod memory;
pub mod sqlite;

pub use api::{
    AiAnalysis, ApiError, AuthApi, PermissionCheckRequest, PermissionCheckResponse,
    PermissionRefreshResponse, TokenRefreshResponse,
};
pub use credentials::{CredentialStore, StoredCredentials};
pub use http::HttpAuthApi;
pub use memory::InMemoryCredentialStore;
pub use sqlite::SqliteCredentialStore;
