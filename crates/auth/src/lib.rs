//! parapet-auth — token decoding and local authorization primitives.
//!
//! This crate is intentionally decoupled from HTTP, storage, and clocks.
//! It turns a raw session token into typed [`Claims`] and answers the
//! purely local authorization questions (role membership, ordinal
//! permission levels, user kind). Anything that needs a network call or
//! a timer lives in `parapet-engine`.

pub mod claims;
pub mod level;
pub mod roles;
pub mod token;

pub use claims::{Claims, UserKind};
pub use level::PermissionLevel;
pub use roles::Role;
pub use token::{DecodeError, DecodedToken, TokenValidationError, decode, validate_token};
