//! `parapet-core` — shared foundation for the authorization engine.
//!
//! This crate contains **pure** building blocks (typed identifiers, the
//! domain error model) with no I/O, no runtime, and no policy.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::UserId;
