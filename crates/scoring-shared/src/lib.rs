//! Shared wire types and errors for the scoring API.

pub mod error;
pub mod rpc;

pub use error::{ApiError, AuthError, FieldError, StoreError, ValidationError, ValidationKind};
pub use rpc::{ApiMethod, ApiResponse};

/// Version of the scoring API crates
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
