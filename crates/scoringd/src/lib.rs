//! scoringd library - exposes modules for testing.

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod fields;
pub mod handlers;
pub mod request;
pub mod scoring;
pub mod server;
pub mod store;

pub use api::{MethodApi, MethodRegistry, MethodRequest};
pub use context::ExecutionContext;
pub use store::{MemoryStore, Store};
