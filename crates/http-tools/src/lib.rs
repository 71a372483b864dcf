//! HTTP execution capability for API-to-MCP.
//!
//! Generated tool handlers never talk to `reqwest` directly. They are bound to an
//! [`runtime::HttpExecutor`], which this crate defines together with a `reqwest`-backed
//! implementation.
//!
//! It intentionally knows nothing about `OpenAPI` documents or tool synthesis.

pub mod runtime;
pub mod safety;
pub mod semantics;
