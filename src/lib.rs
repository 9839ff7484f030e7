//! whisperfunc — a function-calling chat assistant.
//!
//! The crate wires an OpenAI-compatible completion backend to a registry
//! of schema-validated tools through a bounded two-round orchestration
//! loop, and exposes the result over HTTP, a stdio tool protocol, and an
//! interactive terminal.

pub mod bridge;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod registry;
pub mod schema;
pub mod server;
pub mod session;
pub mod tools;
pub mod types;
