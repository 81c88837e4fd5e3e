//! commet: question answering over a repository's recent commit history
//! (library crate).
//!
//! Re-exports public modules for integration tests and external use.

pub mod aggregate;
pub mod config;
pub mod constants;
pub mod context;
pub mod env;
pub mod error;
pub mod hosting;
pub mod models;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod providers;
pub mod session;
