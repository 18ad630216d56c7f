//! Hibiscus Query
//!
//! The query task for Hibiscus workflows: runs a parameterized statement
//! against a document store and materializes the result set into one of
//! four output shapes (inline rows, first row, spilled-to-storage blob,
//! or count only).
//!
//! Connection string, credentials, statement and fetch mode are all
//! templates rendered fresh per invocation via [`Renderer`]; sessions
//! are opened and closed within a single [`Query::run`] call.

mod config;
mod error;
mod fetch;
mod render;
mod task;

pub use config::QueryConfig;
pub use error::QueryError;
pub use fetch::{FetchMode, Output, materialize};
pub use render::Renderer;
pub use task::Query;
