//! Catalog service with semantic search.
//!
//! Records live in a [`catalog::CatalogStore`]. Every save also writes a
//! summary document to a [`index::VectorIndex`]. A query retrieves similar
//! summaries, asks a language model ([`llm::LlmProvider`]) to pick matching
//! records, and returns only the records the catalog actually holds
//! ([`search::CatalogService`]).

pub mod catalog;
pub mod config;
pub mod error;
pub mod index;
pub mod llm;
pub mod logger;
pub mod search;

mod http;

#[cfg(feature = "sqlite")]
mod sqlite;
