//! chatmark-core - Core library for chatmark
//!
//! This crate provides the conversation-to-document pipeline: the
//! conversation model, image extraction and materialization strategies,
//! content rendering with math-safe reformatting, and the exporters.

pub mod error;
pub mod types;
pub mod config;
pub mod conversation;
pub mod image;
pub mod render;
pub mod export;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ChatmarkError, FetchError, Result};
pub use types::*;
