//! chatmark-archive - Packaging library for chatmark
//!
//! This crate turns exports into files on disk: zip archives for
//! multi-file exports and batches, and atomic writes into an output
//! directory.

mod packager;
mod writer;

pub use packager::{export_batch, Archive, BatchFailure, BatchPackager, BatchReport, ExportPackager};
pub use writer::{OutputLayout, OutputWriter};
