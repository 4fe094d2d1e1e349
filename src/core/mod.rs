//! Core types shared across the stackform crate.
//!
//! This module holds the typed error enum that every transformation surfaces
//! through [`anyhow::Result`]. Callers that need to distinguish failure modes
//! (contract violation vs. a parent stack that simply does not exist)
//! downcast to [`StackformError`].

pub mod error;

pub use error::StackformError;
