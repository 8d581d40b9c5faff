//! Output generation.
//!
//! # Submodules
//!
//! - [`json`]: Writes the snapshot array consumed by the static site

pub mod json;
