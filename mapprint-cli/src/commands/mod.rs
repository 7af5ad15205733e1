//! CLI command implementations.
//!
//! - [`render`] - Render a job file to PDF or JPEG
//! - [`zooms`] - Print suggested source zooms

pub mod render;
pub mod zooms;
