//! Job file loading.
//!
//! Settings structs live in [`super::settings`], constants in
//! [`super::defaults`], parsing in [`super::parser`].

use ini::Ini;
use std::path::Path;
use thiserror::Error;

pub use super::settings::*;

use crate::job::{reference_latitude, Page, ZoomSelection};

/// Job file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read or tokenize the job file
    #[error("Failed to read job file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// A required key is absent
    #[error("Missing configuration: {section}.{key}")]
    MissingValue { section: String, key: String },

    /// The file describes nothing to print
    #[error("Invalid job: {0}")]
    InvalidJob(String),
}

impl JobFile {
    /// Loads and validates a job file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Parses job file text.
    pub fn parse(text: &str) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_str(text).map_err(|e| {
            ConfigFileError::ReadError(ini::Error::Parse(e))
        })?;
        super::parser::parse_ini(&ini)
    }

    /// Builds the pages, centred on each page's configured point.
    pub fn build_pages(&self) -> Result<Vec<Page>, ConfigFileError> {
        let paper = self.job.paper();
        self.pages
            .iter()
            .map(|page| {
                let size = paper.printable(page.orientation);
                Page::from_center(page.center, size, self.job.scale, page.label.clone()).map_err(
                    |e| ConfigFileError::InvalidValue {
                        section: format!("page.{}", page.label),
                        key: "center".to_string(),
                        value: format!("{},{}", page.center.lat, page.center.lng),
                        reason: e.to_string(),
                    },
                )
            })
            .collect()
    }

    /// Configured zooms, with missing ones suggested for `pages`.
    pub fn zoom_selection(&self, pages: &[Page]) -> ZoomSelection {
        let suggested = ZoomSelection::suggest(
            self.job.scale,
            self.job.resolution,
            reference_latitude(pages),
        );
        ZoomSelection::new(
            self.job.map_zoom.unwrap_or(suggested.map_zoom),
            self.job.sat_zoom.unwrap_or(suggested.sat_zoom),
        )
    }
}
