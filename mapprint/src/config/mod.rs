//! Job file configuration.
//!
//! A job file is an INI document describing what to print:
//!
//! ```text
//! [job]          format, resolution, scale, paper, margins, zooms
//! [page.<label>] center, orientation        (one per page, file order)
//! [layer.<name>] url, order, print/overlay flags, tile size
//! [decorations]  grid, scale, magnetic_meridians, declination, font
//! [download]     timeout
//! ```
//!
//! # Example
//!
//! ```
//! use mapprint::config::JobFile;
//!
//! let job = JobFile::parse(
//!     "[page.1]\ncenter = 55.75,37.61\n[layer.osm]\nurl = https://t/{z}/{x}/{y}.png\n",
//! )
//! .unwrap();
//! assert_eq!(job.pages[0].label, "1");
//! ```

pub mod defaults;
mod file;
mod parser;
mod settings;

pub use file::ConfigFileError;
pub use settings::{
    DecorationSettings, DownloadSettings, JobFile, JobSettings, LayerSettings, OutputFormat,
    PageSettings,
};
