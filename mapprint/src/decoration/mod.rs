//! Decoration layers
//!
//! Decorations draw vector content instead of fetching tiles. Each returns
//! one or two already-settled draw units per page; the compositor runs them
//! against a page-sized canvas.
//!
//! | Decoration | Units |
//! |---|---|
//! | [`Grid`] | lines (multiplied), caption (solid, when a font is set) |
//! | [`OverlayScale`] | caption (solid) |
//! | [`MagneticMeridians`] | lines (multiplied) |

mod declination;
mod grid;
mod meridians;
mod scale;
mod text;

pub use declination::{ConstantDeclination, DeclinationModel};
pub use grid::{format_distance, grid_interval, grid_segments, Grid, GridInterval, Segment, GRID_INTERVALS};
pub use meridians::{meridian_polylines, MagneticMeridians};
pub use scale::{caption as scale_caption, edge_scales, OverlayScale, SCALE_TOLERANCE};
pub use text::{draw_caption_box, FontError, LabelFont};

/// Caption font height on paper.
pub const CAPTION_FONT_MM: f64 = 3.0;

/// Space between caption text and its box edge.
pub const CAPTION_PADDING_MM: f64 = 1.0;
