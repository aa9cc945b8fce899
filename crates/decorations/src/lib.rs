//! # LM Risk Decorations
//!
//! Turns scores into the data an editor needs to draw them: gutter and
//! minimap buckets, token background spans, folding ranges, codelens titles
//! and the SVG assets behind the gutter icons and minimap thumbnails.
//! Nothing here talks to the network or the filesystem.

mod codelens;
mod error;
mod folding;
mod highlight;
mod ranges;
mod sparkline;
mod svg;

pub use codelens::{lens_error_title, lens_title, LensLanguage, MethodLens, SymbolScanner};
pub use error::{DecorationError, Result};
pub use folding::{folding_ranges, FoldingRange, DEFAULT_FOLDING_MAX_RISK};
pub use highlight::{
    coverage_colors, hover_text, locate_tokens, token_spans, LocatedToken, TokenSpan,
    DEFAULT_OK_COLOR, DEFAULT_WARNING_COLOR,
};
pub use ranges::{ColorRanges, DEFAULT_COLORS, DEFAULT_RANGES};
pub use sparkline::{glyph, sparkline};
pub use svg::{gutter_icon_svg, minimap_svg, MINIMAP_WIDTH};
