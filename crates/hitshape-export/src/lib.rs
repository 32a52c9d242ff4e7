//! hitshape-export: pure serializers for extracted colliders (sans-IO).
//!
//! Currently supports an SVG preview.

pub mod svg;

pub use svg::{SvgMetadata, build_path_data, to_svg};
