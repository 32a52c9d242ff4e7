//! SVG preview of a collider.
//!
//! Renders a [`NormalizedShape`] in its own coordinate space (origin on
//! the area centroid): the collider outline as a closed `<path>`, the
//! sprite's bounding rectangle placed by the shape's offsets, and a small
//! cross-hair on the body origin. Overlaying the preview on the sprite is
//! the quickest way to spot a collider that drifts from its art.
//!
//! This is a pure function with no I/O; it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Element, Group, Line, Path, Rectangle, Title};
use svg::node::{Node, Text, Value};

use hitshape_pipeline::normalize::bounds;
use hitshape_pipeline::{NormalizedShape, Point};

/// Margin around the drawing, as a fraction of its longer side.
const MARGIN_RATIO: f64 = 0.05;

/// Cross-hair arm length, as a fraction of the drawing's longer side.
const CROSSHAIR_RATIO: f64 = 0.04;

/// Metadata to embed in the SVG document.
///
/// When present, `<title>` and `<desc>` are emitted right after the
/// opening `<svg>` tag; `config_json` goes inside `<metadata>`.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, usually the sprite's asset identity.
    pub title: Option<&'a str>,

    /// Free-form description.
    pub description: Option<&'a str>,

    /// Serialized extraction config, for reproducing the preview.
    pub config_json: Option<&'a str>,
}

/// Build a closed SVG path `d` attribute from polygon vertices.
///
/// Returns an empty string for fewer than 3 vertices.
///
/// ```
/// use hitshape_pipeline::Point;
/// use hitshape_export::build_path_data;
///
/// let d = build_path_data(&[Point::new(0.0, 0.0), Point::new(4.0, 0.0), Point::new(0.0, 3.0)]);
/// assert_eq!(d, "M0,0 L4,0 L0,3 z");
/// ```
#[must_use]
pub fn build_path_data(vertices: &[Point]) -> String {
    let [first, rest @ ..] = vertices else {
        return String::new();
    };
    if rest.len() < 2 {
        return String::new();
    }

    let mut data = Data::new().move_to((first.x, first.y));
    for p in rest {
        data = data.line_to((p.x, p.y));
    }
    String::from(Value::from(data.close()))
}

/// Top-left corner and size of the sprite relative to the centroid.
fn sprite_rect(shape: &NormalizedShape) -> (Point, Point) {
    let size = Point::new(f64::from(shape.source.width), f64::from(shape.source.height));
    let corner = Point::new(-shape.x_offset * size.x, -shape.y_offset * size.y);
    (corner, size)
}

/// Serialize `shape` into a standalone SVG document.
#[must_use]
pub fn to_svg(shape: &NormalizedShape, metadata: &SvgMetadata<'_>) -> String {
    let (corner, size) = sprite_rect(shape);
    let (lo, hi) = bounds(&shape.vertices).unwrap_or((Point::ZERO, Point::ZERO));
    let min = Point::new(lo.x.min(corner.x), lo.y.min(corner.y));
    let max = Point::new(hi.x.max(corner.x + size.x), hi.y.max(corner.y + size.y));

    let longer = (max.x - min.x).max(max.y - min.y).max(1.0);
    let margin = longer * MARGIN_RATIO;
    let width = 2.0f64.mul_add(margin, max.x - min.x);
    let height = 2.0f64.mul_add(margin, max.y - min.y);

    let mut doc = Document::new()
        .set("width", width)
        .set("height", height)
        .set("viewBox", (min.x - margin, min.y - margin, width, height));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }
    if let Some(config_json) = metadata.config_json {
        let mut config_el = Element::new("hitshape:config");
        config_el.assign("xmlns:hitshape", "https://hitshape.dev/ns/1");
        config_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(config_el);
        doc = doc.add(metadata_el);
    }

    let sprite = Rectangle::new()
        .set("id", "sprite")
        .set("x", corner.x)
        .set("y", corner.y)
        .set("width", size.x)
        .set("height", size.y)
        .set("fill", "none")
        .set("stroke", "gray")
        .set("stroke-dasharray", "4 2")
        .set("stroke-width", 0.5);
    doc = doc.add(sprite);

    let d = build_path_data(&shape.vertices);
    if !d.is_empty() {
        let mut collider = Path::new()
            .set("id", "collider")
            .set("d", d)
            .set("fill", "none")
            .set("stroke-width", 1);
        collider = match shape.reason {
            Some(reason) => collider
                .set("class", "fallback")
                .set("data-reason", reason.to_string())
                .set("stroke", "red"),
            None => collider.set("stroke", "black"),
        };
        doc = doc.add(collider);
    }

    let arm = longer * CROSSHAIR_RATIO;
    let crosshair = Group::new()
        .set("id", "centroid")
        .set("stroke", "blue")
        .set("stroke-width", 0.5)
        .add(Line::new().set("x1", -arm).set("y1", 0).set("x2", arm).set("y2", 0))
        .add(Line::new().set("x1", 0).set("y1", -arm).set("x2", 0).set("y2", arm));
    doc = doc.add(crosshair);

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
