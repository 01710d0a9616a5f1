//! The map drawing capabilities the widget relies on.
//!
//! Any map backend that can place markers, circles, lines, rectangles and
//! a weighted heat layer, and take each of them off again, implements
//! [`MapSurface`].

use giot_vis_query_models::{LatLng, Rectangle};

/// Identifies one overlay on a surface. Handles are minted by the surface
/// and never reused by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OverlayHandle(u64);

impl OverlayHandle {
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Outline and fill of a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeStyle {
    pub stroke_color: String,
    pub stroke_opacity: f64,
    pub stroke_weight: f64,
    pub fill_color: String,
    pub fill_opacity: f64,
}

impl ShapeStyle {
    /// Red translucent circle used for point results.
    #[must_use]
    pub fn result_circle() -> Self {
        Self {
            stroke_color: "#FF0000".to_string(),
            stroke_opacity: 0.8,
            stroke_weight: 2.0,
            fill_color: "#FF0000".to_string(),
            fill_opacity: 0.35,
        }
    }

    /// Green dot marking a selected point.
    #[must_use]
    pub fn selection_marker() -> Self {
        Self {
            stroke_color: "white".to_string(),
            stroke_opacity: 1.0,
            stroke_weight: 0.5,
            fill_color: "green".to_string(),
            fill_opacity: 0.5,
        }
    }

    /// Thin outline of the drawn rectangle.
    #[must_use]
    pub fn selection_rectangle() -> Self {
        Self {
            stroke_color: "black".to_string(),
            stroke_opacity: 1.0,
            stroke_weight: 1.0,
            fill_color: "black".to_string(),
            fill_opacity: 0.0,
        }
    }

    /// Solid red line for the coverage border.
    #[must_use]
    pub fn border() -> Self {
        Self {
            stroke_color: "#FF0000".to_string(),
            stroke_opacity: 1.0,
            stroke_weight: 2.0,
            fill_color: "#FF0000".to_string(),
            fill_opacity: 0.0,
        }
    }
}

/// Icon scale of selection markers, in screen pixels.
pub const MARKER_SCALE: f64 = 10.0;

/// One point of a heat layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPoint {
    pub position: LatLng,
    pub weight: f64,
}

/// Drawing operations a map backend provides.
pub trait MapSurface {
    /// Places a fixed-size marker icon.
    fn add_marker(&mut self, position: LatLng, style: &ShapeStyle) -> OverlayHandle;

    /// Places a circle whose radius is in map distance units.
    fn add_circle(&mut self, center: LatLng, radius: f64, style: &ShapeStyle) -> OverlayHandle;

    fn add_polyline(&mut self, path: &[LatLng], style: &ShapeStyle) -> OverlayHandle;

    fn add_rectangle(&mut self, rectangle: &Rectangle, style: &ShapeStyle) -> OverlayHandle;

    /// Places a heat layer; `radius` is the visual blur radius of each
    /// point in screen pixels.
    fn add_heatmap(&mut self, points: &[WeightedPoint], radius: f64) -> OverlayHandle;

    /// Detaches an overlay. Unknown or already removed handles are ignored.
    fn remove(&mut self, handle: OverlayHandle);
}
