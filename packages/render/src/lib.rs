#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Draws statistics replies onto a map surface.
//!
//! Point queries render as one circle per reply whose radius is the
//! aggregate of that reply's samples, used directly as a map distance.
//! Rectangle queries render as a single heat layer weighted by the mean of
//! each cell. Either way the previous result is taken off the map first.

pub mod aggregate;
pub mod memory;
pub mod surface;

use giot_vis_query_models::{Aggregate, DataReply, LatLng};

pub use aggregate::{EMPTY_AGGREGATE, aggregate, try_aggregate};
pub use memory::{MemorySurface, Overlay, OverlayKind};
pub use surface::{MapSurface, OverlayHandle, ShapeStyle, WeightedPoint};

/// Visual radius of heat layer points, in screen pixels.
pub const DEFAULT_HEATMAP_RADIUS: f64 = 50.0;

/// Multiplier from a cell's mean to its heat weight.
pub const DEFAULT_HEAT_SCALE: f64 = 5.0;

/// Rendering knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub heatmap_radius: f64,
    pub heat_scale: f64,
    pub circle_style: ShapeStyle,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            heatmap_radius: DEFAULT_HEATMAP_RADIUS,
            heat_scale: DEFAULT_HEAT_SCALE,
            circle_style: ShapeStyle::result_circle(),
        }
    }
}

/// Outcome of one render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderSummary {
    /// Reply entries that made it onto the map.
    pub drawn: usize,
    /// Reply entries without any finite samples.
    pub skipped: usize,
}

/// Owns the result overlays currently on the map.
#[derive(Debug, Default)]
pub struct ResultRenderer {
    options: RenderOptions,
    circles: Vec<OverlayHandle>,
    heatmap: Option<OverlayHandle>,
}

impl ResultRenderer {
    #[must_use]
    pub const fn new(options: RenderOptions) -> Self {
        Self {
            options,
            circles: Vec::new(),
            heatmap: None,
        }
    }

    #[must_use]
    pub const fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Number of result overlays on the map: one per circle plus one for
    /// the heat layer.
    #[must_use]
    pub fn overlay_count(&self) -> usize {
        self.circles.len() + usize::from(self.heatmap.is_some())
    }

    #[must_use]
    pub const fn heatmap(&self) -> Option<OverlayHandle> {
        self.heatmap
    }

    /// Removes every result overlay. Safe to call when nothing is drawn.
    pub fn clear<S: MapSurface + ?Sized>(&mut self, surface: &mut S) {
        for handle in self.circles.drain(..) {
            surface.remove(handle);
        }
        if let Some(handle) = self.heatmap.take() {
            surface.remove(handle);
        }
    }

    /// Replaces the current result with one circle per reply entry.
    pub fn render_points<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        replies: &[DataReply],
        operation: Aggregate,
    ) -> RenderSummary {
        self.clear(surface);
        let mut summary = RenderSummary::default();

        for reply in replies {
            let center = LatLng::from(reply.position);
            let Some(radius) = try_aggregate(&reply.data, operation) else {
                log::warn!(
                    "Skipping reply at ({}, {}): no samples",
                    center.lat,
                    center.lng
                );
                summary.skipped += 1;
                continue;
            };

            self.circles
                .push(surface.add_circle(center, radius, &self.options.circle_style));
            summary.drawn += 1;
        }

        log::info!(
            "Rendered {} {operation} circles ({} skipped)",
            summary.drawn,
            summary.skipped
        );
        summary
    }

    /// Replaces the current result with a heat layer weighted by each
    /// cell's mean.
    pub fn render_heatmap<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        replies: &[DataReply],
    ) -> RenderSummary {
        self.clear(surface);
        let mut summary = RenderSummary::default();

        let points: Vec<WeightedPoint> = replies
            .iter()
            .filter_map(|reply| {
                let mean = try_aggregate(&reply.data, Aggregate::Mean);
                if mean.is_none() {
                    summary.skipped += 1;
                }
                mean.map(|m| WeightedPoint {
                    position: reply.position.into(),
                    weight: m * self.options.heat_scale,
                })
            })
            .collect();
        summary.drawn = points.len();

        if !points.is_empty() {
            self.heatmap = Some(surface.add_heatmap(&points, self.options.heatmap_radius));
        }

        log::info!(
            "Rendered heatmap with {} cells ({} skipped)",
            summary.drawn,
            summary.skipped
        );
        summary
    }
}
