#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Controller for the GreenIoT map widget.
//!
//! [`AppController`] owns all mutable widget state: the form, the current
//! selection and its markers, the result overlays and the map surface.
//! UI events come in through the `on_*` methods; a submit validates the
//! form, sends one request and redraws the map from the reply.
//!
//! Submits are not serialized. A caller that wants the page's behaviour of
//! overlapping requests can split a submit into [`AppController::begin_submit`]
//! and [`AppController::complete_submit`]; whichever reply is completed last
//! determines what is on the map.

pub mod config;

use std::collections::BTreeMap;

use giot_vis_client::{QueryService, TransportError};
use giot_vis_geometry::{GeometryError, GeometryEvent, GeometrySelector, PointId};
use giot_vis_query::{FormFields, ValidationError};
use giot_vis_query_models::{DataReply, LatLng, Query, RegionMode};
use giot_vis_render::{MapSurface, OverlayHandle, RenderSummary, ResultRenderer, ShapeStyle};
use thiserror::Error;

pub use config::{ConfigError, WidgetConfig};

/// Errors surfaced to the user.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The `regType` field holds neither `pointRegion` nor `rectRegion`.
    #[error("Unknown region type '{0}'")]
    UnknownRegionType(String),
}

impl AppError {
    /// Text for the blocking message shown to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(e) => format!("Update Error occurred - {e}"),
            other => other.to_string(),
        }
    }
}

/// A validated submit waiting for its reply.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSubmit {
    /// Increases with every submit of one controller.
    pub sequence: u64,
    pub query: Query,
}

/// Widget state and event handling.
pub struct AppController<S, Q> {
    config: WidgetConfig,
    mode: RegionMode,
    form: FormFields,
    geometry: GeometrySelector,
    markers: BTreeMap<PointId, OverlayHandle>,
    rectangle_overlay: Option<OverlayHandle>,
    border: Option<OverlayHandle>,
    renderer: ResultRenderer,
    surface: S,
    service: Q,
    submits: u64,
}

impl<S: MapSurface, Q: QueryService> AppController<S, Q> {
    /// Initializes the widget for the region type in `form.reg_type` and
    /// draws the configured border.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::UnknownRegionType`] if `form.reg_type` is not a
    /// known region type.
    pub fn new(
        config: WidgetConfig,
        form: FormFields,
        mut surface: S,
        service: Q,
    ) -> Result<Self, AppError> {
        let mode: RegionMode = form
            .reg_type
            .trim()
            .parse()
            .map_err(|_| AppError::UnknownRegionType(form.reg_type.clone()))?;

        let border = config
            .border_path()
            .map(|path| surface.add_polyline(&path, &ShapeStyle::border()));

        log::info!(
            "Map initialized at ({}, {}) zoom {} in {mode} mode",
            config.map.center[0],
            config.map.center[1],
            config.map.zoom
        );

        Ok(Self {
            renderer: ResultRenderer::new(config.render_options()),
            config,
            mode,
            form,
            geometry: GeometrySelector::new(mode),
            markers: BTreeMap::new(),
            rectangle_overlay: None,
            border,
            surface,
            service,
            submits: 0,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &WidgetConfig {
        &self.config
    }

    #[must_use]
    pub const fn mode(&self) -> RegionMode {
        self.mode
    }

    #[must_use]
    pub const fn form(&self) -> &FormFields {
        &self.form
    }

    /// Mutable access for the page's input bindings.
    pub const fn form_mut(&mut self) -> &mut FormFields {
        &mut self.form
    }

    #[must_use]
    pub const fn geometry(&self) -> &GeometrySelector {
        &self.geometry
    }

    #[must_use]
    pub const fn renderer(&self) -> &ResultRenderer {
        &self.renderer
    }

    #[must_use]
    pub const fn surface(&self) -> &S {
        &self.surface
    }

    #[must_use]
    pub const fn service(&self) -> &Q {
        &self.service
    }

    #[must_use]
    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Marker currently drawn for a selected point.
    #[must_use]
    pub fn marker(&self, id: PointId) -> Option<OverlayHandle> {
        self.markers.get(&id).copied()
    }

    /// A click on the map: adds a point in point mode.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Geometry`] in rectangle mode.
    pub fn on_map_click(&mut self, position: LatLng) -> Result<GeometryEvent, AppError> {
        let event = self.geometry.add_point(position)?;
        self.apply(&event);
        Ok(event)
    }

    /// A double-click on a selection marker: removes that point.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Geometry`] if the point is not selected or the
    /// widget is in rectangle mode.
    pub fn on_marker_double_click(&mut self, id: PointId) -> Result<GeometryEvent, AppError> {
        let event = self.geometry.remove_point(id)?;
        self.apply(&event);
        Ok(event)
    }

    /// The drawing tool finished a rectangle.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Geometry`] in point mode or for a degenerate
    /// rectangle; the previous rectangle is kept in that case.
    pub fn on_rectangle_complete(
        &mut self,
        north_east: LatLng,
        south_west: LatLng,
    ) -> Result<GeometryEvent, AppError> {
        let event = self.geometry.set_rectangle(north_east, south_west)?;
        self.apply(&event);
        Ok(event)
    }

    /// The drawing tool changed mode.
    pub fn on_drawing_mode_changed(&mut self, rectangle_tool_active: bool) -> Option<GeometryEvent> {
        let event = self.geometry.drawing_mode_changed(rectangle_tool_active)?;
        self.apply(&event);
        Some(event)
    }

    /// Validates the form against the current selection and snapshots the
    /// query to send.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`]; nothing is sent in that case.
    pub fn begin_submit(&mut self) -> Result<PendingSubmit, ValidationError> {
        let query = giot_vis_query::build(self.mode, &self.form, &self.geometry)?;
        self.submits += 1;
        Ok(PendingSubmit {
            sequence: self.submits,
            query,
        })
    }

    /// Applies the outcome of a sent query. On success the selection and
    /// the previous result are cleared and the reply is drawn; on failure
    /// the map is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Transport`] carrying the request's failure.
    pub fn complete_submit(
        &mut self,
        pending: &PendingSubmit,
        outcome: Result<Vec<DataReply>, TransportError>,
    ) -> Result<RenderSummary, AppError> {
        let replies = outcome.map_err(|e| {
            log::warn!("Submit #{} failed: {e}", pending.sequence);
            e
        })?;

        self.clear_selection();

        let summary = match &pending.query {
            Query::Point(q) => self
                .renderer
                .render_points(&mut self.surface, &replies, q.operation),
            Query::Rect(_) => self.renderer.render_heatmap(&mut self.surface, &replies),
        };

        log::info!(
            "Submit #{} rendered {} of {} replies",
            pending.sequence,
            summary.drawn,
            replies.len()
        );
        Ok(summary)
    }

    /// Validates, sends and renders in one go.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] without sending anything if the
    /// form is incomplete, or [`AppError::Transport`] if the request fails.
    pub async fn submit(&mut self) -> Result<RenderSummary, AppError> {
        let pending = self.begin_submit()?;
        let outcome = self.service.send(&pending.query).await;
        self.complete_submit(&pending, outcome)
    }

    /// The refresh button: empties the form, the selection and every result
    /// overlay. The border stays.
    pub fn refresh(&mut self) {
        self.form.reset();
        self.clear_selection();
        self.renderer.clear(&mut self.surface);
        log::debug!("Widget reset");
    }

    fn clear_selection(&mut self) {
        let event = self.geometry.clear();
        self.apply(&event);
    }

    fn apply(&mut self, event: &GeometryEvent) {
        match event {
            GeometryEvent::PointAdded { id, position } => {
                let handle = self
                    .surface
                    .add_marker(*position, &ShapeStyle::selection_marker());
                self.markers.insert(*id, handle);
            }
            GeometryEvent::PointRemoved { id, .. } => {
                if let Some(handle) = self.markers.remove(id) {
                    self.surface.remove(handle);
                }
            }
            GeometryEvent::RectangleSet { rectangle, .. } => {
                if let Some(handle) = self.rectangle_overlay.take() {
                    self.surface.remove(handle);
                }
                self.rectangle_overlay = Some(
                    self.surface
                        .add_rectangle(rectangle, &ShapeStyle::selection_rectangle()),
                );
            }
            GeometryEvent::RectangleCleared { .. } => {
                if let Some(handle) = self.rectangle_overlay.take() {
                    self.surface.remove(handle);
                }
            }
            GeometryEvent::Cleared { .. } => {
                for handle in std::mem::take(&mut self.markers).into_values() {
                    self.surface.remove(handle);
                }
                if let Some(handle) = self.rectangle_overlay.take() {
                    self.surface.remove(handle);
                }
            }
        }
    }

    /// Handle of the border outline, if one is configured.
    #[must_use]
    pub const fn border(&self) -> Option<OverlayHandle> {
        self.border
    }
}
