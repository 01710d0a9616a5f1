#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! User-drawn input geometry for the map widget.
//!
//! A [`GeometrySelector`] runs in one [`RegionMode`] for its whole
//! lifetime. In point mode it keeps an ordered set of clicked points, each
//! with its own [`PointId`] so a double-click removes exactly the marker
//! that was clicked. In rectangle mode it keeps at most one rectangle.
//!
//! The selector never touches the map itself. Every mutation returns a
//! [`GeometryEvent`] describing what changed, and the caller mirrors that
//! onto whatever surface it draws on.

use giot_vis_query_models::{InvalidRectangleError, LatLng, LongLat, Rectangle, RegionMode};
use thiserror::Error;

/// Identity of one selected point, assigned at creation and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointId(u64);

impl PointId {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "point-{}", self.0)
    }
}

/// A clicked point, stored as a `[lat, lng]` tuple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectedPoint {
    pub id: PointId,
    pub tuple: [f64; 2],
}

impl SelectedPoint {
    #[must_use]
    pub const fn position(&self) -> LatLng {
        LatLng::from_tuple(self.tuple)
    }
}

/// A change to the selection that the map surface has to reflect.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryEvent {
    /// A marker should appear at `position`.
    PointAdded { id: PointId, position: LatLng },
    /// The marker for `id` should disappear.
    PointRemoved { id: PointId, position: LatLng },
    /// `rectangle` is now the active rectangle; `replaced` must be removed
    /// from the map first.
    RectangleSet {
        rectangle: Rectangle,
        replaced: Option<Rectangle>,
    },
    /// The active rectangle was discarded without a replacement.
    RectangleCleared { rectangle: Rectangle },
    /// Everything was discarded.
    Cleared {
        points: Vec<PointId>,
        rectangle: Option<Rectangle>,
    },
}

/// Errors from selection operations.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// The operation belongs to the other region mode.
    #[error("{operation} is not available in {mode} mode")]
    WrongMode {
        /// Mode the selector was created with.
        mode: RegionMode,
        /// Name of the rejected operation.
        operation: &'static str,
    },

    /// No selected point has this id.
    #[error("Unknown point: {0}")]
    UnknownPoint(PointId),

    /// The drawn rectangle is degenerate.
    #[error(transparent)]
    InvalidRectangle(#[from] InvalidRectangleError),
}

/// Current point set or rectangle, depending on the mode.
#[derive(Debug, Clone)]
pub struct GeometrySelector {
    mode: RegionMode,
    points: Vec<SelectedPoint>,
    rectangle: Option<Rectangle>,
    next_id: u64,
}

impl GeometrySelector {
    #[must_use]
    pub const fn new(mode: RegionMode) -> Self {
        Self {
            mode,
            points: Vec::new(),
            rectangle: None,
            next_id: 1,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> RegionMode {
        self.mode
    }

    /// Selected points in insertion order.
    #[must_use]
    pub fn points(&self) -> &[SelectedPoint] {
        &self.points
    }

    /// Selected points projected to wire coordinates, in insertion order.
    #[must_use]
    pub fn long_lats(&self) -> Vec<LongLat> {
        self.points.iter().map(|p| p.position().into()).collect()
    }

    #[must_use]
    pub const fn rectangle(&self) -> Option<&Rectangle> {
        self.rectangle.as_ref()
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.rectangle.is_none()
    }

    /// Appends a clicked point.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::WrongMode`] in rectangle mode.
    pub fn add_point(&mut self, position: LatLng) -> Result<GeometryEvent, GeometryError> {
        self.require(RegionMode::Point, "add_point")?;

        let id = PointId(self.next_id);
        self.next_id += 1;
        self.points.push(SelectedPoint {
            id,
            tuple: position.to_tuple(),
        });

        log::debug!(
            "Added {id} at ({}, {}), {} selected",
            position.lat,
            position.lng,
            self.points.len()
        );

        Ok(GeometryEvent::PointAdded { id, position })
    }

    /// Removes the point with the given id (double-click on its marker).
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::WrongMode`] in rectangle mode and
    /// [`GeometryError::UnknownPoint`] if no point has that id.
    pub fn remove_point(&mut self, id: PointId) -> Result<GeometryEvent, GeometryError> {
        self.require(RegionMode::Point, "remove_point")?;

        let index = self
            .points
            .iter()
            .position(|p| p.id == id)
            .ok_or(GeometryError::UnknownPoint(id))?;
        let removed = self.points.remove(index);

        log::debug!("Removed {id}, {} selected", self.points.len());

        Ok(GeometryEvent::PointRemoved {
            id,
            position: removed.position(),
        })
    }

    /// Makes the drawn rectangle the active one, replacing any previous
    /// rectangle.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::WrongMode`] in point mode and
    /// [`GeometryError::InvalidRectangle`] if `north_east` is not strictly
    /// north-east of `south_west`.
    pub fn set_rectangle(
        &mut self,
        north_east: LatLng,
        south_west: LatLng,
    ) -> Result<GeometryEvent, GeometryError> {
        self.require(RegionMode::Rect, "set_rectangle")?;

        let rectangle = Rectangle::new(north_east, south_west)?;
        let replaced = self.rectangle.replace(rectangle);

        log::debug!(
            "Rectangle set: NE ({}, {}) SW ({}, {})",
            north_east.lat,
            north_east.lng,
            south_west.lat,
            south_west.lng
        );

        Ok(GeometryEvent::RectangleSet {
            rectangle,
            replaced,
        })
    }

    /// Reacts to the drawing tool switching modes. Entering the rectangle
    /// tool again discards the current rectangle; it is redrawn from
    /// scratch.
    ///
    /// Returns `None` when nothing changed.
    pub fn drawing_mode_changed(&mut self, rectangle_tool_active: bool) -> Option<GeometryEvent> {
        if self.mode != RegionMode::Rect || !rectangle_tool_active {
            return None;
        }

        self.rectangle
            .take()
            .map(|rectangle| GeometryEvent::RectangleCleared { rectangle })
    }

    /// Discards every point and the rectangle.
    pub fn clear(&mut self) -> GeometryEvent {
        let points = self.points.drain(..).map(|p| p.id).collect();
        let rectangle = self.rectangle.take();

        GeometryEvent::Cleared { points, rectangle }
    }

    const fn require(&self, mode: RegionMode, operation: &'static str) -> Result<(), GeometryError> {
        if matches!(
            (self.mode, mode),
            (RegionMode::Point, RegionMode::Point) | (RegionMode::Rect, RegionMode::Rect)
        ) {
            Ok(())
        } else {
            Err(GeometryError::WrongMode {
                mode: self.mode,
                operation,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_id(event: &GeometryEvent) -> PointId {
        match event {
            GeometryEvent::PointAdded { id, .. } => *id,
            other => panic!("expected PointAdded, got {other:?}"),
        }
    }

    #[test]
    fn points_keep_insertion_order() {
        let mut selector = GeometrySelector::new(RegionMode::Point);
        selector.add_point(LatLng::new(59.86, 17.64)).unwrap();
        selector.add_point(LatLng::new(59.85, 17.63)).unwrap();

        let tuples: Vec<[f64; 2]> = selector.points().iter().map(|p| p.tuple).collect();
        assert_eq!(tuples, vec![[59.86, 17.64], [59.85, 17.63]]);
    }

    #[test]
    fn remove_targets_the_clicked_duplicate_only() {
        let mut selector = GeometrySelector::new(RegionMode::Point);
        let first = point_id(&selector.add_point(LatLng::new(59.86, 17.64)).unwrap());
        let second = point_id(&selector.add_point(LatLng::new(59.86, 17.64)).unwrap());
        assert_ne!(first, second);

        let event = selector.remove_point(second).unwrap();
        assert!(matches!(event, GeometryEvent::PointRemoved { id, .. } if id == second));
        assert_eq!(selector.points().len(), 1);
        assert_eq!(selector.points()[0].id, first);

        assert!(matches!(
            selector.remove_point(second),
            Err(GeometryError::UnknownPoint(_))
        ));
    }

    #[test]
    fn ids_are_not_reused_after_clear() {
        let mut selector = GeometrySelector::new(RegionMode::Point);
        let first = point_id(&selector.add_point(LatLng::new(1.0, 2.0)).unwrap());
        selector.clear();
        let next = point_id(&selector.add_point(LatLng::new(1.0, 2.0)).unwrap());
        assert!(next > first);
    }

    #[test]
    fn second_rectangle_replaces_first() {
        let mut selector = GeometrySelector::new(RegionMode::Rect);
        selector
            .set_rectangle(LatLng::new(2.0, 2.0), LatLng::new(1.0, 1.0))
            .unwrap();
        let event = selector
            .set_rectangle(LatLng::new(59.865, 17.656), LatLng::new(59.857, 17.620))
            .unwrap();

        match event {
            GeometryEvent::RectangleSet { rectangle, replaced } => {
                assert!((rectangle.north_east().lat - 59.865).abs() < f64::EPSILON);
                assert!((replaced.unwrap().north_east().lat - 2.0).abs() < f64::EPSILON);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn degenerate_rectangle_is_rejected_and_keeps_previous() {
        let mut selector = GeometrySelector::new(RegionMode::Rect);
        selector
            .set_rectangle(LatLng::new(2.0, 2.0), LatLng::new(1.0, 1.0))
            .unwrap();
        assert!(matches!(
            selector.set_rectangle(LatLng::new(1.0, 1.0), LatLng::new(2.0, 2.0)),
            Err(GeometryError::InvalidRectangle(_))
        ));
        assert!(selector.rectangle().is_some());
    }

    #[test]
    fn reentering_rectangle_tool_clears_rectangle() {
        let mut selector = GeometrySelector::new(RegionMode::Rect);
        assert!(selector.drawing_mode_changed(true).is_none());

        selector
            .set_rectangle(LatLng::new(2.0, 2.0), LatLng::new(1.0, 1.0))
            .unwrap();
        assert!(selector.drawing_mode_changed(false).is_none());
        assert!(selector.rectangle().is_some());

        assert!(matches!(
            selector.drawing_mode_changed(true),
            Some(GeometryEvent::RectangleCleared { .. })
        ));
        assert!(selector.rectangle().is_none());
    }

    #[test]
    fn operations_are_mode_checked() {
        let mut points = GeometrySelector::new(RegionMode::Point);
        assert!(matches!(
            points.set_rectangle(LatLng::new(2.0, 2.0), LatLng::new(1.0, 1.0)),
            Err(GeometryError::WrongMode { .. })
        ));

        let mut rect = GeometrySelector::new(RegionMode::Rect);
        assert!(matches!(
            rect.add_point(LatLng::new(1.0, 1.0)),
            Err(GeometryError::WrongMode { .. })
        ));
    }

    #[test]
    fn clear_reports_everything_removed() {
        let mut selector = GeometrySelector::new(RegionMode::Point);
        let id = point_id(&selector.add_point(LatLng::new(1.0, 2.0)).unwrap());

        assert_eq!(
            selector.clear(),
            GeometryEvent::Cleared {
                points: vec![id],
                rectangle: None,
            }
        );
        assert!(selector.is_empty());
        assert_eq!(
            selector.clear(),
            GeometryEvent::Cleared {
                points: vec![],
                rectangle: None,
            }
        );
    }
}
