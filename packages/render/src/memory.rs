//! A [`MapSurface`] that keeps overlays in memory and exports them as
//! `GeoJSON`.

use std::collections::BTreeMap;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use giot_vis_query_models::{LatLng, Rectangle};

use crate::surface::{MapSurface, OverlayHandle, ShapeStyle, WeightedPoint};

/// Kind of an overlay, for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    Marker,
    Circle,
    Polyline,
    Rectangle,
    Heatmap,
}

impl OverlayKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Marker => "marker",
            Self::Circle => "circle",
            Self::Polyline => "polyline",
            Self::Rectangle => "rectangle",
            Self::Heatmap => "heatmap",
        }
    }
}

/// An overlay as it was drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    Marker {
        position: LatLng,
        style: ShapeStyle,
    },
    Circle {
        center: LatLng,
        radius: f64,
        style: ShapeStyle,
    },
    Polyline {
        path: Vec<LatLng>,
        style: ShapeStyle,
    },
    Rectangle {
        rectangle: Rectangle,
        style: ShapeStyle,
    },
    Heatmap {
        points: Vec<WeightedPoint>,
        radius: f64,
    },
}

impl Overlay {
    #[must_use]
    pub const fn kind(&self) -> OverlayKind {
        match self {
            Self::Marker { .. } => OverlayKind::Marker,
            Self::Circle { .. } => OverlayKind::Circle,
            Self::Polyline { .. } => OverlayKind::Polyline,
            Self::Rectangle { .. } => OverlayKind::Rectangle,
            Self::Heatmap { .. } => OverlayKind::Heatmap,
        }
    }
}

/// Overlays currently attached, keyed by handle in drawing order.
#[derive(Debug, Default)]
pub struct MemorySurface {
    overlays: BTreeMap<OverlayHandle, Overlay>,
    next_handle: u64,
}

impl MemorySurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attached overlays.
    #[must_use]
    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    /// Number of attached overlays of one kind.
    #[must_use]
    pub fn count(&self, kind: OverlayKind) -> usize {
        self.overlays.values().filter(|o| o.kind() == kind).count()
    }

    #[must_use]
    pub fn get(&self, handle: OverlayHandle) -> Option<&Overlay> {
        self.overlays.get(&handle)
    }

    /// Attached overlays in drawing order.
    pub fn overlays(&self) -> impl Iterator<Item = (OverlayHandle, &Overlay)> {
        self.overlays.iter().map(|(h, o)| (*h, o))
    }

    /// Every attached overlay as `GeoJSON` features. Heat layers expand to
    /// one point feature per weighted point.
    #[must_use]
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let mut features = Vec::new();

        for (handle, overlay) in &self.overlays {
            let mut props = JsonObject::new();
            props.insert("kind".to_string(), overlay.kind().as_str().into());
            props.insert("overlay".to_string(), handle.value().into());

            match overlay {
                Overlay::Marker { position, style } => {
                    insert_style(&mut props, style);
                    features.push(feature(point(*position), props));
                }
                Overlay::Circle {
                    center,
                    radius,
                    style,
                } => {
                    props.insert("radius".to_string(), (*radius).into());
                    insert_style(&mut props, style);
                    features.push(feature(point(*center), props));
                }
                Overlay::Polyline { path, style } => {
                    insert_style(&mut props, style);
                    features.push(feature(
                        Value::LineString(path.iter().map(|p| vec![p.lng, p.lat]).collect()),
                        props,
                    ));
                }
                Overlay::Rectangle { rectangle, style } => {
                    insert_style(&mut props, style);
                    let ring = rectangle
                        .ring()
                        .iter()
                        .map(|p| vec![p.lng, p.lat])
                        .collect();
                    features.push(feature(Value::Polygon(vec![ring]), props));
                }
                Overlay::Heatmap { points, radius } => {
                    props.insert("radius".to_string(), (*radius).into());
                    for weighted in points {
                        let mut point_props = props.clone();
                        point_props.insert("weight".to_string(), weighted.weight.into());
                        features.push(feature(point(weighted.position), point_props));
                    }
                }
            }
        }

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }

    fn attach(&mut self, overlay: Overlay) -> OverlayHandle {
        self.next_handle += 1;
        let handle = OverlayHandle::new(self.next_handle);
        log::trace!("Attached {} as {}", overlay.kind().as_str(), handle.value());
        self.overlays.insert(handle, overlay);
        handle
    }
}

impl MapSurface for MemorySurface {
    fn add_marker(&mut self, position: LatLng, style: &ShapeStyle) -> OverlayHandle {
        self.attach(Overlay::Marker {
            position,
            style: style.clone(),
        })
    }

    fn add_circle(&mut self, center: LatLng, radius: f64, style: &ShapeStyle) -> OverlayHandle {
        self.attach(Overlay::Circle {
            center,
            radius,
            style: style.clone(),
        })
    }

    fn add_polyline(&mut self, path: &[LatLng], style: &ShapeStyle) -> OverlayHandle {
        self.attach(Overlay::Polyline {
            path: path.to_vec(),
            style: style.clone(),
        })
    }

    fn add_rectangle(&mut self, rectangle: &Rectangle, style: &ShapeStyle) -> OverlayHandle {
        self.attach(Overlay::Rectangle {
            rectangle: *rectangle,
            style: style.clone(),
        })
    }

    fn add_heatmap(&mut self, points: &[WeightedPoint], radius: f64) -> OverlayHandle {
        self.attach(Overlay::Heatmap {
            points: points.to_vec(),
            radius,
        })
    }

    fn remove(&mut self, handle: OverlayHandle) {
        if self.overlays.remove(&handle).is_some() {
            log::trace!("Detached {}", handle.value());
        }
    }
}

fn point(position: LatLng) -> Value {
    Value::Point(vec![position.lng, position.lat])
}

fn feature(value: Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn insert_style(props: &mut JsonObject, style: &ShapeStyle) {
    props.insert(
        "stroke".to_string(),
        JsonValue::String(style.stroke_color.clone()),
    );
    props.insert("stroke-opacity".to_string(), style.stroke_opacity.into());
    props.insert("stroke-width".to_string(), style.stroke_weight.into());
    props.insert("fill".to_string(), JsonValue::String(style.fill_color.clone()));
    props.insert("fill-opacity".to_string(), style.fill_opacity.into());
}
