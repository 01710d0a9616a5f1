//! Widget configuration.
//!
//! The defaults live in `config/default.toml` and are embedded at compile
//! time. A deployment can point `GIOT_VIS_CONFIG` at its own file and
//! override just the service URL with `GIOT_VIS_DATA_URL`.

use std::path::{Path, PathBuf};

use giot_vis_client::ServiceConfig;
use giot_vis_query_models::LatLng;
use giot_vis_render::{DEFAULT_HEAT_SCALE, DEFAULT_HEATMAP_RADIUS, RenderOptions};
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_TOML: &str = include_str!("../config/default.toml");

/// Environment variable naming a configuration file to load.
pub const CONFIG_ENV: &str = "GIOT_VIS_CONFIG";

/// Environment variable overriding `service.data_url`.
pub const DATA_URL_ENV: &str = "GIOT_VIS_DATA_URL";

/// Errors loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// A border needs at least two corners to be drawn.
    #[error("Border must have at least 2 corners, got {0}")]
    Border(usize),
}

/// Initial map view.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapConfig {
    /// `[latitude, longitude]`
    pub center: [f64; 2],
    pub zoom: u8,
}

impl MapConfig {
    #[must_use]
    pub const fn center(&self) -> LatLng {
        LatLng::from_tuple(self.center)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeatmapConfig {
    #[serde(default = "default_heatmap_radius")]
    pub radius: f64,
    #[serde(default = "default_heat_scale")]
    pub scale: f64,
}

const fn default_heatmap_radius() -> f64 {
    DEFAULT_HEATMAP_RADIUS
}

const fn default_heat_scale() -> f64 {
    DEFAULT_HEAT_SCALE
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_HEATMAP_RADIUS,
            scale: DEFAULT_HEAT_SCALE,
        }
    }
}

/// Everything the widget reads at startup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WidgetConfig {
    pub map: MapConfig,
    /// Closed outline of the covered area as `[latitude, longitude]`
    /// corners. No outline is drawn when absent.
    #[serde(default)]
    pub border: Option<Vec<[f64; 2]>>,
    #[serde(default)]
    pub heatmap: HeatmapConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        // The embedded file is covered by `embedded_default_parses`.
        Self::parse(DEFAULT_TOML).unwrap_or_else(|e| {
            log::error!("Embedded default configuration is invalid: {e}");
            Self {
                map: MapConfig {
                    center: [0.0, 0.0],
                    zoom: 1,
                },
                border: None,
                heatmap: HeatmapConfig::default(),
                service: ServiceConfig::default(),
            }
        })
    }
}

impl WidgetConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the text is not a valid
    /// configuration and [`ConfigError::Border`] if the border has fewer
    /// than two corners.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        if let Some(border) = &config.border {
            if border.len() < 2 {
                return Err(ConfigError::Border(border.len()));
            }
        }
        Ok(config)
    }

    /// Reads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise
    /// the errors of [`WidgetConfig::parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded configuration from {}", path.display());
        Self::parse(&text)
    }

    /// The configuration named by [`CONFIG_ENV`] (or the embedded default),
    /// with [`DATA_URL_ENV`] applied on top.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`WidgetConfig::load`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(url) = std::env::var(DATA_URL_ENV) {
            log::info!("Using data URL {url} from {DATA_URL_ENV}");
            config.service.data_url = url;
        }

        Ok(config)
    }

    /// Border corners as map coordinates.
    #[must_use]
    pub fn border_path(&self) -> Option<Vec<LatLng>> {
        self.border
            .as_ref()
            .map(|corners| corners.iter().copied().map(LatLng::from_tuple).collect())
    }

    #[must_use]
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            heatmap_radius: self.heatmap.radius,
            heat_scale: self.heatmap.scale,
            ..RenderOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_default_parses() {
        let config = WidgetConfig::parse(DEFAULT_TOML).unwrap();
        assert_eq!(config.map.zoom, 15);
        assert_eq!(config.border.as_ref().map(Vec::len), Some(5));
        assert!((config.heatmap.radius - 50.0).abs() < f64::EPSILON);
        assert!((config.heatmap.scale - 5.0).abs() < f64::EPSILON);
        assert_eq!(
            config.service.data_url,
            giot_vis_client::config::DEFAULT_DATA_URL
        );
        assert_eq!(WidgetConfig::default(), config);
    }

    #[test]
    fn minimal_config_fills_defaults() {
        let config = WidgetConfig::parse(
            r#"
            [map]
            center = [1.0, 2.0]
            zoom = 3
            "#,
        )
        .unwrap();

        assert!(config.border.is_none());
        assert_eq!(config.heatmap, HeatmapConfig::default());
        assert_eq!(config.service, ServiceConfig::default());
        assert!((config.map.center().lng - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_unknown_keys_and_short_borders() {
        assert!(matches!(
            WidgetConfig::parse("[map]\ncenter = [1.0, 2.0]\nzoom = 3\nspeed = 4\n"),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            WidgetConfig::parse("border = [[1.0, 2.0]]\n[map]\ncenter = [1.0, 2.0]\nzoom = 3\n"),
            Err(ConfigError::Border(1))
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let missing = std::env::temp_dir().join("giot_vis_config_does_not_exist.toml");
        assert!(matches!(
            WidgetConfig::load(&missing),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn load_reads_file() {
        let path = std::env::temp_dir().join("giot_vis_config_load_test.toml");
        std::fs::write(
            &path,
            "[map]\ncenter = [59.86, 17.64]\nzoom = 12\n[service]\ndata_url = \"http://localhost:9000/\"\n",
        )
        .unwrap();

        let config = WidgetConfig::load(&path).unwrap();
        assert_eq!(config.map.zoom, 12);
        assert_eq!(config.service.data_url, "http://localhost:9000/");

        let _ = std::fs::remove_file(&path);
    }
}
