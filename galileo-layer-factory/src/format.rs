//! Vector data formats.
//!
//! Formats are selected by the `format` literal of a layer configuration and configured with its
//! `formatConfig` object. The set of formats is closed: [`VectorFormatKind::build`] maps every kind to its
//! format, so an unknown literal is rejected when parsed instead of at construction time.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LayerFactoryError;

const WGS84: &str = "EPSG:4326";

/// Kind of a vector format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VectorFormatKind {
    /// Mapbox vector tiles.
    #[serde(rename = "MVT")]
    Mvt,
    /// GeoJSON.
    #[serde(rename = "GeoJSON")]
    GeoJson,
    /// TopoJSON.
    #[serde(rename = "TopoJSON")]
    TopoJson,
    /// Keyhole markup language.
    #[serde(rename = "KML")]
    Kml,
}

impl VectorFormatKind {
    /// All known formats.
    pub const ALL: [VectorFormatKind; 4] = [Self::Mvt, Self::GeoJson, Self::TopoJson, Self::Kml];

    /// Configuration literal of the format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mvt => "MVT",
            Self::GeoJson => "GeoJSON",
            Self::TopoJson => "TopoJSON",
            Self::Kml => "KML",
        }
    }

    /// Media type of the data in this format.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Mvt => "application/vnd.mapbox-vector-tile",
            Self::GeoJson => "application/geo+json",
            Self::TopoJson => "application/json",
            Self::Kml => "application/vnd.google-earth.kml+xml",
        }
    }

    /// Creates the format with the given options.
    ///
    /// `None` and JSON `null` produce the format with default options.
    pub fn build(self, options: Option<&Value>) -> Result<VectorFormat, LayerFactoryError> {
        Ok(match self {
            Self::Mvt => VectorFormat::Mvt(parse_options(options)?),
            Self::GeoJson => VectorFormat::GeoJson(parse_options(options)?),
            Self::TopoJson => VectorFormat::TopoJson(parse_options(options)?),
            Self::Kml => VectorFormat::Kml(parse_options(options)?),
        })
    }
}

impl FromStr for VectorFormatKind {
    type Err = LayerFactoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| LayerFactoryError::UnknownFormat(s.to_string()))
    }
}

impl Display for VectorFormatKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_options<T: DeserializeOwned + Default>(
    options: Option<&Value>,
) -> Result<T, LayerFactoryError> {
    match options {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => {
            serde_json::from_value(value.clone()).map_err(LayerFactoryError::FormatConfig)
        }
    }
}

/// Vector format with its options.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum VectorFormat {
    /// Mapbox vector tiles.
    #[serde(rename = "MVT")]
    Mvt(MvtFormat),
    /// GeoJSON.
    #[serde(rename = "GeoJSON")]
    GeoJson(GeoJsonFormat),
    /// TopoJSON.
    #[serde(rename = "TopoJSON")]
    TopoJson(TopoJsonFormat),
    /// Keyhole markup language.
    #[serde(rename = "KML")]
    Kml(KmlFormat),
}

impl VectorFormat {
    /// Kind of the format.
    pub fn kind(&self) -> VectorFormatKind {
        match self {
            Self::Mvt(_) => VectorFormatKind::Mvt,
            Self::GeoJson(_) => VectorFormatKind::GeoJson,
            Self::TopoJson(_) => VectorFormatKind::TopoJson,
            Self::Kml(_) => VectorFormatKind::Kml,
        }
    }

    /// Projection the data is stored in, if the format defines one.
    pub fn data_projection(&self) -> Option<&str> {
        match self {
            Self::Mvt(_) => None,
            Self::GeoJson(f) => Some(&f.data_projection),
            Self::TopoJson(f) => Some(&f.data_projection),
            Self::Kml(_) => Some(WGS84),
        }
    }
}

/// Options of the MVT format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MvtFormat {
    /// Names of the tile layers to read. All layers are read if not set.
    pub layers: Option<Vec<String>>,
    /// Feature property the tile layer name is written to.
    pub layer_name: String,
    /// Feature property used as feature id.
    pub id_property: Option<String>,
    /// Name of the geometry property.
    pub geometry_name: String,
}

impl Default for MvtFormat {
    fn default() -> Self {
        Self {
            layers: None,
            layer_name: "layer".to_string(),
            id_property: None,
            geometry_name: "geometry".to_string(),
        }
    }
}

/// Options of the GeoJSON format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeoJsonFormat {
    /// Projection of the data.
    pub data_projection: String,
    /// Projection features are transformed to.
    pub feature_projection: Option<String>,
    /// Name of the geometry property.
    pub geometry_name: Option<String>,
    /// Take the geometry name from the `geometry_name` member of each feature.
    pub extract_geometry_name: bool,
}

impl Default for GeoJsonFormat {
    fn default() -> Self {
        Self {
            data_projection: WGS84.to_string(),
            feature_projection: None,
            geometry_name: None,
            extract_geometry_name: false,
        }
    }
}

/// Options of the TopoJSON format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TopoJsonFormat {
    /// Projection of the data.
    pub data_projection: String,
    /// Feature property the topology object name is written to.
    pub layer_name: Option<String>,
    /// Names of the topology objects to read. All objects are read if not set.
    pub layers: Option<Vec<String>>,
}

impl Default for TopoJsonFormat {
    fn default() -> Self {
        Self {
            data_projection: WGS84.to_string(),
            layer_name: None,
            layers: None,
        }
    }
}

/// Options of the KML format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KmlFormat {
    /// Use styles defined in the document.
    pub extract_styles: bool,
    /// Show placemark names as labels.
    pub show_point_names: bool,
    /// Write styles when encoding features.
    pub write_styles: bool,
}

impl Default for KmlFormat {
    fn default() -> Self {
        Self {
            extract_styles: true,
            show_point_names: true,
            write_styles: true,
        }
    }
}
