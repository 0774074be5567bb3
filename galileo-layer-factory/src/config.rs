//! Declarative layer configuration.
//!
//! A [`LayerConfig`] is an open record usually read from an application configuration file. Only the
//! `type` field decides what kind of layer is created, all other fields are forwarded into the layer and its
//! source as they are.
//!
//! ```json
//! {
//!   "layers": [
//!     { "type": "OSM", "name": "osm", "title": "OpenStreetMap" },
//!     { "type": "VECTOR", "name": "pois", "url": "./pois.geojson", "format": "GeoJSON", "styleRef": "default" }
//!   ]
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::LayerFactoryError;

/// Layer identifier.
///
/// The value is a millisecond Unix timestamp taken when the identifier was generated. Two identifiers generated
/// within the same millisecond are equal, so a `Lid` is a handle for the caller rather than a unique key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lid(pub u64);

impl Lid {
    /// Creates an identifier from the current wall clock time.
    pub fn now() -> Self {
        let millis = web_time::SystemTime::now()
            .duration_since(web_time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(millis as u64)
    }
}

impl Display for Lid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Attribution text(s) shown for a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attributions {
    /// Single attribution line.
    Single(String),
    /// Several attribution lines.
    Multiple(Vec<String>),
}

impl Attributions {
    /// Iterates over attribution lines.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let slice = match self {
            Self::Single(v) => std::slice::from_ref(v),
            Self::Multiple(v) => v.as_slice(),
        };
        slice.iter().map(String::as_str)
    }
}

/// Configuration of a single map layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerConfig {
    /// Layer type: one of `WMS`, `XYZ`, `OSM`, `BING`, `VECTOR`, `VECTORTILE`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub layer_type: Option<String>,
    /// Layer name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Human readable title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Layer identifier. See [`LayerConfig::normalize`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lid: Option<Lid>,
    /// Whether the layer is listed in the layer list UI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_in_layer_list: Option<bool>,
    /// Initial visibility.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    /// Opacity, `0.0..=1.0`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    /// Rendering order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
    /// Service url or url template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// WMS layer names, comma separated. A list in the configuration is joined with commas.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_layer_names"
    )]
    pub layers: Option<String>,
    /// WMS server type (`geoserver`, `mapserver`, `qgis`, `carmentaserver`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_type: Option<String>,
    /// WMS image ratio.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
    /// Source attributions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributions: Option<Attributions>,
    /// Access token (XYZ) or API key (Bing).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Maximum zoom level of the tile source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_zoom: Option<u32>,
    /// Bing imagery set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imagery_set: Option<String>,
    /// Layer extent as `[min_x, min_y, max_x, max_y]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<[f64; 4]>,
    /// Vector format: one of `MVT`, `GeoJSON`, `TopoJSON`, `KML`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Options of the vector format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_config: Option<Value>,
    /// Inline style specification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<Value>,
    /// Name of a registered style, used when `style` does not produce a style.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_ref: Option<String>,
    /// Whether features of the layer react to hovering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hoverable: Option<bool>,
    /// Feature attribute shown on hover.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover_attribute: Option<String>,
    /// Fields not known to the factory. Kept so that the record can be written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LayerConfig {
    /// Creates an empty configuration of the given type.
    pub fn of_type(layer_type: impl Into<String>) -> Self {
        Self {
            layer_type: Some(layer_type.into()),
            ..Default::default()
        }
    }

    /// Returns the configuration with `lid` populated.
    ///
    /// If the record already has an identifier it is kept, so normalizing the same record several times always
    /// yields the same `lid`.
    pub fn normalize(mut self) -> Self {
        self.ensure_lid();
        self
    }

    /// Populates `lid` in place if it is absent and returns the identifier.
    pub fn ensure_lid(&mut self) -> Lid {
        if let Some(lid) = self.lid {
            return lid;
        }

        let lid = Lid::now();
        log::debug!("Assigned lid {lid} to layer {:?}", self.name);
        self.lid = Some(lid);
        lid
    }

    /// Parses a single layer configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, LayerFactoryError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a layer configuration, moving fields of an unexpected shape into [`extra`](Self::extra).
    ///
    /// A value that is not a JSON object gives an empty record, which creates no layer.
    pub fn from_value_lenient(value: Value) -> Self {
        let fields = match value {
            Value::Object(fields) => fields,
            other => {
                log::warn!("Layer configuration {other} is not an object and is ignored");
                return Self::default();
            }
        };

        let mut accepted = Map::new();
        let mut rejected = Map::new();
        for (key, value) in fields {
            let single = Value::Object(Map::from_iter([(key.clone(), value.clone())]));
            match serde_json::from_value::<LayerConfig>(single) {
                Ok(_) => {
                    accepted.insert(key, value);
                }
                Err(err) => {
                    log::warn!("Layer configuration field '{key}' is ignored: {err}");
                    rejected.insert(key, value);
                }
            }
        }

        let mut config = match serde_json::from_value::<LayerConfig>(Value::Object(accepted)) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Layer configuration is ignored: {err}");
                Self::default()
            }
        };
        config.extra.extend(rejected);
        config
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LayerNames {
    Joined(String),
    List(Vec<String>),
}

fn deserialize_layer_names<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(
        Option::<LayerNames>::deserialize(deserializer)?.map(|names| match names {
            LayerNames::Joined(names) => names,
            LayerNames::List(names) => names.join(","),
        }),
    )
}

fn deserialize_layers<'de, D>(deserializer: D) -> Result<Vec<LayerConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .map(LayerConfig::from_value_lenient)
        .collect())
}

/// A list of layer configurations, as stored in the application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayersConfig {
    /// Layers in drawing order. Malformed fields of a layer do not fail the whole list, see
    /// [`LayerConfig::from_value_lenient`].
    #[serde(default, deserialize_with = "deserialize_layers")]
    pub layers: Vec<LayerConfig>,
}

impl LayersConfig {
    /// Parses the configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, LayerFactoryError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads the configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LayerFactoryError> {
        let path = path.as_ref();
        log::debug!("Reading layer configuration from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Normalizes every layer configuration. See [`LayerConfig::normalize`].
    pub fn normalize(self) -> Self {
        Self {
            layers: self.layers.into_iter().map(LayerConfig::normalize).collect(),
        }
    }
}
