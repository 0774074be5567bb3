//! Layers produced by the [`LayerFactory`](crate::LayerFactory).
//!
//! A layer is a plain value owned by the caller: display properties common to all layers
//! ([`LayerProperties`]), a source describing where the data comes from, and for vector layers the style and
//! interaction settings.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::Serialize;

use crate::config::{LayerConfig, Lid};
use crate::style::Style;

pub mod source;

use source::{ImageWmsSource, TileSource, VectorSource, VectorTileSource};

/// Layer types recognized in the `type` field of a layer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LayerKind {
    /// Image layer with a WMS source.
    #[serde(rename = "WMS")]
    Wms,
    /// Raster tile layer with an XYZ url template.
    #[serde(rename = "XYZ")]
    Xyz,
    /// Raster tile layer with OpenStreetMap tiles.
    #[serde(rename = "OSM")]
    Osm,
    /// Raster tile layer with Bing Maps imagery.
    #[serde(rename = "BING")]
    Bing,
    /// Vector layer loading the whole dataset.
    #[serde(rename = "VECTOR")]
    Vector,
    /// Vector tile layer.
    #[serde(rename = "VECTORTILE")]
    VectorTile,
}

impl LayerKind {
    /// All recognized layer types.
    pub const ALL: [LayerKind; 6] = [
        Self::Wms,
        Self::Xyz,
        Self::Osm,
        Self::Bing,
        Self::Vector,
        Self::VectorTile,
    ];

    /// Returns the kind for the given `type` value. The match is exact and case-sensitive.
    pub fn from_type(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    /// The `type` value of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wms => "WMS",
            Self::Xyz => "XYZ",
            Self::Osm => "OSM",
            Self::Bing => "BING",
            Self::Vector => "VECTOR",
            Self::VectorTile => "VECTORTILE",
        }
    }
}

impl Display for LayerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display properties shared by all layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerProperties {
    /// Layer name.
    pub name: Option<String>,
    /// Human readable title.
    pub title: Option<String>,
    /// Layer identifier.
    pub lid: Lid,
    /// Whether the layer is listed in the layer list UI.
    pub display_in_layer_list: bool,
    /// Visibility.
    pub visible: bool,
    /// Opacity.
    pub opacity: f32,
    /// Rendering order.
    pub z_index: Option<i32>,
}

impl LayerProperties {
    /// Takes the properties from the configuration. `lid` is the identifier already resolved for the layer.
    pub fn from_config(config: &LayerConfig, lid: Lid) -> Self {
        Self {
            name: config.name.clone(),
            title: config.title.clone(),
            lid,
            display_in_layer_list: config.display_in_layer_list.unwrap_or(true),
            visible: config.visible.unwrap_or(true),
            opacity: config.opacity.unwrap_or(1.0),
            z_index: config.z_index,
        }
    }
}

/// Layer rendering single images, requested for the current view.
#[derive(Debug, Clone, Serialize)]
pub struct ImageLayer {
    /// Display properties.
    pub properties: LayerProperties,
    /// Image source.
    pub source: ImageWmsSource,
}

/// Layer rendering raster tiles.
#[derive(Debug, Clone, Serialize)]
pub struct TileLayer {
    /// Display properties.
    pub properties: LayerProperties,
    /// Tile source.
    pub source: TileSource,
}

/// Layer rendering features of a vector dataset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorLayer {
    /// Display properties.
    pub properties: LayerProperties,
    /// Vector source.
    pub source: VectorSource,
    /// Feature style. Features are drawn with the renderer default style if not set.
    pub style: Option<Arc<Style>>,
    /// Features outside this extent are not rendered.
    pub extent: Option<[f64; 4]>,
    /// Whether features react to hovering.
    pub hoverable: bool,
    /// Feature attribute shown on hover.
    pub hover_attribute: Option<String>,
}

/// Layer rendering vector tiles.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorTileLayer {
    /// Display properties.
    pub properties: LayerProperties,
    /// Vector tile source.
    pub source: VectorTileSource,
    /// Feature style.
    pub style: Option<Arc<Style>>,
    /// Whether features react to hovering.
    pub hoverable: bool,
    /// Feature attribute shown on hover.
    pub hover_attribute: Option<String>,
}

/// Map layer created from a layer configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "layer")]
pub enum Layer {
    /// Image layer.
    Image(ImageLayer),
    /// Raster tile layer.
    Tile(TileLayer),
    /// Vector layer.
    Vector(VectorLayer),
    /// Vector tile layer.
    VectorTile(VectorTileLayer),
}

impl Layer {
    /// Display properties of the layer.
    pub fn properties(&self) -> &LayerProperties {
        match self {
            Self::Image(l) => &l.properties,
            Self::Tile(l) => &l.properties,
            Self::Vector(l) => &l.properties,
            Self::VectorTile(l) => &l.properties,
        }
    }

    /// Mutable display properties of the layer.
    pub fn properties_mut(&mut self) -> &mut LayerProperties {
        match self {
            Self::Image(l) => &mut l.properties,
            Self::Tile(l) => &mut l.properties,
            Self::Vector(l) => &mut l.properties,
            Self::VectorTile(l) => &mut l.properties,
        }
    }

    /// Layer identifier.
    pub fn lid(&self) -> Lid {
        self.properties().lid
    }

    /// Layer name.
    pub fn name(&self) -> Option<&str> {
        self.properties().name.as_deref()
    }

    /// Configuration type the layer was created from.
    pub fn kind(&self) -> LayerKind {
        match self {
            Self::Image(_) => LayerKind::Wms,
            Self::Tile(l) => match l.source {
                TileSource::Xyz(_) => LayerKind::Xyz,
                TileSource::Osm(_) => LayerKind::Osm,
                TileSource::Bing(_) => LayerKind::Bing,
            },
            Self::Vector(_) => LayerKind::Vector,
            Self::VectorTile(_) => LayerKind::VectorTile,
        }
    }

    /// Style of a vector or vector tile layer.
    pub fn style(&self) -> Option<&Arc<Style>> {
        match self {
            Self::Vector(l) => l.style.as_ref(),
            Self::VectorTile(l) => l.style.as_ref(),
            Self::Image(_) | Self::Tile(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_type_is_exact() {
        for kind in LayerKind::ALL {
            assert_eq!(LayerKind::from_type(kind.as_str()), Some(kind));
        }

        assert_eq!(LayerKind::from_type("wms"), None);
        assert_eq!(LayerKind::from_type("VECTOR_TILE"), None);
        assert_eq!(LayerKind::from_type(" OSM"), None);
        assert_eq!(LayerKind::from_type(""), None);
    }

    #[test]
    fn properties_defaults() {
        let properties = LayerProperties::from_config(&LayerConfig::of_type("OSM"), Lid(5));
        assert_eq!(properties.lid, Lid(5));
        assert!(properties.visible);
        assert!(properties.display_in_layer_list);
        assert_eq!(properties.opacity, 1.0);
        assert_eq!(properties.z_index, None);
    }

    #[test]
    fn properties_use_given_lid() {
        let config = LayerConfig {
            lid: Some(Lid(10)),
            ..LayerConfig::of_type("OSM")
        };
        assert_eq!(LayerProperties::from_config(&config, Lid(11)).lid, Lid(11));
    }

    #[test]
    fn properties_mut() {
        let mut layer = Layer::Tile(TileLayer {
            properties: LayerProperties::from_config(&LayerConfig::of_type("OSM"), Lid(1)),
            source: TileSource::Osm(source::OsmSource::new(None, None)),
        });
        layer.properties_mut().visible = false;
        layer.properties_mut().opacity = 0.25;

        assert!(!layer.properties().visible);
        assert_eq!(layer.properties().opacity, 0.25);
        assert_eq!(layer.kind(), LayerKind::Osm);
        assert!(layer.style().is_none());
    }

    #[test]
    fn properties_from_config() {
        let config = LayerConfig {
            name: Some("roads".into()),
            title: Some("Roads".into()),
            lid: Some(Lid(10)),
            display_in_layer_list: Some(false),
            visible: Some(false),
            opacity: Some(0.5),
            z_index: Some(2),
            ..LayerConfig::of_type("XYZ")
        };
        let properties = LayerProperties::from_config(&config, Lid(10));
        assert_eq!(
            properties,
            LayerProperties {
                name: Some("roads".into()),
                title: Some("Roads".into()),
                lid: Lid(10),
                display_in_layer_list: false,
                visible: false,
                opacity: 0.5,
                z_index: Some(2),
            }
        );
    }
}
