//! Data sources of layers.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::Serialize;
use url::Url;

use crate::config::Attributions;
use crate::error::LayerFactoryError;
use crate::format::VectorFormat;
use crate::tile_index::TileIndex;

/// Tile url template of the standard OpenStreetMap tile server.
pub const OSM_URL_TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
/// Attribution required by the OpenStreetMap tile usage policy.
pub const OSM_ATTRIBUTION: &str = "&#169; <a href=\"https://www.openstreetmap.org/copyright\" target=\"_blank\">OpenStreetMap</a> contributors.";

const OSM_MAX_ZOOM: u32 = 19;
const XYZ_MAX_ZOOM: u32 = 42;
const BING_MAX_ZOOM: u32 = 21;
const WMS_RATIO: f64 = 1.5;
const WMS_VERSION: &str = "1.3.0";
const WMS_BASE_DPI: f64 = 90.0;

fn range_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{(?:([a-z])-([a-z])|(\d+)-(\d+))\}").expect("range pattern is valid")
    })
}

/// Replaces `{a-c}` and `{1-4}` server ranges with one entry of the range.
///
/// The entry is picked by the tile index, so the same tile is always requested from the same server. Empty
/// ranges (`{c-a}`) are left in place.
fn expand_ranges(template: &str, index: TileIndex) -> String {
    range_pattern()
        .replace_all(template, |caps: &Captures| {
            let bounds = match (caps.get(1), caps.get(2), caps.get(3), caps.get(4)) {
                (Some(start), Some(end), _, _) => {
                    let start = start.as_str().as_bytes()[0];
                    let end = end.as_str().as_bytes()[0];
                    Some((u64::from(start), u64::from(end), true))
                }
                (_, _, Some(start), Some(end)) => {
                    match (start.as_str().parse::<u64>(), end.as_str().parse::<u64>()) {
                        (Ok(start), Ok(end)) => Some((start, end, false)),
                        _ => None,
                    }
                }
                _ => None,
            };

            let Some((start, end, letters)) = bounds.filter(|(start, end, _)| start <= end) else {
                return caps[0].to_string();
            };

            let count = i128::from(end) - i128::from(start) + 1;
            let offset = (i128::from(index.x) + i128::from(index.y)).rem_euclid(count);
            let entry = (i128::from(start) + offset) as u64;
            if letters {
                char::from(entry as u8).to_string()
            } else {
                entry.to_string()
            }
        })
        .into_owned()
}

fn expand_template(template: &str, index: TileIndex) -> Result<String, LayerFactoryError> {
    let template = expand_ranges(template, index);
    let vars: HashMap<String, String> = [
        ("z", index.z.to_string()),
        ("x", index.x.to_string()),
        ("y", index.y.to_string()),
        ("-y", index.inverted_y().to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    strfmt::strfmt(&template, &vars).map_err(|err| LayerFactoryError::UrlTemplate(err.to_string()))
}

/// Kind of WMS server. Used to pass the resolution for high DPI displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WmsServerType {
    /// Carmenta Server.
    CarmentaServer,
    /// GeoServer.
    GeoServer,
    /// MapServer.
    MapServer,
    /// QGIS Server.
    Qgis,
}

impl WmsServerType {
    /// Parses the `serverType` configuration value.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "carmentaserver" => Some(Self::CarmentaServer),
            "geoserver" => Some(Self::GeoServer),
            "mapserver" => Some(Self::MapServer),
            "qgis" => Some(Self::Qgis),
            _ => None,
        }
    }

    fn dpi_param(&self, dpi: f64) -> (&'static str, String) {
        match self {
            Self::CarmentaServer | Self::Qgis => ("DPI", dpi.to_string()),
            Self::GeoServer => ("FORMAT_OPTIONS", format!("dpi:{dpi}")),
            Self::MapServer => ("MAP_RESOLUTION", dpi.to_string()),
        }
    }
}

/// Parameters of a single WMS image request.
#[derive(Debug, Clone, PartialEq)]
pub struct WmsImageRequest {
    /// Extent of the view as `[min_x, min_y, max_x, max_y]`.
    pub extent: [f64; 4],
    /// View width in pixels.
    pub width: u32,
    /// View height in pixels.
    pub height: u32,
    /// Coordinate system code of the extent, e.g. `EPSG:3857`.
    pub crs: String,
    /// Device pixel ratio.
    pub pixel_ratio: f64,
}

/// WMS source of an image layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageWmsSource {
    /// Service url.
    pub url: Option<String>,
    /// Request parameters.
    pub params: BTreeMap<String, String>,
    /// Server type.
    pub server_type: Option<WmsServerType>,
    /// Size of the requested image relative to the view size.
    pub ratio: f64,
    /// Source attributions.
    pub attributions: Option<Attributions>,
}

impl ImageWmsSource {
    /// Creates a source requesting the given layers.
    pub fn new(url: Option<String>, layers: Option<String>) -> Self {
        let params = layers
            .into_iter()
            .map(|layers| ("LAYERS".to_string(), layers))
            .collect();

        Self {
            url,
            params,
            server_type: None,
            ratio: WMS_RATIO,
            attributions: None,
        }
    }

    /// Builds the WMS 1.3.0 `GetMap` url for the given view.
    ///
    /// The requested extent and image size are enlarged by [`ratio`](Self::ratio) around the view center. The
    /// pixel ratio is only applied if the server type is known.
    pub fn get_map_url(&self, request: &WmsImageRequest) -> Result<String, LayerFactoryError> {
        let base = self.url.as_deref().ok_or(LayerFactoryError::MissingUrl)?;
        let mut url = Url::parse(base)?;

        let [min_x, min_y, max_x, max_y] = request.extent;
        let center_x = (min_x + max_x) / 2.0;
        let center_y = (min_y + max_y) / 2.0;
        let half_width = (max_x - min_x) * self.ratio / 2.0;
        let half_height = (max_y - min_y) * self.ratio / 2.0;
        let mut bbox = [
            center_x - half_width,
            center_y - half_height,
            center_x + half_width,
            center_y + half_height,
        ];

        // WMS 1.3.0 uses latitude first for geographic coordinates.
        if request.crs == "EPSG:4326" {
            bbox = [bbox[1], bbox[0], bbox[3], bbox[2]];
        }

        let pixel_ratio = match self.server_type {
            Some(_) => request.pixel_ratio,
            None => 1.0,
        };
        let width = (request.width as f64 * self.ratio * pixel_ratio).round() as u32;
        let height = (request.height as f64 * self.ratio * pixel_ratio).round() as u32;
        let bbox = bbox.map(|v| v.to_string()).join(",");

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("SERVICE", "WMS")
                .append_pair("VERSION", WMS_VERSION)
                .append_pair("REQUEST", "GetMap")
                .append_pair("FORMAT", "image/png")
                .append_pair("TRANSPARENT", "TRUE");
            for (key, value) in &self.params {
                query.append_pair(key, value);
            }
            query
                .append_pair("CRS", &request.crs)
                .append_pair("STYLES", "")
                .append_pair("WIDTH", &width.to_string())
                .append_pair("HEIGHT", &height.to_string())
                .append_pair("BBOX", &bbox);

            if let Some(server_type) = self.server_type {
                if pixel_ratio != 1.0 {
                    let (key, value) = server_type.dpi_param((WMS_BASE_DPI * pixel_ratio).round());
                    query.append_pair(key, &value);
                }
            }
        }

        Ok(url.into())
    }
}

/// Raster tiles from an XYZ url template.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XyzSource {
    /// Url template with `{z}`, `{x}`, `{y}` placeholders.
    pub url: Option<String>,
    /// Maximum zoom level.
    pub max_zoom: u32,
}

impl XyzSource {
    /// Creates a new source. Default maximum zoom is 42.
    pub fn new(url: Option<String>, max_zoom: Option<u32>) -> Self {
        Self {
            url,
            max_zoom: max_zoom.unwrap_or(XYZ_MAX_ZOOM),
        }
    }
}

/// Raster tiles from an OpenStreetMap tile server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OsmSource {
    /// Url template.
    pub url: String,
    /// Maximum zoom level.
    pub max_zoom: u32,
    /// Source attributions.
    pub attributions: Attributions,
}

impl OsmSource {
    /// Creates a new source. The standard OpenStreetMap server and zoom limit are used for missing values.
    pub fn new(url: Option<String>, max_zoom: Option<u32>) -> Self {
        Self {
            url: url.unwrap_or_else(|| OSM_URL_TEMPLATE.to_string()),
            max_zoom: max_zoom.unwrap_or(OSM_MAX_ZOOM),
            attributions: Attributions::Single(OSM_ATTRIBUTION.to_string()),
        }
    }
}

/// Raster tiles from Bing Maps.
///
/// Tile urls are taken from the imagery metadata service at runtime, so the source has no url template.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BingSource {
    /// Bing Maps API key.
    pub key: Option<String>,
    /// Imagery set, e.g. `Aerial` or `RoadOnDemand`.
    pub imagery_set: Option<String>,
    /// Maximum zoom level.
    pub max_zoom: u32,
}

impl BingSource {
    /// Creates a new source. Default maximum zoom is 21.
    pub fn new(key: Option<String>, imagery_set: Option<String>, max_zoom: Option<u32>) -> Self {
        Self {
            key,
            imagery_set,
            max_zoom: max_zoom.unwrap_or(BING_MAX_ZOOM),
        }
    }
}

/// Source of a raster tile layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum TileSource {
    /// XYZ url template.
    #[serde(rename = "XYZ")]
    Xyz(XyzSource),
    /// OpenStreetMap.
    #[serde(rename = "OSM")]
    Osm(OsmSource),
    /// Bing Maps.
    #[serde(rename = "BING")]
    Bing(BingSource),
}

impl TileSource {
    /// Url template of the source.
    pub fn url_template(&self) -> Option<&str> {
        match self {
            Self::Xyz(source) => source.url.as_deref(),
            Self::Osm(source) => Some(&source.url),
            Self::Bing(_) => None,
        }
    }

    /// Maximum zoom level of the source.
    pub fn max_zoom(&self) -> u32 {
        match self {
            Self::Xyz(source) => source.max_zoom,
            Self::Osm(source) => source.max_zoom,
            Self::Bing(source) => source.max_zoom,
        }
    }

    /// Url of the tile with the given index.
    pub fn tile_url(&self, index: TileIndex) -> Result<String, LayerFactoryError> {
        let template = match self {
            Self::Bing(_) => return Err(LayerFactoryError::NoUrlTemplate),
            _ => self.url_template().ok_or(LayerFactoryError::MissingUrl)?,
        };

        expand_template(template, index)
    }
}

/// Source of a vector layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorSource {
    /// Dataset url.
    pub url: Option<String>,
    /// Format of the dataset.
    pub format: VectorFormat,
    /// Source attributions.
    pub attributions: Option<Attributions>,
}

/// Source of a vector tile layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorTileSource {
    /// Tile url template.
    pub url: Option<String>,
    /// Format of the tiles.
    pub format: VectorFormat,
    /// Source attributions.
    pub attributions: Option<Attributions>,
}

impl VectorTileSource {
    /// Url of the tile with the given index.
    pub fn tile_url(&self, index: TileIndex) -> Result<String, LayerFactoryError> {
        let template = self.url.as_deref().ok_or(LayerFactoryError::MissingUrl)?;
        expand_template(template, index)
    }
}
