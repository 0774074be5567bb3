//! Creates layers from layer configurations.

use std::sync::Arc;

use crate::config::{LayerConfig, Lid};
use crate::error::LayerFactoryError;
use crate::format::{VectorFormat, VectorFormatKind};
use crate::layer::source::{
    BingSource, ImageWmsSource, OsmSource, TileSource, VectorSource, VectorTileSource,
    WmsServerType, XyzSource,
};
use crate::layer::{
    ImageLayer, Layer, LayerKind, LayerProperties, TileLayer, VectorLayer, VectorTileLayer,
};
use crate::style::{resolve_style, JsonStyleFactory, Style, StyleFactory, StyleRegistry};

/// Creates [`Layer`]s from [`LayerConfig`]s.
///
/// ```no_run
/// use galileo_layer_factory::{LayerConfig, LayerFactory};
///
/// let factory = LayerFactory::default();
/// let config = LayerConfig::of_type("OSM").normalize();
/// let layer = factory.get_instance(&config).expect("valid config");
/// assert!(layer.is_some());
/// ```
pub struct LayerFactory {
    style_factory: Box<dyn StyleFactory + Send + Sync>,
    style_registry: Arc<StyleRegistry>,
}

impl Default for LayerFactory {
    fn default() -> Self {
        Self::new(JsonStyleFactory, Arc::new(StyleRegistry::with_defaults()))
    }
}

impl LayerFactory {
    /// Creates a factory resolving vector styles with the given style factory and registry.
    pub fn new(
        style_factory: impl StyleFactory + Send + Sync + 'static,
        style_registry: Arc<StyleRegistry>,
    ) -> Self {
        Self {
            style_factory: Box::new(style_factory),
            style_registry,
        }
    }

    /// Registry of named styles used by the factory.
    pub fn style_registry(&self) -> &Arc<StyleRegistry> {
        &self.style_registry
    }

    /// Creates the layer described by the configuration.
    ///
    /// Returns `Ok(None)` if the `type` of the configuration is missing or is not one of the recognized layer
    /// types. The configuration should be [normalized](LayerConfig::normalize) before: if it has no `lid`, the
    /// layer gets a fresh identifier that is not written back to the configuration.
    pub fn get_instance(&self, config: &LayerConfig) -> Result<Option<Layer>, LayerFactoryError> {
        let Some(kind) = config.layer_type.as_deref().and_then(LayerKind::from_type) else {
            log::warn!(
                "Unknown layer type {:?} of layer {:?}, layer is skipped",
                config.layer_type,
                config.name
            );
            return Ok(None);
        };

        log::debug!("Creating {kind} layer {:?}", config.name);

        let layer = match kind {
            LayerKind::Wms => Layer::Image(self.create_wms_layer(config)),
            LayerKind::Xyz => Layer::Tile(self.create_xyz_layer(config)),
            LayerKind::Osm => Layer::Tile(self.create_osm_layer(config)),
            LayerKind::Bing => Layer::Tile(self.create_bing_layer(config)),
            LayerKind::Vector => Layer::Vector(self.create_vector_layer(config)?),
            LayerKind::VectorTile => Layer::VectorTile(self.create_vector_tile_layer(config)?),
        };

        Ok(Some(layer))
    }

    /// Assigns the `lid` of the configuration if it is absent and creates the layer.
    ///
    /// Layers created from the same record always share its `lid`. See [`get_instance`](Self::get_instance).
    pub fn get_instance_mut(
        &self,
        config: &mut LayerConfig,
    ) -> Result<Option<Layer>, LayerFactoryError> {
        config.ensure_lid();
        self.get_instance(config)
    }

    /// Creates layers for all configurations with a recognized type, keeping their order.
    pub fn get_instances<'a>(
        &self,
        configs: impl IntoIterator<Item = &'a LayerConfig>,
    ) -> Result<Vec<Layer>, LayerFactoryError> {
        let mut layers = vec![];
        for config in configs {
            if let Some(layer) = self.get_instance(config)? {
                layers.push(layer);
            }
        }

        Ok(layers)
    }

    /// Creates an image layer with a WMS source.
    pub fn create_wms_layer(&self, config: &LayerConfig) -> ImageLayer {
        let server_type = config.server_type.as_deref().and_then(|name| {
            let server_type = WmsServerType::from_name(name);
            if server_type.is_none() {
                log::warn!("Unknown WMS server type '{name}' is ignored");
            }
            server_type
        });

        let mut source = ImageWmsSource::new(config.url.clone(), config.layers.clone());
        source.server_type = server_type;
        source.attributions = config.attributions.clone();
        if let Some(ratio) = config.ratio {
            source.ratio = ratio;
        }

        ImageLayer {
            properties: properties(config),
            source,
        }
    }

    /// Creates a raster tile layer with an XYZ source.
    ///
    /// If the configuration has an access token, it is appended to the url as the `access_token` query
    /// parameter.
    pub fn create_xyz_layer(&self, config: &LayerConfig) -> TileLayer {
        let url = match (&config.url, &config.access_token) {
            (Some(url), Some(token)) => Some(format!("{url}?access_token={token}")),
            (url, _) => url.clone(),
        };

        TileLayer {
            properties: properties(config),
            source: TileSource::Xyz(XyzSource::new(url, config.max_zoom)),
        }
    }

    /// Creates a raster tile layer with an OpenStreetMap source.
    pub fn create_osm_layer(&self, config: &LayerConfig) -> TileLayer {
        TileLayer {
            properties: properties(config),
            source: TileSource::Osm(OsmSource::new(config.url.clone(), config.max_zoom)),
        }
    }

    /// Creates a raster tile layer with a Bing Maps source. The access token is used as the API key.
    pub fn create_bing_layer(&self, config: &LayerConfig) -> TileLayer {
        TileLayer {
            properties: properties(config),
            source: TileSource::Bing(BingSource::new(
                config.access_token.clone(),
                config.imagery_set.clone(),
                config.max_zoom,
            )),
        }
    }

    /// Creates a vector layer. The format is configured with the `formatConfig` of the configuration.
    pub fn create_vector_layer(
        &self,
        config: &LayerConfig,
    ) -> Result<VectorLayer, LayerFactoryError> {
        let format = vector_format(config, LayerKind::Vector, config.format_config.as_ref())?;

        Ok(VectorLayer {
            properties: properties(config),
            source: VectorSource {
                url: config.url.clone(),
                format,
                attributions: config.attributions.clone(),
            },
            style: self.style(config),
            extent: config.extent,
            hoverable: config.hoverable.unwrap_or(false),
            hover_attribute: config.hover_attribute.clone(),
        })
    }

    /// Creates a vector tile layer. The format always uses default options.
    pub fn create_vector_tile_layer(
        &self,
        config: &LayerConfig,
    ) -> Result<VectorTileLayer, LayerFactoryError> {
        let format = vector_format(config, LayerKind::VectorTile, None)?;

        Ok(VectorTileLayer {
            properties: properties(config),
            source: VectorTileSource {
                url: config.url.clone(),
                format,
                attributions: config.attributions.clone(),
            },
            style: self.style(config),
            hoverable: config.hoverable.unwrap_or(false),
            hover_attribute: config.hover_attribute.clone(),
        })
    }

    fn style(&self, config: &LayerConfig) -> Option<Arc<Style>> {
        resolve_style(
            &*self.style_factory,
            &self.style_registry,
            config.style.as_ref(),
            config.style_ref.as_deref(),
        )
    }
}

fn properties(config: &LayerConfig) -> LayerProperties {
    let lid = config.lid.unwrap_or_else(|| {
        log::warn!(
            "Layer {:?} is not normalized, its lid changes with every created layer",
            config.name
        );
        Lid::now()
    });

    LayerProperties::from_config(config, lid)
}

fn vector_format(
    config: &LayerConfig,
    kind: LayerKind,
    options: Option<&serde_json::Value>,
) -> Result<VectorFormat, LayerFactoryError> {
    let format_kind: VectorFormatKind = config
        .format
        .as_deref()
        .ok_or(LayerFactoryError::MissingFormat(kind))?
        .parse()?;

    format_kind.build(options)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::config::LayersConfig;
    use crate::format::GeoJsonFormat;
    use crate::style::DEFAULT_STYLE;

    struct NoStyles;

    impl StyleFactory for NoStyles {
        fn create(&self, _spec: &Value) -> Option<Arc<Style>> {
            None
        }
    }

    fn config(value: Value) -> LayerConfig {
        serde_json::from_value::<LayerConfig>(value)
            .expect("valid config")
            .normalize()
    }

    #[test]
    fn unknown_type_gives_no_layer() {
        let factory = LayerFactory::default();
        for value in [
            json!({}),
            json!({ "type": "WFS" }),
            json!({ "type": "xyz" }),
            json!({ "type": "Vector", "format": "UNKNOWN" }),
            json!({ "type": null }),
        ] {
            let layer = factory.get_instance(&config(value)).expect("no error");
            assert!(layer.is_none());
        }
    }

    #[test]
    fn every_type_creates_its_layer() {
        let factory = LayerFactory::default();
        for kind in LayerKind::ALL {
            let config = config(json!({
                "type": kind.as_str(),
                "url": "https://example.com/{z}/{x}/{y}",
                "format": "MVT",
            }));
            let layer = factory
                .get_instance(&config)
                .expect("valid config")
                .expect("known type");
            assert_eq!(layer.kind(), kind);
            assert_eq!(Some(layer.lid()), config.lid);
        }
    }

    #[test]
    fn lid_without_normalization() {
        let factory = LayerFactory::default();
        let config = LayerConfig::of_type("OSM");
        let layer = factory
            .get_instance(&config)
            .expect("valid config")
            .expect("known type");
        assert!(layer.lid().0 > 0);
        assert_eq!(config.lid, None);
    }

    #[test]
    fn lid_assigned_to_mutable_record() {
        let factory = LayerFactory::default();
        let mut config = LayerConfig::of_type("OSM");
        let first = factory
            .get_instance_mut(&mut config)
            .expect("valid config")
            .expect("known type");
        let lid = config.lid.expect("lid is assigned");
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = factory
            .get_instance_mut(&mut config)
            .expect("valid config")
            .expect("known type");

        assert_eq!(first.lid(), lid);
        assert_eq!(second.lid(), lid);
        assert_eq!(config.lid, Some(lid));
    }

    #[test]
    fn lenient_layer_list() {
        let config = LayersConfig::from_json_str(
            r#"{"layers": [
                {"type": "OSM"},
                {"type": "WFS", "layers": ["a", "b"]},
                {"type": "WMS", "url": "https://wms.example", "layers": ["a", "b"]}
            ]}"#,
        )
        .expect("lenient layers")
        .normalize();

        let layers = LayerFactory::default()
            .get_instances(&config.layers)
            .expect("valid layers");
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].kind(), LayerKind::Osm);

        let Layer::Image(wms) = &layers[1] else {
            panic!("expected image layer");
        };
        assert_eq!(
            wms.source.params.get("LAYERS").map(String::as_str),
            Some("a,b")
        );
    }

    #[test]
    fn lid_is_stable_between_calls() {
        let factory = LayerFactory::default();
        let config = LayerConfig::of_type("XYZ").normalize();
        let lid = config.lid;
        let first = factory.get_instance(&config).expect("valid").expect("layer");
        let config = config.normalize();
        let second = factory.get_instance(&config).expect("valid").expect("layer");

        assert_eq!(config.lid, lid);
        assert_eq!(first.lid(), second.lid());
    }

    #[test]
    fn wms_layer() {
        let factory = LayerFactory::default();
        let layer = factory.create_wms_layer(&config(json!({
            "type": "WMS",
            "url": "https://wms.example",
            "layers": "base",
            "serverType": "geoserver",
            "ratio": 1.0,
            "attributions": "© WMS",
            "zIndex": 4,
        })));

        assert_eq!(layer.source.url.as_deref(), Some("https://wms.example"));
        assert_eq!(layer.source.params.len(), 1);
        assert_eq!(
            layer.source.params.get("LAYERS").map(String::as_str),
            Some("base")
        );
        assert_eq!(layer.source.server_type, Some(WmsServerType::GeoServer));
        assert_eq!(layer.source.ratio, 1.0);
        assert!(layer.source.attributions.is_some());
        assert_eq!(layer.properties.z_index, Some(4));
    }

    #[test]
    fn wms_unknown_server_type_is_ignored() {
        let layer = LayerFactory::default().create_wms_layer(&config(json!({
            "type": "WMS",
            "serverType": "arcgis",
        })));
        assert_eq!(layer.source.server_type, None);
        assert_eq!(layer.source.ratio, 1.5);
    }

    #[test]
    fn xyz_access_token() {
        let factory = LayerFactory::default();
        let layer = factory.create_xyz_layer(&config(json!({
            "type": "XYZ",
            "url": "https://t.example/{z}/{x}/{y}",
            "accessToken": "abc",
            "maxZoom": 12,
        })));
        assert_eq!(
            layer.source.url_template(),
            Some("https://t.example/{z}/{x}/{y}?access_token=abc")
        );
        assert_eq!(layer.source.max_zoom(), 12);

        let layer = factory.create_xyz_layer(&config(json!({
            "type": "XYZ",
            "url": "https://t.example/{z}/{x}/{y}",
        })));
        assert_eq!(
            layer.source.url_template(),
            Some("https://t.example/{z}/{x}/{y}")
        );
    }

    #[test]
    fn osm_layer() {
        let factory = LayerFactory::default();
        let layer = factory.create_osm_layer(&config(json!({
            "type": "OSM",
            "url": "https://osm.example/{z}/{x}/{y}.png",
            "maxZoom": 17,
            "visible": false,
            "opacity": 0.7,
        })));
        let TileSource::Osm(source) = &layer.source else {
            panic!("expected OSM source");
        };
        assert_eq!(source.url, "https://osm.example/{z}/{x}/{y}.png");
        assert_eq!(source.max_zoom, 17);
        assert!(!layer.properties.visible);
        assert_eq!(layer.properties.opacity, 0.7);
    }

    #[test]
    fn bing_layer() {
        let layer = LayerFactory::default().create_bing_layer(&config(json!({
            "type": "BING",
            "accessToken": "bing-key",
            "imagerySet": "Aerial",
            "maxZoom": 19,
        })));
        assert_eq!(
            layer.source,
            TileSource::Bing(BingSource {
                key: Some("bing-key".into()),
                imagery_set: Some("Aerial".into()),
                max_zoom: 19,
            })
        );
    }

    #[test]
    fn vector_layer() {
        let factory = LayerFactory::default();
        let layer = factory
            .create_vector_layer(&config(json!({
                "type": "VECTOR",
                "url": "./data.geojson",
                "format": "GeoJSON",
                "formatConfig": { "featureProjection": "EPSG:3857" },
                "extent": [0.0, 0.0, 10.0, 10.0],
                "hoverable": true,
                "hoverAttribute": "name",
                "style": { "pointRadius": 2.0 },
            })))
            .expect("valid config");

        assert_eq!(
            layer.source.format,
            VectorFormat::GeoJson(GeoJsonFormat {
                feature_projection: Some("EPSG:3857".into()),
                ..Default::default()
            })
        );
        assert_eq!(layer.extent, Some([0.0, 0.0, 10.0, 10.0]));
        assert!(layer.hoverable);
        assert_eq!(layer.hover_attribute.as_deref(), Some("name"));
        assert_eq!(layer.style.and_then(|s| s.point_radius), Some(2.0));
    }

    #[test]
    fn vector_style_falls_back_to_registry() {
        let registry = Arc::new(StyleRegistry::with_defaults());
        let factory = LayerFactory::new(NoStyles, registry.clone());
        let layer = factory
            .get_instance(&config(json!({
                "type": "VECTOR",
                "format": "GeoJSON",
                "style": null,
                "styleRef": "default",
            })))
            .expect("valid config")
            .expect("known type");

        let expected = registry.get(DEFAULT_STYLE).expect("default style");
        let style = layer.style().expect("style is resolved");
        assert!(Arc::ptr_eq(style, &expected));
    }

    #[test]
    fn unknown_format_is_an_error() {
        let factory = LayerFactory::default();
        for layer_type in ["VECTOR", "VECTORTILE"] {
            let result = factory.get_instance(&config(json!({
                "type": layer_type,
                "format": "UNKNOWN",
            })));
            match result {
                Err(LayerFactoryError::UnknownFormat(format)) => assert_eq!(format, "UNKNOWN"),
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }

    #[test]
    fn missing_format_is_an_error() {
        let result = LayerFactory::default().get_instance(&config(json!({ "type": "VECTORTILE" })));
        assert!(matches!(
            result,
            Err(LayerFactoryError::MissingFormat(LayerKind::VectorTile))
        ));
    }

    #[test]
    fn vector_tile_layer_ignores_format_config() {
        let layer = LayerFactory::default()
            .create_vector_tile_layer(&config(json!({
                "type": "VECTORTILE",
                "url": "https://vt.example/{z}/{x}/{y}.pbf",
                "format": "MVT",
                "formatConfig": { "layers": ["roads"] },
                "styleRef": "default",
            })))
            .expect("valid config");

        assert_eq!(
            layer.source.format,
            VectorFormatKind::Mvt.build(None).expect("defaults")
        );
        assert!(layer.style.is_some());
        assert!(!layer.hoverable);
    }

    #[test]
    fn get_instances_skips_unknown_types() {
        let configs = [
            config(json!({ "type": "OSM", "name": "osm" })),
            config(json!({ "type": "WFS", "name": "wfs" })),
            config(json!({ "type": "XYZ", "name": "xyz" })),
        ];
        let layers = LayerFactory::default()
            .get_instances(&configs)
            .expect("valid configs");
        let names: Vec<_> = layers.iter().filter_map(Layer::name).collect();
        assert_eq!(names, vec!["osm", "xyz"]);
    }
}
