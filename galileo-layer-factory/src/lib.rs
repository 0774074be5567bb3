//! Creates map layers from declarative layer configuration.
//!
//! Applications usually describe their map layers in a configuration file rather than in code. This crate reads
//! such descriptions ([`LayerConfig`]) and turns them into [`Layer`] values a renderer can display: WMS image
//! layers, raster tile layers (XYZ, OpenStreetMap, Bing Maps), vector layers and vector tile layers with
//! MVT, GeoJSON, TopoJSON or KML data.
//!
//! # Quick start
//!
//! ```no_run
//! use galileo_layer_factory::{LayerFactory, LayersConfig};
//!
//! let config = LayersConfig::from_path("layers.json")
//!     .expect("failed to read config")
//!     .normalize();
//!
//! let factory = LayerFactory::default();
//! let layers = factory
//!     .get_instances(&config.layers)
//!     .expect("invalid layer config");
//!
//! for layer in &layers {
//!     println!("{} {:?}", layer.kind(), layer.name());
//! }
//! ```
//!
//! # Main components
//!
//! * [`LayerConfig`] is the configuration record of a layer. Call [`LayerConfig::normalize`] once to assign the
//!   layer identifier before creating layers.
//! * [`LayerFactory`] dispatches on the `type` field and creates the layer with its [`source`](layer::source).
//! * [`style`] contains the style model and the two step style resolution of vector layers.
//! * [`format`] is the closed set of vector formats.

pub mod config;
pub mod error;
mod factory;
pub mod format;
pub mod layer;
pub mod style;
pub mod tile_index;

pub use config::{Attributions, LayerConfig, LayersConfig, Lid};
pub use error::LayerFactoryError;
pub use factory::LayerFactory;
pub use layer::{Layer, LayerKind, LayerProperties};
pub use tile_index::TileIndex;
