//! Error type of the crate.

use thiserror::Error;

use crate::layer::LayerKind;

/// Error that can occur while reading layer configuration or creating a layer.
///
/// Note that an unrecognized layer `type` is not an error: [`LayerFactory::get_instance`](crate::LayerFactory::get_instance)
/// returns `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum LayerFactoryError {
    /// The `format` value of a vector or vector tile layer is not one of the known formats.
    #[error("unknown vector format '{0}'")]
    UnknownFormat(String),

    /// A vector or vector tile layer has no `format` value.
    #[error("{0} layer requires a vector format")]
    MissingFormat(LayerKind),

    /// The `formatConfig` value cannot be used as format options.
    #[error("invalid format options: {0}")]
    FormatConfig(#[source] serde_json::Error),

    /// Layer configuration document is malformed.
    #[error("invalid layer configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Failed to read the configuration file.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Tile url template cannot be expanded.
    #[error("invalid url template: {0}")]
    UrlTemplate(String),

    /// The source does not use a url template (e.g. Bing imagery).
    #[error("source has no url template")]
    NoUrlTemplate,

    /// The source has no url to send requests to.
    #[error("source has no url")]
    MissingUrl,

    /// Source url cannot be parsed.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}
