//! Styles of vector layers.
//!
//! A vector layer gets its style in two steps (see [`resolve_style`]):
//!
//! 1. the inline `style` specification of the layer configuration is given to a [`StyleFactory`];
//! 2. if that produces nothing, the style registered under `styleRef` in the [`StyleRegistry`] is used.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::LayerFactoryError;

/// Name of the style that [`StyleRegistry::with_defaults`] registers.
pub const DEFAULT_STYLE: &str = "default";

/// Error parsing a color string.
#[derive(Debug, Error)]
#[error("invalid color '{0}', expected #rrggbb or #rrggbbaa")]
pub struct ColorParseError(String);

/// RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    /// Opaque white.
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    /// Opaque blue.
    pub const BLUE: Color = Color::rgba(0, 0, 255, 255);

    /// Creates a new color.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Returns the color as `[r, g, b, a]`.
    pub fn to_u8_array(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Alpha channel.
    pub fn a(&self) -> u8 {
        self.a
    }

    /// Returns the same color with a different alpha channel.
    pub fn with_alpha(&self, a: u8) -> Self {
        Self { a, ..*self }
    }

    /// Parses `#rrggbb` or `#rrggbbaa`.
    pub fn try_from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let err = || ColorParseError(hex.to_string());
        let digits = hex.strip_prefix('#').ok_or_else(err)?;
        if !digits.is_ascii() || (digits.len() != 6 && digits.len() != 8) {
            return Err(err());
        }

        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| err());
        let a = if digits.len() == 8 { channel(6)? } else { 255 };

        Ok(Self::rgba(channel(0)?, channel(2)?, channel(4)?, a))
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_string()
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }

        Ok(())
    }
}

/// Line style.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    /// Line color.
    pub color: Color,
    /// Line width in pixels.
    #[serde(default = "default_stroke_width")]
    pub width: f32,
}

fn default_stroke_width() -> f32 {
    1.0
}

/// Style of the features of a vector layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Style {
    /// Polygon and point fill.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<Color>,
    /// Outline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke: Option<StrokeStyle>,
    /// Radius of point symbols in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_radius: Option<f32>,
    /// Feature attribute rendered as label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_attribute: Option<String>,
    /// Style used for hovered features.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover: Option<Box<Style>>,
}

/// Creates styles from inline style specifications.
pub trait StyleFactory {
    /// Returns the style for the given specification, or `None` if the specification does not describe a style.
    fn create(&self, spec: &Value) -> Option<Arc<Style>>;
}

/// Style factory that reads the specification as a JSON-serialized [`Style`].
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonStyleFactory;

impl StyleFactory for JsonStyleFactory {
    fn create(&self, spec: &Value) -> Option<Arc<Style>> {
        if spec.is_null() {
            return None;
        }

        match Style::deserialize(spec) {
            Ok(style) => Some(Arc::new(style)),
            Err(err) => {
                log::warn!("Ignoring invalid style specification: {err}");
                None
            }
        }
    }
}

/// Named style definitions.
#[derive(Debug, Default)]
pub struct StyleRegistry {
    styles: RwLock<AHashMap<String, Arc<Style>>>,
}

impl StyleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry containing the [`DEFAULT_STYLE`].
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(
            DEFAULT_STYLE,
            Style {
                fill: Some(Color::rgba(255, 255, 255, 102)),
                stroke: Some(StrokeStyle {
                    color: Color::rgba(51, 153, 204, 255),
                    width: 1.25,
                }),
                point_radius: Some(5.0),
                label_attribute: None,
                hover: Some(Box::new(Style {
                    stroke: Some(StrokeStyle {
                        color: Color::rgba(255, 0, 0, 255),
                        width: 2.0,
                    }),
                    ..Default::default()
                })),
            },
        );

        registry
    }

    /// Reads style definitions from a JSON object mapping names to styles.
    pub fn from_json_str(json: &str) -> Result<Self, LayerFactoryError> {
        let styles: HashMap<String, Style> = serde_json::from_str(json)?;
        let registry = Self::new();
        for (name, style) in styles {
            registry.register(name, style);
        }

        Ok(registry)
    }

    /// Adds a style. A style with the same name is replaced.
    pub fn register(&self, name: impl Into<String>, style: impl Into<Arc<Style>>) {
        let name = name.into();
        if self.styles.write().insert(name.clone(), style.into()).is_some() {
            log::debug!("Style '{name}' replaced");
        }
    }

    /// Returns the style with the given name.
    pub fn get(&self, name: &str) -> Option<Arc<Style>> {
        self.styles.read().get(name).cloned()
    }

    /// Checks if a style with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.styles.read().contains_key(name)
    }

    /// Names of all registered styles, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.styles.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Resolves the style of a vector layer.
///
/// The inline `style` specification wins if the factory produces a style from it. Otherwise the registry entry
/// named by `style_ref` is returned.
pub fn resolve_style(
    factory: &dyn StyleFactory,
    registry: &StyleRegistry,
    style: Option<&Value>,
    style_ref: Option<&str>,
) -> Option<Arc<Style>> {
    if let Some(style) = style.and_then(|spec| factory.create(spec)) {
        return Some(style);
    }

    let name = style_ref?;
    let style = registry.get(name);
    if style.is_none() {
        log::warn!("Style '{name}' is not registered");
    }

    style
}
