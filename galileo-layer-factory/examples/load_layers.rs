//! Reads a layer configuration file and prints the layers created from it.
//! Run with: cargo run --example load_layers -- path/to/layers.json [path/to/styles.json]

use std::sync::Arc;

use anyhow::Context;
use galileo_layer_factory::style::{JsonStyleFactory, StyleRegistry};
use galileo_layer_factory::{LayerFactory, LayersConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let layers_path = args
        .next()
        .context("usage: load_layers <layers.json> [styles.json]")?;

    let registry = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read styles from {path}"))?;
            StyleRegistry::from_json_str(&json)?
        }
        None => StyleRegistry::with_defaults(),
    };
    log::info!("Registered styles: {:?}", registry.names());

    let config = LayersConfig::from_path(&layers_path)?.normalize();
    let factory = LayerFactory::new(JsonStyleFactory, Arc::new(registry));
    let layers = factory.get_instances(&config.layers)?;

    log::info!(
        "Created {} of {} configured layers",
        layers.len(),
        config.layers.len()
    );

    for layer in &layers {
        log::info!(
            "{} layer {:?} (lid {})",
            layer.kind(),
            layer.name(),
            layer.lid()
        );
    }

    println!("{}", serde_json::to_string_pretty(&layers)?);

    Ok(())
}
