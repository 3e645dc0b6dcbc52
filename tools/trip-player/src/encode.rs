use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;
use zurich_transit::format::{BinaryEncoder, Manifest};
use zurich_transit::provider::FallbackDocument;

pub async fn run(input: &Path, output: &Path) -> Result<()> {
    let text = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let document: FallbackDocument = serde_json::from_slice(&text)
        .with_context(|| format!("Invalid trip dataset {}", input.display()))?;

    let mut encoder = BinaryEncoder::new();
    for (i, trip) in document.trips.iter().enumerate() {
        encoder
            .add_renderable(trip)
            .with_context(|| format!("Trip {i} ({}) cannot be encoded", trip.route_short_name))?;
    }
    let file = encoder.finish()?;

    let output_name = output.to_string_lossy();
    let manifest_path = Manifest::url_for(&output_name);

    tokio::fs::write(output, &file.binary)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    tokio::fs::write(&manifest_path, serde_json::to_vec_pretty(&file.manifest)?)
        .await
        .with_context(|| format!("Failed to write {manifest_path}"))?;

    info!(
        trips = document.trips.len(),
        chunks = file.manifest.chunks.len(),
        bytes = file.binary.len(),
        "Wrote {} and {}",
        output.display(),
        manifest_path
    );

    Ok(())
}
