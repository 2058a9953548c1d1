use std::path::Path;

use anyhow::Context as _;
use carsure_assess::AnalysisPipeline;
use carsure_core::AppConfig;

/// Runs one image through the analysis pipeline and prints the structured
/// result. Nothing is persisted.
///
/// # Errors
///
/// Returns an error if the image cannot be read, the pipeline cannot be
/// built, or the provider fails for a reason other than quota.
pub(crate) async fn run_analyze(
    config: &AppConfig,
    image: &Path,
    show_raw: bool,
) -> anyhow::Result<()> {
    let bytes = std::fs::read(image).with_context(|| format!("reading {}", image.display()))?;
    let filename = image
        .file_name()
        .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());

    let pipeline = AnalysisPipeline::from_config(config)?;
    let outcome = pipeline.analyze(&bytes, &filename).await?;

    if show_raw {
        eprintln!("{}", outcome.raw_analysis);
    }
    if outcome.structured.demo_mode {
        eprintln!("warning: provider quota exhausted; result is demo data");
    }
    println!("{}", serde_json::to_string_pretty(&outcome.structured)?);
    Ok(())
}
