use std::io::Read as _;
use std::path::Path;

use anyhow::Context as _;
use carsure_assess::parse_ai_response_to_damage_result;
use carsure_core::StructuredDamageResult;

fn read_input(file: &Path) -> anyhow::Result<String> {
    if file == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading reply from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))
}

pub(crate) fn parse_reply(text: &str) -> StructuredDamageResult {
    parse_ai_response_to_damage_result(text, Vec::new())
}

/// Parses a stored model reply without calling any provider and prints the
/// structured result as JSON.
///
/// # Errors
///
/// Returns an error if the input cannot be read.
pub(crate) fn run_parse(file: &Path, pretty: bool) -> anyhow::Result<()> {
    let text = read_input(file)?;
    let result = parse_reply(&text);
    tracing::debug!(mode = ?result.analysis_mode, "parsed reply");

    let output = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{output}");
    Ok(())
}
