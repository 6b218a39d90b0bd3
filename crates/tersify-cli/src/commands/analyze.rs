//! `--analyze`: report token-aware opportunities without changing the text.

use anyhow::Result;

use tersify_core::Pipeline;
use tersify_token::reporter::opportunities_display;

/// Number of opportunities shown in the text report.
const TOP: usize = 10;

pub fn execute(pipeline: &Pipeline, text: &str, json: bool) -> Result<()> {
    let opportunities = pipeline.analyze(text);

    if json {
        println!("{}", serde_json::to_string_pretty(&opportunities)?);
        return Ok(());
    }

    eprintln!("Analyzing text for optimization potential...");
    eprint!("\n{}", opportunities_display(&opportunities, TOP));
    Ok(())
}
