//! `--count-only`: token count without running any stage.

use anyhow::Result;

use tersify_core::Pipeline;
use tersify_token::TokenCount;

pub fn execute(pipeline: &Pipeline, text: &str, json: bool) -> Result<()> {
    if json {
        let count = TokenCount::measure(pipeline.tokenizer().as_ref(), "input", text);
        println!("{}", serde_json::to_string_pretty(&count)?);
    } else {
        println!("{} tokens", pipeline.count_only(text));
    }
    Ok(())
}
