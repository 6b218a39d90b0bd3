//! Terminal output formatting. Everything here goes to stderr.

use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use unicode_width::UnicodeWidthStr;

use tersify_core::{StageHistory, StageResult};

/// Separator between the pipeline header, stage lines and summary.
pub const RULE: &str = "--------------------------------------------------";

/// Print a stage diagnostic line, green on success and red on failure.
pub fn print_stage_line(result: &StageResult) {
    let line = result.diagnostic_line();
    if result.succeeded {
        eprintln!("{}", line.green());
    } else {
        eprintln!("{}", line.red());
    }
}

/// Word-level diff with `[-removed-]` and `{+added+}` markers.
pub fn render_word_diff(before: &str, after: &str) -> String {
    let diff = TextDiff::from_words(before, after);
    let mut out = String::new();
    let mut run = String::new();
    let mut tag = None;

    for change in diff.iter_all_changes() {
        if tag != Some(change.tag()) {
            push_run(&mut out, tag, &run);
            run.clear();
            tag = Some(change.tag());
        }
        run.push_str(change.value());
    }
    push_run(&mut out, tag, &run);

    out
}

fn push_run(out: &mut String, tag: Option<ChangeTag>, run: &str) {
    match tag {
        Some(ChangeTag::Equal) => out.push_str(run),
        Some(ChangeTag::Delete) => {
            out.push_str(&format!("[-{run}-]").red().strikethrough().to_string())
        }
        Some(ChangeTag::Insert) => out.push_str(&format!("{{+{run}+}}").green().to_string()),
        None => {}
    }
}

/// Print one row per stage that ran, plus skipped stages.
pub fn print_stage_table(history: &StageHistory) {
    let width = term_width().min(72);

    eprintln!();
    eprintln!(
        "{}",
        format!(
            "{} {:>8} {:>8} {:>8} {:>8}  {}",
            pad_right("Stage", 16),
            "Input",
            "Output",
            "Saved",
            "Time",
            "Status"
        )
        .bold()
    );
    eprintln!("{}", "─".repeat(width));

    for result in history.results() {
        let status = if result.succeeded {
            "ok".green()
        } else {
            "failed".red()
        };
        eprintln!(
            "{} {:>8} {:>8} {:>8} {:>7.2}s  {}",
            pad_right(&result.stage, 16),
            result.input_tokens,
            result.output_tokens,
            result.tokens_saved(),
            result.elapsed.as_secs_f64(),
            status
        );
    }
    for stage in history.skipped() {
        eprintln!(
            "{} {:>8} {:>8} {:>8} {:>8}  {}",
            pad_right(stage, 16),
            "-",
            "-",
            "-",
            "-",
            "skipped".dimmed()
        );
    }

    eprintln!("{}", "─".repeat(width));
}

/// Get terminal width, defaulting to 80.
fn term_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80)
}

/// Pad a plain string to a given visual width (right-padded).
fn pad_right(s: &str, width: usize) -> String {
    let visual = UnicodeWidthStr::width(s);
    if visual >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - visual))
    }
}
