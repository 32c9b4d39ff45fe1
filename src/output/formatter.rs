use std::io::IsTerminal;
use owo_colors::OwoColorize;
use terminal_size::{terminal_size, Width};

use crate::index::{CorpusResults, IndexResult, IndexValue};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format an index value for display. Signed notation for bipolar ranges,
/// plain for [0, 1]; the no-data sentinel renders as words, never 0.0.
pub fn format_value(result: &IndexResult) -> String {
    match result.value {
        IndexValue::NoData => "no data".to_string(),
        IndexValue::Value(v) => {
            if result.range.min < 0.0 {
                format!("{:+.3}", v)
            } else {
                format!("{:.3}", v)
            }
        }
    }
}

fn format_range(result: &IndexResult) -> String {
    format!("[{}, {}]", result.range.min, result.range.max)
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

fn truncate_line(line: &str, max_width: usize) -> String {
    let chars: Vec<char> = line.chars().collect();
    if chars.len() <= max_width {
        line.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// Format computed indices as an aligned table, one line per index:
/// name, value, range, evidence counts.
pub fn format_results_table(results: &CorpusResults, use_colors: bool) -> String {
    if results.results.is_empty() {
        return "No indices computed.".to_string();
    }

    let name_width = results
        .results
        .iter()
        .map(|result| result.name.chars().count())
        .max()
        .unwrap_or(0);

    results
        .results
        .iter()
        .map(|result| {
            let value_str = format!("{:>8}", format_value(result));
            let counts = format!(
                "n={} excluded={}",
                result.counts.mentions, result.counts.excluded
            );
            let name = format!("{:<width$}", result.name, width = name_width);
            if use_colors {
                let value_colored = if result.value.is_no_data() {
                    value_str.yellow().to_string()
                } else {
                    value_str.bold().to_string()
                };
                format!(
                    "{}  {}  {}  {}",
                    name,
                    value_colored,
                    format_range(result).dimmed(),
                    counts.dimmed()
                )
            } else {
                format!("{}  {}  {}  {}", name, value_str, format_range(result), counts)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Multi-line detail for one index (verbose mode): evidence counts plus
/// per-category and per-group tallies, sorted by count.
pub fn format_index_detail(result: &IndexResult, use_colors: bool) -> String {
    let mut lines = Vec::new();

    let header = format!(
        "{}: {} {}",
        result.name,
        format_value(result),
        format_range(result)
    );
    if use_colors {
        lines.push(header.bold().to_string());
    } else {
        lines.push(header);
    }

    lines.push(format!(
        "  records: {} contributing, {} excluded",
        result.counts.contributing, result.counts.excluded
    ));
    lines.push(format!("  mentions: {}", result.counts.mentions));

    if !result.counts.by_category.is_empty() {
        lines.push(fit_width(&format!(
            "  categories: {}",
            format_tallies(&result.counts.by_category)
        )));
    }
    if !result.counts.groups.is_empty() {
        lines.push(fit_width(&format!(
            "  groups: {}",
            format_tallies(&result.counts.groups)
        )));
    }

    lines.join("\n")
}

fn fit_width(line: &str) -> String {
    match get_terminal_width() {
        Some(width) if width > 20 => truncate_line(line, width),
        _ => line.to_string(),
    }
}

/// Render tallies largest-first, e.g. "CONFIDENT: 64, NEUTRAL: 41".
fn format_tallies(tallies: &std::collections::BTreeMap<String, usize>) -> String {
    let mut entries: Vec<(&String, &usize)> = tallies.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    entries
        .into_iter()
        .map(|(label, count)| format!("{}: {}", label, count))
        .collect::<Vec<_>>()
        .join(", ")
}
