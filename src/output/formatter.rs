use std::io::IsTerminal;
use owo_colors::OwoColorize;
use terminal_size::{Width, terminal_size};

use crate::scoring::{Level, ScoreAxis, ScoreResult, MODEL_KEY};

const AXES: [ScoreAxis; 4] = [
    ScoreAxis::Total,
    ScoreAxis::Gender,
    ScoreAxis::Race,
    ScoreAxis::Age,
];

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format a score with four decimals, or "-" when the axis is absent
pub fn format_score(score: Option<f64>) -> String {
    match score {
        Some(score) => format!("{:.4}", score),
        None => "-".to_string(),
    }
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate text to fit available width, counting chars not bytes
fn truncate_key(key: &str, max_width: usize) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= max_width {
        key.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

fn header(use_colors: bool) -> String {
    let line = format!(
        "{:<9}{:>8}  {:>8}  {:>8}  {:>8}",
        "metric", "total", "gender", "race", "age"
    );
    if use_colors {
        line.dimmed().to_string()
    } else {
        line
    }
}

/// One line per metric with its model-level score on every axis it reports.
pub fn format_summary(results: &[ScoreResult], use_colors: bool) -> String {
    if results.is_empty() {
        return "No scores computed.".to_string();
    }

    let mut lines = vec![header(use_colors)];
    for result in results {
        let cells: Vec<String> = AXES
            .iter()
            .map(|&axis| {
                let cell = format!(
                    "{:>8}",
                    format_score(result.get(Level::Model, MODEL_KEY, axis))
                );
                if use_colors && axis == ScoreAxis::Total {
                    cell.bold().to_string()
                } else {
                    cell
                }
            })
            .collect();

        let name = format!("{:<9}", result.metric.as_str());
        let name = if use_colors {
            name.cyan().to_string()
        } else {
            name
        };
        lines.push(format!("{}{}", name, cells.join("  ")));
    }
    lines.join("\n")
}

/// Entries of one level as a table: index, four score columns, entity key.
/// Rows are sorted by total score, highest first.
pub fn format_level(result: &ScoreResult, level: Level, use_colors: bool) -> String {
    let entries = match result.level(level) {
        Some(entries) if !entries.is_empty() => entries,
        _ => {
            return format!(
                "No {} scores at the {} level.",
                result.metric,
                level.as_str()
            )
        }
    };

    let mut rows: Vec<_> = entries.iter().collect();
    rows.sort_by(|a, b| {
        let total = |scores: &indexmap::IndexMap<ScoreAxis, f64>| {
            scores.get(&ScoreAxis::Total).copied().unwrap_or(f64::NEG_INFINITY)
        };
        total(b.1).total_cmp(&total(a.1))
    });

    let term_width = get_terminal_width();
    let index_width = format!("{}.", rows.len()).len();
    let score_width = 8;
    let separator = "  ";
    let fixed_width = index_width + 1 + (score_width + separator.len()) * AXES.len();

    rows.iter()
        .enumerate()
        .map(|(idx, (key, scores))| {
            let index_str = format!("{:>width$}", format!("{}.", idx + 1), width = index_width);
            let cells: Vec<String> = AXES
                .iter()
                .map(|axis| format!("{:>width$}", format_score(scores.get(axis).copied()), width = score_width))
                .collect();

            let key = if let Some(width) = term_width {
                if width > fixed_width + 10 {
                    truncate_key(key, width - fixed_width)
                } else {
                    truncate_key(key, 20)
                }
            } else {
                // Pipe: keep full key
                key.to_string()
            };

            if use_colors {
                format!(
                    "{} {}{}{}{}{}",
                    index_str.dimmed(),
                    cells[0].bold(),
                    separator,
                    cells[1..].join(separator),
                    separator,
                    key.cyan()
                )
            } else {
                format!(
                    "{} {}{}{}{}{}",
                    index_str,
                    cells[0],
                    separator,
                    cells[1..].join(separator),
                    separator,
                    key
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Tab-separated rows for scripting: key, total, gender, race, age.
/// Absent axes are empty fields. No headers, no colors.
pub fn format_tsv(result: &ScoreResult, level: Level) -> String {
    let Some(entries) = result.level(level) else {
        return String::new();
    };

    entries
        .iter()
        .map(|(key, scores)| {
            let mut fields = vec![key.clone()];
            fields.extend(
                AXES.iter()
                    .map(|axis| scores.get(axis).map(|v| v.to_string()).unwrap_or_default()),
            );
            fields.join("\t")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
