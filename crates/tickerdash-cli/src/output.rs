use serde_json::Value;

use crate::cli::OutputFormat;
use crate::commands::CommandOutput;
use crate::error::CliError;

/// Column-aligned rows for `--format table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<&'static str>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Key/value table from pairs.
    pub fn pairs(pairs: impl IntoIterator<Item = (&'static str, String)>) -> Self {
        let mut table = Self::new(vec!["field", "value"]);
        for (key, value) in pairs {
            table.push(vec![key.to_owned(), value]);
        }
        table
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| display_width(h)).collect();
        for row in &self.rows {
            for (index, cell) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(index) {
                    *width = (*width).max(display_width(cell));
                }
            }
        }
        widths
    }

    pub fn to_lines(&self) -> Vec<String> {
        let widths = self.widths();
        let line = |cells: Vec<&str>| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| {
                    let pad = width.saturating_sub(display_width(cell));
                    format!("{cell}{}", " ".repeat(pad))
                })
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_owned()
        };

        let mut lines = vec![line(self.headers.clone())];
        lines.push(
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("  "),
        );
        for row in &self.rows {
            lines.push(line(row.iter().map(String::as_str).collect()));
        }
        lines
    }
}

/// Hangul and other wide characters take two terminal columns.
fn display_width(text: &str) -> usize {
    text.chars()
        .map(|ch| match ch as u32 {
            0x1100..=0x115F | 0x2E80..=0xA4CF | 0xAC00..=0xD7A3 | 0xF900..=0xFAFF | 0xFF00..=0xFF60 => 2,
            _ => 1,
        })
        .sum()
}

pub fn render(output: &CommandOutput, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(&output.envelope)?
            } else {
                serde_json::to_string(&output.envelope)?
            };
            println!("{payload}");
        }
        OutputFormat::Table => render_table(output)?,
    }
    Ok(())
}

fn render_table(output: &CommandOutput) -> Result<(), CliError> {
    let envelope = &output.envelope;
    println!("request_id  : {}", envelope.meta.request_id);
    println!("generated_at: {}", envelope.meta.generated_at);
    println!("source      : {}", envelope.meta.source);
    println!("latency_ms  : {}", envelope.meta.latency_ms);
    println!("cache_hit   : {}", envelope.meta.cache_hit);

    if !envelope.meta.warnings.is_empty() {
        println!("warnings:");
        for warning in &envelope.meta.warnings {
            println!("  - {warning}");
        }
    }

    match (&output.table, &envelope.data) {
        (Some(table), _) => {
            println!();
            for line in table.to_lines() {
                println!("{line}");
            }
        }
        (None, Value::Null) => {}
        (None, data) => {
            println!("data:");
            for line in serde_json::to_string_pretty(data)?.lines() {
                println!("  {line}");
            }
        }
    }

    if !envelope.errors.is_empty() {
        println!("errors:");
        for error in &envelope.errors {
            println!("  - {}: {}", error.code, error.message);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligns_columns_with_wide_characters() {
        let mut table = Table::new(vec!["symbol", "name"]);
        table.push(vec![String::from("005930.KS"), String::from("삼성전자")]);
        table.push(vec![String::from("AAPL"), String::from("Apple")]);

        let lines = table.to_lines();
        assert_eq!(lines[0], "symbol     name");
        assert_eq!(lines[1], "---------  --------");
        assert_eq!(lines[2], "005930.KS  삼성전자");
        assert_eq!(lines[3], "AAPL       Apple");
    }
}
