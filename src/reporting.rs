// Reporting and output for Reflector
// Dump text blocks, reflect JSON array, and CSV/Markdown file exports

use chrono::Local;
use std::fs::File;
use std::io::{self, Write};

use crate::correlator::{DumpRecord, Reflection};

/// Escape CSV field to prevent formula injection attacks
/// Cells starting with =, +, -, @, or tab are prefixed with single quote
fn escape_csv_field(field: &str) -> String {
    let needs_escaping = matches!(field.chars().next(), Some('=' | '+' | '-' | '@' | '\t'));

    if needs_escaping {
        format!("\"'{}\"", field.replace('"', "\"\""))
    } else if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Write one dump record as `key/value/request` blocks, one per leaf
pub fn write_dump<W: Write>(out: &mut W, record: &DumpRecord) -> io::Result<()> {
    for leaf in &record.leaves {
        write!(
            out,
            "key: {}\nvalue: {}\nrequest: {}\n\n",
            leaf.key, leaf.value, record.request
        )?;
    }
    Ok(())
}

/// Write all reflect results as a single JSON array followed by a newline
pub fn write_reflections<W: Write>(
    out: &mut W,
    results: &[Reflection],
    pretty: bool,
) -> io::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, results)?;
    } else {
        serde_json::to_writer(&mut *out, results)?;
    }
    writeln!(out)
}

pub fn export_csv(results: &[Reflection]) -> Result<String, io::Error> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let filename = format!("reflector_report_{}.csv", timestamp);
    let mut file = File::create(&filename)?;

    writeln!(file, "Method,URL,Key,Value")?;
    for result in results {
        for leaf in &result.xss {
            writeln!(
                file,
                "{},{},{},{}",
                escape_csv_field(&result.method),
                escape_csv_field(&result.url),
                escape_csv_field(&leaf.key.to_string()),
                escape_csv_field(&leaf.value)
            )?;
        }
    }

    Ok(filename)
}

/// Length of the longest run of backticks in `text`
fn longest_backtick_run(text: &str) -> usize {
    text.split(|c: char| c != '`').map(str::len).max().unwrap_or(0)
}

/// Render `text` as an inline code span that cannot be closed early
fn code_span(text: &str) -> String {
    if text.is_empty() {
        return "` `".to_string();
    }
    let fence = "`".repeat(longest_backtick_run(text) + 1);
    let edge = |c: Option<char>| matches!(c, Some('`' | ' '));
    if edge(text.chars().next()) || edge(text.chars().last()) {
        format!("{} {} {}", fence, text, fence)
    } else {
        format!("{}{}{}", fence, text, fence)
    }
}

/// Write a value under a list item; multi-line values get an indented fenced block
fn write_markdown_value<W: Write>(out: &mut W, key: &str, value: &str) -> io::Result<()> {
    if !value.contains(['\n', '\r']) {
        return writeln!(out, "- {}: {}", code_span(key), code_span(value));
    }
    let fence = "`".repeat((longest_backtick_run(value) + 1).max(3));
    writeln!(out, "- {}:", code_span(key))?;
    writeln!(out, "  {}", fence)?;
    for line in value.lines() {
        writeln!(out, "  {}", line)?;
    }
    writeln!(out, "  {}", fence)
}

/// Write the Markdown report body; entries without reflections are skipped
pub fn write_markdown<W: Write>(out: &mut W, results: &[Reflection]) -> io::Result<()> {
    writeln!(out, "# Reflector Report\n")?;
    for result in results.iter().filter(|r| !r.xss.is_empty()) {
        writeln!(out, "## {} {}\n", result.method, result.url)?;
        for leaf in &result.xss {
            write_markdown_value(out, &leaf.key.to_string(), &leaf.value)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn export_markdown(results: &[Reflection]) -> Result<String, io::Error> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let filename = format!("reflector_report_{}.md", timestamp);
    let mut file = File::create(&filename)?;
    write_markdown(&mut file, results)?;
    Ok(filename)
}
