//! Deterministic word wrap and SVG rendering.
//!
//! Wrapping counts characters, not bytes, and assumes a monospaced font:
//! `max_chars_per_line = max_width / avg_char_width`.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::SummaryError;

/// Geometry and styling of the rendered card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgLayout {
    /// Image width in pixels. Default: 480.
    pub max_width: u32,
    /// Assumed width of one monospaced glyph. Default: 10.
    pub avg_char_width: u32,
    /// Left offset of every line. Default: 10.
    pub x: u32,
    /// Baseline of the first line and the step between lines. Default: 20.
    pub line_height: u32,
    pub font_family: String,
    pub font_size: u32,
    pub fill: String,
}

impl Default for SvgLayout {
    fn default() -> Self {
        Self {
            max_width: 480,
            avg_char_width: 10,
            x: 10,
            line_height: 20,
            font_family: "Courier".into(),
            font_size: 14,
            fill: "gray".into(),
        }
    }
}

impl SvgLayout {
    /// Characters that fit on one line; never less than 1.
    pub fn max_chars_per_line(&self) -> usize {
        let per_line = self.max_width / self.avg_char_width.max(1);
        (per_line as usize).max(1)
    }
}

/// Greedy wrap at the last space that keeps a line under `max_chars`.
///
/// While at least `max_chars` characters remain, the line breaks at the last
/// space among the first `max_chars` characters, or hard-breaks at
/// `max_chars` when there is none. One leading space is dropped from what
/// remains. Always returns at least one line.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max = max_chars.max(1);
    let chars: Vec<char> = text.chars().collect();
    let mut lines = Vec::new();
    let mut start = 0;

    while chars.len() - start >= max {
        let window = &chars[start..start + max];
        let split = window.iter().rposition(|&c| c == ' ').unwrap_or(max);
        lines.push(window[..split].iter().collect());
        start += split;
        if chars.get(start) == Some(&' ') {
            start += 1;
        }
    }

    if start < chars.len() || lines.is_empty() {
        lines.push(chars[start..].iter().collect());
    }
    lines
}

/// Escape the five XML special characters.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// Render `text` as an SVG document, one `<text>` element per wrapped line.
pub fn render_svg(text: &str, layout: &SvgLayout) -> String {
    let lines = wrap_text(text, layout.max_chars_per_line());

    let mut body = String::new();
    let mut y = layout.line_height;
    for line in &lines {
        let _ = write!(
            body,
            r#"<text x="{}" y="{y}" font-family="{}" font-size="{}" fill="{}">{}</text>"#,
            layout.x,
            escape_xml(&layout.font_family),
            layout.font_size,
            escape_xml(&layout.fill),
            escape_xml(line),
        );
        y += layout.line_height;
    }

    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{y}">{body}</svg>"#,
        layout.max_width
    )
}

/// Render `text` and write it to `path`.
pub fn write_svg_file(
    text: &str,
    path: impl AsRef<Path>,
    layout: &SvgLayout,
) -> Result<(), SummaryError> {
    std::fs::write(path, render_svg(text, layout))?;
    Ok(())
}
