//! System instructions for the two generation calls.

/// Pronouns used when the caller doesn't supply any.
pub const DEFAULT_PRONOUNS: &str = "he/him";

/// Instruction for per-commit summaries.
pub const COMMIT_SUMMARY_INSTRUCTION: &str =
    "Generate a brief, max 4 sentence summary of commit content.";

/// Instruction for the final activity summary, with the pronouns filled in.
///
/// Missing or empty pronouns fall back to [`DEFAULT_PRONOUNS`]. The output is asked to
/// be a single plain-text paragraph because it is dropped straight into SVG
/// `<text>` elements.
pub fn activity_summary_instruction(pronouns: Option<&str>) -> String {
    let pronouns = pronouns
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_PRONOUNS);
    format!(
        "\
Generate a concise summary (max 10 sentences) of the user's recent GitHub activity based on the provided data.
You can start the summary directly with \"<Username> recently...\".
Use the user's pronouns ({pronouns}) naturally only when needed for sentence structure; do not state the pronouns themselves.
The output must be plain text only, with absolutely no formatting (no markdown, newlines, etc.), suitable for direct use within an SVG <text> element.
Focus on key actions like commits, pull requests, and issues. Avoid any introductory or explanatory text."
    )
}
