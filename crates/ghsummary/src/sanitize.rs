//! Input validation for usernames and output paths.

use tracing::warn;

use crate::error::SummaryError;

/// GitHub's username length limit.
pub const MAX_USERNAME_LEN: usize = 39;

/// Path traversal sequences, raw and URL-encoded, matched case-insensitively.
const TRAVERSAL_PATTERNS: &[&str] = &[
    "../",
    "..\\",
    "%2e%2e%2f",
    "%2e%2e%5c",
    "%252e%252e%255c",
    "%c0%2e",
    "%c0%af",
    "%00",
];

/// Accept `[A-Za-z0-9-]{1,39}`.
pub fn validate_username(username: &str) -> Result<(), SummaryError> {
    if username.is_empty() {
        return Err(invalid("username is empty".into()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(invalid(format!(
            "maximum length of username is {MAX_USERNAME_LEN}: {username}"
        )));
    }
    if let Some(c) = username
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-'))
    {
        return Err(invalid(format!("invalid character in username: {c:?}")));
    }
    Ok(())
}

/// Accept only relative output paths that can't climb out of the working
/// directory.
pub fn validate_output_path(path: &str) -> Result<(), SummaryError> {
    if path.is_empty() {
        return Err(invalid("output file is empty".into()));
    }
    if matches!(path, "/" | "." | "..") {
        return Err(invalid(format!("invalid output file path: {path}")));
    }
    if path.starts_with('/') || path.starts_with('\\') {
        return Err(invalid(format!("absolute path is not allowed: {path}")));
    }
    let lower = path.to_ascii_lowercase();
    if TRAVERSAL_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Err(invalid(format!(
            "path traversal detected in output file: {path}"
        )));
    }
    Ok(())
}

/// Validate both CLI inputs at once.
pub fn validate_inputs(username: &str, output: &str) -> Result<(), SummaryError> {
    validate_username(username)?;
    validate_output_path(output)
}

fn invalid(message: String) -> SummaryError {
    warn!("{message}");
    SummaryError::InvalidInput(message)
}
