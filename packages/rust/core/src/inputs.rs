//! Pre-flight checks on the user's input files.

use std::path::Path;

use cvtailor_shared::{Result, TailorError};

/// Template text shipped in an unfilled résumé file.
pub const RESUME_PLACEHOLDERS: &[&str] = &[
    "PASTE YOUR RESUME HERE",
    "<!-- REPLACE WITH YOUR RESUME -->",
    "[Your Name]",
    "[Your Contact Information]",
];

/// Template text shipped in an unfilled job posting file.
pub const JOB_POSTING_PLACEHOLDERS: &[&str] = &[
    "PASTE JOB POSTING HERE",
    "<!-- REPLACE WITH JOB POSTING -->",
    "[Job Title]",
    "[Company Name]",
];

/// Read `path` and make sure it holds real content.
///
/// Fails if the file is missing, blank, or still contains one of
/// `placeholders`. Returns the content on success.
pub fn validate_input_file(
    path: &Path,
    description: &str,
    placeholders: &[&str],
) -> Result<String> {
    if !path.exists() {
        return Err(TailorError::validation(format!(
            "{description} not found at {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path).map_err(|e| TailorError::io(path, e))?;
    if content.trim().is_empty() {
        return Err(TailorError::validation(format!("{description} is empty")));
    }

    if let Some(placeholder) = placeholders.iter().find(|p| content.contains(*p)) {
        return Err(TailorError::validation(format!(
            "{description} contains template text '{placeholder}'; replace it with your actual content"
        )));
    }

    Ok(content)
}
