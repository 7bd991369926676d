//! Prompt templates and sanitisation of user-supplied prompt text

pub mod discovery;
pub mod ma_insights;
pub mod sa_report;

/// Patterns rejected in user-supplied text (prompt injection protection)
pub const DISALLOWED_PATTERNS: [&str; 5] = ["system:", "assistant:", "user:", "{{", "```"];

/// Maximum length of a product name accepted for lookup
pub const MAX_PRODUCT_NAME_LENGTH: usize = 120;

/// Max length of free text interpolated into a prompt (truncated beyond this)
pub const MAX_INTERPOLATED_LEN: usize = 4000;

/// Validates a product name before it is matched or sent to the LLM.
/// Returns the trimmed name with control characters removed.
pub fn sanitize_product_name(name: &str) -> Result<String, String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("productName is required".to_string());
    }

    if trimmed.chars().count() > MAX_PRODUCT_NAME_LENGTH {
        return Err(format!(
            "productName exceeds maximum length of {MAX_PRODUCT_NAME_LENGTH} characters"
        ));
    }

    let lowered = trimmed.to_lowercase();
    if let Some(pattern) = DISALLOWED_PATTERNS.iter().find(|p| lowered.contains(*p)) {
        return Err(format!("productName contains disallowed pattern: {pattern}"));
    }

    Ok(trimmed.chars().filter(|c| !c.is_control()).collect())
}

/// Remove control characters (keeping newlines and tabs) and hard-truncate
/// free text taken from client responses.
pub fn sanitize_interpolated(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .take(MAX_INTERPOLATED_LEN)
        .collect()
}

/// Horizontal rule used to separate prompt sections.
pub(crate) const RULE: &str =
    "═══════════════════════════════════════════════════════════════════════════════";

pub(crate) fn section(title: &str) -> String {
    format!("{RULE}\n{title}\n{RULE}")
}
