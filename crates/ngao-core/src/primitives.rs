//! # Fixed Limits
//!
//! Hardcoded constants for the NGAO engine. These are compiled into the
//! binary and are immutable at runtime.

/// Maximum number of parent hops when walking the admin-unit hierarchy.
///
/// Country → Region → County → Sub-County → Division → Location →
/// Sub-Location → Village is eight levels; the bound leaves headroom and
/// guarantees walks terminate on corrupted parent links.
pub const MAX_HIERARCHY_DEPTH: usize = 16;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for personal and unit names.
pub const MAX_NAME_LENGTH: usize = 120;

/// Maximum length for incident and announcement titles.
pub const MAX_TITLE_LENGTH: usize = 255;

/// Maximum length for descriptions, comments and message bodies.
pub const MAX_TEXT_LENGTH: usize = 16 * 1024;

/// Minimum and maximum number of digits in a phone number.
pub const PHONE_DIGITS_MIN: usize = 7;
pub const PHONE_DIGITS_MAX: usize = 15;

/// Country code assumed for numbers written in the local `0...` form.
pub const DEFAULT_COUNTRY_CODE: &str = "254";

// =============================================================================
// REFERENCE NUMBERS
// =============================================================================

pub const BIRTH_PREFIX: &str = "BIRTH";
pub const DEATH_PREFIX: &str = "DEATH";
pub const MARRIAGE_PREFIX: &str = "MARR";
pub const NATIONAL_ID_PREFIX: &str = "NID";

/// Timestamp layout embedded in reference numbers.
pub const REFERENCE_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Check that `text` is non-blank and at most `max` bytes.
pub(crate) fn bounded(field: &str, text: &str, max: usize) -> Result<(), crate::NgaoError> {
    if text.trim().is_empty() {
        return Err(crate::NgaoError::Validation(format!("{field} is required")));
    }
    if text.len() > max {
        return Err(crate::NgaoError::Validation(format!(
            "{field} length {} exceeds maximum {max}",
            text.len()
        )));
    }
    Ok(())
}

/// Check a phone number: optional leading `+`, then 7 to 15 digits.
pub(crate) fn valid_phone(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    (PHONE_DIGITS_MIN..=PHONE_DIGITS_MAX).contains(&digits.len())
        && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Canonical digits of a phone number, for comparing numbers written in
/// different forms: `+254712345678`, `254712345678` and `0712345678` agree.
pub(crate) fn normalize_phone(phone: &str) -> String {
    let trimmed = phone.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    match digits.strip_prefix('0') {
        Some(local) => format!("{DEFAULT_COUNTRY_CODE}{local}"),
        None => digits.to_string(),
    }
}
