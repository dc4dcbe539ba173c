//! Name comparison, and validation of ids that become path components.
//!
//! Namespace ids, element-type ids and element ids name directories and
//! files on disk. A valid id:
//! - Must be non-empty
//! - Must not contain `/`, `\` or control characters (including NUL)
//! - Must not be `.` or `..`
//! - Must not start with `.` (hidden entries are skipped by listings)
//! - Must not start or end with whitespace

use crate::error::TypeError;

/// Validate an id, returning `Ok(())` if it can be used as a path component.
///
/// `kind` names what the id identifies and only appears in the error.
///
/// # Examples
///
/// ```
/// use metastore_types::validate_id;
///
/// assert!(validate_id("namespace", "pentaho").is_ok());
/// assert!(validate_id("element", "Customer Dimension").is_ok());
/// assert!(validate_id("element", "").is_err());
/// assert!(validate_id("element", "../etc").is_err());
/// ```
pub fn validate_id(kind: &'static str, id: &str) -> Result<(), TypeError> {
    let invalid = |reason: &str| TypeError::InvalidName {
        kind,
        name: id.to_string(),
        reason: reason.to_string(),
    };

    if id.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if id == "." || id == ".." {
        return Err(invalid("must not be a relative path"));
    }
    if id.starts_with('.') {
        return Err(invalid("must not start with '.'"));
    }
    if id.contains(|c: char| c == '/' || c == '\\') {
        return Err(invalid("must not contain path separators"));
    }
    if id.chars().any(char::is_control) {
        return Err(invalid("must not contain control characters"));
    }
    if id.starts_with(char::is_whitespace) || id.ends_with(char::is_whitespace) {
        return Err(invalid("must not start or end with whitespace"));
    }
    Ok(())
}

/// Case-insensitive name comparison, as used by lookups by name.
///
/// Compares full Unicode lowercase forms, so `"Äpfel"` matches `"äpfel"`.
pub fn names_match(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}
