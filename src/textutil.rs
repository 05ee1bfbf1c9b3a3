use once_cell::sync::Lazy;
use regex::Regex;

static UNSAFE_FILE_CHAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("unsafe file char"));

/// Replaces every character outside `[A-Za-z0-9._-]` with `_`. An empty
/// result becomes `unknown`.
pub fn sanitize_file_component(raw: &str) -> String {
    let cleaned = UNSAFE_FILE_CHAR_RE.replace_all(raw, "_");
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned.into_owned()
    }
}
