/// Sentinel a select control uses for "no constraint".
pub const ALL: &str = "all";

/// Normalizes a user-selected filter value.
///
/// Returns `None` for the `all` sentinel (any ASCII case) and for blank input;
/// otherwise the trimmed value. Callers treat `None` as "key unset", so the
/// sentinel never reaches a query string.
pub fn normalize_choice(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL) {
        None
    } else {
        Some(trimmed)
    }
}

/// Builds `(name, value)` query pairs, dropping unset entries.
pub fn query_pairs<'a>(
    entries: impl IntoIterator<Item = (&'static str, Option<&'a str>)>,
) -> Vec<(&'static str, String)> {
    entries
        .into_iter()
        .filter_map(|(name, value)| normalize_choice(value?).map(|v| (name, v.to_string())))
        .collect()
}
