/// Strips invisible characters that spreadsheet exports like to leave behind and
/// collapses runs of whitespace.
pub(crate) fn clean_text(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-insensitive form used when matching category labels against score tables.
pub(crate) fn normalize_label(value: &str) -> String {
    clean_text(value).to_ascii_lowercase()
}

/// Header keys collapse to snake case so `First Name`, `first-name` and
/// `FIRST_NAME` all land on `first_name`.
pub(crate) fn normalize_key(value: &str) -> String {
    normalize_label(value)
        .chars()
        .map(|ch| match ch {
            ' ' | '-' => '_',
            other => other,
        })
        .collect()
}
