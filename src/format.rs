//! Textual clause-breaking formatter; not idempotent.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Applied in order. `JOIN` goes first, so by the time the qualified joins
/// are tried the text reads `LEFT \nJOIN` and they no longer match.
static BREAK_BEFORE: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        ("FROM", "\nFROM"),
        ("WHERE", "\nWHERE"),
        ("JOIN", "\nJOIN"),
        ("LEFT JOIN", "\nLEFT JOIN"),
        ("RIGHT JOIN", "\nRIGHT JOIN"),
        ("INNER JOIN", "\nINNER JOIN"),
        ("ORDER BY", "\nORDER BY"),
        ("GROUP BY", "\nGROUP BY"),
        ("HAVING", "\nHAVING"),
        ("SELECT", "SELECT"),
    ]
    .into_iter()
    .map(|(keyword, replacement)| (keyword_pattern(keyword), replacement))
    .collect()
});

fn keyword_pattern(keyword: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(keyword))).unwrap()
}

pub fn format_sql(query: &str) -> String {
    if query.trim().is_empty() {
        return query.to_string();
    }

    let mut formatted = WHITESPACE.replace_all(query, " ").into_owned();
    formatted = formatted.replace(',', ",\n    ");
    for (pattern, replacement) in BREAK_BEFORE.iter() {
        formatted = pattern
            .replace_all(&formatted, regex::NoExpand(replacement))
            .into_owned();
    }
    formatted.trim().to_string()
}
