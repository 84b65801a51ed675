//! Taxonomy token and numeric input parsing
//!
//! 自由文本输入统一在这里拆分：按分隔符切分、trim、去空、按首次出现去重。

/// Separators for type / sealing / status inputs: `,` `\n` `/` `|` `、`
pub const LIST_SEPARATORS: &[char] = &[',', '\n', '/', '|', '、'];

/// Separators for damage inputs: `,` `\n` `|` `／` `、` (ASCII `/` is part of damage labels)
pub const DAMAGE_SEPARATORS: &[char] = &[',', '\n', '|', '／', '、'];

/// Split, trim, drop empties and de-duplicate in first-seen order
pub fn tokenize(raw: &str, separators: &[char]) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for token in raw.split(|c| separators.contains(&c)).map(str::trim) {
        if !token.is_empty() && !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }
    tokens
}

pub fn parse_types_input(raw: &str) -> Vec<String> {
    tokenize(raw, LIST_SEPARATORS)
}

pub fn parse_sealing_input(raw: &str) -> Vec<String> {
    tokenize(raw, LIST_SEPARATORS)
}

pub fn parse_damages_input(raw: &str) -> Vec<String> {
    tokenize(raw, DAMAGE_SEPARATORS)
}

pub fn parse_status_tokens(raw: &str) -> Vec<String> {
    tokenize(raw, LIST_SEPARATORS)
}

/// Multiset equality: `["a","b"]` equals `["b","a"]`, `["a","a"]` does not equal `["a"]`
pub fn tokens_equal<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut left: Vec<&str> = a.iter().map(AsRef::as_ref).collect();
    let mut right: Vec<&str> = b.iter().map(AsRef::as_ref).collect();
    left.sort_unstable();
    right.sort_unstable();
    left == right
}

/// Parse a numeric form input: commas removed, trimmed
///
/// Empty input and non-finite values yield `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Numeric input as compared by the diff engine
///
/// Empty → `Some(0.0)`; unparseable → `None`, which never equals a stored value.
pub fn diff_number(raw: &str) -> Option<f64> {
    if raw.trim().is_empty() {
        Some(0.0)
    } else {
        parse_number(raw)
    }
}

/// Render a stored number the way it is shown in a draft field
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
