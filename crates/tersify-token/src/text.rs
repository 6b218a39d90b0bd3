//! Small text helpers shared by the replacement stages.

/// Collapse whitespace runs to one space, drop whitespace in front of
/// `, . ! ? ; :` and trim both ends.
///
/// Deleting a phrase leaves its surrounding spaces behind; this is the
/// cleanup that follows every replacement pass.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() && !is_tight_punctuation(c) {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }

    out
}

fn is_tight_punctuation(c: char) -> bool {
    matches!(c, ',' | '.' | '!' | '?' | ';' | ':')
}

/// True when `s` has at least one cased character and none in lower case.
pub fn is_all_upper(s: &str) -> bool {
    s.chars().any(char::is_uppercase) && !s.chars().any(char::is_lowercase)
}

/// True when the first character of `s` is upper case.
pub fn starts_upper(s: &str) -> bool {
    s.chars().next().is_some_and(char::is_uppercase)
}

/// Upper-case the first character, leave the rest alone.
pub fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Upper-case the first character and lower-case the rest.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Adapt `replacement` to the case of the text it replaces.
///
/// Single-character replacements (mostly symbols) are never adjusted.
pub fn match_case(matched: &str, replacement: &str) -> String {
    if replacement.chars().count() <= 1 {
        return replacement.to_string();
    }
    if is_all_upper(matched) {
        replacement.to_uppercase()
    } else if starts_upper(matched) {
        upper_first(replacement)
    } else {
        replacement.to_string()
    }
}
