//! Identifier spelling for generated code
//!
//! Declared names may be `snake_case`, `kebab-case` or `camelCase`. They are
//! split into words on `_`, `-`, space, `.` and on lowercase→uppercase
//! boundaries, then re-joined in the spelling each emitter needs. Every
//! function here is pure.

/// Split a declared name into its words
pub fn split_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut previous: Option<char> = None;

    for c in name.chars() {
        if matches!(c, '_' | '-' | ' ' | '.') {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            previous = Some(c);
            continue;
        }

        if c.is_uppercase() && previous.is_some_and(char::is_lowercase) && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }

        current.push(c);
        previous = Some(c);
    }

    if !current.is_empty() {
        words.push(current);
    }

    words
}

/// First character uppercased, the rest lowercased
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// `order_approved` → `OrderApproved`
pub fn to_pascal_case(name: &str) -> String {
    split_words(name).iter().map(|w| capitalize(w)).collect()
}

/// `order_approved` → `orderApproved`; only the first character of the pascal form is lowered
pub fn to_camel_case(name: &str) -> String {
    let pascal = to_pascal_case(name);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => pascal,
    }
}

/// `OrderApproved` → `order_approved`
pub fn to_snake_case(name: &str) -> String {
    split_words(name)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}
