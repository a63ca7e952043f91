//! Naming
//!
//! Identifier construction and the deterministic name transforms that pair a
//! kube-side definition with its ARM counterpart.

use std::collections::HashSet;

use super::{EnumValue, TypeName};

/// Go visibility of a generated identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Exported,
    NotExported,
}

/// Go keywords that cannot be used as identifiers
const RESERVED_WORDS: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else",
    "fallthrough", "for", "func", "go", "goto", "if", "import", "interface",
    "map", "package", "range", "return", "select", "struct", "switch", "type", "var",
];

/// Creates identifiers for generated code
#[derive(Debug, Clone)]
pub struct IdentifierFactory {
    acronyms: HashSet<String>,
}

impl Default for IdentifierFactory {
    fn default() -> Self {
        Self::new(["ID", "URL", "URI", "API", "JSON", "HTTP", "IP"].iter().map(|s| s.to_string()))
    }
}

impl IdentifierFactory {
    pub fn new(acronyms: impl IntoIterator<Item = String>) -> Self {
        Self {
            acronyms: acronyms.into_iter().map(|a| a.to_uppercase()).collect(),
        }
    }

    /// Build an identifier from a name or name hint.
    ///
    /// Exported identifiers are PascalCase; unexported ones are camelCase with
    /// a trailing underscore when they would collide with a keyword.
    pub fn create_identifier(&self, name: &str, visibility: Visibility) -> String {
        let words = split_words(name);
        let mut result = String::with_capacity(name.len());

        for (i, word) in words.iter().enumerate() {
            let upper = word.to_uppercase();
            if i == 0 && visibility == Visibility::NotExported {
                result.push_str(&word.to_lowercase());
            } else if self.acronyms.contains(&upper) {
                result.push_str(&upper);
            } else {
                result.push_str(&capitalize(word));
            }
        }

        if visibility == Visibility::NotExported && RESERVED_WORDS.contains(&result.as_str()) {
            result.push('_');
        }
        result
    }
}

/// Split on separators and lower-to-upper case transitions, keeping acronym runs together
fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_ascii_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map(|n| n.is_ascii_lowercase()).unwrap_or(false);
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => {
            first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
        }
    }
}

/// ARM counterpart of a kube-side type: same package, suffixed name
pub fn arm_type_name(name: &TypeName, suffix: &str) -> TypeName {
    name.with_name(format!("{}{}", name.name, suffix))
}

/// Does this name look like an ARM counterpart?
pub fn is_arm_type_name(name: &TypeName, suffix: &str) -> bool {
    !suffix.is_empty() && name.name.len() > suffix.len() && name.name.ends_with(suffix)
}

/// Generated constant identifier for an enum option: `{EnumName}{Option}`
pub fn enum_value_id(enum_name: &str, option: &EnumValue) -> String {
    format!("{}{}", enum_name, option.identifier)
}

/// Base file name for a definition (snake_case)
pub fn file_name_hint(name: &TypeName) -> String {
    split_words(&name.name)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}
