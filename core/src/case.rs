//! Key case conventions for attribute and relationship names.

use serde::Deserialize;

/// How attribute keys are rewritten when crossing the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum KeyCase {
    /// Keys are used verbatim.
    #[default]
    #[serde(rename = "asIs", alias = "as-is")]
    AsIs,
    #[serde(rename = "dash-case", alias = "kebab-case", alias = "lisp-case", alias = "spinal-case")]
    DashCase,
    #[serde(rename = "snake_case", alias = "underscore_case")]
    SnakeCase,
    #[serde(rename = "camelCase")]
    CamelCase,
    #[serde(rename = "CamelCase", alias = "PascalCase")]
    PascalCase,
}

impl KeyCase {
    pub fn apply(self, key: &str) -> String {
        match self {
            KeyCase::AsIs => key.to_string(),
            KeyCase::DashCase => words(key).join("-"),
            KeyCase::SnakeCase => words(key).join("_"),
            KeyCase::CamelCase => {
                let mut out = String::with_capacity(key.len());
                for (i, word) in words(key).iter().enumerate() {
                    if i == 0 {
                        out.push_str(word);
                    } else {
                        push_capitalized(&mut out, word);
                    }
                }
                out
            }
            KeyCase::PascalCase => {
                let mut out = String::with_capacity(key.len());
                for word in words(key) {
                    push_capitalized(&mut out, &word);
                }
                out
            }
        }
    }
}

/// Split on `-`, `_`, spaces and lower-to-upper transitions; lowercased.
fn words(key: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in key.chars() {
        if c == '-' || c == '_' || c == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn push_capitalized(out: &mut String, word: &str) {
    let mut chars = word.chars();
    if let Some(first) = chars.next() {
        out.extend(first.to_uppercase());
        out.push_str(chars.as_str());
    }
}
