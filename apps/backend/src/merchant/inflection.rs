//! Key naming conventions for merchant request and response bodies.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Convention a merchant expects for request keys. Responses are always
/// normalised to snake case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCase {
    Camel,
    CapitalCamel,
    #[default]
    Snake,
}

impl KeyCase {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyCase::Camel => "camel",
            KeyCase::CapitalCamel => "capital_camel",
            KeyCase::Snake => "snake",
        }
    }

    /// Render a snake_case key in this convention.
    pub fn apply(self, snake_key: &str) -> String {
        match self {
            KeyCase::Snake => snake_key.to_string(),
            KeyCase::CapitalCamel => capitalize_words(snake_key, true),
            KeyCase::Camel => capitalize_words(snake_key, false),
        }
    }
}

fn capitalize_words(snake_key: &str, capitalize_first: bool) -> String {
    let mut out = String::with_capacity(snake_key.len());
    for (idx, word) in snake_key.split('_').filter(|w| !w.is_empty()).enumerate() {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if idx == 0 && !capitalize_first {
                out.extend(first.to_lowercase());
            } else {
                out.extend(first.to_uppercase());
            }
            out.push_str(chars.as_str());
        }
    }
    out
}

/// `totalBalance` / `TotalBalance` / `total_balance` -> `total_balance`.
pub fn to_snake(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_lower_or_digit = false;
    for ch in key.chars() {
        if ch == '-' || ch == ' ' {
            out.push('_');
            prev_lower_or_digit = false;
            continue;
        }
        if ch.is_uppercase() {
            if prev_lower_or_digit {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower_or_digit = false;
        } else {
            out.push(ch);
            prev_lower_or_digit = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

/// Rename the top-level keys of a snake_case request body.
pub fn inflect_request(body: Map<String, Value>, case: KeyCase) -> Map<String, Value> {
    if case == KeyCase::Snake {
        return body;
    }
    body.into_iter().map(|(k, v)| (case.apply(&k), v)).collect()
}

/// Normalise the top-level keys of a merchant response to snake case.
pub fn normalize_response(body: Map<String, Value>) -> Map<String, Value> {
    body.into_iter().map(|(k, v)| (to_snake(&k), v)).collect()
}
