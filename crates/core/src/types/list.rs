//! List-valued input fields (categories, age groups, seasons, occasions).
//!
//! Admin clients send these either as a JSON array or as a single string. The
//! string form is itself ambiguous: multipart forms carry a serialized JSON
//! array (`["Boys","Girls"]`), while hand-written requests use a plain
//! comma-separated list (`Girls,Unisex`). [`ListInput`] captures both shapes
//! and [`ListInput::normalize`] turns either into one canonical sequence.

use serde::{Deserialize, Serialize};

/// A list field as received at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListInput {
    /// Already a list of strings.
    Structured(Vec<String>),
    /// A single string: serialized list syntax, or a comma-separated fallback.
    Delimited(String),
}

impl ListInput {
    /// Normalize into an ordered list of values.
    ///
    /// For the string form a structured parse is tried first; if the text is
    /// not a JSON array of strings it is split on commas. In both forms values
    /// are trimmed, empties dropped and exact duplicates removed, keeping the
    /// first occurrence so the caller's order survives.
    #[must_use]
    pub fn normalize(&self) -> Vec<String> {
        match self {
            Self::Structured(values) => dedup_trimmed(values.iter().map(String::as_str)),
            Self::Delimited(text) => match serde_json::from_str::<Vec<String>>(text.trim()) {
                Ok(values) => dedup_trimmed(values.iter().map(String::as_str)),
                Err(_) => dedup_trimmed(text.split(',')),
            },
        }
    }
}

impl From<Vec<String>> for ListInput {
    fn from(values: Vec<String>) -> Self {
        Self::Structured(values)
    }
}

impl From<&str> for ListInput {
    fn from(text: &str) -> Self {
        Self::Delimited(text.to_owned())
    }
}

fn dedup_trimmed<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values.map(str::trim).filter(|v| !v.is_empty()) {
        if !out.iter().any(|existing| existing == value) {
            out.push(value.to_owned());
        }
    }
    out
}
