//! Multiple-choice extraction from free-form assistant text
//!
//! Questions arrive as plain prose with inline lettered options, e.g.
//! `"Which fits best? A. Lists B) Timers C. Neither"`. The extractor splits
//! that into a stem and at most three options using a positional scan.

use serde::{Deserialize, Serialize};

/// Letters recognized as option markers. Anything past `C` is plain text.
const OPTION_KEYS: [char; 3] = ['A', 'B', 'C'];

/// Maximum number of options a question can carry
pub const MAX_OPTIONS: usize = OPTION_KEYS.len();

/// A selectable answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub key: char,
    pub label: String,
}

impl ChoiceOption {
    pub fn new(key: char, label: impl Into<String>) -> Self {
        Self {
            key,
            label: label.into(),
        }
    }
}

/// Stem and options split out of one utterance
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extracted {
    pub stem: String,
    pub options: Vec<ChoiceOption>,
}

/// Position of a marker like `B.` or `C)` followed by whitespace
#[derive(Debug, Clone, Copy)]
struct Marker {
    key: char,
    /// Byte offset of the letter
    start: usize,
    /// Byte offset just after the `.`/`)` delimiter
    label_start: usize,
}

/// Split `raw` into a question stem and up to three lettered options.
///
/// Never fails: text without markers comes back as the stem with no options.
pub fn extract(raw: &str) -> Extracted {
    let markers = find_markers(raw);

    let Some(first) = markers.first() else {
        return Extracted {
            stem: raw.trim().to_string(),
            options: Vec::new(),
        };
    };

    let (before, _) = raw.split_at(first.start);
    let stem = before.trim().to_string();

    let options = markers
        .iter()
        .enumerate()
        .map(|(i, marker)| {
            let end = markers.get(i + 1).map_or(raw.len(), |next| next.start);
            let label = raw.get(marker.label_start..end).unwrap_or_default();
            ChoiceOption::new(marker.key, clean_label(label))
        })
        .collect();

    Extracted { stem, options }
}

/// Locate option markers in order, keeping at most [`MAX_OPTIONS`].
///
/// Markers after the third are ignored, which leaves their text inside the
/// third option's label.
fn find_markers(text: &str) -> Vec<Marker> {
    let mut markers = Vec::new();
    let mut chars = text.char_indices();

    while let Some((start, c)) = chars.next() {
        if !OPTION_KEYS.contains(&c) {
            continue;
        }
        let mut lookahead = chars.clone();
        let Some((delim_at, delim)) = lookahead.next() else {
            break;
        };
        if delim != '.' && delim != ')' {
            continue;
        }
        let Some((_, space)) = lookahead.next() else {
            break;
        };
        if !space.is_whitespace() {
            continue;
        }

        markers.push(Marker {
            key: c,
            start,
            label_start: delim_at + delim.len_utf8(),
        });
        if markers.len() == MAX_OPTIONS {
            break;
        }
    }

    markers
}

/// Strip bullets and emphasis wrapped around a label
fn clean_label(raw: &str) -> String {
    let mut label = raw.trim();

    // One bullet; a leading `**` is bold, not a bullet
    if !label.starts_with("**") {
        if let Some(rest) = label.strip_prefix(['-', '*']) {
            label = rest.trim_start();
        }
    }

    if label.len() >= 4 {
        if let Some(inner) = label.strip_prefix("**").and_then(|l| l.strip_suffix("**")) {
            label = inner.trim();
        }
    }

    label = label.strip_prefix(['*', '_']).unwrap_or(label);
    label = label.strip_suffix(['*', '_']).unwrap_or(label);

    label.trim().to_string()
}
