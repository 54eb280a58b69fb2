//! Artifact naming.
//!
//! Names come from the row's id-like and name-like columns, transliterated
//! to ASCII and restricted to `[A-Za-z0-9_-]`. Rows without either fall back
//! to their 1-based position.

use certforge_template_model::DataRow;

use crate::encode::ArtifactKind;

/// File name for the artifact of `row` at `index`.
///
/// `columns` is the table's column order; it decides which column wins when
/// several look like an id or a name.
pub fn name_for(columns: &[String], row: &DataRow, index: usize, kind: ArtifactKind) -> String {
    format!("{}.{}", stem_for(columns, row, index), kind.extension())
}

/// File name without extension.
pub fn stem_for(columns: &[String], row: &DataRow, index: usize) -> String {
    let id = pick_value(columns, row, "id");
    let name = pick_value(columns, row, "name");

    let candidate = match (id, name) {
        (Some(id), Some(name)) => format!("{id}_{name}"),
        (Some(single), None) | (None, Some(single)) => single.to_string(),
        (None, None) => return (index + 1).to_string(),
    };
    sanitize(&candidate)
}

/// Strip diacritics and replace everything outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize(candidate: &str) -> String {
    deunicode::deunicode(candidate)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Value of the best column for `word`: a column named exactly `word` wins,
/// then the first column containing it as a word. Blank cells are skipped.
fn pick_value<'a>(columns: &[String], row: &'a DataRow, word: &str) -> Option<&'a str> {
    // Columns missing from the declared order keep their map order, last.
    let ordered: Vec<&str> = columns
        .iter()
        .map(String::as_str)
        .chain(
            row.keys()
                .map(String::as_str)
                .filter(|key| !columns.iter().any(|c| c == key)),
        )
        .collect();

    let value_of = |column: &str| {
        row.get(column)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    };

    let exact = ordered
        .iter()
        .copied()
        .filter(|column| column_words(column) == [word])
        .find_map(value_of);
    exact.or_else(|| {
        ordered
            .iter()
            .copied()
            .filter(|column| column_words(column).iter().any(|w| w == word))
            .find_map(value_of)
    })
}

/// Lowercased words of a column name, split on punctuation and camelCase.
fn column_words(column: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in column.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_numeric();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}
