//! `{{variable}}` substitution against a data row.

use certforge_template_model::{DataRow, Document, Shape, VariableMapping};

/// Replace tokens of declared, mapped variables with row values.
///
/// A variable whose column is mapped but missing from the row resolves to the
/// empty string. Tokens of undeclared or unmapped variables are kept
/// verbatim. Only complete `{{name}}` tokens match, and inserted values are
/// never scanned for further tokens.
pub fn resolve(
    text: &str,
    declared: &[String],
    mapping: &VariableMapping,
    row: &DataRow,
) -> String {
    let replacements: Vec<(String, &str)> = declared
        .iter()
        .filter_map(|variable| {
            let column = mapping.column_for(variable)?;
            let value = row.get(column).map(String::as_str).unwrap_or("");
            Some((format!("{{{{{variable}}}}}"), value))
        })
        .collect();

    if replacements.is_empty() || !text.contains("{{") {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while !rest.is_empty() {
        if rest.starts_with("{{") {
            if let Some((token, value)) = replacements
                .iter()
                .find(|(token, _)| rest.starts_with(token.as_str()))
            {
                out.push_str(value);
                rest = &rest[token.len()..];
                continue;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}

/// Copy of `document` with every text element resolved against `row`.
pub fn instantiate(document: &Document, mapping: &VariableMapping, row: &DataRow) -> Document {
    let mut instance = document.clone();
    for element in &mut instance.elements {
        if let Shape::Text(text) = &mut element.shape {
            text.text = resolve(&text.text, &document.variables, mapping, row);
        }
    }
    instance
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn row(pairs: &[(&str, &str)]) -> DataRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_hello_name() {
        let mapping: VariableMapping = [("name", "Full Name")].into_iter().collect();
        let out = resolve(
            "Hello {{name}}",
            &vars(&["name"]),
            &mapping,
            &row(&[("Full Name", "Alice")]),
        );
        assert_eq!(out, "Hello Alice");
    }

    #[test]
    fn test_unmapped_and_undeclared_tokens_stay_literal() {
        let mapping: VariableMapping = [("name", "Full Name"), ("role", "Role")]
            .into_iter()
            .collect();
        let out = resolve(
            "{{name}} / {{date}} / {{role}}",
            &vars(&["name", "date"]),
            &mapping,
            &row(&[("Full Name", "Alice"), ("Role", "Mentor")]),
        );
        assert_eq!(out, "Alice / {{date}} / {{role}}");
    }

    #[test]
    fn test_missing_cell_resolves_to_empty() {
        let mapping: VariableMapping = [("name", "Full Name")].into_iter().collect();
        let out = resolve("[{{name}}]", &vars(&["name"]), &mapping, &DataRow::new());
        assert_eq!(out, "[]");
    }

    #[test]
    fn test_substring_variable_names_do_not_collide() {
        let mapping: VariableMapping = [("name", "N"), ("full_name", "F")]
            .into_iter()
            .collect();
        let out = resolve(
            "{{full_name}} ({{name}})",
            &vars(&["name", "full_name"]),
            &mapping,
            &row(&[("N", "Al"), ("F", "Alice Liddell")]),
        );
        assert_eq!(out, "Alice Liddell (Al)");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let mapping: VariableMapping = [("name", "N"), ("date", "D")].into_iter().collect();
        let out = resolve(
            "{{name}} {{date}}",
            &vars(&["name", "date"]),
            &mapping,
            &row(&[("N", "{{date}}"), ("D", "2026-02-27")]),
        );
        assert_eq!(out, "{{date}} 2026-02-27");
    }

    #[test]
    fn test_repeated_tokens_and_unicode() {
        let mapping: VariableMapping = [("name", "Full Name")].into_iter().collect();
        let out = resolve(
            "✓ {{name}}, {{name}}!",
            &vars(&["name"]),
            &mapping,
            &row(&[("Full Name", "Nguyễn Văn A")]),
        );
        assert_eq!(out, "✓ Nguyễn Văn A, Nguyễn Văn A!");
    }
}
