//! Template documents and their structural operations.
//!
//! A document owns an ordered list of elements. The order is the paint
//! order: index 0 is painted first and ends up at the bottom.

use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementId, Shape};

/// Canvas size in pixels. Becomes the viewport of every export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 500.0,
        }
    }
}

/// A reusable template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Human-readable template title.
    pub title: String,

    /// Declared variable names, in declaration order, without duplicates.
    #[serde(default)]
    pub variables: Vec<String>,

    /// Elements in z-order (bottom first).
    #[serde(default)]
    pub elements: Vec<Element>,

    /// Last edit timestamp (RFC 3339).
    pub last_edited_at: String,

    #[serde(default)]
    pub canvas: CanvasSize,
}

/// Z-order change applied to a single element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReorderOp {
    /// Move to the top of the stack (end of the list).
    ToFront,
    /// Move to the bottom of the stack (index 0).
    ToBack,
    /// Swap with the element directly above.
    Up,
    /// Swap with the element directly below.
    Down,
}

/// Problems reported by [`Document::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentIssue {
    DuplicateElementId(ElementId),
    DuplicateVariable(String),
    UndeclaredToken { element: ElementId, token: String },
    MissingImageData(ElementId),
    NonFiniteGeometry(ElementId),
    UnknownElementKind(ElementId),
}

impl std::fmt::Display for DocumentIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentIssue::DuplicateElementId(id) => write!(f, "duplicate element id '{id}'"),
            DocumentIssue::DuplicateVariable(name) => write!(f, "duplicate variable '{name}'"),
            DocumentIssue::UndeclaredToken { element, token } => {
                write!(f, "element '{element}' uses undeclared token '{{{{{token}}}}}'")
            }
            DocumentIssue::MissingImageData(id) => write!(f, "image '{id}' has no data"),
            DocumentIssue::NonFiniteGeometry(id) => {
                write!(f, "element '{id}' has non-finite geometry")
            }
            DocumentIssue::UnknownElementKind(id) => {
                write!(f, "element '{id}' has an unknown kind and will be skipped")
            }
        }
    }
}

impl Document {
    /// Create an empty document with the given declared variables.
    pub fn new(title: impl Into<String>, variables: &[String]) -> Self {
        let mut document = Self {
            title: title.into(),
            variables: Vec::new(),
            elements: Vec::new(),
            last_edited_at: certforge_common::now_rfc3339(),
            canvas: CanvasSize::default(),
        };
        for variable in variables {
            document.declare_variable(variable);
        }
        document
    }

    pub fn with_canvas(mut self, width: f64, height: f64) -> Self {
        self.canvas = CanvasSize { width, height };
        self
    }

    /// Stamp the document as edited now.
    pub fn touch(&mut self) {
        self.last_edited_at = certforge_common::now_rfc3339();
    }

    pub fn position_of(&self, id: &ElementId) -> Option<usize> {
        self.elements.iter().position(|e| &e.id == id)
    }

    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| &e.id == id)
    }

    pub fn get_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| &e.id == id)
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.position_of(id).is_some()
    }

    /// Append an element at the top of the z-order.
    ///
    /// The element always receives a fresh id that is unique in this document.
    pub fn insert(&mut self, mut element: Element) -> ElementId {
        element.id = ElementId::generate(element.kind());
        while self.contains(&element.id) {
            element.id = ElementId::generate(element.kind());
        }
        let id = element.id.clone();
        self.elements.push(element);
        id
    }

    /// Delete an element, keeping the order of the rest. Unknown ids are ignored.
    pub fn remove(&mut self, id: &ElementId) -> Option<Element> {
        let index = self.position_of(id)?;
        Some(self.elements.remove(index))
    }

    /// Change the z-order of one element.
    ///
    /// Returns whether the sequence changed. Unknown ids and elements already
    /// at the relevant boundary leave the sequence untouched.
    pub fn reorder(&mut self, id: &ElementId, op: ReorderOp) -> bool {
        reorder_elements(&mut self.elements, id, op)
    }

    /// Declare a variable. Names are normalised; returns the stored name, or
    /// `None` when the normalised name is empty or already declared.
    pub fn declare_variable(&mut self, name: &str) -> Option<String> {
        let normalized = normalize_variable_name(name);
        if normalized.is_empty() || self.variables.contains(&normalized) {
            return None;
        }
        self.variables.push(normalized.clone());
        Some(normalized)
    }

    /// Remove a declared variable. Text tokens referencing it are left as is.
    pub fn remove_variable(&mut self, name: &str) -> bool {
        let before = self.variables.len();
        self.variables.retain(|v| v != name);
        before != self.variables.len()
    }

    /// Tokens used in text elements whose variable is not declared.
    pub fn undeclared_tokens(&self) -> Vec<(ElementId, String)> {
        let mut found = Vec::new();
        for element in &self.elements {
            if let Some(text) = element.as_text() {
                for token in tokens_in(&text.text) {
                    if !self.variables.iter().any(|v| v == token) {
                        found.push((element.id.clone(), token.to_string()));
                    }
                }
            }
        }
        found
    }

    /// Structural checks used before exporting or generating.
    pub fn validate(&self) -> Vec<DocumentIssue> {
        let mut issues = Vec::new();

        let mut seen_ids = std::collections::HashSet::new();
        for element in &self.elements {
            if !seen_ids.insert(&element.id) {
                issues.push(DocumentIssue::DuplicateElementId(element.id.clone()));
            }
            if !element.is_finite() {
                issues.push(DocumentIssue::NonFiniteGeometry(element.id.clone()));
            }
            match &element.shape {
                Shape::Image(image) if image.src.trim().is_empty() => {
                    issues.push(DocumentIssue::MissingImageData(element.id.clone()));
                }
                Shape::Unknown => {
                    issues.push(DocumentIssue::UnknownElementKind(element.id.clone()));
                }
                _ => {}
            }
        }

        let mut seen_vars = std::collections::HashSet::new();
        for variable in &self.variables {
            if !seen_vars.insert(variable) {
                issues.push(DocumentIssue::DuplicateVariable(variable.clone()));
            }
        }

        for (element, token) in self.undeclared_tokens() {
            issues.push(DocumentIssue::UndeclaredToken { element, token });
        }

        issues
    }

    /// File stem for single-document exports: whitespace runs become `-`,
    /// lowercased, `design` when the title is blank.
    pub fn export_file_stem(&self) -> String {
        let stem = self
            .title
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
            .to_lowercase();
        if stem.is_empty() {
            "design".to_string()
        } else {
            stem
        }
    }
}

/// Apply a z-order change to an element sequence in place.
pub fn reorder_elements(elements: &mut Vec<Element>, id: &ElementId, op: ReorderOp) -> bool {
    let Some(index) = elements.iter().position(|e| &e.id == id) else {
        return false;
    };
    let last = elements.len() - 1;
    match op {
        ReorderOp::ToFront => {
            if index == last {
                return false;
            }
            let element = elements.remove(index);
            elements.push(element);
        }
        ReorderOp::ToBack => {
            if index == 0 {
                return false;
            }
            let element = elements.remove(index);
            elements.insert(0, element);
        }
        ReorderOp::Up => {
            if index == last {
                return false;
            }
            elements.swap(index, index + 1);
        }
        ReorderOp::Down => {
            if index == 0 {
                return false;
            }
            elements.swap(index, index - 1);
        }
    }
    true
}

/// Normalise a variable name: trimmed, lowercased, anything outside
/// `[a-z0-9_]` replaced with `_`.
pub fn normalize_variable_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Variable names of all `{{name}}` tokens in a text, in order of appearance.
pub fn tokens_in(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        let name = &after[..end];
        if !name.is_empty() && !name.contains("{{") {
            tokens.push(name);
        }
        rest = &after[end + 2..];
    }
    tokens
}
