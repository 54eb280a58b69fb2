//! Editing façade over a document.
//!
//! All element mutations go through [`Editor`], which records each resulting
//! element list in the undo history. Drag gestures are coalesced: the first
//! move of a gesture records a new snapshot and later moves overwrite it.

use base64::Engine as _;
use certforge_common::config::EditorDefaults;

use crate::document::{reorder_elements, Document, ReorderOp};
use crate::element::{
    Element, ElementId, FontStyle, ImageFormat, ImageShape, Shape, ShapeKind, TextAlign,
    TextDecoration, TextShape,
};
use crate::history::History;

/// Fill colours handed out to new shapes in turn.
const SHAPE_PALETTE: [&str; 6] = [
    "#4285f4", "#ea4335", "#fbbc04", "#34a853", "#9c27b0", "#ff7043",
];

const VARIABLE_TOKEN_COLOR: &str = "#4285F4";
const IMAGE_MAX_WIDTH: f64 = 300.0;

/// An image ready to be placed on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAsset {
    /// Image bytes as a `data:` URI.
    pub src: String,
    pub file_name: Option<String>,
    pub format: ImageFormat,
    /// Intrinsic size in pixels.
    pub natural_width: f64,
    pub natural_height: f64,
}

impl ImageAsset {
    /// Build an asset from raw file bytes.
    pub fn from_bytes(
        bytes: &[u8],
        file_name: Option<String>,
        format: ImageFormat,
        natural_width: f64,
        natural_height: f64,
    ) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self {
            src: format!("data:{};base64,{encoded}", format.mime_type()),
            file_name,
            format,
            natural_width,
            natural_height,
        }
    }

    /// Display size: at most 300 px wide, aspect ratio preserved.
    pub fn display_size(&self) -> (f64, f64) {
        if self.natural_width <= 0.0 || self.natural_height <= 0.0 {
            return (IMAGE_MAX_WIDTH, IMAGE_MAX_WIDTH);
        }
        let ratio = self.natural_width / self.natural_height;
        let width = self.natural_width.min(IMAGE_MAX_WIDTH);
        (width, width / ratio)
    }
}

/// Document editor with undo/redo.
#[derive(Debug, Clone)]
pub struct Editor {
    document: Document,
    history: History<Vec<Element>>,
    defaults: EditorDefaults,
    gesture: GestureState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GestureState {
    Idle,
    /// A gesture has started but nothing has moved yet.
    Started,
    /// The gesture already owns the snapshot at the history cursor.
    Moving,
}

impl Editor {
    pub fn new(document: Document) -> Self {
        Self::with_defaults(document, EditorDefaults::default())
    }

    pub fn with_defaults(document: Document, defaults: EditorDefaults) -> Self {
        let history = History::new(document.elements.clone());
        Self {
            document,
            history,
            defaults,
            gesture: GestureState::Idle,
        }
    }

    /// Start a blank document using the editor defaults.
    pub fn blank(title: impl Into<String>, defaults: EditorDefaults) -> Self {
        let document = Document::new(title, &defaults.variables)
            .with_canvas(defaults.canvas_width, defaults.canvas_height);
        Self::with_defaults(document, defaults)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn elements(&self) -> &[Element] {
        &self.document.elements
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        self.gesture = GestureState::Idle;
        if !self.history.undo() {
            return false;
        }
        self.sync_from_history();
        true
    }

    pub fn redo(&mut self) -> bool {
        self.gesture = GestureState::Idle;
        if !self.history.redo() {
            return false;
        }
        self.sync_from_history();
        true
    }

    /// Append an element; it receives a fresh id.
    pub fn insert(&mut self, element: Element) -> ElementId {
        let mut scratch = self.document.clone();
        let id = scratch.insert(element);
        self.commit(scratch.elements, false);
        id
    }

    /// Add a shape with the default geometry for its kind.
    ///
    /// Text and image elements have their own constructors; for those kinds
    /// this returns `None`.
    pub fn add_shape(&mut self, kind: ShapeKind, filled: bool) -> Option<ElementId> {
        let shape = match kind {
            ShapeKind::Rectangle => Shape::Rectangle {
                width: 100.0,
                height: 100.0,
                corner_radius: 4.0,
            },
            ShapeKind::Circle => Shape::Circle { radius: 50.0 },
            ShapeKind::Triangle => Shape::Triangle { radius: 60.0 },
            ShapeKind::Pentagon => Shape::Pentagon { radius: 55.0 },
            ShapeKind::Hexagon => Shape::Hexagon { radius: 50.0 },
            ShapeKind::Star => Shape::Star {
                radius: 55.0,
                inner_radius: Some(22.0),
            },
            ShapeKind::Diamond => Shape::Diamond { radius: 50.0 },
            ShapeKind::Arrow => Shape::Arrow {
                radius: 40.0,
                scale: 1.0,
            },
            ShapeKind::Line => Shape::Line {
                width: 150.0,
                height: 8.0,
            },
            ShapeKind::Text | ShapeKind::Image | ShapeKind::Unknown => return None,
        };

        let mut element = Element::new(shape, 200.0, 200.0);
        element.stroke_width = self.defaults.stroke_width;
        if kind == ShapeKind::Line {
            element.fill_color = "#333".to_string();
        } else {
            element.fill_color = self.next_palette_color().to_string();
            element.filled = filled;
        }
        Some(self.insert(element))
    }

    /// Add a plain text element.
    pub fn add_text(&mut self) -> ElementId {
        let element = Element::new(Shape::Text(self.default_text("New Text")), 150.0, 150.0);
        self.insert(element)
    }

    /// Add a text element containing the `{{variable}}` token.
    pub fn add_variable_token(&mut self, variable: &str) -> ElementId {
        let text = self.default_text(&format!("{{{{{variable}}}}}"));
        let element =
            Element::new(Shape::Text(text), 200.0, 200.0).with_fill(VARIABLE_TOKEN_COLOR);
        self.insert(element)
    }

    /// Place an image at (100, 100), scaled down to at most 300 px wide.
    pub fn add_image(&mut self, asset: ImageAsset) -> ElementId {
        let (width, height) = asset.display_size();
        let element = Element::new(
            Shape::Image(ImageShape {
                width,
                height,
                src: asset.src,
                file_name: asset.file_name,
                format: asset.format,
            }),
            100.0,
            100.0,
        );
        self.insert(element)
    }

    /// Delete an element. Unknown ids are a no-op and record nothing.
    pub fn delete(&mut self, id: &ElementId) -> bool {
        let Some(index) = self.document.position_of(id) else {
            return false;
        };
        let mut elements = self.document.elements.clone();
        elements.remove(index);
        self.commit(elements, false);
        true
    }

    /// Change z-order. No-ops record nothing.
    pub fn reorder(&mut self, id: &ElementId, op: ReorderOp) -> bool {
        let mut elements = self.document.elements.clone();
        if !reorder_elements(&mut elements, id, op) {
            return false;
        }
        self.commit(elements, false);
        true
    }

    /// Apply a property change to one element. The id cannot be changed.
    pub fn update<F>(&mut self, id: &ElementId, change: F) -> bool
    where
        F: FnOnce(&mut Element),
    {
        let Some(index) = self.document.position_of(id) else {
            return false;
        };
        let mut elements = self.document.elements.clone();
        let element = &mut elements[index];
        change(element);
        element.id = id.clone();
        if elements[index] == self.document.elements[index] {
            return false;
        }
        self.commit(elements, false);
        true
    }

    /// Replace the content of a text element.
    pub fn set_text(&mut self, id: &ElementId, content: &str) -> bool {
        self.update(id, |element| {
            if let Shape::Text(text) = &mut element.shape {
                text.text = content.to_string();
            }
        })
    }

    /// Begin a drag gesture; moves until [`Editor::end_gesture`] form one
    /// undo step.
    pub fn begin_gesture(&mut self) {
        self.gesture = GestureState::Started;
    }

    pub fn end_gesture(&mut self) {
        self.gesture = GestureState::Idle;
    }

    /// Move an element to a new position.
    ///
    /// Outside a gesture every move is its own undo step.
    pub fn move_element(&mut self, id: &ElementId, x: f64, y: f64) -> bool {
        let Some(index) = self.document.position_of(id) else {
            return false;
        };
        let mut elements = self.document.elements.clone();
        elements[index].x = x;
        elements[index].y = y;

        let overwrite = self.gesture == GestureState::Moving;
        self.commit(elements, overwrite);
        if self.gesture == GestureState::Started {
            self.gesture = GestureState::Moving;
        }
        true
    }

    /// Rename the template. Not part of the undo history.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.document.title = title.into();
        self.document.touch();
    }

    /// Declare a variable. Not part of the undo history.
    pub fn declare_variable(&mut self, name: &str) -> Option<String> {
        let declared = self.document.declare_variable(name);
        if declared.is_some() {
            self.document.touch();
        }
        declared
    }

    pub fn remove_variable(&mut self, name: &str) -> bool {
        let removed = self.document.remove_variable(name);
        if removed {
            self.document.touch();
        }
        removed
    }

    fn default_text(&self, content: &str) -> TextShape {
        TextShape {
            text: content.to_string(),
            font_size: self.defaults.font_size,
            font_family: self.defaults.font_family.clone(),
            align: TextAlign::Left,
            font_style: FontStyle::Normal,
            text_decoration: TextDecoration::default(),
            width: 200.0,
        }
    }

    fn next_palette_color(&self) -> &'static str {
        SHAPE_PALETTE[self.document.elements.len() % SHAPE_PALETTE.len()]
    }

    fn commit(&mut self, elements: Vec<Element>, overwrite: bool) {
        tracing::trace!(
            count = elements.len(),
            overwrite,
            step = self.history.step(),
            "Recording edit"
        );
        if !overwrite {
            self.release_gesture_step();
        }
        self.history.record(elements.clone(), overwrite);
        self.document.elements = elements;
        self.document.touch();
    }

    fn sync_from_history(&mut self) {
        self.document.elements = self.history.current().clone();
        self.document.touch();
    }

    /// Any other recorded edit ends the step a drag owns; later moves of
    /// the same gesture start a new one.
    fn release_gesture_step(&mut self) {
        if self.gesture == GestureState::Moving {
            self.gesture = GestureState::Started;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> Editor {
        Editor::blank("Test", EditorDefaults::default())
    }

    #[test]
    fn test_blank_editor_declares_default_variables() {
        let editor = editor();
        assert_eq!(
            editor.document().variables,
            vec!["name", "date", "role", "event_name"]
        );
        assert!(!editor.can_undo());
        assert!(!editor.can_redo());
    }

    #[test]
    fn test_add_rectangle_undo_redo_restores_same_element() {
        let mut editor = editor();
        let id = editor.add_shape(ShapeKind::Rectangle, true).unwrap();
        assert_eq!(editor.elements().len(), 1);
        let before = editor.elements()[0].clone();
        assert_eq!((before.x, before.y), (200.0, 200.0));

        assert!(editor.undo());
        assert!(editor.elements().is_empty());

        assert!(editor.redo());
        assert_eq!(editor.elements().len(), 1);
        assert_eq!(editor.elements()[0], before);
        assert_eq!(editor.elements()[0].id, id);
    }

    #[test]
    fn test_add_shape_rejects_text_and_image_kinds() {
        let mut editor = editor();
        assert!(editor.add_shape(ShapeKind::Text, true).is_none());
        assert!(editor.add_shape(ShapeKind::Image, true).is_none());
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_line_is_always_filled_dark() {
        let mut editor = editor();
        editor.add_shape(ShapeKind::Line, false).unwrap();
        let line = &editor.elements()[0];
        assert!(line.filled);
        assert_eq!(line.fill_color, "#333");
    }

    #[test]
    fn test_variable_token_text() {
        let mut editor = editor();
        let id = editor.add_variable_token("name");
        let element = editor.document().get(&id).unwrap();
        assert_eq!(element.as_text().unwrap().text, "{{name}}");
        assert_eq!(element.fill_color, VARIABLE_TOKEN_COLOR);
    }

    #[test]
    fn test_gesture_moves_coalesce_into_one_step() {
        let mut editor = editor();
        let id = editor.add_shape(ShapeKind::Circle, true).unwrap();

        editor.begin_gesture();
        editor.move_element(&id, 210.0, 210.0);
        editor.move_element(&id, 220.0, 230.0);
        editor.move_element(&id, 300.0, 320.0);
        editor.end_gesture();

        assert_eq!(editor.elements()[0].x, 300.0);
        assert!(editor.undo());
        assert_eq!(editor.elements()[0].x, 200.0);
        assert!(editor.undo());
        assert!(editor.elements().is_empty());
    }

    #[test]
    fn test_edit_during_gesture_keeps_its_own_step() {
        let mut editor = editor();
        let dragged = editor.add_shape(ShapeKind::Circle, true).unwrap();
        let other = editor.add_text();

        editor.begin_gesture();
        editor.move_element(&dragged, 210.0, 210.0);
        assert!(editor.delete(&other));
        editor.move_element(&dragged, 260.0, 260.0);
        editor.move_element(&dragged, 300.0, 300.0);
        editor.end_gesture();

        assert_eq!(editor.elements().len(), 1);
        assert_eq!(editor.elements()[0].x, 300.0);

        // Later moves coalesce after the delete.
        assert!(editor.undo());
        assert_eq!(editor.elements().len(), 1);
        assert_eq!(editor.elements()[0].x, 210.0);

        // The delete is its own step.
        assert!(editor.undo());
        assert_eq!(editor.elements().len(), 2);
        assert_eq!(editor.elements()[0].x, 210.0);

        assert!(editor.undo());
        assert_eq!(editor.elements()[0].x, 200.0);
    }

    #[test]
    fn test_undo_during_gesture_is_not_overwritten() {
        let mut editor = editor();
        let id = editor.add_shape(ShapeKind::Circle, true).unwrap();

        editor.begin_gesture();
        editor.move_element(&id, 250.0, 250.0);
        assert!(editor.undo());
        editor.move_element(&id, 260.0, 260.0);
        editor.end_gesture();

        assert!(editor.undo());
        assert_eq!(editor.elements()[0].x, 200.0);
        assert!(editor.undo());
        assert!(editor.elements().is_empty());
    }

    #[test]
    fn test_update_keeps_id_and_skips_noops() {
        let mut editor = editor();
        let id = editor.add_text();
        assert!(editor.update(&id, |e| {
            e.id = ElementId::new("hijacked");
            e.opacity = 0.5;
        }));
        assert!(editor.document().contains(&id));
        assert!(!editor.update(&id, |e| e.opacity = 0.5));
        assert!(!editor.update(&ElementId::new("missing"), |e| e.opacity = 0.1));
    }

    #[test]
    fn test_noop_reorder_records_nothing() {
        let mut editor = editor();
        let id = editor.add_text();
        assert!(!editor.reorder(&id, ReorderOp::ToFront));
        assert!(editor.undo());
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_image_asset_scaling() {
        let asset = ImageAsset::from_bytes(b"png", None, ImageFormat::Png, 600.0, 300.0);
        assert!(asset.src.starts_with("data:image/png;base64,"));
        assert_eq!(asset.display_size(), (300.0, 150.0));

        let small = ImageAsset::from_bytes(b"png", None, ImageFormat::Png, 120.0, 60.0);
        assert_eq!(small.display_size(), (120.0, 60.0));
    }
}
