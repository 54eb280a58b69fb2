//! Scene elements: the shapes, text, and images a template is made of.
//!
//! Elements are stored flat in JSON with a `type` discriminant:
//!
//! ```json
//! {"id":"rectangle_1f3a","x":200,"y":200,"fill_color":"#4285f4","type":"rectangle","width":100,"height":100}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an element, unique within its document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier prefixed with the element kind.
    pub fn generate(kind: ShapeKind) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{}_{}", kind.as_str(), &suffix[..12]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A single element of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Unique within the owning document; never changes after creation.
    pub id: ElementId,

    /// Horizontal position (centre for radial shapes, left edge otherwise).
    pub x: f64,

    /// Vertical position (centre for radial shapes, top edge otherwise).
    pub y: f64,

    /// Opacity in `[0.0, 1.0]`.
    #[serde(default = "default_opacity")]
    pub opacity: f64,

    /// Fill colour, also used as the outline colour of unfilled shapes.
    #[serde(default = "default_fill_color")]
    pub fill_color: String,

    /// Whether the shape is painted filled or as an outline.
    #[serde(default = "default_filled")]
    pub filled: bool,

    /// Outline width, only used when `filled` is false.
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,

    /// Kind-specific geometry and content.
    #[serde(flatten)]
    pub shape: Shape,
}

fn default_opacity() -> f64 {
    1.0
}

fn default_fill_color() -> String {
    "#000000".to_string()
}

fn default_filled() -> bool {
    true
}

fn default_stroke_width() -> f64 {
    2.0
}

fn default_arrow_scale() -> f64 {
    1.0
}

/// Kind-specific element payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Rectangle {
        width: f64,
        height: f64,
        #[serde(default)]
        corner_radius: f64,
    },
    Circle {
        radius: f64,
    },
    Triangle {
        radius: f64,
    },
    Pentagon {
        radius: f64,
    },
    Hexagon {
        radius: f64,
    },
    Star {
        radius: f64,
        /// Defaults to `0.4 × radius` when unset.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        inner_radius: Option<f64>,
    },
    Diamond {
        radius: f64,
    },
    Arrow {
        radius: f64,
        #[serde(default = "default_arrow_scale")]
        scale: f64,
    },
    /// A horizontal bar drawn as a filled capsule.
    Line {
        width: f64,
        height: f64,
    },
    Text(TextShape),
    Image(ImageShape),
    /// A kind written by a newer version; skipped by every output path.
    #[serde(other)]
    Unknown,
}

/// Payload-free discriminant of [`Shape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Triangle,
    Pentagon,
    Hexagon,
    Star,
    Diamond,
    Arrow,
    Line,
    Text,
    Image,
    Unknown,
}

impl ShapeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Circle => "circle",
            ShapeKind::Triangle => "triangle",
            ShapeKind::Pentagon => "pentagon",
            ShapeKind::Hexagon => "hexagon",
            ShapeKind::Star => "star",
            ShapeKind::Diamond => "diamond",
            ShapeKind::Arrow => "arrow",
            ShapeKind::Line => "line",
            ShapeKind::Text => "text",
            ShapeKind::Image => "image",
            ShapeKind::Unknown => "unknown",
        }
    }

    /// Parse a kind name as used in the JSON `type` field.
    pub fn parse(name: &str) -> Option<Self> {
        let kind = match name.trim().to_ascii_lowercase().as_str() {
            "rectangle" | "rect" => ShapeKind::Rectangle,
            "circle" => ShapeKind::Circle,
            "triangle" => ShapeKind::Triangle,
            "pentagon" => ShapeKind::Pentagon,
            "hexagon" => ShapeKind::Hexagon,
            "star" => ShapeKind::Star,
            "diamond" => ShapeKind::Diamond,
            "arrow" => ShapeKind::Arrow,
            "line" => ShapeKind::Line,
            "text" => ShapeKind::Text,
            "image" => ShapeKind::Image,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text content and typography.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextShape {
    /// Literal text, possibly containing `{{variable}}` tokens.
    pub text: String,
    pub font_size: f64,
    pub font_family: String,
    #[serde(default)]
    pub align: TextAlign,
    #[serde(default)]
    pub font_style: FontStyle,
    #[serde(default)]
    pub text_decoration: TextDecoration,
    /// Layout box width used to anchor centred and right-aligned text.
    #[serde(default = "default_text_width")]
    pub width: f64,
}

fn default_text_width() -> f64 {
    200.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FontStyle {
    #[default]
    #[serde(rename = "normal")]
    Normal,
    #[serde(rename = "bold")]
    Bold,
    #[serde(rename = "italic")]
    Italic,
    #[serde(rename = "bold italic")]
    BoldItalic,
}

impl FontStyle {
    pub fn is_bold(self) -> bool {
        matches!(self, FontStyle::Bold | FontStyle::BoldItalic)
    }

    pub fn is_italic(self) -> bool {
        matches!(self, FontStyle::Italic | FontStyle::BoldItalic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TextDecoration {
    pub underline: bool,
    pub strikethrough: bool,
}

impl TextDecoration {
    pub fn is_none(&self) -> bool {
        !self.underline && !self.strikethrough
    }
}

/// An embedded raster or vector image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageShape {
    pub width: f64,
    pub height: f64,
    /// Image bytes as a `data:` URI.
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default)]
    pub format: ImageFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Svg,
}

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Svg => "image/svg+xml",
        }
    }
}

/// Resolved paint of an element, shared by every output path.
#[derive(Debug, Clone, PartialEq)]
pub struct Paint {
    /// Fill colour, `None` for outline-only shapes.
    pub fill: Option<String>,
    /// Stroke colour and width, `None` for filled shapes.
    pub stroke: Option<(String, f64)>,
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Rectangle { .. } => ShapeKind::Rectangle,
            Shape::Circle { .. } => ShapeKind::Circle,
            Shape::Triangle { .. } => ShapeKind::Triangle,
            Shape::Pentagon { .. } => ShapeKind::Pentagon,
            Shape::Hexagon { .. } => ShapeKind::Hexagon,
            Shape::Star { .. } => ShapeKind::Star,
            Shape::Diamond { .. } => ShapeKind::Diamond,
            Shape::Arrow { .. } => ShapeKind::Arrow,
            Shape::Line { .. } => ShapeKind::Line,
            Shape::Text(_) => ShapeKind::Text,
            Shape::Image(_) => ShapeKind::Image,
            Shape::Unknown => ShapeKind::Unknown,
        }
    }

    /// Numeric geometry fields, for validation.
    fn dimensions(&self) -> Vec<f64> {
        match self {
            Shape::Rectangle {
                width,
                height,
                corner_radius,
            } => vec![*width, *height, *corner_radius],
            Shape::Circle { radius }
            | Shape::Triangle { radius }
            | Shape::Pentagon { radius }
            | Shape::Hexagon { radius }
            | Shape::Diamond { radius } => vec![*radius],
            Shape::Star {
                radius,
                inner_radius,
            } => vec![*radius, inner_radius.unwrap_or(0.0)],
            Shape::Arrow { radius, scale } => vec![*radius, *scale],
            Shape::Line { width, height } => vec![*width, *height],
            Shape::Text(text) => vec![text.font_size, text.width],
            Shape::Image(image) => vec![image.width, image.height],
            Shape::Unknown => vec![],
        }
    }
}

impl Element {
    /// Create an element with a freshly generated id and default paint.
    pub fn new(shape: Shape, x: f64, y: f64) -> Self {
        Self {
            id: ElementId::generate(shape.kind()),
            x,
            y,
            opacity: default_opacity(),
            fill_color: default_fill_color(),
            filled: true,
            stroke_width: default_stroke_width(),
            shape,
        }
    }

    pub fn with_id(mut self, id: impl Into<ElementId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_fill(mut self, color: impl Into<String>) -> Self {
        self.fill_color = color.into();
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Switch to outline rendering with the given stroke width.
    pub fn outlined(mut self, stroke_width: f64) -> Self {
        self.filled = false;
        self.stroke_width = stroke_width;
        self
    }

    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    pub fn as_text(&self) -> Option<&TextShape> {
        match &self.shape {
            Shape::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Resolve fill and stroke according to the filled/outline rule.
    ///
    /// Lines and text are always filled; images carry no paint.
    pub fn paint(&self) -> Paint {
        match self.shape {
            Shape::Image(_) | Shape::Unknown => Paint {
                fill: None,
                stroke: None,
            },
            Shape::Line { .. } | Shape::Text(_) => Paint {
                fill: Some(self.fill_color.clone()),
                stroke: None,
            },
            _ if self.filled => Paint {
                fill: Some(self.fill_color.clone()),
                stroke: None,
            },
            _ => Paint {
                fill: None,
                stroke: Some((self.fill_color.clone(), self.stroke_width)),
            },
        }
    }

    /// Short label shown in a layer list.
    pub fn layer_label(&self) -> String {
        match &self.shape {
            Shape::Text(text) => {
                if text.text.chars().count() > 14 {
                    let head: String = text.text.chars().take(14).collect();
                    format!("{head}...")
                } else {
                    text.text.clone()
                }
            }
            Shape::Image(image) => image
                .file_name
                .clone()
                .unwrap_or_else(|| "Image".to_string()),
            other => {
                let name = other.kind().as_str();
                let mut chars = name.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        }
    }

    /// Whether every numeric field is finite.
    pub fn is_finite(&self) -> bool {
        [self.x, self.y, self.opacity, self.stroke_width]
            .into_iter()
            .chain(self.shape.dimensions())
            .all(f64::is_finite)
    }
}
