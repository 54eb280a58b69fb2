//! Document to SVG markup.
//!
//! Serialization is deterministic: the same document always produces the
//! same bytes. The canvas becomes the viewport, a white background is
//! painted first and elements follow in z-order. Raster capture renders this
//! same markup, so both output paths share one geometry and paint.

use std::f64::consts::PI;
use std::fmt::Write as _;

use certforge_template_model::{
    DataRow, Document, Element, Shape, TextAlign, TextShape, VariableMapping,
};

use crate::substitute::instantiate;

const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// Baseline offset below `y`, as a fraction of font size.
const BASELINE_RATIO: f64 = 0.8;

/// Default star inner radius as a fraction of the outer radius.
const STAR_INNER_RATIO: f64 = 0.4;

/// Arrow outline relative to its anchor, before scaling.
const ARROW_POINTS: [(f64, f64); 7] = [
    (-20.0, -15.0),
    (20.0, -15.0),
    (20.0, -25.0),
    (40.0, 0.0),
    (20.0, 25.0),
    (20.0, 15.0),
    (-20.0, 15.0),
];

/// Serialize a document to an SVG string.
pub fn serialize(document: &Document) -> String {
    let width = num(document.canvas.width);
    let height = num(document.canvas.height);

    let mut out = String::with_capacity(256 + document.elements.len() * 128);
    let _ = write!(
        out,
        r#"<svg xmlns="{SVG_NS}" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    let _ = write!(
        out,
        r##"<rect x="0" y="0" width="{width}" height="{height}" fill="#ffffff"/>"##
    );

    for element in &document.elements {
        if let Some(markup) = element_markup(element) {
            out.push_str(&markup);
        } else {
            tracing::debug!(id = %element.id, "Skipping element of unknown kind");
        }
    }

    out.push_str("</svg>");
    out
}

/// Substitute `row` into the document's text, then serialize.
pub fn serialize_instance(document: &Document, mapping: &VariableMapping, row: &DataRow) -> String {
    serialize(&instantiate(document, mapping, row))
}

/// Markup for a single element, `None` for unknown kinds.
pub fn element_markup(element: &Element) -> Option<String> {
    let x = element.x;
    let y = element.y;
    let paint = paint_attrs(element);
    let opacity = opacity_attr(element.opacity);

    let markup = match &element.shape {
        Shape::Rectangle {
            width,
            height,
            corner_radius,
        } => format!(
            r#"<rect x="{}" y="{}" width="{}" height="{}" rx="{}"{paint}{opacity}/>"#,
            num(x),
            num(y),
            num(*width),
            num(*height),
            num(*corner_radius),
        ),
        Shape::Line { width, height } => format!(
            r#"<rect x="{}" y="{}" width="{}" height="{}" rx="{}"{paint}{opacity}/>"#,
            num(x),
            num(y),
            num(*width),
            num(*height),
            num(height / 2.0),
        ),
        Shape::Circle { radius } => format!(
            r#"<circle cx="{}" cy="{}" r="{}"{paint}{opacity}/>"#,
            num(x),
            num(y),
            num(*radius),
        ),
        Shape::Triangle { radius } => polygon(&regular_polygon(x, y, *radius, 3), &paint, &opacity),
        Shape::Pentagon { radius } => polygon(&regular_polygon(x, y, *radius, 5), &paint, &opacity),
        Shape::Hexagon { radius } => polygon(&regular_polygon(x, y, *radius, 6), &paint, &opacity),
        Shape::Star {
            radius,
            inner_radius,
        } => {
            let inner = inner_radius.unwrap_or(radius * STAR_INNER_RATIO);
            polygon(&star_points(x, y, *radius, inner), &paint, &opacity)
        }
        Shape::Diamond { radius } => {
            let r = *radius;
            let points = [(x, y - r), (x + r, y), (x, y + r), (x - r, y)];
            polygon(&points, &paint, &opacity)
        }
        Shape::Arrow { scale, .. } => {
            let points: Vec<(f64, f64)> = ARROW_POINTS
                .iter()
                .map(|(dx, dy)| (x + dx * scale, y + dy * scale))
                .collect();
            polygon(&points, &paint, &opacity)
        }
        Shape::Text(text) => text_markup(x, y, text, &paint, &opacity),
        Shape::Image(image) => format!(
            r#"<image href="{}" x="{}" y="{}" width="{}" height="{}" preserveAspectRatio="none" opacity="{}"/>"#,
            escape_xml(&image.src),
            num(x),
            num(y),
            num(image.width),
            num(image.height),
            num(element.opacity),
        ),
        Shape::Unknown => return None,
    };
    Some(markup)
}

/// Vertices of a regular polygon whose first vertex points straight up.
pub fn regular_polygon(cx: f64, cy: f64, radius: f64, sides: usize) -> Vec<(f64, f64)> {
    (0..sides)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / sides as f64 - PI / 2.0;
            (cx + radius * angle.cos(), cy + radius * angle.sin())
        })
        .collect()
}

/// Ten alternating outer/inner vertices of a five-pointed star.
pub fn star_points(cx: f64, cy: f64, outer: f64, inner: f64) -> Vec<(f64, f64)> {
    (0..10)
        .map(|i| {
            let r = if i % 2 == 0 { outer } else { inner };
            let angle = 2.0 * PI * i as f64 / 10.0 - PI / 2.0;
            (cx + r * angle.cos(), cy + r * angle.sin())
        })
        .collect()
}

fn polygon(points: &[(f64, f64)], paint: &str, opacity: &str) -> String {
    let points = points
        .iter()
        .map(|(px, py)| format!("{},{}", num(*px), num(*py)))
        .collect::<Vec<_>>()
        .join(" ");
    format!(r#"<polygon points="{points}"{paint}{opacity}/>"#)
}

fn text_markup(x: f64, y: f64, text: &TextShape, paint: &str, opacity: &str) -> String {
    let (anchor_x, anchor) = match text.align {
        TextAlign::Left => (x, "start"),
        TextAlign::Center => (x + text.width / 2.0, "middle"),
        TextAlign::Right => (x + text.width, "end"),
    };
    let baseline = y + text.font_size * BASELINE_RATIO;

    let mut style = String::new();
    if text.font_style.is_bold() {
        style.push_str(r#" font-weight="bold""#);
    }
    if text.font_style.is_italic() {
        style.push_str(r#" font-style="italic""#);
    }
    let mut decorations = Vec::new();
    if text.text_decoration.underline {
        decorations.push("underline");
    }
    if text.text_decoration.strikethrough {
        decorations.push("line-through");
    }
    if !decorations.is_empty() {
        let _ = write!(style, r#" text-decoration="{}""#, decorations.join(" "));
    }

    format!(
        r#"<text x="{}" y="{}" font-family="{}" font-size="{}px" text-anchor="{anchor}"{style}{paint}{opacity}>{}</text>"#,
        num(anchor_x),
        num(baseline),
        escape_xml(&text.font_family),
        num(text.font_size),
        escape_xml(&text.text),
    )
}

/// Fill and stroke attributes following [`Element::paint`].
fn paint_attrs(element: &Element) -> String {
    let paint = element.paint();
    let mut attrs = String::new();
    match &paint.fill {
        Some(fill) => {
            let _ = write!(attrs, r#" fill="{}""#, escape_xml(fill));
        }
        None => attrs.push_str(r#" fill="none""#),
    }
    match &paint.stroke {
        Some((color, width)) => {
            let _ = write!(
                attrs,
                r#" stroke="{}" stroke-width="{}""#,
                escape_xml(color),
                num(*width)
            );
        }
        None => attrs.push_str(r#" stroke="none""#),
    }
    attrs
}

fn opacity_attr(opacity: f64) -> String {
    if opacity < 1.0 {
        format!(r#" opacity="{}""#, num(opacity.max(0.0)))
    } else {
        String::new()
    }
}

/// Escape the five XML-reserved characters.
pub fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// Format a coordinate with at most three decimals.
pub fn num(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let formatted = format!("{rounded:.3}");
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use certforge_template_model::{FontStyle, ImageFormat, ImageShape, TextDecoration};

    fn doc_with(elements: Vec<Element>) -> Document {
        let mut doc = Document::new("Test", &["name".to_string()]);
        doc.elements = elements;
        doc
    }

    fn text(content: &str, align: TextAlign) -> Element {
        Element::new(
            Shape::Text(TextShape {
                text: content.to_string(),
                font_size: 20.0,
                font_family: "serif".to_string(),
                align,
                font_style: FontStyle::Normal,
                text_decoration: TextDecoration::default(),
                width: 200.0,
            }),
            10.0,
            30.0,
        )
        .with_id("text_1")
    }

    #[test]
    fn test_num_formatting() {
        assert_eq!(num(10.0), "10");
        assert_eq!(num(1.5), "1.5");
        assert_eq!(num(1.23456), "1.235");
        assert_eq!(num(-0.0001), "0");
        assert_eq!(num(-12.25), "-12.25");
    }

    #[test]
    fn test_empty_document_has_white_background() {
        let svg = serialize(&Document::new("Empty", &[]));
        assert!(svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" width="800" height="500" viewBox="0 0 800 500">"#));
        assert!(svg.contains(r##"<rect x="0" y="0" width="800" height="500" fill="#ffffff"/>"##));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn test_filled_and_outlined_paint() {
        let filled = Element::new(Shape::Circle { radius: 5.0 }, 1.0, 2.0).with_fill("#ff0000");
        let markup = element_markup(&filled).unwrap();
        assert_eq!(
            markup,
            r##"<circle cx="1" cy="2" r="5" fill="#ff0000" stroke="none"/>"##
        );

        let outlined = filled.outlined(3.0);
        let markup = element_markup(&outlined).unwrap();
        assert_eq!(
            markup,
            r##"<circle cx="1" cy="2" r="5" fill="none" stroke="#ff0000" stroke-width="3"/>"##
        );
    }

    #[test]
    fn test_line_is_capsule_and_ignores_filled() {
        let line = Element::new(
            Shape::Line {
                width: 150.0,
                height: 8.0,
            },
            0.0,
            0.0,
        )
        .with_fill("#333")
        .outlined(4.0);
        let markup = element_markup(&line).unwrap();
        assert!(markup.contains(r#"rx="4""#));
        assert!(markup.contains(r##"fill="#333" stroke="none""##));
    }

    #[test]
    fn test_polygon_first_vertex_points_up() {
        let points = regular_polygon(100.0, 100.0, 50.0, 3);
        assert_eq!(points.len(), 3);
        assert!((points[0].0 - 100.0).abs() < 1e-9);
        assert!((points[0].1 - 50.0).abs() < 1e-9);

        let star = star_points(0.0, 0.0, 10.0, 4.0);
        assert_eq!(star.len(), 10);
        let r1 = (star[1].0.powi(2) + star[1].1.powi(2)).sqrt();
        assert!((r1 - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_star_default_inner_radius() {
        let star = Element::new(
            Shape::Star {
                radius: 10.0,
                inner_radius: None,
            },
            0.0,
            0.0,
        );
        let markup = element_markup(&star).unwrap();
        // Second vertex sits at 0.4 * 10 on the -54 degree ray.
        let expected = star_points(0.0, 0.0, 10.0, 4.0)[1];
        assert!(markup.contains(&format!("{},{}", num(expected.0), num(expected.1))));
    }

    #[test]
    fn test_diamond_and_arrow_points() {
        let diamond = Element::new(Shape::Diamond { radius: 10.0 }, 50.0, 50.0);
        assert!(element_markup(&diamond)
            .unwrap()
            .contains(r#"points="50,40 60,50 50,60 40,50""#));

        let arrow = Element::new(
            Shape::Arrow {
                radius: 40.0,
                scale: 2.0,
            },
            100.0,
            100.0,
        );
        assert!(element_markup(&arrow)
            .unwrap()
            .contains(r#"points="60,70 140,70 140,50 180,100 140,150 140,130 60,130""#));
    }

    #[test]
    fn test_text_alignment_and_baseline() {
        let left = element_markup(&text("Hi", TextAlign::Left)).unwrap();
        assert!(left.contains(r#"x="10" y="46""#));
        assert!(left.contains(r#"text-anchor="start""#));

        let center = element_markup(&text("Hi", TextAlign::Center)).unwrap();
        assert!(center.contains(r#"x="110""#));
        assert!(center.contains(r#"text-anchor="middle""#));

        let right = element_markup(&text("Hi", TextAlign::Right)).unwrap();
        assert!(right.contains(r#"x="210""#));
        assert!(right.contains(r#"text-anchor="end""#));
    }

    #[test]
    fn test_text_escaping_and_style() {
        let mut element = text(r#"<A & B> "q" 'x'"#, TextAlign::Left);
        if let Shape::Text(t) = &mut element.shape {
            t.font_style = FontStyle::BoldItalic;
            t.text_decoration = TextDecoration {
                underline: true,
                strikethrough: true,
            };
        }
        let markup = element_markup(&element).unwrap();
        assert!(markup.contains("&lt;A &amp; B&gt; &quot;q&quot; &apos;x&apos;"));
        assert!(markup.contains(r#"font-weight="bold""#));
        assert!(markup.contains(r#"font-style="italic""#));
        assert!(markup.contains(r#"text-decoration="underline line-through""#));
    }

    #[test]
    fn test_image_and_opacity() {
        let image = Element::new(
            Shape::Image(ImageShape {
                width: 300.0,
                height: 150.0,
                src: "data:image/png;base64,AAAA".to_string(),
                file_name: Some("logo.png".to_string()),
                format: ImageFormat::Png,
            }),
            100.0,
            100.0,
        )
        .with_opacity(0.5);
        let markup = element_markup(&image).unwrap();
        assert_eq!(
            markup,
            r#"<image href="data:image/png;base64,AAAA" x="100" y="100" width="300" height="150" preserveAspectRatio="none" opacity="0.5"/>"#
        );

        let faded = Element::new(Shape::Circle { radius: 1.0 }, 0.0, 0.0).with_opacity(0.25);
        assert!(element_markup(&faded).unwrap().contains(r#"opacity="0.25""#));
    }

    #[test]
    fn test_unknown_elements_are_skipped() {
        let mut unknown = Element::new(Shape::Circle { radius: 1.0 }, 0.0, 0.0);
        unknown.shape = Shape::Unknown;
        let doc = doc_with(vec![unknown]);
        let svg = serialize(&doc);
        assert_eq!(svg.matches('<').count(), 3);
    }

    #[test]
    fn test_serialize_is_deterministic_and_ordered() {
        let doc = doc_with(vec![
            Element::new(Shape::Circle { radius: 1.0 }, 0.0, 0.0).with_id("a"),
            text("Hello", TextAlign::Left),
        ]);
        let first = serialize(&doc);
        assert_eq!(first, serialize(&doc));
        let circle = first.find("<circle").unwrap();
        let text_pos = first.find("<text").unwrap();
        assert!(circle < text_pos);
    }

    #[test]
    fn test_serialize_instance_substitutes_text() {
        let doc = doc_with(vec![text("Hello {{name}}", TextAlign::Left)]);
        let mapping: VariableMapping = [("name", "Full Name")].into_iter().collect();
        let row: DataRow = [("Full Name".to_string(), "Alice".to_string())]
            .into_iter()
            .collect();
        let svg = serialize_instance(&doc, &mapping, &row);
        assert!(svg.contains(">Hello Alice</text>"));
    }
}
