use std::sync::Arc;

use certforge_render_engine::svg::{element_markup, serialize};
use certforge_render_engine::{resolve, RenderSurface, SvgRasterSurface};
use certforge_template_model::{DataRow, Document, Element, Shape, VariableMapping};
use proptest::prelude::*;

fn arb_paintable_shape() -> impl Strategy<Value = Shape> {
    prop_oneof![
        (1.0..200.0f64, 1.0..200.0f64, 0.0..10.0f64).prop_map(|(width, height, corner_radius)| {
            Shape::Rectangle {
                width,
                height,
                corner_radius,
            }
        }),
        (1.0..100.0f64).prop_map(|radius| Shape::Circle { radius }),
        (1.0..100.0f64).prop_map(|radius| Shape::Triangle { radius }),
        (1.0..100.0f64).prop_map(|radius| Shape::Pentagon { radius }),
        (1.0..100.0f64).prop_map(|radius| Shape::Diamond { radius }),
        (1.0..100.0f64).prop_map(|radius| Shape::Star {
            radius,
            inner_radius: None,
        }),
        (0.5..3.0f64).prop_map(|scale| Shape::Arrow {
            radius: 40.0,
            scale,
        }),
    ]
}

fn attr<'a>(markup: &'a str, name: &str) -> Option<&'a str> {
    let key = format!(" {name}=\"");
    let start = markup.find(&key)? + key.len();
    let end = markup[start..].find('"')? + start;
    Some(&markup[start..end])
}

proptest! {
    #[test]
    fn unknown_tokens_are_left_untouched(
        prefix in "[a-z ]{0,10}",
        unknown in "[a-z]{1,8}",
        suffix in "[a-z ]{0,10}",
        value in "[A-Za-z ]{0,12}",
    ) {
        prop_assume!(unknown != "name");
        let text = format!("{prefix}{{{{{unknown}}}}}{suffix}");
        let mapping: VariableMapping = [("name", "Name")].into_iter().collect();
        let row: DataRow = [("Name".to_string(), value)].into_iter().collect();

        // Undeclared variable.
        prop_assert_eq!(resolve(&text, &["name".to_string()], &mapping, &row), text.clone());
        // Declared but unmapped.
        let declared = vec!["name".to_string(), unknown.clone()];
        prop_assert_eq!(resolve(&text, &declared, &mapping, &row), text);
    }

    #[test]
    fn markup_paint_matches_element_paint(
        shape in arb_paintable_shape(),
        filled in any::<bool>(),
        stroke_width in 0.5..8.0f64,
    ) {
        let mut element = Element::new(shape, 100.0, 100.0).with_fill("#123456");
        element.filled = filled;
        element.stroke_width = stroke_width;

        let markup = element_markup(&element).unwrap();
        let paint = element.paint();

        match &paint.fill {
            Some(fill) => prop_assert_eq!(attr(&markup, "fill"), Some(fill.as_str())),
            None => prop_assert_eq!(attr(&markup, "fill"), Some("none")),
        }
        match &paint.stroke {
            Some((color, _)) => {
                prop_assert_eq!(attr(&markup, "stroke"), Some(color.as_str()));
                prop_assert!(attr(&markup, "stroke-width").is_some());
            }
            None => {
                prop_assert_eq!(attr(&markup, "stroke"), Some("none"));
                prop_assert!(attr(&markup, "stroke-width").is_none());
            }
        }
        prop_assert_eq!(paint.fill.is_some(), filled);
    }
}

async fn center_and_edge(element: Element) -> ([u8; 4], [u8; 4]) {
    let mut doc = Document::new("Paint", &[]).with_canvas(100.0, 100.0);
    doc.insert(element);

    let mut surface = SvgRasterSurface::with_fontdb(Arc::new(resvg::usvg::fontdb::Database::new()));
    surface.render(&doc).await.unwrap();
    surface.settled().await.unwrap();
    let capture = surface.capture(1.0).await.unwrap();

    let image = image::load_from_memory(&capture.png).unwrap().to_rgba8();
    (image.get_pixel(50, 50).0, image.get_pixel(70, 50).0)
}

#[tokio::test]
async fn raster_honours_filled_and_outlined_paint() {
    let circle = Element::new(Shape::Circle { radius: 20.0 }, 50.0, 50.0).with_fill("#ff0000");

    let (center, edge) = center_and_edge(circle.clone()).await;
    assert_eq!(center, [255, 0, 0, 255]);
    assert_eq!(edge[0], 255);

    let (center, edge) = center_and_edge(circle.outlined(6.0)).await;
    assert_eq!(center, [255, 255, 255, 255]);
    assert_eq!(edge, [255, 0, 0, 255]);
}

#[test]
fn background_precedes_elements() {
    let mut doc = Document::new("Order", &[]);
    doc.insert(Element::new(Shape::Circle { radius: 5.0 }, 10.0, 10.0));
    let svg = serialize(&doc);
    let background = svg.find("fill=\"#ffffff\"").unwrap();
    let circle = svg.find("<circle").unwrap();
    assert!(background < circle);
}
