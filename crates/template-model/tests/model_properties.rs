use certforge_common::config::EditorDefaults;
use certforge_template_model::{
    reorder_elements, DirTemplateStore, Document, Editor, Element, ElementId, History,
    ReorderOp, Shape, ShapeKind, TemplateStore, TextShape,
};
use proptest::prelude::*;

fn element_stack(len: usize) -> Vec<Element> {
    (0..len)
        .map(|i| {
            Element::new(Shape::Circle { radius: 10.0 + i as f64 }, i as f64, i as f64)
                .with_id(format!("el_{i}").as_str())
        })
        .collect()
}

fn arb_shape() -> impl Strategy<Value = Shape> {
    prop_oneof![
        (1.0..500.0f64, 1.0..500.0f64, 0.0..20.0f64).prop_map(|(w, h, r)| Shape::Rectangle {
            width: w,
            height: h,
            corner_radius: r,
        }),
        (1.0..200.0f64).prop_map(|radius| Shape::Circle { radius }),
        (1.0..200.0f64).prop_map(|radius| Shape::Hexagon { radius }),
        (1.0..200.0f64, proptest::option::of(1.0..100.0f64)).prop_map(
            |(radius, inner_radius)| Shape::Star {
                radius,
                inner_radius,
            }
        ),
        (1.0..200.0f64, 0.1..4.0f64).prop_map(|(radius, scale)| Shape::Arrow { radius, scale }),
        ("[a-zA-Z {}_]{0,30}", 8.0..72.0f64).prop_map(|(text, font_size)| {
            Shape::Text(TextShape {
                text,
                font_size,
                font_family: "serif".to_string(),
                align: Default::default(),
                font_style: Default::default(),
                text_decoration: Default::default(),
                width: 240.0,
            })
        }),
    ]
}

fn arb_element() -> impl Strategy<Value = Element> {
    (
        arb_shape(),
        -100.0..900.0f64,
        -100.0..600.0f64,
        0.0..=1.0f64,
        any::<bool>(),
        0.5..10.0f64,
    )
        .prop_map(|(shape, x, y, opacity, filled, stroke)| {
            let mut element = Element::new(shape, x, y).with_opacity(opacity);
            element.filled = filled;
            element.stroke_width = stroke;
            element
        })
}

proptest! {
    #[test]
    fn reorder_at_boundary_is_noop(len in 1usize..12) {
        let elements = element_stack(len);
        let first = elements[0].id.clone();
        let last = elements[len - 1].id.clone();

        for (id, op) in [
            (&first, ReorderOp::ToBack),
            (&first, ReorderOp::Down),
            (&last, ReorderOp::ToFront),
            (&last, ReorderOp::Up),
        ] {
            let mut copy = elements.clone();
            prop_assert!(!reorder_elements(&mut copy, id, op));
            prop_assert_eq!(&copy, &elements);
        }
    }

    #[test]
    fn reorder_preserves_membership(len in 1usize..12, pick in 0usize..12, op_index in 0usize..4) {
        let elements = element_stack(len);
        let id = elements[pick % len].id.clone();
        let op = [ReorderOp::ToFront, ReorderOp::ToBack, ReorderOp::Up, ReorderOp::Down][op_index];
        let mut copy = elements.clone();
        reorder_elements(&mut copy, &id, op);

        let mut before: Vec<_> = elements.iter().map(|e| e.id.clone()).collect();
        let mut after: Vec<_> = copy.iter().map(|e| e.id.clone()).collect();
        before.sort();
        after.sort();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn undo_then_redo_is_inverse(snapshots in proptest::collection::vec(any::<u32>(), 1..20)) {
        let mut history = History::new(0u32);
        for s in &snapshots {
            history.record(*s, false);
        }
        let top = *history.current();
        prop_assert!(history.undo());
        let prior = snapshots.len().checked_sub(2).map(|i| snapshots[i]).unwrap_or(0);
        prop_assert_eq!(*history.current(), prior);
        prop_assert!(history.redo());
        prop_assert_eq!(*history.current(), top);
    }

    #[test]
    fn step_stays_within_bounds(ops in proptest::collection::vec(0u8..3, 0..40)) {
        let mut history = History::new(0usize);
        for (i, op) in ops.iter().enumerate() {
            match op {
                0 => history.record(i, false),
                1 => { history.undo(); }
                _ => { history.redo(); }
            }
            prop_assert!(history.step() < history.len());
            prop_assert_eq!(history.can_undo(), history.step() > 0);
            prop_assert_eq!(history.can_redo(), history.step() + 1 < history.len());
        }
    }

    #[test]
    fn store_round_trip(elements in proptest::collection::vec(arb_element(), 0..8), title in "[A-Za-z ]{0,20}") {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirTemplateStore::open(dir.path()).unwrap();

        let mut document = Document::new(title, &["name".to_string(), "date".to_string()]);
        for element in elements {
            document.insert(element);
        }

        let id = store.save(&document).unwrap();
        let loaded = store.load(&id).unwrap();
        prop_assert_eq!(&loaded.elements, &document.elements);
        prop_assert_eq!(&loaded.variables, &document.variables);
        prop_assert_eq!(&loaded.title, &document.title);
        prop_assert_eq!(loaded, document);
    }
}

#[test]
fn scenario_insert_undo_redo_rectangle() {
    let mut editor = Editor::blank("Scenario A", EditorDefaults::default());
    let id = editor.add_shape(ShapeKind::Rectangle, true).unwrap();
    assert_eq!(editor.elements().len(), 1);
    let inserted = editor.elements()[0].clone();
    assert_eq!(
        inserted.shape,
        Shape::Rectangle {
            width: 100.0,
            height: 100.0,
            corner_radius: 4.0
        }
    );

    editor.undo();
    assert_eq!(editor.elements().len(), 0);

    editor.redo();
    assert_eq!(editor.elements().len(), 1);
    assert_eq!(editor.elements()[0].id, id);
    assert_eq!(editor.elements()[0], inserted);
}

#[test]
fn scenario_move_down_then_noop_at_bottom() {
    let mut editor = Editor::new(Document::new("Scenario E", &[]));
    let ids: Vec<ElementId> = (0..5)
        .map(|_| editor.add_shape(ShapeKind::Circle, true).unwrap())
        .collect();
    let selected = ids[2].clone();

    assert!(editor.reorder(&selected, ReorderOp::Down));
    assert_eq!(editor.document().position_of(&selected), Some(1));
    assert_eq!(editor.document().position_of(&ids[1]), Some(2));

    assert!(editor.reorder(&selected, ReorderOp::Down));
    assert_eq!(editor.document().position_of(&selected), Some(0));

    let before = editor.elements().to_vec();
    assert!(!editor.reorder(&selected, ReorderOp::Down));
    assert_eq!(editor.elements(), before.as_slice());
}
