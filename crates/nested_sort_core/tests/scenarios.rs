use std::cell::RefCell;
use std::rc::Rc;

use nested_sort_core::{
    Bounds, Cursor, DataItem, DropLocation, NestingLevels, NodeId, Options, PlaceholderAction,
    Record, RecordedLayout, SortableTree, TreeItem,
};

const ROW: f32 = 32.;

/// Lay every item and placeholder out as one row each, in document order.
fn layout(sortable: &SortableTree) -> RecordedLayout {
    let tree = sortable.tree();
    let mut layout = RecordedLayout::new();
    let rows = tree
        .descendants(tree.root())
        .into_iter()
        .filter(|node| tree.is_item(*node) || tree.is_placeholder(*node));
    for (row, node) in rows.enumerate() {
        layout.record(node, Bounds::new(0., row as f32 * ROW, ROW));
    }
    layout
}

fn node(sortable: &SortableTree, id: &str) -> NodeId {
    sortable.tree().find_item(id).unwrap()
}

/// A point well inside the row of `node`, `indent` pixels from its left edge.
fn over(sortable: &SortableTree, node: NodeId, indent: f32) -> Cursor {
    let bounds = nested_sort_core::LayoutSource::bounds(&layout(sortable), node).unwrap();
    Cursor::new(bounds.left + indent, bounds.top + ROW - 4.)
}

fn record(id: &str, parent: Option<&str>, order: usize) -> Record {
    Record {
        id: id.to_string(),
        parent: parent.map(str::to_string),
        order,
    }
}

#[test]
fn dropping_before_a_sibling_reorders_a_flat_list() {
    let dropped: Rc<RefCell<Option<Vec<Record>>>> = Rc::default();
    let sink = Rc::clone(&dropped);
    let mut sortable = SortableTree::from_data(
        &[DataItem::new("1"), DataItem::new("2"), DataItem::new("3")],
        Options::default(),
    )
    .unwrap()
    .on_drop(move |records| *sink.borrow_mut() = Some(records.to_vec()));

    let one = node(&sortable, "1");
    let three = node(&sortable, "3");
    assert!(sortable.drag_start(one));
    assert!(sortable.drag_enter(three));
    let cursor = over(&sortable, three, 10.);
    sortable.drag_over(cursor, &layout(&sortable));
    assert_eq!(sortable.drop(), Some(DropLocation::Before));
    sortable.drag_end();

    let expected = vec![
        record("2", None, 1),
        record("1", None, 2),
        record("3", None, 3),
    ];
    assert_eq!(dropped.borrow().as_deref(), Some(expected.as_slice()));
    assert_eq!(sortable.records(), expected);
}

#[test]
fn indenting_over_an_item_nests_the_dropped_item() {
    let mut sortable = SortableTree::new(
        nested_sort_core::Tree::from_items(
            nested_sort_core::ListTag::Ordered,
            vec![
                TreeItem::new("1", "One").child(TreeItem::new("11", "One-One")),
                TreeItem::new("2", "Two"),
                TreeItem::new("3", "Three"),
            ],
        ),
        Options::default().nesting_levels(NestingLevels::Unlimited),
    );

    let two = node(&sortable, "2");
    let three = node(&sortable, "3");
    sortable.drag_start(two);
    sortable.drag_enter(three);
    let cursor = over(&sortable, three, 80.);
    assert_eq!(
        sortable.drag_over(cursor, &layout(&sortable)),
        Some(PlaceholderAction::Add)
    );

    let placeholder = sortable.placeholder().unwrap();
    assert!(sortable.drag_enter(placeholder));
    let cursor = over(&sortable, placeholder, 80.);
    assert_eq!(sortable.drag_over(cursor, &layout(&sortable)), None);
    assert_eq!(sortable.drop_location(), Some(DropLocation::Inside));
    assert_eq!(sortable.drop(), Some(DropLocation::Inside));

    let records = sortable.records();
    let moved = records.iter().find(|r| r.id == "2").unwrap();
    assert_eq!(moved, &record("2", Some("3"), 1));
    assert_eq!(
        sortable.tree().outline().trim(),
        r#"1
  11
3
  2"#
    );
}

#[test]
fn zero_nesting_levels_never_open_a_placeholder() {
    let mut sortable = SortableTree::from_data(
        &[
            DataItem::new("1"),
            DataItem::new("2"),
            DataItem::new("3"),
            DataItem::new("4"),
        ],
        Options::default().nesting_levels(NestingLevels::Limited(0)),
    )
    .unwrap();

    let one = node(&sortable, "1");
    sortable.drag_start(one);
    for id in ["2", "3", "4"] {
        let target = node(&sortable, id);
        assert!(sortable.drag_enter(target));
        for indent in [60., 120., 400.] {
            let cursor = over(&sortable, target, indent);
            let action = sortable.drag_over(cursor, &layout(&sortable));
            assert_ne!(action, Some(PlaceholderAction::Add));
            assert_eq!(sortable.placeholder(), None);
            assert_ne!(sortable.drop_location(), Some(DropLocation::Inside));
        }
    }
    assert_eq!(sortable.drop(), Some(DropLocation::Before));
    assert!(sortable.records().iter().all(|r| r.parent.is_none()));
}

#[test]
fn entering_a_new_item_moves_the_targeted_marker() {
    let mut sortable = SortableTree::from_data(
        &[DataItem::new("A"), DataItem::new("B"), DataItem::new("C")],
        Options::default(),
    )
    .unwrap();
    let a = node(&sortable, "A");
    let b = node(&sortable, "B");
    let c = node(&sortable, "C");

    sortable.drag_start(a);
    sortable.drag_enter(b);
    let tree = sortable.tree();
    assert!(tree.get(b).unwrap().is_targeted());
    assert!(tree.get(a).unwrap().is_dragged());

    sortable.drag_enter(c);
    let tree = sortable.tree();
    assert!(!tree.get(b).unwrap().is_targeted());
    assert!(tree.get(c).unwrap().is_targeted());
    assert!(tree.get(a).unwrap().is_dragged());
    assert_eq!(sortable.targeted(), Some(c));
    assert_eq!(
        tree.get(c).unwrap().class_list(),
        vec![nested_sort_core::TARGETED_CLASS]
    );
}

#[test]
fn drag_end_removes_an_open_placeholder() {
    let mut sortable = SortableTree::from_data(
        &[DataItem::new("1"), DataItem::new("2")],
        Options::default(),
    )
    .unwrap();
    let one = node(&sortable, "1");
    let two = node(&sortable, "2");
    sortable.drag_start(one);
    sortable.drag_enter(two);
    let cursor = over(&sortable, two, 90.);
    sortable.drag_over(cursor, &layout(&sortable));
    let placeholder = sortable.placeholder().unwrap();
    sortable.drag_enter(placeholder);

    sortable.drag_end();

    assert!(!sortable.tree().is_alive(placeholder));
    assert_eq!(sortable.placeholder(), None);
    assert_eq!(sortable.dragged(), None);
    assert_eq!(sortable.targeted(), None);
    assert!(!sortable.tree().get(one).unwrap().is_dragged());
    assert!(!sortable.tree().get(two).unwrap().is_targeted());
    assert_eq!(sortable.tree().outline().trim(), "1\n2");
}

#[test]
fn moving_the_last_child_out_removes_the_empty_list() {
    let mut sortable = SortableTree::from_data(
        &[
            DataItem::new("1"),
            DataItem::new("11").parent("1"),
            DataItem::new("2"),
        ],
        Options::default(),
    )
    .unwrap();
    let eleven = node(&sortable, "11");
    let two = node(&sortable, "2");
    let one = node(&sortable, "1");
    sortable.drag_start(eleven);
    sortable.drag_enter(two);
    assert_eq!(sortable.drop(), Some(DropLocation::Before));

    assert_eq!(sortable.tree().child_list(one), None);
    assert_eq!(
        sortable.records(),
        vec![
            record("1", None, 1),
            record("11", None, 2),
            record("2", None, 3)
        ]
    );
}

#[test]
fn mapped_records_use_the_callers_field_names() {
    let options = Options::from_json_str(
        r#"{ "property_map": { "id": "item_id", "parent": "item_parent", "order": "position" } }"#,
    )
    .unwrap();
    let sortable = SortableTree::from_json(
        &serde_json::json!([
            { "item_id": 1, "text": "One" },
            { "item_id": 11, "item_parent": 1 },
        ]),
        options,
    )
    .unwrap();
    assert_eq!(
        sortable.mapped_records(),
        vec![
            serde_json::json!({ "item_id": "1", "position": 1 }),
            serde_json::json!({ "item_id": "11", "item_parent": "1", "position": 1 }),
        ]
    );
}
