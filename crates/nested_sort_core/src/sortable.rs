use serde_json::Value;
use tracing::{debug, trace};

use crate::codec::{self, CodecError, DataItem, Record};
use crate::config::Options;
use crate::depth::{ThresholdCheck, nesting_threshold_reached};
use crate::geometry::{Cursor, Distances, LayoutSource, compute_distances};
use crate::session::DragSession;
use crate::tree::{NodeId, Tree};

pub type DropCallback = Box<dyn FnMut(&[Record])>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaceholderAction {
    /// Drop any stray placeholder, then open a new one under the target.
    Add,
    Cleanup,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropLocation {
    /// Insert the dragged item as the target's preceding sibling.
    Before,
    /// Append the dragged item to the targeted placeholder list.
    Inside,
}

/// A nested list whose items can be reordered and re-parented by dragging.
///
/// Feed it the gesture's events in arrival order; it keeps the one [`DragSession`],
/// maintains the placeholder list and moves nodes on drop.
pub struct SortableTree {
    tree: Tree,
    options: Options,
    session: DragSession,
    cursor: Option<Cursor>,
    distances: Option<Distances>,
    initialised: bool,
    on_drop: Option<DropCallback>,
}

impl SortableTree {
    pub fn new(tree: Tree, options: Options) -> Self {
        let init = options.init;
        let mut this = Self {
            tree,
            options,
            session: DragSession::default(),
            cursor: None,
            distances: None,
            initialised: false,
            on_drop: None,
        };
        this.add_list_attributes();
        if init {
            this.init();
        }
        this
    }

    pub fn from_data(items: &[DataItem], options: Options) -> Result<Self, CodecError> {
        let tree = codec::build_tree(items)?;
        Ok(Self::new(tree, options))
    }

    /// Build from caller records, translated through the configured property map.
    pub fn from_json(records: &Value, options: Options) -> Result<Self, CodecError> {
        let items = codec::data_items_from_json(records, &options.property_map)?;
        Self::from_data(&items, options)
    }

    pub fn on_drop(mut self, on_drop: impl FnMut(&[Record]) + 'static) -> Self {
        self.on_drop = Some(Box::new(on_drop));
        self
    }

    pub fn set_on_drop(&mut self, on_drop: Option<DropCallback>) {
        self.on_drop = on_drop;
    }

    #[inline]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    #[inline]
    pub fn options(&self) -> &Options {
        &self.options
    }

    #[inline]
    pub fn session(&self) -> DragSession {
        self.session
    }

    pub fn dragged(&self) -> Option<NodeId> {
        self.session.dragged()
    }

    pub fn targeted(&self) -> Option<NodeId> {
        self.session.targeted()
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    pub fn distances(&self) -> Option<Distances> {
        self.distances
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    /// The placeholder list currently open, looked up in the live tree.
    pub fn placeholder(&self) -> Option<NodeId> {
        self.tree
            .lists_in(self.tree.root())
            .into_iter()
            .find(|list| self.tree.is_placeholder(*list))
    }

    pub fn records(&self) -> Vec<Record> {
        codec::serialize(&self.tree)
    }

    pub fn mapped_records(&self) -> Vec<Value> {
        codec::serialize_mapped(&self.tree, &self.options.property_map)
    }

    fn add_list_attributes(&mut self) {
        let root = self.tree.root();
        let mut root_classes = self.options.list_class_names.as_slice().to_vec();
        root_classes.push(self.options.main_list_class_name().to_string());
        self.tree.add_classes(root, &root_classes);

        for list in self.tree.lists_in(root) {
            self.tree
                .add_classes(list, self.options.list_class_names.as_slice());
        }
        for item in self.tree.items_in(root) {
            self.tree
                .add_classes(item, self.options.list_item_class_names.as_slice());
        }
    }

    fn set_items_draggable(&mut self, draggable: bool) {
        for item in self.tree.items_in(self.tree.root()) {
            self.tree.set_draggable(item, draggable);
        }
    }

    fn toggle_enabled_class(&mut self, enabled: bool) {
        let root = self.tree.root();
        let class = [self.options.enabled_class_name()];
        if enabled {
            self.tree.add_classes(root, &class);
        } else {
            self.tree.remove_classes(root, &class);
        }
    }

    /// Start accepting drag events. Calling it again is a no-op.
    pub fn init(&mut self) {
        if self.initialised {
            return;
        }
        self.set_items_draggable(true);
        self.toggle_enabled_class(true);
        self.initialised = true;
        debug!("nested sort initialised");
    }

    /// Stop accepting drag events, settling any gesture still in flight.
    pub fn destroy(&mut self) {
        if !self.initialised {
            return;
        }
        if !self.session.is_idle() {
            self.finish_gesture();
        }
        self.set_items_draggable(false);
        self.toggle_enabled_class(false);
        self.initialised = false;
        debug!("nested sort destroyed");
    }

    pub fn drag_start(&mut self, item: NodeId) -> bool {
        if !self.initialised || !self.tree.is_item(item) {
            return false;
        }
        if !self.session.start(item) {
            trace!(?item, "drag start ignored, a gesture is already running");
            return false;
        }
        self.tree.set_dragged(item, true);
        debug!(?item, "drag started");
        true
    }

    pub fn can_be_targeted(&self, candidate: NodeId) -> bool {
        let Some(dragged) = self.session.dragged() else {
            return false;
        };
        if candidate == dragged {
            return false;
        }
        if self.tree.is_item(candidate) {
            return !self.nesting_threshold_reached(candidate, ThresholdCheck::Drop);
        }
        self.tree.is_list(candidate) && self.tree.is_placeholder(candidate)
    }

    pub fn drag_enter(&mut self, candidate: NodeId) -> bool {
        if !self.initialised || !self.can_be_targeted(candidate) {
            return false;
        }
        if let Some(previous) = self.session.target(candidate) {
            self.tree.set_targeted(previous, false);
        }
        self.tree.set_targeted(candidate, true);
        trace!(?candidate, "targeted");
        true
    }

    /// Track the cursor against the targeted node and open or close placeholders.
    pub fn drag_over(
        &mut self,
        cursor: Cursor,
        layout: &impl LayoutSource,
    ) -> Option<PlaceholderAction> {
        if !self.initialised || self.session.is_idle() {
            return None;
        }
        self.update_coordination(cursor, layout);
        let action = self.analyse_placeholder_situation();
        match action {
            Some(PlaceholderAction::Add) => {
                self.cleanup_placeholder_lists();
                self.add_placeholder_list(layout);
            }
            Some(PlaceholderAction::Cleanup) => self.cleanup_placeholder_lists(),
            None => {}
        }
        action
    }

    fn live_target(&self) -> Option<NodeId> {
        self.session
            .targeted()
            .filter(|target| self.tree.is_alive(*target))
    }

    fn update_coordination(&mut self, cursor: Cursor, layout: &impl LayoutSource) {
        self.cursor = Some(cursor);
        if self.session.targeted().is_some() && self.live_target().is_none() {
            trace!("targeted node is gone");
            self.session.untarget();
        }
        self.distances = self
            .live_target()
            .and_then(|target| layout.bounds(target))
            .map(|bounds| compute_distances(cursor, bounds));
    }

    fn nesting_threshold_reached(&self, node: NodeId, check: ThresholdCheck) -> bool {
        nesting_threshold_reached(
            &self.tree,
            self.options.nesting_levels,
            node,
            self.session.dragged(),
            check,
        )
    }

    fn target_is_nested_in_dragged(&self, target: NodeId) -> bool {
        self.session
            .dragged()
            .is_some_and(|dragged| self.tree.contains(dragged, target))
    }

    pub fn analyse_placeholder_situation(&self) -> Option<PlaceholderAction> {
        let target = self.live_target()?;
        if self.target_is_nested_in_dragged(target) {
            return None;
        }
        let distances = self.distances?;

        if !distances.cursor_is_indented_enough()
            || distances.cursor_is_too_close_to_top(self.options.dropping_edge)
        {
            return (!self.tree.is_placeholder(target)).then_some(PlaceholderAction::Cleanup);
        }

        if Some(target) != self.session.dragged()
            && self.tree.is_item(target)
            && self.tree.child_list(target).is_none()
            && !self.nesting_threshold_reached(target, ThresholdCheck::Placeholder)
        {
            return Some(PlaceholderAction::Add);
        }

        None
    }

    fn add_placeholder_list(&mut self, layout: &impl LayoutSource) {
        let Some(target) = self.live_target() else {
            return;
        };
        let list = self.tree.create_list();
        self.tree.set_placeholder(list, true);
        self.tree
            .add_classes(list, self.options.list_class_names.as_slice());
        let height = self.session.dragged().and_then(|dragged| layout.height(dragged));
        self.tree.set_min_height(list, Some(height.unwrap_or(0.)));
        self.tree.append_child(target, list);
        trace!(?target, ?list, "placeholder opened");
    }

    pub fn can_be_dropped(&self) -> bool {
        let Some(target) = self.live_target() else {
            return false;
        };
        if Some(target) == self.session.dragged() {
            return false;
        }
        if self.tree.is_list(target) && !self.tree.items_in(target).is_empty() {
            return false;
        }
        !self.target_is_nested_in_dragged(target)
    }

    pub fn drop_location(&self) -> Option<DropLocation> {
        if !self.can_be_dropped() {
            return None;
        }
        let target = self.live_target()?;
        if self.tree.is_item(target) {
            Some(DropLocation::Before)
        } else if self.tree.is_list(target) {
            Some(DropLocation::Inside)
        } else {
            None
        }
    }

    /// Settle the gesture on the current target, returning where the item landed.
    ///
    /// The drop callback runs with the serialized tree even when nothing moved.
    pub fn drop(&mut self) -> Option<DropLocation> {
        if !self.initialised || self.session.is_idle() {
            return None;
        }
        let location = self.drop_location();
        if let (Some(location), Some(dragged), Some(target)) =
            (location, self.session.dragged(), self.live_target())
        {
            self.move_node(dragged, target, location);
        } else {
            debug!("drop without a valid location");
        }
        self.cleanup_placeholder_lists();

        if let Some(on_drop) = self.on_drop.as_mut() {
            let records = codec::serialize(&self.tree);
            on_drop(&records);
        }

        self.finish_gesture();
        location
    }

    fn move_node(&mut self, node: NodeId, target: NodeId, location: DropLocation) -> bool {
        let moved = match location {
            DropLocation::Before => self.tree.insert_before(target, node),
            DropLocation::Inside => self.tree.append_child(target, node),
        };
        if moved {
            debug!(?node, ?target, ?location, "dropped");
        } else {
            debug!(?node, ?target, ?location, "drop refused by the tree");
        }
        moved
    }

    pub fn drag_end(&mut self) {
        if !self.initialised {
            return;
        }
        self.finish_gesture();
    }

    fn finish_gesture(&mut self) {
        let session = self.session.finish();
        if let Some(dragged) = session.dragged() {
            self.tree.set_dragged(dragged, false);
        }
        if let Some(targeted) = session.targeted() {
            self.tree.set_targeted(targeted, false);
        }
        self.cleanup_placeholder_lists();
        self.cursor = None;
        self.distances = None;
        if !session.is_idle() {
            debug!("drag ended");
        }
    }

    /// Remove lists without items and turn filled placeholders into permanent branch lists.
    pub fn cleanup_placeholder_lists(&mut self) {
        for list in self.tree.lists_in(self.tree.root()) {
            if !self.tree.is_alive(list) {
                continue;
            }
            if self.tree.items_in(list).is_empty() {
                self.tree.remove(list);
            } else if self.tree.is_placeholder(list) {
                self.tree.set_placeholder(list, false);
                self.tree.set_min_height(list, None);
                let owner_id = self
                    .tree
                    .parent(list)
                    .and_then(|owner| self.tree.get(owner))
                    .and_then(|owner| owner.id())
                    .map(str::to_string);
                self.tree.set_list_id(list, owner_id);
            }
        }
    }

    /// Add a top-level item, first or last, and return the serialized tree.
    pub fn add_new_item(&mut self, item: DataItem, as_last_child: bool) -> Vec<Record> {
        let root = self.tree.root();
        let node = self.tree.create_item(item.id, item.text);
        self.tree.set_draggable(node, self.initialised);
        self.tree
            .add_classes(node, self.options.list_item_class_names.as_slice());

        match self.tree.children(root).first().copied() {
            Some(first) if !as_last_child => {
                self.tree.insert_before(first, node);
            }
            _ => {
                self.tree.append_child(root, node);
            }
        }
        self.records()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::NestingLevels;
    use crate::geometry::{Bounds, RecordedLayout};
    use crate::tree::{ListTag, TreeItem};

    const ROW: f32 = 30.;

    fn sortable(items: Vec<TreeItem>, options: Options) -> SortableTree {
        SortableTree::new(Tree::from_items(ListTag::Ordered, items), options)
    }

    fn node(sortable: &SortableTree, id: &str) -> NodeId {
        sortable.tree().find_item(id).unwrap()
    }

    fn layout_for(sortable: &SortableTree) -> RecordedLayout {
        let tree = sortable.tree();
        let mut layout = RecordedLayout::new();
        for (row, item) in tree.items_in(tree.root()).into_iter().enumerate() {
            layout.record(item, Bounds::new(0., row as f32 * ROW, ROW));
        }
        layout
    }

    fn flat() -> Vec<TreeItem> {
        vec![
            TreeItem::new("1", "One"),
            TreeItem::new("2", "Two"),
            TreeItem::new("3", "Three"),
        ]
    }

    #[test]
    fn drag_start_is_ignored_while_dragging() {
        let mut s = sortable(flat(), Options::default());
        let one = node(&s, "1");
        let two = node(&s, "2");
        assert!(s.drag_start(one));
        assert!(!s.drag_start(two));
        assert_eq!(s.dragged(), Some(one));
        assert!(!s.tree().get(two).unwrap().is_dragged());
    }

    #[test]
    fn events_are_ignored_until_initialised() {
        let mut s = sortable(flat(), Options::default().init(false));
        let root = s.tree().root();
        let one = node(&s, "1");
        assert!(!s.tree().get(one).unwrap().is_draggable());
        assert!(!s.drag_start(one));
        assert_eq!(s.tree().get(root).unwrap().classes(), &["nested-sort".to_string()]);
        s.init();
        s.init();
        assert!(s.tree().get(one).unwrap().is_draggable());
        assert_eq!(
            s.tree().get(root).unwrap().classes(),
            &["nested-sort".to_string(), "nested-sort--enabled".to_string()]
        );
        assert!(s.drag_start(one));
        s.destroy();
        assert!(s.session().is_idle());
        assert!(!s.tree().get(one).unwrap().is_dragged());
        assert!(!s.tree().get(one).unwrap().is_draggable());
        assert_eq!(s.tree().get(root).unwrap().classes(), &["nested-sort".to_string()]);
    }

    #[test]
    fn lists_are_only_targetable_as_placeholders() {
        let mut s = sortable(
            vec![TreeItem::new("1", "One").child(TreeItem::new("11", "One-One"))],
            Options::default(),
        );
        let one = node(&s, "1");
        let eleven = node(&s, "11");
        let list = s.tree().child_list(one).unwrap();
        assert!(!s.can_be_targeted(eleven));
        s.drag_start(eleven);
        assert!(!s.can_be_targeted(list));
        assert!(!s.can_be_targeted(eleven));
        assert!(s.can_be_targeted(one));
    }

    #[test]
    fn shallow_cursor_cleans_up_but_leaves_a_targeted_placeholder() {
        let mut s = sortable(flat(), Options::default());
        let one = node(&s, "1");
        let two = node(&s, "2");
        let layout = layout_for(&s);
        s.drag_start(one);
        s.drag_enter(two);
        assert_eq!(
            s.drag_over(Cursor::new(80., ROW + 20.), &layout),
            Some(PlaceholderAction::Add)
        );
        let placeholder = s.placeholder().unwrap();
        assert_eq!(s.tree().get(placeholder).unwrap().min_height(), Some(ROW));

        let layout = layout.with(placeholder, Bounds::new(20., ROW * 2., ROW));
        assert!(s.drag_enter(placeholder));
        assert_eq!(s.drag_over(Cursor::new(10., ROW * 2. + 20.), &layout), None);
        assert_eq!(s.placeholder(), Some(placeholder));

        s.drag_enter(two);
        assert_eq!(
            s.drag_over(Cursor::new(10., ROW + 20.), &layout),
            Some(PlaceholderAction::Cleanup)
        );
        assert_eq!(s.placeholder(), None);
    }

    #[test]
    fn cursor_near_the_top_edge_does_not_nest() {
        let mut s = sortable(flat(), Options::default());
        let one = node(&s, "1");
        let two = node(&s, "2");
        let layout = layout_for(&s);
        s.drag_start(one);
        s.drag_enter(two);
        assert_eq!(
            s.drag_over(Cursor::new(80., ROW + 5.), &layout),
            Some(PlaceholderAction::Cleanup)
        );
        assert_eq!(s.placeholder(), None);
    }

    #[test]
    fn items_with_a_list_do_not_get_a_placeholder() {
        let mut s = sortable(
            vec![
                TreeItem::new("1", "One"),
                TreeItem::new("2", "Two").child(TreeItem::new("21", "Two-One")),
            ],
            Options::default(),
        );
        let one = node(&s, "1");
        let two = node(&s, "2");
        let layout = layout_for(&s);
        s.drag_start(one);
        s.drag_enter(two);
        assert_eq!(s.drag_over(Cursor::new(80., ROW + 20.), &layout), None);
        assert_eq!(s.placeholder(), None);
    }

    #[test]
    fn drag_over_without_target_does_nothing() {
        let mut s = sortable(flat(), Options::default());
        let one = node(&s, "1");
        let layout = layout_for(&s);
        assert_eq!(s.drag_over(Cursor::new(80., 20.), &layout), None);
        s.drag_start(one);
        assert_eq!(s.drag_over(Cursor::new(80., 20.), &layout), None);
        assert_eq!(s.distances(), None);
        assert_eq!(s.cursor(), Some(Cursor::new(80., 20.)));
    }

    #[test]
    fn stale_target_is_dropped_from_the_session() {
        let mut s = sortable(flat(), Options::default());
        let one = node(&s, "1");
        let two = node(&s, "2");
        let layout = layout_for(&s);
        s.drag_start(one);
        s.drag_enter(two);
        s.drag_over(Cursor::new(80., ROW + 20.), &layout);
        let placeholder = s.placeholder().unwrap();
        s.drag_enter(placeholder);
        s.cleanup_placeholder_lists();

        assert_eq!(s.drag_over(Cursor::new(80., ROW + 20.), &layout), None);
        assert_eq!(s.session(), DragSession::Dragging { dragged: one });
        assert_eq!(s.drop_location(), None);
    }

    #[test]
    fn drop_inside_placeholder_makes_it_a_branch_list() {
        let mut s = sortable(flat(), Options::default().list_class_names("tree"));
        let one = node(&s, "1");
        let two = node(&s, "2");
        let layout = layout_for(&s);
        s.drag_start(one);
        s.drag_enter(two);
        s.drag_over(Cursor::new(80., ROW + 20.), &layout);
        let placeholder = s.placeholder().unwrap();
        s.drag_enter(placeholder);

        assert_eq!(s.drop(), Some(DropLocation::Inside));
        let list = s.tree().get(placeholder).unwrap();
        assert!(!list.is_placeholder());
        assert_eq!(list.min_height(), None);
        assert_eq!(list.id(), Some("2"));
        assert_eq!(list.classes(), &["tree".to_string()]);
        assert_eq!(
            s.tree().outline().trim(),
            r#"2
  1
3"#
        );
        assert!(s.session().is_idle());
    }

    #[test]
    fn nesting_limit_blocks_targets_and_placeholders() {
        let mut s = sortable(
            vec![
                TreeItem::new("1", "One").child(TreeItem::new("11", "One-One")),
                TreeItem::new("2", "Two").child(TreeItem::new("21", "Two-One")),
            ],
            Options::default().nesting_levels(NestingLevels::Limited(1)),
        );
        let one = node(&s, "1");
        let two = node(&s, "2");
        let twenty_one = node(&s, "21");
        s.drag_start(one);
        assert!(!s.can_be_targeted(twenty_one));
        assert!(s.can_be_targeted(two));
        s.drag_end();

        let eleven = node(&s, "11");
        s.drag_start(eleven);
        assert!(s.drag_enter(twenty_one));
        let layout = layout_for(&s);
        let row = s
            .tree()
            .items_in(s.tree().root())
            .iter()
            .position(|n| *n == twenty_one)
            .unwrap() as f32;
        assert_eq!(
            s.drag_over(Cursor::new(80., row * ROW + 20.), &layout),
            None
        );
        assert_eq!(s.placeholder(), None);
        assert_eq!(s.options().nesting_levels, NestingLevels::Limited(1));
    }

    #[test]
    fn refused_moves_leave_the_tree_alone() {
        let mut s = sortable(
            vec![
                TreeItem::new("1", "One").child(TreeItem::new("11", "One-One")),
                TreeItem::new("2", "Two"),
            ],
            Options::default(),
        );
        let one = node(&s, "1");
        let eleven = node(&s, "11");
        let two = node(&s, "2");
        let list = s.tree().child_list(one).unwrap();
        let before = s.tree().outline();

        assert!(!s.move_node(one, list, DropLocation::Inside));
        assert!(!s.move_node(one, eleven, DropLocation::Before));
        assert_eq!(s.tree().outline(), before);

        assert!(s.move_node(two, one, DropLocation::Before));
        assert_eq!(s.tree().outline().trim(), "2\n1\n  11");
    }

    #[test]
    fn drop_callback_runs_even_without_a_move() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let calls: Rc<RefCell<Vec<Vec<Record>>>> = Rc::default();
        let sink = Rc::clone(&calls);
        let mut s = sortable(flat(), Options::default())
            .on_drop(move |records| sink.borrow_mut().push(records.to_vec()));
        let one = node(&s, "1");
        s.drag_start(one);
        assert_eq!(s.drop(), None);
        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(calls.borrow()[0], s.records());
    }

    #[test]
    fn add_new_item_respects_position_and_lifecycle() {
        let mut s = sortable(flat(), Options::default().list_item_class_names("row"));
        let records = s.add_new_item(DataItem::new("0").text("Zero"), false);
        assert_eq!(records[0].id, "0");
        let records = s.add_new_item(DataItem::new("4"), true);
        assert_eq!(records.last().unwrap().id, "4");
        assert_eq!(records.last().unwrap().order, 5);

        let zero = node(&s, "0");
        assert!(s.tree().get(zero).unwrap().is_draggable());
        assert_eq!(s.tree().get(zero).unwrap().classes(), &["row".to_string()]);

        s.destroy();
        s.add_new_item(DataItem::new("5"), true);
        let five = node(&s, "5");
        assert!(!s.tree().get(five).unwrap().is_draggable());
    }

    #[test]
    fn main_list_gets_list_classes_and_main_class() {
        let s = sortable(
            vec![TreeItem::new("1", "One").child(TreeItem::new("11", "One-One"))],
            Options::default().list_class_names("a b"),
        );
        let root = s.tree().get(s.tree().root()).unwrap();
        assert_eq!(
            root.classes(),
            &["a".to_string(), "b".to_string(), "a--enabled".to_string()]
        );
        let one = node(&s, "1");
        let nested = s.tree().child_list(one).unwrap();
        assert_eq!(
            s.tree().get(nested).unwrap().classes(),
            &["a".to_string(), "b".to_string()]
        );

        let plain = sortable(flat(), Options::default());
        let root = plain.tree().get(plain.tree().root()).unwrap();
        assert_eq!(
            root.classes(),
            &["nested-sort".to_string(), "nested-sort--enabled".to_string()]
        );
    }
}
