use std::{ops::Range, rc::Rc};

use gpui::{
    App, AppContext as _, Context, ElementId, Entity, EntityId, EventEmitter, FocusHandle,
    InteractiveElement as _, IntoElement, ListSizingBehavior, ParentElement as _, Pixels, Render,
    RenderOnce, SharedString, StatefulInteractiveElement as _, StyleRefinement, Styled,
    UniformListScrollHandle, Window, div, prelude::FluentBuilder as _, px, uniform_list,
};
use gpui_component::list::ListItem;
use gpui_component::scroll::{Scrollbar, ScrollbarState};
use gpui_component::{ActiveTheme as _, StyledExt as _};
use nested_sort_core::{
    Bounds as NodeBounds, CodecError, Cursor, DataItem, DropLocation, ListTag, Node, NodeId,
    NodeKind, Options, Record, RecordedLayout, SortableTree, Tree, TreeItem, build_tree,
};
use tracing::debug;

const CONTEXT: &str = "NestedSort";

type RenderRowFn =
    dyn Fn(usize, &NestedSortRow, NestedSortRowState, &mut Window, &mut App) -> ListItem;

/// Create a [`NestedSort`].
pub fn nested_sort<R>(state: &Entity<NestedSortState>, render_item: R) -> NestedSort
where
    R: Fn(usize, &NestedSortRow, NestedSortRowState, &mut Window, &mut App) -> ListItem + 'static,
{
    NestedSort::new(state, render_item)
}

#[derive(Clone)]
struct NestedSortDrag {
    sort_id: EntityId,
    node: NodeId,
    label: SharedString,
    carried: usize,
}

/// Label following the cursor, with the number of descendants travelling along.
struct DragGhost {
    label: SharedString,
    carried: usize,
}

impl Render for DragGhost {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        div()
            .flex()
            .items_center()
            .gap_x_2()
            .px(px(10.))
            .py(px(6.))
            .rounded(px(8.))
            .bg(theme.popover)
            .border_1()
            .border_color(theme.border)
            .shadow_md()
            .text_color(theme.popover_foreground)
            .text_sm()
            .child(self.label.clone())
            .when(self.carried > 0, |this| {
                this.child(
                    div()
                        .text_color(theme.muted_foreground)
                        .child(format!("+{}", self.carried)),
                )
            })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NestedSortRowKind {
    Item,
    /// The open drop slot under the item it would nest into.
    Placeholder,
}

/// One visible row: an item, or the placeholder slot opened below one.
#[derive(Clone, Debug)]
pub struct NestedSortRow {
    node: NodeId,
    kind: NestedSortRowKind,
    id: Option<SharedString>,
    label: SharedString,
    depth: usize,
    min_height: Option<f32>,
}

impl NestedSortRow {
    #[inline]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[inline]
    pub fn kind(&self) -> NestedSortRowKind {
        self.kind
    }

    #[inline]
    pub fn id(&self) -> Option<&SharedString> {
        self.id.as_ref()
    }

    #[inline]
    pub fn label(&self) -> &SharedString {
        &self.label
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn is_placeholder(&self) -> bool {
        self.kind == NestedSortRowKind::Placeholder
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NestedSortRowState {
    pub dragged: bool,
    pub targeted: bool,
    pub draggable: bool,
}

#[derive(Clone, Debug)]
pub enum NestedSortEvent {
    /// A gesture ended with a drop; `records` is the tree after the move, if any.
    Dropped {
        location: Option<DropLocation>,
        records: Vec<Record>,
    },
}

/// State for a sortable nested list.
pub struct NestedSortState {
    focus_handle: FocusHandle,
    sortable: SortableTree,
    rows: Vec<NestedSortRow>,
    layout: RecordedLayout,
    entered: Option<NodeId>,
    indent_width: Pixels,
    scrollbar_state: ScrollbarState,
    scroll_handle: UniformListScrollHandle,
    render_item: Rc<RenderRowFn>,
}

impl EventEmitter<NestedSortEvent> for NestedSortState {}

impl NestedSortState {
    pub fn new(cx: &mut App) -> Self {
        Self {
            focus_handle: cx.focus_handle(),
            sortable: SortableTree::new(Tree::default(), Options::default()),
            rows: Vec::new(),
            layout: RecordedLayout::new(),
            entered: None,
            indent_width: px(16.),
            scrollbar_state: ScrollbarState::default(),
            scroll_handle: UniformListScrollHandle::default(),
            render_item: Rc::new(|_, _, _, _, _| ListItem::new("nested-sort-empty")),
        }
    }

    /// Indentation per nesting level.
    ///
    /// This should match the indentation used by your row renderer, since the cursor's
    /// indent is measured from the indented left edge of the row.
    pub fn indent_width(mut self, indent_width: Pixels) -> Self {
        self.indent_width = indent_width;
        self
    }

    pub fn options(mut self, options: Options) -> Self {
        let tree = self.sortable.tree().clone();
        self.replace(tree, options);
        self
    }

    /// Use nested items as the initial tree.
    pub fn items(mut self, items: impl Into<Vec<TreeItem>>) -> Self {
        let options = self.sortable.options().clone();
        self.replace(Tree::from_items(ListTag::Unordered, items), options);
        self
    }

    /// Use flat records as the initial tree.
    pub fn data(mut self, items: &[DataItem]) -> Result<Self, CodecError> {
        let options = self.sortable.options().clone();
        self.replace(build_tree(items)?, options);
        Ok(self)
    }

    pub fn set_data(&mut self, items: &[DataItem], cx: &mut Context<Self>) -> Result<(), CodecError> {
        let tree = build_tree(items)?;
        let options = self.sortable.options().clone();
        self.replace(tree, options);
        cx.notify();
        Ok(())
    }

    fn replace(&mut self, tree: Tree, options: Options) {
        self.sortable = SortableTree::new(tree, options);
        self.entered = None;
        self.layout.clear();
        self.rebuild_rows();
    }

    pub fn sortable(&self) -> &SortableTree {
        &self.sortable
    }

    /// Whether the tree renders as an ordered or unordered list.
    pub fn list_tag(&self) -> ListTag {
        self.sortable.tree().list_tag()
    }

    pub fn rows(&self) -> &[NestedSortRow] {
        &self.rows
    }

    pub fn records(&self) -> Vec<Record> {
        self.sortable.records()
    }

    pub fn is_initialised(&self) -> bool {
        self.sortable.is_initialised()
    }

    /// Start listening for drags. Calling it twice is harmless.
    pub fn init(&mut self, cx: &mut Context<Self>) {
        self.sortable.init();
        self.rebuild_rows();
        cx.notify();
    }

    /// Detach the drag listeners on the next render.
    pub fn destroy(&mut self, cx: &mut Context<Self>) {
        self.sortable.destroy();
        self.entered = None;
        self.layout.clear();
        self.rebuild_rows();
        cx.notify();
    }

    pub fn add_new_item(
        &mut self,
        item: DataItem,
        as_last_child: bool,
        cx: &mut Context<Self>,
    ) -> Vec<Record> {
        let records = self.sortable.add_new_item(item, as_last_child);
        self.rebuild_rows();
        cx.notify();
        records
    }

    fn rebuild_rows(&mut self) {
        let tree = self.sortable.tree();
        let mut rows = Vec::with_capacity(self.rows.len());
        push_rows(tree, tree.root(), 0, &mut rows);
        self.rows = rows;
    }

    fn reset_gesture(&mut self) {
        self.entered = None;
        self.layout.clear();
        self.rebuild_rows();
    }

    fn on_drag_start(&mut self, drag: &NestedSortDrag, cx: &mut Context<Self>) {
        if !self.sortable.drag_start(drag.node) {
            return;
        }
        self.entered = None;
        self.rebuild_rows();
        cx.notify();
    }

    fn on_row_drag_move(
        &mut self,
        row_ix: usize,
        event: &gpui::DragMoveEvent<NestedSortDrag>,
        _window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        if !cx.has_active_drag() {
            return;
        }

        let drag = event.drag(cx);
        if drag.sort_id != cx.entity_id() {
            return;
        }

        let mouse_position = event.event.position;
        if !event.bounds.contains(&mouse_position) {
            return;
        }
        let Some(row) = self.rows.get(row_ix) else {
            return;
        };
        let node = row.node;
        self.layout
            .record(node, row_bounds(event.bounds, row.depth, self.indent_width));

        let mut changed = false;
        if self.entered != Some(node) {
            self.entered = Some(node);
            changed |= self.sortable.drag_enter(node);
        }

        let cursor = Cursor::new(to_f32(mouse_position.x), to_f32(mouse_position.y));
        if self.sortable.drag_over(cursor, &self.layout).is_some() {
            self.rebuild_rows();
            changed = true;
        }

        if changed {
            cx.notify();
        }
    }

    fn on_drop(&mut self, drag: &NestedSortDrag, _window: &mut Window, cx: &mut Context<Self>) {
        if drag.sort_id != cx.entity_id() || self.sortable.session().is_idle() {
            return;
        }

        let location = self.sortable.drop();
        self.reset_gesture();
        let records = self.sortable.records();
        debug!(?location, items = records.len(), "nested sort drop");
        cx.emit(NestedSortEvent::Dropped { location, records });
        cx.notify();
    }
}

impl Render for NestedSortState {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        if !cx.has_active_drag() && !self.sortable.session().is_idle() {
            self.sortable.drag_end();
            self.reset_gesture();
        }

        let render_item = Rc::clone(&self.render_item);
        let state_entity = cx.entity();
        let enabled = self.sortable.is_initialised();
        let indent_width = self.indent_width;

        div()
            .id("nested-sort-state")
            .size_full()
            .relative()
            .child(
                uniform_list("rows", self.rows.len(), {
                    cx.processor(move |state, visible_range: Range<usize>, window, cx| {
                        let targeted_bg = cx.theme().drop_target;
                        let slot_border = cx.theme().drag_border;
                        let mut rows = Vec::with_capacity(visible_range.len());
                        for ix in visible_range {
                            let row = state.rows[ix].clone();
                            let node = state.sortable.tree().get(row.node);
                            let row_state = NestedSortRowState {
                                dragged: node.is_some_and(Node::is_dragged),
                                targeted: node.is_some_and(Node::is_targeted),
                                draggable: enabled && node.is_some_and(Node::is_draggable),
                            };
                            let carried = state.sortable.tree().items_in(row.node).len();

                            let el = div()
                                .id(ix)
                                .when(row_state.targeted, |this| this.bg(targeted_bg));
                            let el = match row.kind {
                                NestedSortRowKind::Placeholder => el.child(
                                    div()
                                        .ml(indent_width * row.depth)
                                        .min_h(px(row.min_height.unwrap_or(0.)))
                                        .rounded(px(4.))
                                        .border_1()
                                        .border_color(slot_border),
                                ),
                                NestedSortRowKind::Item => {
                                    el.child((render_item)(ix, &row, row_state, window, cx))
                                }
                            };

                            let drag_value = NestedSortDrag {
                                sort_id: cx.entity_id(),
                                node: row.node,
                                label: row.label.clone(),
                                carried,
                            };
                            let el = el
                                .when(enabled, |this| {
                                    this.on_drag_move::<NestedSortDrag>(cx.listener(
                                        move |this, ev, window, cx| {
                                            this.on_row_drag_move(ix, ev, window, cx);
                                        },
                                    ))
                                    .on_drop::<NestedSortDrag>(cx.listener(Self::on_drop))
                                })
                                .when(row_state.draggable, |this| {
                                    let state_entity = state_entity.clone();
                                    this.on_drag(
                                        drag_value,
                                        move |drag, _cursor_offset, _window, cx| {
                                            state_entity.update(cx, |state, cx| {
                                                state.on_drag_start(drag, cx);
                                            });
                                            let ghost = DragGhost {
                                                label: drag.label.clone(),
                                                carried: drag.carried,
                                            };
                                            cx.new(|_| ghost)
                                        },
                                    )
                                });

                            rows.push(el);
                        }
                        rows
                    })
                })
                .when(enabled, |this| {
                    this.on_drop::<NestedSortDrag>(cx.listener(Self::on_drop))
                })
                .flex_grow()
                .size_full()
                .track_scroll(self.scroll_handle.clone())
                .with_sizing_behavior(ListSizingBehavior::Auto)
                .into_any_element(),
            )
            .child(
                div()
                    .absolute()
                    .top_0()
                    .right_0()
                    .bottom_0()
                    .w(px(12.))
                    .child(Scrollbar::uniform_scroll(
                        &self.scrollbar_state,
                        &self.scroll_handle,
                    )),
            )
    }
}

/// A sortable nested list element.
#[derive(IntoElement)]
pub struct NestedSort {
    id: ElementId,
    state: Entity<NestedSortState>,
    style: StyleRefinement,
    render_item: Rc<RenderRowFn>,
}

impl NestedSort {
    pub fn new<R>(state: &Entity<NestedSortState>, render_item: R) -> Self
    where
        R: Fn(usize, &NestedSortRow, NestedSortRowState, &mut Window, &mut App) -> ListItem
            + 'static,
    {
        Self {
            id: ElementId::Name(format!("nested-sort-{}", state.entity_id()).into()),
            state: state.clone(),
            style: StyleRefinement::default(),
            render_item: Rc::new(render_item),
        }
    }
}

impl Styled for NestedSort {
    fn style(&mut self) -> &mut StyleRefinement {
        &mut self.style
    }
}

impl RenderOnce for NestedSort {
    fn render(self, _window: &mut Window, cx: &mut App) -> impl IntoElement {
        let focus_handle = self.state.read(cx).focus_handle.clone();
        self.state
            .update(cx, |state, _| state.render_item = self.render_item);

        div()
            .id(self.id)
            .key_context(CONTEXT)
            .track_focus(&focus_handle)
            .size_full()
            .child(self.state)
            .refine_style(&self.style)
    }
}

fn to_f32(value: Pixels) -> f32 {
    value / px(1.)
}

/// Bounds of a row as seen by the drop logic: its left edge moves right with its depth.
fn row_bounds(bounds: gpui::Bounds<Pixels>, depth: usize, indent_width: Pixels) -> NodeBounds {
    NodeBounds::new(
        to_f32(bounds.origin.x + indent_width * depth),
        to_f32(bounds.origin.y),
        to_f32(bounds.size.height),
    )
}

fn push_rows(tree: &Tree, list: NodeId, depth: usize, rows: &mut Vec<NestedSortRow>) {
    for child in tree.children(list) {
        let Some(node) = tree.get(*child) else {
            continue;
        };
        if node.kind() != NodeKind::Item {
            continue;
        }
        let label = node.text().or(node.id()).unwrap_or_default().to_string();
        rows.push(NestedSortRow {
            node: *child,
            kind: NestedSortRowKind::Item,
            id: node.id().map(|id| SharedString::from(id.to_string())),
            label: label.into(),
            depth,
            min_height: None,
        });

        let Some(nested) = tree.child_list(*child) else {
            continue;
        };
        if tree.is_placeholder(nested) {
            rows.push(NestedSortRow {
                node: nested,
                kind: NestedSortRowKind::Placeholder,
                id: None,
                label: "".into(),
                depth: depth + 1,
                min_height: tree.get(nested).and_then(Node::min_height),
            });
        }
        push_rows(tree, nested, depth + 1, rows);
    }
}
