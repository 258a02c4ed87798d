use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_component::ActiveTheme as _;
use gpui_component::button::{Button, ButtonVariants as _};
use gpui_component::list::ListItem;
use gpui_component::{h_flex, v_flex};
use gpui_nested_sort::{
    DataItem, DropLocation, NestedSortEvent, NestedSortRow, NestedSortRowState, NestedSortState,
    NestingLevels, Options, Record, data_items_from_json_str, nested_sort,
};
use tracing::info;

const INDENT: f32 = 20.;

const DEMO_DATA: &str = r#"[
    { "item_id": 1, "item_title": "Topic 1" },
    { "item_id": 2, "item_title": "Topic 2" },
    { "item_id": 3, "item_title": "Topic 3", "item_parent": 2 },
    { "item_id": 4, "item_title": "Topic 4", "item_parent": 3, "position": 2 },
    { "item_id": 5, "item_title": "Topic 5", "item_parent": 3, "position": 1 },
    { "item_id": 6, "item_title": "Topic 6" },
    { "item_id": 7, "item_title": "Topic 7" }
]"#;

const DEMO_OPTIONS: &str = r#"{
    "nesting_levels": 2,
    "list_class_names": "nested-sort demo-list",
    "property_map": {
        "id": "item_id",
        "parent": "item_parent",
        "order": "position",
        "text": "item_title"
    }
}"#;

pub struct NestedSortExample {
    sort: Entity<NestedSortState>,
    last_drop: Option<DropLocation>,
    next_id: usize,
    _subscription: Subscription,
}

impl NestedSortExample {
    pub fn view(_window: &mut Window, cx: &mut App) -> Entity<Self> {
        cx.new(|cx| {
            let sort = cx.new(|cx| demo_state(cx));
            let subscription = cx.subscribe(&sort, |this: &mut Self, _, event: &NestedSortEvent, cx| {
                let NestedSortEvent::Dropped { location, records } = event;
                info!(?location, items = records.len(), "tree reordered");
                this.last_drop = *location;
                cx.notify();
            });
            Self {
                sort,
                last_drop: None,
                next_id: 8,
                _subscription: subscription,
            }
        })
    }

    fn add_item(&mut self, cx: &mut Context<Self>) {
        let id = self.next_id;
        self.next_id += 1;
        self.sort.update(cx, |sort, cx| {
            sort.add_new_item(
                DataItem::new(id.to_string()).text(format!("Topic {id}")),
                true,
                cx,
            );
        });
        cx.notify();
    }

    fn toggle_enabled(&mut self, cx: &mut Context<Self>) {
        self.sort.update(cx, |sort, cx| {
            if sort.is_initialised() {
                sort.destroy(cx);
            } else {
                sort.init(cx);
            }
        });
        cx.notify();
    }
}

fn demo_state(cx: &mut App) -> NestedSortState {
    let state = NestedSortState::new(cx).indent_width(px(INDENT));
    let options = match Options::from_json_str(DEMO_OPTIONS) {
        Ok(options) => options,
        Err(err) => {
            tracing::warn!(%err, "demo options rejected, using defaults");
            Options::default().nesting_levels(NestingLevels::Limited(2))
        }
    };
    let state = state.options(options.clone());
    let loaded = data_items_from_json_str(DEMO_DATA, &options.property_map)
        .and_then(|items| state.data(&items));
    match loaded {
        Ok(state) => state,
        Err(err) => {
            tracing::warn!(%err, "demo data rejected");
            NestedSortState::new(cx).options(options)
        }
    }
}

impl Render for NestedSortExample {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let sort = self.sort.read(cx);
        let enabled = sort.is_initialised();
        let list_tag = sort.list_tag().tag_name();
        let records = format_records(&sort.records());
        let last_drop = match self.last_drop {
            Some(DropLocation::Before) => "before target",
            Some(DropLocation::Inside) => "inside target",
            None => "<none>",
        };

        v_flex()
            .size_full()
            .p(px(16.))
            .gap_y_3()
            .child(
                v_flex()
                    .gap_y_1()
                    .child(div().text_xl().font_weight(FontWeight::BOLD).child("Nested Sort"))
                    .child(
                        div()
                            .text_sm()
                            .text_color(theme.muted_foreground)
                            .child("Tip: drag a topic over another to move it before it. Move the cursor at least 50px right of the target's left edge to open a slot below it and drop there to nest. Nesting is capped at 2 levels."),
                    )
                    .child(
                        div()
                            .text_sm()
                            .text_color(theme.muted_foreground)
                            .child(format!("Last drop: {last_drop}")),
                    ),
            )
            .child(
                h_flex()
                    .gap_x_2()
                    .child(
                        Button::new("nested-sort-add")
                            .label("Add topic")
                            .ghost()
                            .on_click(cx.listener(|this, _, _window, cx| this.add_item(cx))),
                    )
                    .child(
                        Button::new("nested-sort-toggle")
                            .label(if enabled { "Disable dragging" } else { "Enable dragging" })
                            .ghost()
                            .on_click(cx.listener(|this, _, _window, cx| this.toggle_enabled(cx))),
                    ),
            )
            .child(
                h_flex()
                    .flex_1()
                    .min_h(px(0.))
                    .gap_x_3()
                    .child(
                        v_flex()
                            .w(px(420.))
                            .min_w(px(0.))
                            .h_full()
                            .gap_y_2()
                            .child(div().text_sm().font_weight(FontWeight::MEDIUM).child(format!("Topics <{list_tag}>")))
                            .child(
                                div()
                                    .flex_1()
                                    .min_h(px(0.))
                                    .rounded(px(12.))
                                    .border_1()
                                    .border_color(theme.border)
                                    .bg(theme.background)
                                    .child(nested_sort(&self.sort, |ix, row, row_state, _window, cx| {
                                        render_row(ix, row, row_state, cx)
                                    })),
                            ),
                    )
                    .child(
                        v_flex()
                            .flex_1()
                            .min_w(px(0.))
                            .h_full()
                            .gap_y_2()
                            .child(div().text_sm().font_weight(FontWeight::MEDIUM).child("Records"))
                            .child(
                                div()
                                    .flex_1()
                                    .min_h(px(0.))
                                    .rounded(px(12.))
                                    .border_1()
                                    .border_color(theme.border)
                                    .bg(theme.background)
                                    .p(px(12.))
                                    .child(render_lines(records)),
                            ),
                    ),
            )
    }
}

fn render_row(ix: usize, row: &NestedSortRow, row_state: NestedSortRowState, cx: &mut App) -> ListItem {
    let theme = cx.theme();
    ListItem::new(ix)
        .pl(px(10.) + px(INDENT) * row.depth())
        .when(row_state.dragged, |this| this.opacity(0.4))
        .when(!row_state.draggable, |this| this.text_color(theme.muted_foreground))
        .child(row.label().clone())
}

fn render_lines(text: String) -> impl IntoElement {
    let lines = text
        .lines()
        .map(|line| div().text_sm().child(line.to_string()));
    v_flex().gap_y_0p5().children(lines)
}

fn format_records(records: &[Record]) -> String {
    records
        .iter()
        .map(|record| match &record.parent {
            Some(parent) => format!("{} -> parent {parent}, order {}", record.id, record.order),
            None => format!("{} -> root, order {}", record.id, record.order),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
