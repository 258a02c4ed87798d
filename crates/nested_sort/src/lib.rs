mod sort;

pub use nested_sort_core::{
    ClassList, CodecError, DataItem, DropLocation, ListTag, NestingLevels, NodeId, Options,
    PropertyMap, Record, TreeItem, data_items_from_json, data_items_from_json_str,
};
pub use sort::{
    NestedSort, NestedSortEvent, NestedSortRow, NestedSortRowKind, NestedSortRowState,
    NestedSortState, nested_sort,
};
