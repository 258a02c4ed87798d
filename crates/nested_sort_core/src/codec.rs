use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::tree::{ListTag, NodeId, Tree};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("duplicate item id: {0}")]
    DuplicateId(String),

    #[error("item {id} references missing parent {parent}")]
    MissingParent { id: String, parent: String },

    #[error("item {0} is part of a parent cycle")]
    ParentCycle(String),

    #[error("invalid record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// One flat input record, already translated to canonical field names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataItem {
    pub id: String,
    pub parent: Option<String>,
    pub order: Option<i64>,
    pub text: Option<String>,
}

impl DataItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent: None,
            order: None,
            text: None,
        }
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        let parent = parent.into();
        self.parent = (!parent.is_empty()).then_some(parent);
        self
    }

    pub fn order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// One serialized item: its id, the id of the item it is nested in, and its
/// 1-based position among its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub order: usize,
}

impl Record {
    pub fn to_mapped_json(&self, map: &PropertyMap) -> Value {
        let mut object = Map::new();
        object.insert(map.id.clone(), Value::String(self.id.clone()));
        if let Some(parent) = &self.parent {
            object.insert(map.parent.clone(), Value::String(parent.clone()));
        }
        object.insert(map.order.clone(), Value::from(self.order));
        Value::Object(object)
    }
}

/// Names the caller's records use for the canonical `id`, `parent`, `order` and `text` fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyMap {
    pub id: String,
    pub parent: String,
    pub order: String,
    pub text: String,
}

impl Default for PropertyMap {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            parent: "parent".to_string(),
            order: "order".to_string(),
            text: "text".to_string(),
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn order_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read caller records through `map`.
pub fn data_items_from_json(value: &Value, map: &PropertyMap) -> Result<Vec<DataItem>, CodecError> {
    let Value::Array(records) = value else {
        return Err(CodecError::InvalidRecord {
            index: 0,
            reason: "expected an array of records".to_string(),
        });
    };

    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let Value::Object(fields) = record else {
                return Err(CodecError::InvalidRecord {
                    index,
                    reason: "expected an object".to_string(),
                });
            };
            let id = fields
                .get(&map.id)
                .and_then(scalar_to_string)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| CodecError::InvalidRecord {
                    index,
                    reason: format!("missing `{}`", map.id),
                })?;
            let parent = fields
                .get(&map.parent)
                .and_then(scalar_to_string)
                .filter(|parent| !parent.is_empty());
            let order = fields.get(&map.order).and_then(order_from_value);
            let text = fields
                .get(&map.text)
                .and_then(|text| text.as_str())
                .map(str::to_string);
            Ok(DataItem {
                id,
                parent,
                order,
                text,
            })
        })
        .collect()
}

pub fn data_items_from_json_str(s: &str, map: &PropertyMap) -> Result<Vec<DataItem>, CodecError> {
    let value: Value = serde_json::from_str(s)?;
    data_items_from_json(&value, map)
}

/// Sort the siblings that carry a non-zero `order` among the slots they occupy.
///
/// Siblings without one stay where the input put them.
fn sort_siblings(items: &mut [&DataItem]) {
    let slots: Vec<usize> = (0..items.len())
        .filter(|ix| items[*ix].order.is_some_and(|order| order != 0))
        .collect();
    let mut ordered: Vec<&DataItem> = slots.iter().map(|ix| items[*ix]).collect();
    ordered.sort_by_key(|item| item.order);
    for (slot, item) in slots.into_iter().zip(ordered) {
        items[slot] = item;
    }
}

/// Build an ordered tree from flat records.
pub fn build_tree(items: &[DataItem]) -> Result<Tree, CodecError> {
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item.id.as_str()) {
            return Err(CodecError::DuplicateId(item.id.clone()));
        }
    }

    let mut top_level = Vec::new();
    let mut children: HashMap<&str, Vec<&DataItem>> = HashMap::new();
    for item in items {
        match item.parent.as_deref() {
            None => top_level.push(item),
            Some(parent) if !seen.contains(parent) => {
                return Err(CodecError::MissingParent {
                    id: item.id.clone(),
                    parent: parent.to_string(),
                });
            }
            Some(parent) => children.entry(parent).or_default().push(item),
        }
    }

    sort_siblings(&mut top_level);
    for group in children.values_mut() {
        sort_siblings(group);
    }

    let mut tree = Tree::new(ListTag::Ordered);
    let root = tree.root();
    let mut placed = 0;
    let mut queue: VecDeque<(NodeId, &DataItem)> = VecDeque::new();
    for item in top_level {
        let node = tree.create_item(item.id.clone(), item.text.clone());
        tree.append_child(root, node);
        queue.push_back((node, item));
    }

    while let Some((node, item)) = queue.pop_front() {
        placed += 1;
        let Some(group) = children.get(item.id.as_str()) else {
            continue;
        };
        let list = tree.ensure_child_list(node);
        for child in group {
            let child_node = tree.create_item(child.id.clone(), child.text.clone());
            tree.append_child(list, child_node);
            queue.push_back((child_node, *child));
        }
    }

    if placed != items.len() {
        let reached: HashSet<&str> = tree
            .items_in(root)
            .into_iter()
            .filter_map(|node| tree.get(node).and_then(|n| n.id()))
            .collect();
        if let Some(orphan) = items.iter().find(|item| !reached.contains(item.id.as_str())) {
            return Err(CodecError::ParentCycle(orphan.id.clone()));
        }
    }

    Ok(tree)
}

/// Flatten `tree` in document order.
pub fn serialize(tree: &Tree) -> Vec<Record> {
    tree.items_in(tree.root())
        .into_iter()
        .filter_map(|node| {
            let id = tree.get(node)?.id()?.to_string();
            let list = tree.parent(node)?;
            let order = tree.children(list).iter().position(|n| *n == node)? + 1;
            let parent = tree
                .parent_item(node)
                .and_then(|parent| tree.get(parent))
                .and_then(|parent| parent.id())
                .map(str::to_string);
            Some(Record { id, parent, order })
        })
        .collect()
}

pub fn serialize_mapped(tree: &Tree, map: &PropertyMap) -> Vec<Value> {
    serialize(tree)
        .iter()
        .map(|record| record.to_mapped_json(map))
        .collect()
}
