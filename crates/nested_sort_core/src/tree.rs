use std::fmt::Write as _;

pub const DRAGGED_CLASS: &str = "ns-dragged";
pub const TARGETED_CLASS: &str = "ns-targeted";
pub const PLACEHOLDER_CLASS: &str = "ns-placeholder";

/// Handle to a node living in a [`Tree`].
///
/// Freed slots are recycled under a new generation, so a handle to a removed node
/// stays dead instead of aliasing whatever gets created in its slot later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ListTag {
    #[default]
    Ordered,
    Unordered,
}

impl ListTag {
    pub fn tag_name(self) -> &'static str {
        match self {
            ListTag::Ordered => "ol",
            ListTag::Unordered => "ul",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Item,
    List,
}

#[derive(Clone, Debug)]
pub struct Node {
    kind: NodeKind,
    id: Option<String>,
    text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    classes: Vec<String>,
    draggable: bool,
    dragged: bool,
    targeted: bool,
    placeholder: bool,
    min_height: Option<f32>,
}

impl Node {
    fn new(kind: NodeKind, id: Option<String>, text: Option<String>) -> Self {
        Self {
            kind,
            id,
            text,
            parent: None,
            children: Vec::new(),
            classes: Vec::new(),
            draggable: false,
            dragged: false,
            targeted: false,
            placeholder: false,
            min_height: None,
        }
    }

    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[inline]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[inline]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// User classes followed by whichever drag markers are currently set.
    pub fn class_list(&self) -> Vec<&str> {
        let mut classes: Vec<&str> = self.classes.iter().map(String::as_str).collect();
        if self.placeholder {
            classes.push(PLACEHOLDER_CLASS);
        }
        if self.dragged {
            classes.push(DRAGGED_CLASS);
        }
        if self.targeted {
            classes.push(TARGETED_CLASS);
        }
        classes
    }

    pub fn is_draggable(&self) -> bool {
        self.draggable
    }

    pub fn is_dragged(&self) -> bool {
        self.dragged
    }

    pub fn is_targeted(&self) -> bool {
        self.targeted
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Transient sizing applied to a placeholder while it is open.
    pub fn min_height(&self) -> Option<f32> {
        self.min_height
    }
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena holding a root list and every item and nested list below it.
#[derive(Clone, Debug)]
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<usize>,
    root: NodeId,
    list_tag: ListTag,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new(ListTag::default())
    }
}

impl Tree {
    pub fn new(list_tag: ListTag) -> Self {
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(Node::new(NodeKind::List, None, None)),
            }],
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            list_tag,
        }
    }

    /// Build a tree from nested markup-style items.
    pub fn from_items(list_tag: ListTag, items: impl Into<Vec<TreeItem>>) -> Self {
        let mut tree = Self::new(list_tag);
        let root = tree.root;
        for item in items.into() {
            tree.push_tree_item(root, item);
        }
        tree
    }

    fn push_tree_item(&mut self, list: NodeId, item: TreeItem) {
        let node = self.create_item(item.id, item.text);
        self.append_child(list, node);
        if item.children.is_empty() {
            return;
        }
        let child_list = self.ensure_child_list(node);
        for child in item.children {
            self.push_tree_item(child_list, child);
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn list_tag(&self) -> ListTag {
        self.list_tag
    }

    pub fn get(&self, node: NodeId) -> Option<&Node> {
        self.slots
            .get(node.index)
            .filter(|slot| slot.generation == node.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, node: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(node.index)
            .filter(|slot| slot.generation == node.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn is_alive(&self, node: NodeId) -> bool {
        self.get(node).is_some()
    }

    pub fn is_item(&self, node: NodeId) -> bool {
        self.get(node).is_some_and(|n| n.kind == NodeKind::Item)
    }

    pub fn is_list(&self, node: NodeId) -> bool {
        self.get(node).is_some_and(|n| n.kind == NodeKind::List)
    }

    pub fn is_placeholder(&self, node: NodeId) -> bool {
        self.get(node).is_some_and(Node::is_placeholder)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.get(node).map(Node::children).unwrap_or(&[])
    }

    /// Create a detached item.
    pub fn create_item(&mut self, id: impl Into<String>, text: Option<String>) -> NodeId {
        self.alloc(Node::new(NodeKind::Item, Some(id.into()), text))
    }

    /// Create a detached, anonymous list.
    pub fn create_list(&mut self) -> NodeId {
        self.alloc(Node::new(NodeKind::List, None, None))
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    fn release(&mut self, node: NodeId) -> Option<Node> {
        let slot = self
            .slots
            .get_mut(node.index)
            .filter(|slot| slot.generation == node.generation)?;
        let freed = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(node.index);
        Some(freed)
    }

    /// The list owned by `item`, if it has one.
    pub fn child_list(&self, item: NodeId) -> Option<NodeId> {
        self.children(item)
            .iter()
            .copied()
            .find(|child| self.is_list(*child))
    }

    /// Returns the list owned by `item`, creating one carrying the item's id if needed.
    pub fn ensure_child_list(&mut self, item: NodeId) -> NodeId {
        if let Some(list) = self.child_list(item) {
            return list;
        }
        let id = self.get(item).and_then(|n| n.id.clone());
        let list = self.create_list();
        if let Some(node) = self.get_mut(list) {
            node.id = id;
        }
        self.append_child(item, list);
        list
    }

    /// Whether `node` is `ancestor` or sits anywhere below it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Move `child` to the end of `parent`'s children.
    ///
    /// Refused when either node is dead or when `parent` lives inside `child`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.is_alive(parent) || !self.is_alive(child) || self.contains(child, parent) {
            return false;
        }
        self.detach(child);
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        true
    }

    /// Move `node` so that it becomes the preceding sibling of `reference`.
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) -> bool {
        if reference == node || !self.is_alive(node) {
            return false;
        }
        let Some(parent) = self.parent(reference) else {
            return false;
        };
        if self.contains(node, parent) {
            return false;
        }
        self.detach(node);
        let Some(parent_node) = self.get_mut(parent) else {
            return false;
        };
        let index = parent_node
            .children
            .iter()
            .position(|id| *id == reference)
            .unwrap_or(parent_node.children.len());
        parent_node.children.insert(index, node);
        if let Some(node) = self.get_mut(node) {
            node.parent = Some(parent);
        }
        true
    }

    /// Unlink `node` from its parent, keeping its subtree intact.
    pub fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        if let Some(parent_node) = self.get_mut(parent) {
            parent_node.children.retain(|id| *id != node);
        }
        if let Some(node) = self.get_mut(node) {
            node.parent = None;
        }
    }

    /// Unlink and free `node` together with its whole subtree.
    pub fn remove(&mut self, node: NodeId) {
        if node == self.root {
            return;
        }
        self.detach(node);
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(freed) = self.release(id) {
                stack.extend(freed.children);
            }
        }
    }

    /// Every node below `node` in document order, `node` itself excluded.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    pub fn items_in(&self, node: NodeId) -> Vec<NodeId> {
        self.descendants(node)
            .into_iter()
            .filter(|id| self.is_item(*id))
            .collect()
    }

    pub fn lists_in(&self, node: NodeId) -> Vec<NodeId> {
        self.descendants(node)
            .into_iter()
            .filter(|id| self.is_list(*id))
            .collect()
    }

    /// Length of the deepest chain of lists nested inside `node`.
    pub fn list_depth_below(&self, node: NodeId) -> usize {
        self.children(node)
            .iter()
            .map(|child| usize::from(self.is_list(*child)) + self.list_depth_below(*child))
            .max()
            .unwrap_or(0)
    }

    pub fn find_item(&self, id: &str) -> Option<NodeId> {
        self.items_in(self.root)
            .into_iter()
            .find(|node| self.get(*node).and_then(Node::id) == Some(id))
    }

    /// The item owning the list `node` sits in, `None` at the top level.
    pub fn parent_item(&self, node: NodeId) -> Option<NodeId> {
        let list = self.parent(node)?;
        if list == self.root {
            return None;
        }
        self.parent(list).filter(|parent| self.is_item(*parent))
    }

    pub(crate) fn set_dragged(&mut self, node: NodeId, dragged: bool) {
        if let Some(node) = self.get_mut(node) {
            node.dragged = dragged;
        }
    }

    pub(crate) fn set_targeted(&mut self, node: NodeId, targeted: bool) {
        if let Some(node) = self.get_mut(node) {
            node.targeted = targeted;
        }
    }

    pub(crate) fn set_placeholder(&mut self, node: NodeId, placeholder: bool) {
        if let Some(node) = self.get_mut(node) {
            node.placeholder = placeholder;
        }
    }

    pub(crate) fn set_min_height(&mut self, node: NodeId, min_height: Option<f32>) {
        if let Some(node) = self.get_mut(node) {
            node.min_height = min_height;
        }
    }

    pub(crate) fn set_list_id(&mut self, node: NodeId, id: Option<String>) {
        if let Some(node) = self.get_mut(node) {
            node.id = id;
        }
    }

    pub(crate) fn set_draggable(&mut self, node: NodeId, draggable: bool) {
        if let Some(node) = self.get_mut(node) {
            node.draggable = draggable;
        }
    }

    pub(crate) fn remove_classes(&mut self, node: NodeId, classes: &[String]) {
        if let Some(node) = self.get_mut(node) {
            node.classes.retain(|class| !classes.contains(class));
        }
    }

    pub(crate) fn add_classes(&mut self, node: NodeId, classes: &[String]) {
        let Some(node) = self.get_mut(node) else {
            return;
        };
        for class in classes {
            if !node.classes.contains(class) {
                node.classes.push(class.clone());
            }
        }
    }

    /// Indented dump of the tree, one item id per line.
    ///
    /// Placeholders show up as `<placeholder>`, other lists without items as `<list>`.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.outline_list(self.root, 0, &mut out);
        out
    }

    fn outline_list(&self, list: NodeId, depth: usize, out: &mut String) {
        for child in self.children(list) {
            let Some(node) = self.get(*child) else {
                continue;
            };
            match node.kind {
                NodeKind::Item => {
                    let _ = writeln!(out, "{}{}", "  ".repeat(depth), node.id().unwrap_or(""));
                    for nested in node.children() {
                        if self.is_list(*nested) {
                            self.outline_nested_list(*nested, depth + 1, out);
                        }
                    }
                }
                NodeKind::List => self.outline_nested_list(*child, depth, out),
            }
        }
    }

    fn outline_nested_list(&self, list: NodeId, depth: usize, out: &mut String) {
        if self.is_placeholder(list) {
            let _ = writeln!(out, "{}<placeholder>", "  ".repeat(depth));
        } else if self.children(list).is_empty() {
            let _ = writeln!(out, "{}<list>", "  ".repeat(depth));
        }
        self.outline_list(list, depth, out);
    }
}

/// An item with children, used to build a [`Tree`] from nested markup.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeItem {
    pub id: String,
    pub text: Option<String>,
    pub children: Vec<TreeItem>,
}

impl TreeItem {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: Some(text.into()),
            children: Vec::new(),
        }
    }

    pub fn child(mut self, child: TreeItem) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl Into<Vec<TreeItem>>) -> Self {
        self.children.extend(children.into());
        self
    }
}
