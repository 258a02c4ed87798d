use std::collections::HashMap;

use crate::tree::NodeId;

/// How far right of a target's left edge the cursor must be before nesting is considered.
pub const INDENT_THRESHOLD: f32 = 50.;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Cursor {
    pub x: f32,
    pub y: f32,
}

impl Cursor {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
    pub left: f32,
    pub top: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(left: f32, top: f32, height: f32) -> Self {
        Self { left, top, height }
    }
}

/// Signed distances between the cursor and the targeted node.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Distances {
    pub horizontal_indent: f32,
    /// Negative once the cursor is below the target's top edge.
    pub vertical_top_delta: f32,
    pub vertical_top_delta_abs: f32,
    pub vertical_bottom_delta: f32,
}

impl Distances {
    pub fn cursor_is_indented_enough(&self) -> bool {
        self.horizontal_indent > INDENT_THRESHOLD
    }

    /// Whether the cursor sits within `dropping_edge` of the target's top edge.
    ///
    /// An edge of zero turns the check off.
    pub fn cursor_is_too_close_to_top(&self, dropping_edge: f32) -> bool {
        if dropping_edge == 0. || dropping_edge.is_nan() {
            return false;
        }
        -self.vertical_top_delta < dropping_edge
    }
}

pub fn compute_distances(cursor: Cursor, target: Bounds) -> Distances {
    let vertical_top_delta = target.top - cursor.y;
    let vertical_top_delta_abs = vertical_top_delta.abs();
    Distances {
        horizontal_indent: cursor.x - target.left,
        vertical_top_delta,
        vertical_top_delta_abs,
        vertical_bottom_delta: vertical_top_delta_abs - target.height,
    }
}

/// Where nodes currently are on screen.
///
/// Queried afresh on every drag-over; implementors must not hand back bounds for
/// nodes that are no longer laid out.
pub trait LayoutSource {
    fn bounds(&self, node: NodeId) -> Option<Bounds>;

    fn height(&self, node: NodeId) -> Option<f32> {
        self.bounds(node).map(|bounds| bounds.height)
    }
}

/// A [`LayoutSource`] fed with bounds observed by the caller.
#[derive(Clone, Debug, Default)]
pub struct RecordedLayout {
    bounds: HashMap<NodeId, Bounds>,
}

impl RecordedLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, node: NodeId, bounds: Bounds) -> Self {
        self.record(node, bounds);
        self
    }

    pub fn record(&mut self, node: NodeId, bounds: Bounds) {
        self.bounds.insert(node, bounds);
    }

    pub fn clear(&mut self) {
        self.bounds.clear();
    }
}

impl LayoutSource for RecordedLayout {
    fn bounds(&self, node: NodeId) -> Option<Bounds> {
        self.bounds.get(&node).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distances_are_signed_relative_to_target_top() {
        let d = compute_distances(Cursor::new(80., 130.), Bounds::new(10., 100., 40.));
        assert_eq!(d.horizontal_indent, 70.);
        assert_eq!(d.vertical_top_delta, -30.);
        assert_eq!(d.vertical_top_delta_abs, 30.);
        assert_eq!(d.vertical_bottom_delta, -10.);
        assert!(d.cursor_is_indented_enough());
    }

    #[test]
    fn indent_threshold_is_exclusive() {
        let d = compute_distances(Cursor::new(60., 0.), Bounds::new(10., 0., 20.));
        assert!(!d.cursor_is_indented_enough());
    }

    #[test]
    fn too_close_to_top_uses_offset_below_the_edge() {
        let target = Bounds::new(0., 100., 40.);
        let near = compute_distances(Cursor::new(0., 110.), target);
        let far = compute_distances(Cursor::new(0., 125.), target);
        assert!(near.cursor_is_too_close_to_top(15.));
        assert!(!far.cursor_is_too_close_to_top(15.));
        assert!(!near.cursor_is_too_close_to_top(0.));
    }
}
