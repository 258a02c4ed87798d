use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::tree::{NodeId, Tree};

/// How deep items may be nested below the root list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NestingLevels {
    #[default]
    Unlimited,
    Limited(usize),
}

impl NestingLevels {
    /// Negative values mean unlimited.
    pub fn from_int(levels: i64) -> Self {
        usize::try_from(levels)
            .map(NestingLevels::Limited)
            .unwrap_or(NestingLevels::Unlimited)
    }

    /// Reads the leading integer of `s`; anything non-numeric means unlimited.
    pub fn parse(s: &str) -> Self {
        let s = s.trim_start();
        let (negative, digits) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let end = digits
            .bytes()
            .position(|b| !b.is_ascii_digit())
            .unwrap_or(digits.len());
        if end == 0 {
            return NestingLevels::Unlimited;
        }
        match digits[..end].parse::<usize>() {
            // `-0` is not below zero, so it still forbids nesting.
            Ok(levels) if !negative || levels == 0 => NestingLevels::Limited(levels),
            _ => NestingLevels::Unlimited,
        }
    }

    fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                .map(NestingLevels::from_int)
                .unwrap_or(NestingLevels::Unlimited),
            Value::String(s) => NestingLevels::parse(s),
            _ => NestingLevels::Unlimited,
        }
    }

    pub fn is_unlimited(self) -> bool {
        self == NestingLevels::Unlimited
    }
}

impl From<i64> for NestingLevels {
    fn from(levels: i64) -> Self {
        NestingLevels::from_int(levels)
    }
}

impl From<&str> for NestingLevels {
    fn from(levels: &str) -> Self {
        NestingLevels::parse(levels)
    }
}

impl Serialize for NestingLevels {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            NestingLevels::Unlimited => serializer.serialize_i64(-1),
            NestingLevels::Limited(levels) => serializer.serialize_u64(*levels as u64),
        }
    }
}

impl<'de> Deserialize<'de> for NestingLevels {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(NestingLevels::from_value(&value))
    }
}

/// Which question the nesting limit is asked.
///
/// Opening a placeholder is refused one level earlier than an actual drop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThresholdCheck {
    Placeholder,
    Drop,
}

/// Number of list boundaries between `node` and the root list, plus the list depth
/// carried along by the subtree being dragged.
pub fn node_depth(tree: &Tree, node: NodeId, dragged: Option<NodeId>) -> usize {
    let root = tree.root();
    let mut depth = 0;
    let mut current = node;
    while let Some(parent) = tree.parent(current) {
        if parent == root {
            break;
        }
        if tree.is_list(parent) {
            depth += 1;
        }
        current = parent;
    }

    let self_depth = dragged.map_or(0, |dragged| tree.list_depth_below(dragged));
    depth + self_depth
}

pub fn nesting_threshold_reached(
    tree: &Tree,
    levels: NestingLevels,
    node: NodeId,
    dragged: Option<NodeId>,
    check: ThresholdCheck,
) -> bool {
    let NestingLevels::Limited(limit) = levels else {
        return false;
    };
    let depth = node_depth(tree, node, dragged);
    match check {
        ThresholdCheck::Placeholder => depth >= limit,
        ThresholdCheck::Drop => depth > limit,
    }
}
