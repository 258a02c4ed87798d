use serde::{Deserialize, Deserializer, Serialize};

use crate::codec::PropertyMap;
use crate::depth::NestingLevels;

pub const DEFAULT_DROPPING_EDGE: f32 = 15.;
pub const DEFAULT_MAIN_LIST_CLASS: &str = "nested-sort";

/// Class names given either as one space-separated string or as a list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClassList(Vec<String>);

impl ClassList {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }
}

impl From<&str> for ClassList {
    fn from(classes: &str) -> Self {
        ClassList(classes.split_whitespace().map(str::to_string).collect())
    }
}

impl<S: AsRef<str>> From<Vec<S>> for ClassList {
    fn from(classes: Vec<S>) -> Self {
        ClassList(
            classes
                .iter()
                .map(|class| class.as_ref().trim())
                .filter(|class| !class.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for ClassList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }

        Ok(match Option::<Raw>::deserialize(deserializer)? {
            None => ClassList::default(),
            Some(Raw::One(classes)) => ClassList::from(classes.as_str()),
            Some(Raw::Many(classes)) => ClassList::from(classes),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Band below a target's top edge, in pixels, where nesting is not offered.
    pub dropping_edge: f32,
    pub nesting_levels: NestingLevels,
    /// Enable drag and drop straight away.
    pub init: bool,
    pub list_class_names: ClassList,
    pub list_item_class_names: ClassList,
    pub property_map: PropertyMap,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            dropping_edge: DEFAULT_DROPPING_EDGE,
            nesting_levels: NestingLevels::Unlimited,
            init: true,
            list_class_names: ClassList::default(),
            list_item_class_names: ClassList::default(),
            property_map: PropertyMap::default(),
        }
    }
}

impl Options {
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn dropping_edge(mut self, dropping_edge: f32) -> Self {
        self.dropping_edge = dropping_edge;
        self
    }

    pub fn nesting_levels(mut self, nesting_levels: impl Into<NestingLevels>) -> Self {
        self.nesting_levels = nesting_levels.into();
        self
    }

    pub fn init(mut self, init: bool) -> Self {
        self.init = init;
        self
    }

    pub fn list_class_names(mut self, classes: impl Into<ClassList>) -> Self {
        self.list_class_names = classes.into();
        self
    }

    pub fn list_item_class_names(mut self, classes: impl Into<ClassList>) -> Self {
        self.list_item_class_names = classes.into();
        self
    }

    pub fn property_map(mut self, property_map: PropertyMap) -> Self {
        self.property_map = property_map;
        self
    }

    pub fn main_list_class_name(&self) -> &str {
        self.list_class_names
            .first()
            .unwrap_or(DEFAULT_MAIN_LIST_CLASS)
    }

    /// Class carried by the main list while dragging is enabled.
    pub fn enabled_class_name(&self) -> String {
        format!("{}--enabled", self.main_list_class_name())
    }
}
