//! Tag vocabulary
//!
//! Static schema of the tag categories and the values each one permits.
//! Every tag committed to a file is a fully-qualified `category/value`
//! string drawn from this vocabulary; the aggregator guarantees at most one
//! value per category and a fixed category emission order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag category, in fixed evaluation order.
///
/// The order of `Category::ALL` is the order tags appear in every emitted
/// tag set: scene → roomtype → clothing → people.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Scene,
    RoomType,
    Clothing,
    People,
}

impl Category {
    /// All categories in evaluation order
    pub const ALL: [Category; 4] = [
        Category::Scene,
        Category::RoomType,
        Category::Clothing,
        Category::People,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Scene => "scene",
            Category::RoomType => "roomtype",
            Category::Clothing => "clothing",
            Category::People => "people",
        }
    }

    /// Permitted values for this category
    pub fn permitted_values(&self) -> &'static [&'static str] {
        match self {
            Category::Scene => &["indoor", "outdoor"],
            Category::RoomType => &["kitchen", "bathroom", "bedroom", "living_room", "office"],
            Category::Clothing => &["dressed", "naked"],
            Category::People => &["solo", "group"],
        }
    }

    /// Whether `value` belongs to this category's permitted set
    pub fn permits(&self, value: &str) -> bool {
        self.permitted_values().contains(&value)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single fully-qualified tag (`category/value`), validated against the
/// vocabulary at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    category: Category,
    value: String,
}

impl Tag {
    /// Create a tag, rejecting values outside the category's permitted set.
    pub fn new(category: Category, value: &str) -> Option<Self> {
        if category.permits(value) {
            Some(Self {
                category,
                value: value.to_string(),
            })
        } else {
            None
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Fully-qualified form written to metadata, e.g. `scene/indoor`
    pub fn qualified(&self) -> String {
        format!("{}/{}", self.category, self.value)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.value)
    }
}

/// Ordered collection of tags for one image: at most one tag per category,
/// emitted in `Category::ALL` order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: Vec<Tag>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tag; ignored if the category already holds a value
    /// (first-committed wins, keeping category uniqueness by construction).
    pub fn push(&mut self, tag: Tag) {
        if !self.tags.iter().any(|t| t.category() == tag.category()) {
            self.tags.push(tag);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter()
    }

    pub fn contains(&self, category: Category, value: &str) -> bool {
        self.tags
            .iter()
            .any(|t| t.category() == category && t.value() == value)
    }

    pub fn get(&self, category: Category) -> Option<&Tag> {
        self.tags.iter().find(|t| t.category() == category)
    }

    /// Fully-qualified tag strings in emission order
    pub fn qualified(&self) -> Vec<String> {
        self.tags.iter().map(Tag::qualified).collect()
    }
}
