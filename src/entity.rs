//! Entity types - named things with a free-form attribute bag

use crate::fact::Fact;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form entity attributes
pub type Attributes = Map<String, Value>;

/// Attribute key that is lifted out of the bag into [`Entity::name`]
pub const NAME_KEY: &str = "name";

/// A caller-named object tracked with a mutable attribute bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub attributes: Attributes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Live linked facts, newest first (only when requested)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facts: Option<Vec<Fact>>,
}

impl Entity {
    /// Look up a single attribute
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// Remove the `name` key from an attribute bag.
///
/// Non-string names are rendered as JSON text; `null` counts as absent.
pub(crate) fn take_name(attributes: &mut Attributes) -> Option<String> {
    match attributes.remove(NAME_KEY) {
        Some(Value::String(name)) => Some(name),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    }
}

/// Shallow merge: keys in `update` overwrite, all others are preserved.
pub(crate) fn merge_attributes(existing: &mut Attributes, update: Attributes) {
    for (key, value) in update {
        existing.insert(key, value);
    }
}
