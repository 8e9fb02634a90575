//! External and local record shapes.
//!
//! The external system hands back property bags whose values come in three
//! incompatible forms; [`Property`] keeps them apart:
//!
//! - a typed API property object (`{"type": "title", "title": [...]}`)
//! - a plain string
//! - any other nested JSON structure
//!
//! Text is pulled out of all three through [`crate::support::AsText`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use booksim_core::EntityType;

/// One raw record from the external source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalRecord {
    pub id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Property>,
}

impl ExternalRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style insert, used by sources and tests.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Property>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

/// A single property value in whichever shape the source produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Property {
    Typed(PropertyValue),
    Text(String),
    Raw(serde_json::Value),
}

impl From<PropertyValue> for Property {
    fn from(value: PropertyValue) -> Self {
        Property::Typed(value)
    }
}

impl From<&str> for Property {
    fn from(value: &str) -> Self {
        Property::Text(value.to_string())
    }
}

impl From<String> for Property {
    fn from(value: String) -> Self {
        Property::Text(value)
    }
}

impl From<serde_json::Value> for Property {
    fn from(value: serde_json::Value) -> Self {
        Property::Raw(value)
    }
}

/// Typed external-API property object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    Title {
        #[serde(default)]
        title: Vec<RichText>,
    },
    RichText {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    Select {
        #[serde(default)]
        select: Option<SelectOption>,
    },
    Number {
        #[serde(default)]
        number: Option<f64>,
    },
    Checkbox {
        #[serde(default)]
        checkbox: bool,
    },
    Relation {
        #[serde(default)]
        relation: Vec<RelationRef>,
    },
}

impl PropertyValue {
    pub fn title(text: &str) -> Self {
        PropertyValue::Title {
            title: vec![RichText::plain(text)],
        }
    }

    pub fn rich_text(text: &str) -> Self {
        PropertyValue::RichText {
            rich_text: vec![RichText::plain(text)],
        }
    }

    pub fn select(name: &str) -> Self {
        PropertyValue::Select {
            select: Some(SelectOption {
                id: None,
                name: name.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: Option<String>,
    #[serde(default)]
    pub text: Option<TextContent>,
}

impl RichText {
    pub fn plain(text: &str) -> Self {
        Self {
            plain_text: Some(text.to_string()),
            text: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRef {
    pub id: String,
}

/// A record as persisted in the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalRecord {
    pub id: String,
    pub entity: EntityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}
