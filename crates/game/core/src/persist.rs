//! Structured save document for live action and brain state.
//!
//! An [`Element`] is a tag, string attributes and ordered children, the
//! lowest common denominator of XML-like formats. Actions write their
//! parameters as attributes and read them back with the typed getters
//! below; serde (RON in the content crate) handles the on-disk form.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use crate::action::ActionError;
use crate::error::{ErrorSeverity, GameError};
use crate::state::{EntityId, Position};

#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Element {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub attributes: BTreeMap<String, String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: impl Display) {
        self.attributes.insert(key.to_owned(), value.to_string());
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: impl Display) -> Self {
        self.set(key, value);
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Parses a required attribute.
    pub fn require<T: FromStr>(&self, key: &str) -> Result<T, PersistError> {
        self.parse(key)?.ok_or_else(|| PersistError::MissingAttribute {
            element: self.name.clone(),
            attribute: key.to_owned(),
        })
    }

    /// Parses an optional attribute. Present but malformed is still an error.
    pub fn parse<T: FromStr>(&self, key: &str) -> Result<Option<T>, PersistError> {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };
        raw.parse()
            .map(Some)
            .map_err(|_| PersistError::InvalidAttribute {
                element: self.name.clone(),
                attribute: key.to_owned(),
                value: raw.to_owned(),
            })
    }

    pub fn flag(&self, key: &str) -> Result<bool, PersistError> {
        Ok(self.parse(key)?.unwrap_or(false))
    }

    pub fn set_entity(&mut self, key: &str, id: EntityId) {
        self.set(key, id.0);
    }

    pub fn entity(&self, key: &str) -> Result<EntityId, PersistError> {
        self.require(key).map(EntityId)
    }

    pub fn set_tile(&mut self, tile: Position) {
        self.set("x", tile.x);
        self.set("y", tile.y);
    }

    pub fn tile(&self) -> Result<Position, PersistError> {
        Ok(Position::new(self.require("x")?, self.require("y")?))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PersistError {
    #[error("<{element}> is missing attribute `{attribute}`")]
    MissingAttribute { element: String, attribute: String },

    #[error("<{element}> attribute `{attribute}` has invalid value `{value}`")]
    InvalidAttribute {
        element: String,
        attribute: String,
        value: String,
    },

    #[error("unknown tag <{0}>")]
    UnknownTag(String),

    #[error(transparent)]
    Action(#[from] ActionError),
}

impl GameError for PersistError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Action(e) => e.severity(),
            _ => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingAttribute { .. } => "PERSIST_MISSING_ATTRIBUTE",
            Self::InvalidAttribute { .. } => "PERSIST_INVALID_ATTRIBUTE",
            Self::UnknownTag(_) => "PERSIST_UNKNOWN_TAG",
            Self::Action(e) => e.error_code(),
        }
    }
}
