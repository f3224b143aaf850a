//! Quick link records and the validation applied by the link form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::ValidationError;

pub const UNNAMED_LINK: &str = "Unnamed link";

/// A single quick link. Fields other than `url` and `name` that came in
/// through storage or an import are carried along untouched. A stored
/// record missing `url` or `name` loads with an empty field instead of
/// failing the whole list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Entity {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Shallow merge: fields present in `patch` replace ours, the rest stay.
    pub fn merge(&mut self, patch: EntityPatch) {
        if let Some(url) = patch.url {
            self.url = url;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
    }

    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else if !self.url.is_empty() {
            &self.url
        } else {
            UNNAMED_LINK
        }
    }
}

/// Partial update for [`Entity::merge`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityPatch {
    pub url: Option<String>,
    pub name: Option<String>,
}

impl EntityPatch {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            name: None,
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            url: None,
            name: Some(name.into()),
        }
    }
}

impl From<Entity> for EntityPatch {
    fn from(entity: Entity) -> Self {
        Self {
            url: Some(entity.url),
            name: Some(entity.name),
        }
    }
}

fn with_scheme(url: &str) -> String {
    if url.starts_with("http") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

fn parse_loose(url: &str) -> Option<Url> {
    Url::parse(&with_scheme(url)).ok()
}

/// Validate link form input. Both fields are trimmed; the url must parse once
/// an `https://` prefix is assumed for scheme-less input.
pub fn validate_link_input(url: &str, name: &str) -> Result<Entity, ValidationError> {
    let url = url.trim();
    let name = name.trim();
    if url.is_empty() || name.is_empty() {
        return Err(ValidationError::MissingField);
    }
    match parse_loose(url) {
        Some(parsed) if parsed.host_str().is_some() => Ok(Entity::new(url, name)),
        _ => Err(ValidationError::InvalidUrl),
    }
}

/// The address actually handed to the opener.
pub fn open_target(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

pub fn host_of(url: &str) -> Option<String> {
    parse_loose(url)?.host_str().map(str::to_string)
}

/// Icon service address for the link's domain.
pub fn favicon_url(url: &str) -> Option<String> {
    let host = host_of(url)?;
    Some(format!("https://icons.duckduckgo.com/ip3/{host}.ico"))
}
