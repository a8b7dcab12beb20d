//! Per-tag overrides: pins, display marks, aliases
//!
//! The table is user-edited, so parsing is lenient: anything unreadable
//! yields an empty table and a warning rather than an error.

use crate::tagpath;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Override record for one canonical tag
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TagInfo {
    /// Pin sort key; presence means the tag is pinned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Glyph shown in front of the label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark: Option<String>,
    /// Replacement label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    /// Tag this one is an alias of
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl TagInfo {
    /// Whether no field is set
    pub fn is_empty(&self) -> bool {
        self.key.is_none() && self.mark.is_none() && self.alt.is_none() && self.redirect.is_none()
    }
}

/// TagInfo records keyed by canonical tag
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagInfoDict(BTreeMap<String, TagInfo>);

impl TagInfoDict {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of records, dropping whatever does not fit
    ///
    /// Entries that are not objects, or that carry none of the known
    /// fields, are skipped. Unknown fields are ignored. Scalar values are
    /// accepted for any field and stringified.
    pub fn parse_lenient(text: &str) -> Self {
        if text.trim().is_empty() {
            return Self::new();
        }
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                warn!("Ignoring malformed tag info: {}", e);
                return Self::new();
            }
        };
        let Value::Object(entries) = value else {
            warn!("Ignoring tag info: expected an object at the top level");
            return Self::new();
        };

        let mut dict = Self::new();
        for (tag, record) in entries {
            let Value::Object(fields) = record else {
                continue;
            };
            let field = |name: &str| fields.get(name).and_then(scalar_to_string);
            let info = TagInfo {
                key: field("key"),
                mark: field("mark"),
                alt: field("alt"),
                redirect: field("redirect"),
            };
            if !info.is_empty() {
                dict.0.insert(tag, info);
            }
        }
        dict
    }

    /// Serialize for the pin/override store
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "{}".to_string())
    }

    /// Record for `tag`, exact match first, then case-insensitive
    pub fn get(&self, tag: &str) -> Option<&TagInfo> {
        self.0.get(tag).or_else(|| {
            self.0
                .iter()
                .find(|(k, _)| tagpath::eq_fold(k, tag))
                .map(|(_, v)| v)
        })
    }

    /// Pin key for `tag`, if pinned
    pub fn pin_key(&self, tag: &str) -> Option<&str> {
        self.get(tag).and_then(|info| info.key.as_deref())
    }

    /// Whether `tag` is pinned
    pub fn is_pinned(&self, tag: &str) -> bool {
        self.pin_key(tag).is_some()
    }

    /// Alias target for `tag`
    pub fn redirect(&self, tag: &str) -> Option<&str> {
        self.get(tag).and_then(|info| info.redirect.as_deref())
    }

    /// Rewrite `tag` through the alias table
    ///
    /// A single hop, matching how aliases are authored; chained aliases are
    /// not followed so a cycle cannot loop.
    pub fn resolve<'a>(&'a self, tag: &'a str) -> &'a str {
        self.redirect(tag).map(tagpath::canonical_tag).filter(|t| !t.is_empty()).unwrap_or(tag)
    }

    /// Pin `tag` with the given sort key
    pub fn pin(&mut self, tag: impl Into<String>, key: impl Into<String>) {
        self.0.entry(tag.into()).or_default().key = Some(key.into());
    }

    /// Remove the pin from `tag`, dropping the record if nothing is left
    pub fn unpin(&mut self, tag: &str) {
        if let Some(info) = self.0.get_mut(tag) {
            info.key = None;
            if info.is_empty() {
                self.0.remove(tag);
            }
        }
    }

    /// Insert or replace a record
    pub fn insert(&mut self, tag: impl Into<String>, info: TagInfo) {
        self.0.insert(tag.into(), info);
    }

    /// Records in tag order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &TagInfo)> {
        self.0.iter()
    }

    /// Pinned tags ordered by pin key
    pub fn pins(&self) -> Vec<(&str, &str)> {
        let mut pins: Vec<(&str, &str)> = self
            .0
            .iter()
            .filter_map(|(tag, info)| info.key.as_deref().map(|key| (tag.as_str(), key)))
            .collect();
        pins.sort_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)));
        pins
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
