//! Store access behind the search protocol.
//!
//! `EntityStore` is the seam to the persistent store collaborator;
//! `MemoryStore` is the in-crate reference implementation used by tests and
//! small deployments.

use std::sync::RwLock;

use async_trait::async_trait;

use courier_core::types::{Attachment, Contact, ConversationId, Message};
use courier_core::Result;

use crate::params::SearchParameters;

/// Executes validated queries for one entity kind.
///
/// Callers validate parameters before querying; implementations map their
/// own failures to [`CourierError::Upstream`](courier_core::CourierError::Upstream).
#[async_trait]
pub trait EntityStore<T>: Send + Sync {
    async fn query(&self, parameters: &SearchParameters) -> Result<Vec<T>>;
}

/// Exposes the filter dimensions of one searchable entity kind.
///
/// Dimensions an entity does not carry default to `None`; under a filter on
/// such a dimension the entity simply never matches.
pub trait Queryable: Clone + Send + Sync {
    /// The conversation this entity belongs to, for scoped searches.
    fn conversation(&self) -> Option<&ConversationId> {
        None
    }

    /// Whether the entity's name matches a substring filter.
    fn matches_name(&self, needle: &str) -> bool;

    fn mime_type(&self) -> Option<&str> {
        None
    }

    fn uti(&self) -> Option<&str> {
        None
    }
}

impl Queryable for Attachment {
    fn conversation(&self) -> Option<&ConversationId> {
        Some(&self.conversation)
    }

    fn matches_name(&self, needle: &str) -> bool {
        self.filename
            .as_deref()
            .is_some_and(|filename| contains_ignore_case(filename, needle))
    }

    fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    fn uti(&self) -> Option<&str> {
        self.uti.as_deref()
    }
}

impl Queryable for Message {
    fn matches_name(&self, needle: &str) -> bool {
        contains_ignore_case(&self.text, needle)
            || self
                .subject
                .as_deref()
                .is_some_and(|subject| contains_ignore_case(subject, needle))
    }
}

impl Queryable for Contact {
    fn matches_name(&self, needle: &str) -> bool {
        self.first_name
            .as_deref()
            .is_some_and(|name| contains_ignore_case(name, needle))
            || self
                .last_name
                .as_deref()
                .is_some_and(|name| contains_ignore_case(name, needle))
            || self
                .nicknames
                .iter()
                .any(|nickname| contains_ignore_case(nickname, needle))
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// SQL LIKE semantics: `%` matches any run, `_` exactly one character.
/// Case-insensitive.
pub fn like_match(pattern: &str, value: &str) -> bool {
    fn step(pattern: &[char], value: &[char]) -> bool {
        match pattern.split_first() {
            None => value.is_empty(),
            Some((&'%', rest)) => (0..=value.len()).any(|skip| step(rest, &value[skip..])),
            Some((&'_', rest)) => value
                .split_first()
                .is_some_and(|(_, tail)| step(rest, tail)),
            Some((&expected, rest)) => value
                .split_first()
                .is_some_and(|(&actual, tail)| actual == expected && step(rest, tail)),
        }
    }
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let value: Vec<char> = value.to_lowercase().chars().collect();
    step(&pattern, &value)
}

fn matches<T: Queryable>(item: &T, parameters: &SearchParameters) -> bool {
    if let Some(conversations) = &parameters.conversations {
        match item.conversation() {
            Some(id) if conversations.contains(id) => {}
            _ => return false,
        }
    }
    if let Some(mime) = &parameters.mime {
        match item.mime_type() {
            Some(value) if mime.iter().any(|candidate| candidate == value) => {}
            _ => return false,
        }
    }
    if let Some(pattern) = &parameters.like_mime {
        match item.mime_type() {
            Some(value) if like_match(pattern, value) => {}
            _ => return false,
        }
    }
    if let Some(uti) = &parameters.uti {
        match item.uti() {
            Some(value) if uti.iter().any(|candidate| candidate == value) => {}
            _ => return false,
        }
    }
    if let Some(pattern) = &parameters.like_uti {
        match item.uti() {
            Some(value) if like_match(pattern, value) => {}
            _ => return false,
        }
    }
    if let Some(name) = &parameters.name {
        if !item.matches_name(name) {
            return false;
        }
    }
    true
}

/// In-memory store over one entity kind.
pub struct MemoryStore<T> {
    items: RwLock<Vec<T>>,
}

impl<T: Queryable> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
        }
    }

    pub fn insert(&self, item: T) {
        self.items.write().expect("store poisoned").push(item);
    }

    pub fn extend(&self, items: impl IntoIterator<Item = T>) {
        self.items
            .write()
            .expect("store poisoned")
            .extend(items);
    }

    pub fn len(&self) -> usize {
        self.items.read().expect("store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Queryable> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Queryable + 'static> EntityStore<T> for MemoryStore<T> {
    async fn query(&self, parameters: &SearchParameters) -> Result<Vec<T>> {
        let mut hits: Vec<T> = {
            let items = self.items.read().expect("store poisoned");
            items
                .iter()
                .filter(|item| matches(*item, parameters))
                .cloned()
                .collect()
        };

        if let Some(limit) = parameters.limit {
            let limit = limit as usize;
            let start = parameters.page.unwrap_or(0) as usize * limit;
            hits = hits.into_iter().skip(start).take(limit).collect();
        }
        Ok(hits)
    }
}
