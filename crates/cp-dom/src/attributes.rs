//! Element Attributes
//!
//! Ordered attribute map with case-insensitive names.

use std::collections::HashMap;

/// Single attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

impl Attr {
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            value: value.into(),
        }
    }
}

/// Named node map (attribute collection)
///
/// Keeps source order for iteration and an index for lookups.
#[derive(Debug, Clone, Default)]
pub struct NamedNodeMap {
    attributes: Vec<Attr>,
    by_name: HashMap<String, usize>,
}

impl NamedNodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Get attribute value
    pub fn get(&self, name: &str) -> Option<&str> {
        let index = self.lookup(name)?;
        self.attributes.get(index).map(|a| a.value.as_str())
    }

    /// Check if attribute exists
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Set attribute, returning the previous value
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Option<String> {
        let attr = Attr::new(name, value);
        match self.by_name.get(&attr.name) {
            Some(&index) => Some(std::mem::replace(&mut self.attributes[index].value, attr.value)),
            None => {
                self.by_name.insert(attr.name.clone(), self.attributes.len());
                self.attributes.push(attr);
                None
            }
        }
    }

    /// Remove attribute, returning its value
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.lookup(name)?;
        let removed = self.attributes.remove(index);
        self.by_name.remove(&removed.name);
        for idx in self.by_name.values_mut() {
            if *idx > index {
                *idx -= 1;
            }
        }
        Some(removed.value)
    }

    /// Toggle a boolean attribute, returns presence afterwards
    pub fn toggle(&mut self, name: &str, force: Option<bool>) -> bool {
        let present = force.unwrap_or(!self.contains(name));
        if present {
            if !self.contains(name) {
                self.set(name, "");
            }
        } else {
            self.remove(name);
        }
        present
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attr> {
        self.attributes.iter()
    }

    fn lookup(&self, name: &str) -> Option<usize> {
        match self.by_name.get(name) {
            Some(&index) => Some(index),
            None if name.bytes().any(|b| b.is_ascii_uppercase()) => {
                self.by_name.get(&name.to_ascii_lowercase()).copied()
            }
            None => None,
        }
    }
}
