//! Configuration
//!
//! Defaults for every component family, loadable from TOML, plus the
//! helpers that read declarative `data-*` overrides off elements.

use std::path::Path;

use cp_dom::{Document, NodeId};
use cp_emitter::DispatchMode;
use serde::Deserialize;
use tracing::warn;

use crate::accordion::AccordionOptions;
use crate::error::ConfigError;
use crate::expand::ExpandOptions;
use crate::modal::ModalOptions;

/// Component defaults
///
/// ```toml
/// dispatch = "isolate"
///
/// [expand]
/// transition_timeout_ms = 300
///
/// [accordion]
/// mode = "single"
///
/// [modal]
/// backdrop_dismiss = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComponentConfig {
    pub expand: ExpandOptions,
    pub accordion: AccordionOptions,
    pub modal: ModalOptions,
    /// Error handling for component event channels
    pub dispatch: DispatchMode,
}

impl ComponentConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}

/// Boolean data attribute: absent is `None`, `"false"` is false, anything else true
pub(crate) fn bool_attr(doc: &Document, node: NodeId, name: &str) -> Option<bool> {
    doc.attr(node, name)
        .map(|value| !value.trim().eq_ignore_ascii_case("false"))
}

/// Millisecond data attribute; unparsable values are ignored with a warning
pub(crate) fn ms_attr(doc: &Document, node: NodeId, name: &str) -> Option<u64> {
    let value = doc.attr(node, name)?.trim();
    match value.parse() {
        Ok(ms) => Some(ms),
        Err(_) => {
            warn!(node = %node, attr = name, value, "not a millisecond count, ignored");
            None
        }
    }
}

/// Non-empty string data attribute
pub(crate) fn string_attr(doc: &Document, node: NodeId, name: &str) -> Option<String> {
    doc.attr(node, name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
