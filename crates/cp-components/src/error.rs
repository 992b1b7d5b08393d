//! Component errors

use std::path::PathBuf;

use cp_dom::{DomError, NodeId};

/// Component operation errors
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    #[error("{0} is not an element")]
    NotAnElement(NodeId),

    #[error("{node} is <{found}>, expected <{expected}>")]
    WrongElementKind {
        node: NodeId,
        expected: &'static str,
        found: String,
    },

    #[error(transparent)]
    Dom(#[from] DomError),

    /// A subscribed handler failed
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

pub type ComponentResult<T> = Result<T, ComponentError>;

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
