//! Scripted interactions
//!
//! Each command line action is `kind:argument`, e.g. `click:#menu-btn`,
//! `key:Escape`, `tick:300`.

use std::fmt;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use cp_dom::{Document, Event, EventType, Key, NodeId};
use tracing::{debug, warn};

/// One step of a replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Click the first element matching a selector (or id)
    Click(String),
    /// Press a key on the focused element
    Key(Key),
    Focus(String),
    /// Advance the virtual clock
    Tick(Duration),
    /// Fire `transitionend` on an element
    TransitionEnd(String),
}

impl Action {
    pub fn parse(text: &str) -> Result<Self> {
        let Some((kind, arg)) = text.split_once(':') else {
            bail!("action `{text}` is missing its `kind:` prefix");
        };
        if arg.is_empty() {
            bail!("action `{text}` has no argument");
        }
        Ok(match kind {
            "click" => Self::Click(arg.to_string()),
            "key" => Self::Key(Key::parse(arg)),
            "focus" => Self::Focus(arg.to_string()),
            "tick" => {
                let ms: u64 = arg.parse().with_context(|| format!("`{arg}` is not a millisecond count"))?;
                Self::Tick(Duration::from_millis(ms))
            }
            "end" => Self::TransitionEnd(arg.to_string()),
            other => bail!("unknown action kind `{other}`"),
        })
    }

    /// Apply to `doc`, then drain tasks that became due
    pub fn run(&self, doc: &mut Document) -> Result<()> {
        match self {
            Self::Click(target) => {
                let node = resolve(doc, target)?;
                let proceed = doc.click(node);
                debug!(target = %node, proceed, "click");
            }
            Self::Key(key) => {
                let proceed = doc.key_down(key.clone());
                debug!(key = %key.as_key_string(), proceed, "key");
            }
            Self::Focus(target) => {
                let node = resolve(doc, target)?;
                if !doc.focus(node) {
                    warn!(target = %node, "element refused focus");
                }
            }
            Self::Tick(by) => {
                let ran = doc.advance(*by);
                debug!(?by, ran, "tick");
            }
            Self::TransitionEnd(target) => {
                let node = resolve(doc, target)?;
                doc.dispatch_event(Event::new(EventType::TransitionEnd, node));
            }
        }
        doc.run_until_idle();
        Ok(())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Click(target) => write!(f, "click {target}"),
            Self::Key(key) => write!(f, "key {}", key.as_key_string()),
            Self::Focus(target) => write!(f, "focus {target}"),
            Self::Tick(by) => write!(f, "tick {}ms", by.as_millis()),
            Self::TransitionEnd(target) => write!(f, "transitionend {target}"),
        }
    }
}

/// Bare ids first, then selectors
pub fn resolve(doc: &Document, target: &str) -> Result<NodeId> {
    if let Some(node) = doc.get_element_by_id(target) {
        return Ok(node);
    }
    doc.query_selector(doc.root(), target)?
        .with_context(|| format!("nothing matches `{target}`"))
}
