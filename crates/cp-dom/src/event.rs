//! DOM Events
//!
//! Event objects, keyboard keys and listener registrations.

use std::fmt;
use std::rc::Rc;

use crate::{Document, NodeId};

/// DOM event types the component layer listens for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Click,
    KeyDown,
    /// Fired (as a queued task) after a dialog closes
    Close,
    /// Fired on the topmost modal dialog before Escape closes it
    Cancel,
    AnimationEnd,
    TransitionEnd,
    DomContentLoaded,
}

impl EventType {
    pub fn bubbles(self) -> bool {
        !matches!(self, Self::Close | Self::Cancel)
    }

    pub fn cancelable(self) -> bool {
        matches!(self, Self::Click | Self::KeyDown | Self::Cancel)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::KeyDown => "keydown",
            Self::Close => "close",
            Self::Cancel => "cancel",
            Self::AnimationEnd => "animationend",
            Self::TransitionEnd => "transitionend",
            Self::DomContentLoaded => "DOMContentLoaded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "click" => Self::Click,
            "keydown" => Self::KeyDown,
            "close" => Self::Close,
            "cancel" => Self::Cancel,
            "animationend" => Self::AnimationEnd,
            "transitionend" => Self::TransitionEnd,
            "DOMContentLoaded" => Self::DomContentLoaded,
            _ => return None,
        })
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Character(char),
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    Enter,
    Escape,
    Tab,
    Space,
    Unidentified(String),
}

impl Key {
    /// Parse from a `KeyboardEvent.key` string
    pub fn parse(s: &str) -> Self {
        match s {
            "ArrowUp" => Self::ArrowUp,
            "ArrowDown" => Self::ArrowDown,
            "ArrowLeft" => Self::ArrowLeft,
            "ArrowRight" => Self::ArrowRight,
            "Home" => Self::Home,
            "End" => Self::End,
            "Enter" => Self::Enter,
            "Escape" | "Esc" => Self::Escape,
            "Tab" => Self::Tab,
            " " | "Space" => Self::Space,
            s => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Character(c),
                    _ => Self::Unidentified(s.to_string()),
                }
            }
        }
    }

    pub fn as_key_string(&self) -> String {
        match self {
            Self::Character(c) => c.to_string(),
            Self::ArrowUp => "ArrowUp".into(),
            Self::ArrowDown => "ArrowDown".into(),
            Self::ArrowLeft => "ArrowLeft".into(),
            Self::ArrowRight => "ArrowRight".into(),
            Self::Home => "Home".into(),
            Self::End => "End".into(),
            Self::Enter => "Enter".into(),
            Self::Escape => "Escape".into(),
            Self::Tab => "Tab".into(),
            Self::Space => " ".into(),
            Self::Unidentified(s) => s.clone(),
        }
    }
}

/// Event being dispatched
#[derive(Debug, Clone)]
pub struct Event {
    event_type: EventType,
    target: NodeId,
    current_target: NodeId,
    key: Option<Key>,
    bubbles: bool,
    cancelable: bool,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl Event {
    pub fn new(event_type: EventType, target: NodeId) -> Self {
        Self {
            event_type,
            target,
            current_target: target,
            key: None,
            bubbles: event_type.bubbles(),
            cancelable: event_type.cancelable(),
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// Create a keydown event
    pub fn key_down(target: NodeId, key: Key) -> Self {
        Self {
            key: Some(key),
            ..Self::new(EventType::KeyDown, target)
        }
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn current_target(&self) -> NodeId {
        self.current_target
    }

    pub(crate) fn set_current_target(&mut self, node: NodeId) {
        self.current_target = node;
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    /// Prevent default action (ignored for non-cancelable events)
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Event listener callback
///
/// Errors are reported through tracing and do not stop the dispatch.
pub type Listener = Rc<dyn Fn(&mut Document, &mut Event) -> anyhow::Result<()>>;

/// Handle returned by `add_event_listener`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

pub(crate) struct ListenerEntry {
    pub id: ListenerId,
    pub event_type: EventType,
    pub listener: Listener,
}
