//! copy-point Accessibility
//!
//! ARIA state helpers and focus rules shared by the components.
//!
//! Features:
//! - `aria-expanded` / `aria-controls` reading and writing
//! - Focusability and tab order
//! - Roving focus for composite widgets

pub mod aria;
pub mod focus;

pub use aria::{controlled_element, controls, is_expanded, parse_bool, set_expanded, ControlLink};
pub use focus::{first_focusable, focusable_descendants, is_focusable, RovingFocus, TabIndex};
