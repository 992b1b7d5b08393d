//! copy-point Components
//!
//! Interactive behaviour for server-rendered markup:
//! - `Expand`: disclosure driven by `aria-expanded` / `aria-controls`
//! - `Accordion`: single or multiple open groups of expands
//! - `Modal`: dismissal, focus and auto-open around `<dialog>`
//!
//! Components are configured by `data-*` attributes over `ComponentConfig`
//! defaults and found by the `init_*` scans.

pub mod accordion;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod expand;
pub mod modal;
pub mod trigger;

pub use accordion::{Accordion, AccordionMode, AccordionOptions};
pub use bootstrap::{init_accordions, init_all, init_expands, init_modals, install, InitReport};
pub use config::ComponentConfig;
pub use error::{ComponentError, ComponentResult, ConfigError};
pub use expand::{AfterCollapse, AfterExpand, BeforeCollapse, BeforeExpand, Expand, ExpandOptions, ToggleDetail};
pub use modal::{
    AfterClose, AfterOpen, BeforeClose, BeforeOpen, CloseDetail, Modal, ModalCallbacks, ModalOptions, ModalPhase,
    OpenDetail,
};
pub use trigger::init_modal_triggers;
