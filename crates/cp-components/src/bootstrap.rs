//! Discovery and bootstrap
//!
//! Each `init_*` scan enhances the matching elements that do not have an
//! instance yet, so running a scan twice is harmless.

use std::rc::Rc;

use cp_a11y::aria;
use cp_dom::{Document, Event as DomEvent, EventType, ReadyState};
use tracing::info;

use crate::accordion::{Accordion, AccordionOptions, ITEM_CONTROL_SELECTOR};
use crate::config::ComponentConfig;
use crate::error::ComponentResult;
use crate::expand::Expand;
use crate::modal::Modal;
use crate::trigger::init_modal_triggers;

/// New instances created by one `init_all` pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitReport {
    pub modals: usize,
    pub triggers: usize,
    pub accordions: usize,
    pub expands: usize,
}

impl InitReport {
    pub fn total(&self) -> usize {
        self.modals + self.triggers + self.accordions + self.expands
    }
}

/// Enhance every `[aria-expanded][aria-controls]` control that is not a dialog trigger
pub fn init_expands(doc: &mut Document, config: &ComponentConfig) -> ComponentResult<usize> {
    let mut created = 0;
    for control in doc.query_selector_all(doc.root(), ITEM_CONTROL_SELECTOR)? {
        if Expand::get_instance(doc, control).is_some() || doc.has_attr(control, "data-modal-open") {
            continue;
        }
        let opens_dialog = aria::controlled_element(doc, control)
            .node()
            .is_some_and(|target| doc.is_dialog(target));
        if opens_dialog {
            continue;
        }
        let expand = Expand::new(doc, control, config.expand.clone())?;
        expand.events().set_mode(config.dispatch);
        created += 1;
    }
    Ok(created)
}

/// Coordinate every `[data-accordion]` container
pub fn init_accordions(doc: &mut Document, config: &ComponentConfig) -> ComponentResult<usize> {
    let options = AccordionOptions {
        items: config.expand.clone(),
        ..config.accordion.clone()
    };
    let mut created = 0;
    for container in doc.query_selector_all(doc.root(), "[data-accordion]")? {
        if Accordion::get_instance(doc, container).is_some() {
            continue;
        }
        let accordion = Accordion::new(doc, container, options.clone())?;
        for item in accordion.items() {
            item.events().set_mode(config.dispatch);
        }
        created += 1;
    }
    Ok(created)
}

/// Control every `dialog[data-modal]`
pub fn init_modals(doc: &mut Document, config: &ComponentConfig) -> ComponentResult<usize> {
    let mut created = 0;
    for dialog in doc.query_selector_all(doc.root(), "dialog[data-modal]")? {
        if Modal::get_instance(doc, dialog).is_some() {
            continue;
        }
        let modal = Modal::new(doc, dialog, config.modal.clone())?;
        modal.events().set_mode(config.dispatch);
        created += 1;
    }
    Ok(created)
}

/// Run every discovery scan: modals, triggers, accordions, then loose expands
pub fn init_all(doc: &mut Document, config: &ComponentConfig) -> ComponentResult<InitReport> {
    let report = InitReport {
        modals: init_modals(doc, config)?,
        triggers: init_modal_triggers(doc, &config.modal, config.dispatch)?,
        accordions: init_accordions(doc, config)?,
        expands: init_expands(doc, config)?,
    };
    info!(
        modals = report.modals,
        triggers = report.triggers,
        accordions = report.accordions,
        expands = report.expands,
        "components initialised"
    );
    Ok(report)
}

/// Run `init_all` now if the document is interactive, else on `DOMContentLoaded`
///
/// Returns the report when initialisation ran immediately.
pub fn install(doc: &mut Document, config: ComponentConfig) -> ComponentResult<Option<InitReport>> {
    if doc.ready_state() == ReadyState::Interactive {
        return init_all(doc, &config).map(Some);
    }
    doc.add_event_listener(
        doc.root(),
        EventType::DomContentLoaded,
        Rc::new(move |doc: &mut Document, _event: &mut DomEvent| {
            init_all(doc, &config)?;
            Ok(())
        }),
    );
    Ok(None)
}
