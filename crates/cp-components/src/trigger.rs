//! Declarative modal triggers
//!
//! `<button data-modal-open="#signup">` opens the referenced dialog on
//! click. The reference is a selector or a bare id, resolved once when the
//! trigger is bound.

use std::rc::Rc;

use cp_dom::{Document, Event as DomEvent, EventType, NodeId};
use cp_emitter::DispatchMode;
use tracing::{debug, warn};

use crate::error::ComponentResult;
use crate::modal::{Modal, ModalOptions};

/// Marker set on triggers that already have a click listener
pub const BOUND_ATTR: &str = "data-modal-bound";

/// Resolve `reference` as an element id first, then as a selector
fn resolve_target(doc: &Document, reference: &str) -> Option<NodeId> {
    if reference.is_empty() {
        return None;
    }
    doc.get_element_by_id(reference)
        .or_else(|| doc.query_selector(doc.root(), reference).ok().flatten())
}

/// Bind every unbound `[data-modal-open]` trigger, returns how many were bound
pub fn init_modal_triggers(
    doc: &mut Document,
    options: &ModalOptions,
    dispatch: DispatchMode,
) -> ComponentResult<usize> {
    let mut bound = 0;
    for trigger in doc.query_selector_all(doc.root(), "[data-modal-open]")? {
        if doc.has_attr(trigger, BOUND_ATTR) {
            continue;
        }
        let reference = doc.attr(trigger, "data-modal-open").unwrap_or_default().trim().to_string();
        let Some(dialog) = resolve_target(doc, &reference) else {
            warn!(trigger = %trigger, reference = %reference, "modal trigger target not found");
            continue;
        };
        if !doc.is_dialog(dialog) {
            warn!(trigger = %trigger, reference = %reference, "modal trigger target is not a dialog");
            continue;
        }
        let non_modal = doc
            .attr(trigger, "data-modal-open-mode")
            .is_some_and(|mode| mode.trim().eq_ignore_ascii_case("non-modal"));

        let options = options.clone();
        doc.add_event_listener(
            trigger,
            EventType::Click,
            Rc::new(move |doc: &mut Document, event: &mut DomEvent| {
                event.prevent_default();
                let modal = match Modal::get_instance(doc, dialog) {
                    Some(modal) => modal,
                    None => {
                        let modal = Modal::new(doc, dialog, options.clone())?;
                        modal.events().set_mode(dispatch);
                        modal
                    }
                };
                if non_modal {
                    modal.open_non_modal(doc)?;
                } else {
                    modal.open_modal(doc)?;
                }
                Ok(())
            }),
        );
        doc.set_attr(trigger, BOUND_ATTR, "")?;
        debug!(trigger = %trigger, dialog = %dialog, non_modal, "modal trigger bound");
        bound += 1;
    }
    Ok(bound)
}
