use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use cp_components::{
    AfterClose, AfterOpen, BeforeClose, BeforeOpen, CloseDetail, ComponentError, Modal, ModalCallbacks,
    ModalOptions, ModalPhase, OpenDetail,
};
use cp_dom::{Document, EventType, Key, NodeId};
use cp_emitter::Event;

const PAGE: &str = r#"
    <button id="opener">Sign up</button>
    <dialog id="dlg">
      <h2 id="title">Join</h2>
      <input id="email" type="email">
      <form method="dialog"><button id="ok" value="confirm">OK</button></form>
    </dialog>
"#;

fn setup(html: &str) -> (Document, NodeId) {
    let doc = cp_html::parse(html).unwrap();
    let dialog = doc.get_element_by_id("dlg").unwrap();
    (doc, dialog)
}

fn by_id(doc: &Document, id: &str) -> NodeId {
    doc.get_element_by_id(id).unwrap()
}

/// Counts emissions of `E`
fn count<E: Event>(modal: &Modal) -> Rc<Cell<usize>> {
    let hits = Rc::new(Cell::new(0));
    let seen = Rc::clone(&hits);
    modal.events().on::<E>(Rc::new(move |_doc: &mut Document, _payload: &E::Payload| {
        seen.set(seen.get() + 1);
        Ok(())
    }));
    hits
}

#[test]
fn test_rejects_non_dialogs() {
    let mut doc = cp_html::parse(PAGE).unwrap();
    let opener = by_id(&doc, "opener");
    match Modal::new(&mut doc, opener, ModalOptions::default()) {
        Err(ComponentError::WrongElementKind { expected, found, .. }) => {
            assert_eq!(expected, "dialog");
            assert_eq!(found, "button");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_open_focuses_first_focusable_and_close_restores_opener() {
    let (mut doc, dialog) = setup(PAGE);
    let (opener, email) = (by_id(&doc, "opener"), by_id(&doc, "email"));
    let modal = Modal::new(&mut doc, dialog, ModalOptions::default()).unwrap();

    assert!(doc.focus(opener));
    modal.open_modal(&mut doc).unwrap();
    assert_eq!(modal.phase(), ModalPhase::Open);
    assert_eq!(doc.topmost_modal(), Some(dialog));
    assert_eq!(doc.active_element(), Some(email));
    assert!(doc.is_inert(opener));

    modal.close(&mut doc, None).unwrap();
    assert_eq!(modal.phase(), ModalPhase::Closing);
    doc.run_until_idle();

    assert_eq!(modal.phase(), ModalPhase::Closed);
    assert!(!doc.has_attr(dialog, "open"));
    assert!(doc.top_layer().is_empty());
    assert_eq!(doc.active_element(), Some(opener));
}

#[test]
fn test_restore_focus_can_be_disabled() {
    let (mut doc, dialog) = setup(PAGE);
    let opener = by_id(&doc, "opener");
    doc.set_attr(dialog, "data-modal-restore-focus", "false").unwrap();
    let modal = Modal::new(&mut doc, dialog, ModalOptions::default()).unwrap();

    doc.focus(opener);
    modal.open_modal(&mut doc).unwrap();
    modal.close(&mut doc, None).unwrap();
    doc.run_until_idle();
    assert_eq!(doc.active_element(), None);
}

#[test]
fn test_removed_opener_is_not_refocused() {
    let (mut doc, dialog) = setup(PAGE);
    let opener = by_id(&doc, "opener");
    let modal = Modal::new(&mut doc, dialog, ModalOptions::default()).unwrap();

    doc.focus(opener);
    modal.open_modal(&mut doc).unwrap();
    doc.remove_node(opener).unwrap();
    modal.close(&mut doc, None).unwrap();
    doc.run_until_idle();
    assert_eq!(doc.active_element(), None);
}

#[test]
fn test_focus_target_wins_over_first_focusable() {
    let (mut doc, dialog) = setup(PAGE);
    doc.set_attr(dialog, "data-modal-focus", "#ok").unwrap();
    let modal = Modal::new(&mut doc, dialog, ModalOptions::default()).unwrap();

    modal.open_modal(&mut doc).unwrap();
    assert_eq!(doc.active_element(), Some(by_id(&doc, "ok")));
}

#[test]
fn test_footer_button_is_the_last_resort() {
    let (mut doc, dialog) = setup(r#"
        <dialog id="dlg">
          <p>Saved.</p>
          <footer><button id="dismiss" tabindex="-1">Dismiss</button></footer>
        </dialog>
    "#);
    let modal = Modal::new(&mut doc, dialog, ModalOptions::default()).unwrap();

    modal.open_modal(&mut doc).unwrap();
    assert_eq!(doc.active_element(), Some(by_id(&doc, "dismiss")));
}

#[test]
fn test_events_observe_the_transition() {
    let (mut doc, dialog) = setup(PAGE);
    let modal = Modal::new(&mut doc, dialog, ModalOptions::default()).unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));

    let entry = Rc::clone(&log);
    modal.events().on::<BeforeOpen>(Rc::new(move |doc: &mut Document, d: &OpenDetail| {
        entry.borrow_mut().push(format!("before-open open={}", doc.is_dialog_open(d.dialog)));
        Ok(())
    }));
    let entry = Rc::clone(&log);
    modal.events().on::<AfterOpen>(Rc::new(move |doc: &mut Document, d: &OpenDetail| {
        entry.borrow_mut().push(format!("after-open open={} modal={}", doc.is_dialog_open(d.dialog), d.modal));
        Ok(())
    }));
    let entry = Rc::clone(&log);
    modal.events().on::<BeforeClose>(Rc::new(move |doc: &mut Document, d: &CloseDetail| {
        entry.borrow_mut().push(format!("before-close open={}", doc.is_dialog_open(d.dialog)));
        Ok(())
    }));
    let entry = Rc::clone(&log);
    modal.events().on::<AfterClose>(Rc::new(move |doc: &mut Document, d: &CloseDetail| {
        entry.borrow_mut().push(format!(
            "after-close open={} value={:?}",
            doc.is_dialog_open(d.dialog),
            d.return_value
        ));
        Ok(())
    }));

    modal.open_modal(&mut doc).unwrap();
    modal.close(&mut doc, Some("later")).unwrap();
    doc.run_until_idle();

    assert_eq!(
        *log.borrow(),
        [
            "before-open open=false",
            "after-open open=true modal=true",
            "before-close open=true",
            "after-close open=false value=Some(\"later\")",
        ]
    );
}

#[test]
fn test_opening_twice_emits_once() {
    let (mut doc, dialog) = setup(PAGE);
    let modal = Modal::new(&mut doc, dialog, ModalOptions::default()).unwrap();
    let opened = count::<AfterOpen>(&modal);
    let closed = count::<BeforeClose>(&modal);

    modal.open_modal(&mut doc).unwrap();
    modal.open_non_modal(&mut doc).unwrap();
    assert_eq!(opened.get(), 1);
    assert_eq!(doc.top_layer(), &[dialog]);

    modal.close(&mut doc, None).unwrap();
    modal.close(&mut doc, None).unwrap();
    assert_eq!(closed.get(), 1);
}

#[test]
fn test_backdrop_click_closes() {
    let (mut doc, dialog) = setup(PAGE);
    let title = by_id(&doc, "title");
    let modal = Modal::new(&mut doc, dialog, ModalOptions::default()).unwrap();
    modal.open_modal(&mut doc).unwrap();

    doc.click(title);
    assert!(modal.is_open(&doc));

    doc.click(dialog);
    assert!(!modal.is_open(&doc));
}

#[test]
fn test_backdrop_dismissal_can_be_disabled() {
    let (mut doc, dialog) = setup(PAGE);
    doc.set_attr(dialog, "data-modal-backdrop", "false").unwrap();
    let modal = Modal::new(&mut doc, dialog, ModalOptions::default()).unwrap();
    let closing = count::<BeforeClose>(&modal);
    modal.open_modal(&mut doc).unwrap();

    doc.click(dialog);
    doc.run_until_idle();
    assert!(modal.is_open(&doc));
    assert_eq!(closing.get(), 0);
}

#[test]
fn test_escape_closes_and_skips_native_cancel() {
    let (mut doc, dialog) = setup(PAGE);
    let modal = Modal::new(&mut doc, dialog, ModalOptions::default()).unwrap();
    let closed = count::<AfterClose>(&modal);
    let cancels = Rc::new(Cell::new(0));
    let seen = Rc::clone(&cancels);
    doc.add_event_listener(
        dialog,
        EventType::Cancel,
        Rc::new(move |_doc: &mut Document, _event: &mut cp_dom::Event| {
            seen.set(seen.get() + 1);
            Ok(())
        }),
    );

    modal.open_modal(&mut doc).unwrap();
    assert!(!doc.key_down(Key::Escape));
    doc.run_until_idle();

    assert!(!modal.is_open(&doc));
    assert_eq!(closed.get(), 1);
    assert_eq!(cancels.get(), 0);
}

#[test]
fn test_escape_policy_can_refuse() {
    let (mut doc, dialog) = setup(PAGE);
    let options = ModalOptions {
        escape_dismiss: false,
        ..ModalOptions::default()
    };
    let modal = Modal::new(&mut doc, dialog, options).unwrap();
    modal.open_modal(&mut doc).unwrap();

    doc.key_down(Key::Escape);
    doc.run_until_idle();
    assert!(modal.is_open(&doc));
    assert_eq!(modal.phase(), ModalPhase::Open);
}

#[test]
fn test_escape_while_closed_is_ignored() {
    let (mut doc, dialog) = setup(PAGE);
    let modal = Modal::new(&mut doc, dialog, ModalOptions::default()).unwrap();
    let closing = count::<BeforeClose>(&modal);

    doc.key_down(Key::Escape);
    modal.open_modal(&mut doc).unwrap();
    modal.close(&mut doc, None).unwrap();
    doc.run_until_idle();
    doc.key_down(Key::Escape);

    assert_eq!(closing.get(), 1);
    assert_eq!(doc.listener_count(doc.root(), EventType::KeyDown), 0);
}

#[test]
fn test_form_submission_reports_the_return_value() {
    let (mut doc, dialog) = setup(PAGE);
    let ok = by_id(&doc, "ok");
    let values = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&values);
    let callbacks = ModalCallbacks {
        on_close: Some(Rc::new(move |_doc: &mut Document, detail: &CloseDetail| {
            seen.borrow_mut().push(detail.return_value.clone());
            Ok(())
        })),
        ..ModalCallbacks::default()
    };
    let modal = Modal::with_callbacks(&mut doc, dialog, ModalOptions::default(), callbacks).unwrap();

    modal.open_modal(&mut doc).unwrap();
    doc.click(ok);
    doc.run_until_idle();

    assert_eq!(modal.phase(), ModalPhase::Closed);
    assert_eq!(*values.borrow(), [Some("confirm".to_string())]);

    // a fresh open starts without the previous value
    modal.open_modal(&mut doc).unwrap();
    assert_eq!(doc.dialog_return_value(dialog), None);
}

#[test]
fn test_reopen_before_close_event_skips_stale_close() {
    let (mut doc, dialog) = setup(PAGE);
    let modal = Modal::new(&mut doc, dialog, ModalOptions::default()).unwrap();
    let closed = count::<AfterClose>(&modal);

    modal.open_modal(&mut doc).unwrap();
    modal.close(&mut doc, None).unwrap();
    modal.open_modal(&mut doc).unwrap();
    doc.run_until_idle();

    assert_eq!(closed.get(), 0);
    assert_eq!(modal.phase(), ModalPhase::Open);
    assert!(modal.is_open(&doc));
}

#[test]
fn test_non_modal_open_leaves_the_page_interactive() {
    let (mut doc, dialog) = setup(PAGE);
    let opener = by_id(&doc, "opener");
    let modal = Modal::new(&mut doc, dialog, ModalOptions::default()).unwrap();

    modal.open_non_modal(&mut doc).unwrap();
    assert!(modal.is_open(&doc));
    assert!(doc.top_layer().is_empty());
    assert!(!doc.is_inert(opener));

    doc.key_down(Key::Escape);
    assert!(!modal.is_open(&doc));
}

#[test]
fn test_auto_open_waits_for_its_delay() {
    let (mut doc, dialog) = setup(r#"<dialog id="dlg" data-modal-auto-open data-modal-delay="300"><button>OK</button></dialog>"#);
    let modal = Modal::new(&mut doc, dialog, ModalOptions::default()).unwrap();

    doc.advance(Duration::from_millis(299));
    assert!(!modal.is_open(&doc));
    doc.advance(Duration::from_millis(1));
    assert!(modal.is_open(&doc));
    assert!(doc.is_modal_dialog(dialog));
}

#[test]
fn test_auto_open_skips_an_already_open_dialog() {
    let (mut doc, dialog) = setup(r#"<dialog id="dlg" data-modal-auto-open data-modal-delay="100"></dialog>"#);
    let modal = Modal::new(&mut doc, dialog, ModalOptions::default()).unwrap();
    let opened = count::<BeforeOpen>(&modal);

    modal.open_non_modal(&mut doc).unwrap();
    doc.advance(Duration::from_millis(200));
    assert_eq!(opened.get(), 1);
    assert!(!doc.is_modal_dialog(dialog));
}

#[test]
fn test_destroy_force_closes_and_cancels_auto_open() {
    let (mut doc, dialog) = setup(PAGE);
    let modal = Modal::new(&mut doc, dialog, ModalOptions::default()).unwrap();
    modal.open_modal(&mut doc).unwrap();

    modal.destroy(&mut doc).unwrap();
    doc.run_until_idle();
    assert!(!doc.has_attr(dialog, "open"));
    assert!(doc.top_layer().is_empty());
    assert!(Modal::get_instance(&doc, dialog).is_none());
    assert_eq!(doc.listener_count(dialog, EventType::Close), 0);
    assert_eq!(doc.listener_count(doc.root(), EventType::KeyDown), 0);

    modal.open_modal(&mut doc).unwrap();
    assert!(!modal.is_open(&doc));
    modal.destroy(&mut doc).unwrap();

    let (mut doc, dialog) = setup(r#"<dialog id="dlg" data-modal-auto-open data-modal-delay="50"></dialog>"#);
    let modal = Modal::new(&mut doc, dialog, ModalOptions::default()).unwrap();
    modal.destroy(&mut doc).unwrap();
    doc.advance(Duration::from_millis(100));
    assert!(!doc.is_dialog_open(dialog));
    assert!(!doc.has_pending_tasks());
}

#[test]
fn test_failing_before_open_keeps_the_dialog_closed() {
    let (mut doc, dialog) = setup(PAGE);
    let modal = Modal::new(&mut doc, dialog, ModalOptions::default()).unwrap();
    modal.events().on::<BeforeOpen>(Rc::new(
        |_doc: &mut Document, _detail: &OpenDetail| -> anyhow::Result<()> { anyhow::bail!("not yet") },
    ));

    assert!(modal.open_modal(&mut doc).is_err());
    assert!(!modal.is_open(&doc));
    assert_eq!(modal.phase(), ModalPhase::Closed);
}

#[test]
fn test_refused_open_leaves_no_focus_to_restore() {
    let (mut doc, dialog) = setup(PAGE);
    let (opener, email) = (by_id(&doc, "opener"), by_id(&doc, "email"));
    let modal = Modal::new(&mut doc, dialog, ModalOptions::default()).unwrap();
    modal.events().on::<BeforeOpen>(Rc::new(
        |_doc: &mut Document, _detail: &OpenDetail| -> anyhow::Result<()> { anyhow::bail!("not yet") },
    ));

    assert!(doc.focus(opener));
    assert!(modal.open_modal(&mut doc).is_err());

    // shown and closed by page script, outside the component
    doc.show_modal_dialog(dialog).unwrap();
    assert!(doc.focus(email));
    doc.close_dialog(dialog, None).unwrap();
    doc.run_until_idle();

    assert_eq!(modal.phase(), ModalPhase::Closed);
    assert_eq!(doc.active_element(), None);
}

#[test]
fn test_removing_open_dialogs_releases_root_listeners() {
    let mut doc = cp_html::parse(
        r#"
        <section id="stack">
          <dialog id="one"><button>One</button></dialog>
          <dialog id="two"><button>Two</button></dialog>
          <dialog id="three"><button>Three</button></dialog>
        </section>
        <dialog id="later" data-modal-auto-open data-modal-delay="100"></dialog>
        "#,
    )
    .unwrap();
    for id in ["one", "two", "three"] {
        let dialog = by_id(&doc, id);
        Modal::new(&mut doc, dialog, ModalOptions::default())
            .unwrap()
            .open_modal(&mut doc)
            .unwrap();
    }
    assert_eq!(doc.listener_count(doc.root(), EventType::KeyDown), 3);
    assert_eq!(doc.top_layer().len(), 3);

    doc.remove_node(by_id(&doc, "stack")).unwrap();
    doc.run_until_idle();
    assert_eq!(doc.listener_count(doc.root(), EventType::KeyDown), 0);
    assert!(doc.top_layer().is_empty());
    assert!(doc.key_down(Key::Escape));

    let later = by_id(&doc, "later");
    Modal::new(&mut doc, later, ModalOptions::default()).unwrap();
    doc.remove_node(later).unwrap();
    doc.advance(Duration::from_millis(200));
    assert!(!doc.has_pending_tasks());
    assert_eq!(doc.instance_count(), 0);
}
