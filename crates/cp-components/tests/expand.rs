use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use cp_components::{
    AfterCollapse, AfterExpand, BeforeCollapse, BeforeExpand, ComponentError, Expand, ExpandOptions, ToggleDetail,
};
use cp_dom::{Document, Event, EventType, NodeId};
use cp_emitter::{DispatchMode, Handler};

fn load(html: &str) -> Document {
    cp_html::parse(html).unwrap()
}

fn by_id(doc: &Document, id: &str) -> NodeId {
    doc.get_element_by_id(id).unwrap()
}

const BASIC: &str = r##"
    <button id="t1" aria-expanded="false" aria-controls="c1">More</button>
    <div id="c1" hidden><a href="#x" id="inner">Link</a></div>
"##;

type Log = Rc<RefCell<Vec<String>>>;

/// Records every event together with the `aria-expanded` value seen at that moment
fn record(expand: &Expand, log: &Log) {
    fn entry<E: cp_emitter::Event<Payload = ToggleDetail>>(expand: &Expand, log: &Log, label: &'static str) {
        let log = Rc::clone(log);
        let handler: Handler<Document, E> = Rc::new(move |doc: &mut Document, detail: &ToggleDetail| {
            let attr = doc.attr(detail.control, "aria-expanded").unwrap_or("-").to_string();
            log.borrow_mut().push(format!("{label}({}) attr={attr}", detail.expanded));
            Ok(())
        });
        expand.events().on::<E>(handler);
    }
    entry::<BeforeExpand>(expand, log, "before-expand");
    entry::<AfterExpand>(expand, log, "after-expand");
    entry::<BeforeCollapse>(expand, log, "before-collapse");
    entry::<AfterCollapse>(expand, log, "after-collapse");
}

#[test]
fn test_toggle_reveals_hidden_content() {
    let mut doc = load(BASIC);
    let (control, content) = (by_id(&doc, "t1"), by_id(&doc, "c1"));
    let expand = Expand::new(&mut doc, control, ExpandOptions::default()).unwrap();

    expand.toggle(&mut doc).unwrap();
    assert_eq!(doc.attr(control, "aria-expanded"), Some("true"));
    assert!(!doc.has_attr(content, "hidden"));
    assert!(expand.is_expanded(&doc));
}

#[test]
fn test_events_bracket_the_attribute_change() {
    let mut doc = load(BASIC);
    let control = by_id(&doc, "t1");
    let expand = Expand::new(&mut doc, control, ExpandOptions::default()).unwrap();
    let log: Log = Rc::default();
    record(&expand, &log);

    expand.toggle(&mut doc).unwrap();
    expand.toggle(&mut doc).unwrap();
    assert_eq!(
        *log.borrow(),
        [
            "before-expand(true) attr=false",
            "after-expand(true) attr=true",
            "before-collapse(false) attr=true",
            "after-collapse(false) attr=false",
        ]
    );
}

#[test]
fn test_expand_and_collapse_are_idempotent() {
    let mut doc = load(BASIC);
    let control = by_id(&doc, "t1");
    let expand = Expand::new(&mut doc, control, ExpandOptions::default()).unwrap();
    let log: Log = Rc::default();
    record(&expand, &log);

    expand.expand(&mut doc).unwrap();
    expand.expand(&mut doc).unwrap();
    assert_eq!(log.borrow().len(), 2);

    expand.collapse(&mut doc).unwrap();
    expand.collapse(&mut doc).unwrap();
    assert_eq!(log.borrow().len(), 4);
}

#[test]
fn test_attribute_always_matches_reported_state() {
    let mut doc = load(BASIC);
    let control = by_id(&doc, "t1");
    let expand = Expand::new(&mut doc, control, ExpandOptions::default()).unwrap();

    for step in 0..12 {
        match step % 3 {
            0 => expand.toggle(&mut doc).unwrap(),
            1 if step % 2 == 0 => expand.expand(&mut doc).unwrap(),
            _ => expand.collapse(&mut doc).unwrap(),
        }
        let attr = doc.attr(control, "aria-expanded") == Some("true");
        assert_eq!(attr, expand.is_expanded(&doc), "drift after step {step}");
    }
}

#[test]
fn test_click_on_control_toggles() {
    let mut doc = load(BASIC);
    let (control, content) = (by_id(&doc, "t1"), by_id(&doc, "c1"));
    Expand::new(&mut doc, control, ExpandOptions::default()).unwrap();

    doc.click(control);
    assert!(!doc.is_hidden(content));
    doc.click(control);
    assert!(doc.is_hidden(content));
}

#[test]
fn test_construction_reuses_the_attached_instance() {
    let mut doc = load(BASIC);
    let control = by_id(&doc, "t1");
    assert!(Expand::get_instance(&doc, control).is_none());

    let first = Expand::new(&mut doc, control, ExpandOptions::default()).unwrap();
    let second = Expand::new(&mut doc, control, ExpandOptions::default()).unwrap();
    assert!(Rc::ptr_eq(&first, &second));
    assert!(Rc::ptr_eq(&first, &Expand::get_instance(&doc, control).unwrap()));
    assert_eq!(doc.listener_count(control, EventType::Click), 1);
}

#[test]
fn test_missing_link_degrades_to_noop() {
    let mut doc = load(r#"<button id="t" aria-expanded="false">x</button>
                          <button id="u" aria-expanded="false" aria-controls="ghost">y</button>"#);
    for id in ["t", "u"] {
        let control = by_id(&doc, id);
        let expand = Expand::new(&mut doc, control, ExpandOptions::default()).unwrap();
        assert_eq!(expand.content(), None);
        expand.toggle(&mut doc).unwrap();
        assert_eq!(doc.attr(control, "aria-expanded"), Some("false"));
    }
}

#[test]
fn test_text_nodes_are_rejected() {
    let mut doc = Document::new();
    let text = doc.create_text("hello");
    doc.append_child(doc.body(), text).unwrap();
    assert!(matches!(
        Expand::new(&mut doc, text, ExpandOptions::default()),
        Err(ComponentError::NotAnElement(_))
    ));
}

const ANIMATED: &str = r#"
    <button id="t1" aria-expanded="false" aria-controls="c1">More</button>
    <div id="c1" hidden data-expand-animation="fade">Body</div>
"#;

#[test]
fn test_leave_phase_defers_hidden_until_completion() {
    let mut doc = load(ANIMATED);
    let (control, content) = (by_id(&doc, "t1"), by_id(&doc, "c1"));
    let expand = Expand::new(&mut doc, control, ExpandOptions::default()).unwrap();

    expand.expand(&mut doc).unwrap();
    doc.run_until_idle();
    doc.dispatch_event(Event::new(EventType::AnimationEnd, content));

    expand.collapse(&mut doc).unwrap();
    assert_eq!(doc.attr(control, "aria-expanded"), Some("false"));
    assert!(!doc.has_attr(content, "hidden"));
    assert!(doc.has_class(content, "fade-leave-from"));
    assert!(doc.has_class(content, "fade-leave-active"));

    doc.run_until_idle();
    assert!(doc.has_class(content, "fade-leave-to"));
    assert!(!doc.has_class(content, "fade-leave-from"));

    doc.dispatch_event(Event::new(EventType::TransitionEnd, content));
    assert!(doc.has_attr(content, "hidden"));
    assert_eq!(doc.attr(content, "class"), None);
}

#[test]
fn test_fallback_timeout_completes_a_phase() {
    let mut doc = load(ANIMATED);
    let (control, content) = (by_id(&doc, "t1"), by_id(&doc, "c1"));
    let options = ExpandOptions {
        transition_timeout_ms: 200,
        ..ExpandOptions::default()
    };
    let expand = Expand::new(&mut doc, control, options).unwrap();

    expand.expand(&mut doc).unwrap();
    doc.advance(Duration::from_millis(199));
    assert!(expand.is_animating());
    doc.advance(Duration::from_millis(1));
    assert!(!expand.is_animating());
    assert_eq!(doc.attr(content, "class"), None);
}

#[test]
fn test_end_events_from_descendants_are_ignored() {
    let mut doc = load(r#"
        <button id="t1" aria-expanded="false" aria-controls="c1">More</button>
        <div id="c1" hidden data-expand-animation="fade"><span id="spinner">...</span></div>
    "#);
    let (control, spinner) = (by_id(&doc, "t1"), by_id(&doc, "spinner"));
    let expand = Expand::new(&mut doc, control, ExpandOptions::default()).unwrap();

    expand.expand(&mut doc).unwrap();
    doc.dispatch_event(Event::new(EventType::AnimationEnd, spinner));
    assert!(expand.is_animating());
}

#[test]
fn test_reexpand_interrupts_leave_cleanly() {
    let mut doc = load(ANIMATED);
    let (control, content) = (by_id(&doc, "t1"), by_id(&doc, "c1"));
    let expand = Expand::new(&mut doc, control, ExpandOptions::default()).unwrap();

    expand.expand(&mut doc).unwrap();
    doc.advance(Duration::from_millis(600));
    expand.collapse(&mut doc).unwrap();
    expand.expand(&mut doc).unwrap();

    assert!(!doc.has_class(content, "fade-leave-from"));
    assert!(!doc.has_class(content, "fade-leave-active"));
    assert!(doc.has_class(content, "fade-enter-active"));

    // the interrupted leave never hides the content
    doc.advance(Duration::from_millis(1_000));
    assert!(!doc.has_attr(content, "hidden"));
    assert!(expand.is_expanded(&doc));
    assert_eq!(doc.attr(content, "class"), None);
}

#[test]
fn test_destroy_mid_animation_is_safe() {
    let mut doc = load(ANIMATED);
    let (control, content) = (by_id(&doc, "t1"), by_id(&doc, "c1"));
    let expand = Expand::new(&mut doc, control, ExpandOptions::default()).unwrap();

    expand.expand(&mut doc).unwrap();
    doc.run_until_idle();
    expand.collapse(&mut doc).unwrap();
    expand.destroy(&mut doc).unwrap();
    expand.destroy(&mut doc).unwrap();

    doc.advance(Duration::from_secs(1));
    assert!(!doc.has_pending_tasks());
    assert!(Expand::get_instance(&doc, control).is_none());
    assert_eq!(doc.listener_count(control, EventType::Click), 0);
    assert_eq!(doc.listener_count(content, EventType::TransitionEnd), 0);

    doc.click(control);
    assert_eq!(doc.attr(control, "aria-expanded"), Some("false"));
}

const INERT: &str = r#"
    <header id="top"><a href="/">Home</a></header>
    <nav id="menu">
      <button id="t1" aria-expanded="false" aria-controls="c1" data-expand-inert="body > *">Menu</button>
      <ul id="c1" hidden><li><a href="/a" id="link">A</a></li></ul>
    </nav>
    <main id="main" inert><p>Body</p></main>
    <footer id="bottom">Footer</footer>
"#;

#[test]
fn test_inert_marks_only_unrelated_elements_and_undoes_its_own() {
    let mut doc = load(INERT);
    let control = by_id(&doc, "t1");
    let [top, menu, main, bottom] = ["top", "menu", "main", "bottom"].map(|id| by_id(&doc, id));
    let expand = Expand::new(&mut doc, control, ExpandOptions::default()).unwrap();

    expand.expand(&mut doc).unwrap();
    assert!(doc.has_attr(top, "inert"));
    assert!(doc.has_attr(bottom, "inert"));
    assert!(!doc.has_attr(menu, "inert"));
    assert_eq!(expand.inert_elements(), vec![top, bottom]);

    expand.collapse(&mut doc).unwrap();
    assert!(!doc.has_attr(top, "inert"));
    assert!(!doc.has_attr(bottom, "inert"));
    // was inert before this instance touched it
    assert!(doc.has_attr(main, "inert"));
}

#[test]
fn test_collapse_returns_focus_from_content_to_control() {
    let mut doc = load(INERT);
    let (control, link) = (by_id(&doc, "t1"), by_id(&doc, "link"));
    let expand = Expand::new(&mut doc, control, ExpandOptions::default()).unwrap();

    expand.expand(&mut doc).unwrap();
    assert!(doc.focus(link));
    expand.collapse(&mut doc).unwrap();
    assert_eq!(doc.active_element(), Some(control));
}

#[test]
fn test_destroy_undoes_inert() {
    let mut doc = load(INERT);
    let (control, top) = (by_id(&doc, "t1"), by_id(&doc, "top"));
    let expand = Expand::new(&mut doc, control, ExpandOptions::default()).unwrap();

    expand.expand(&mut doc).unwrap();
    expand.destroy(&mut doc).unwrap();
    assert!(!doc.has_attr(top, "inert"));
}

#[test]
fn test_failing_before_handler_aborts_the_toggle() {
    let mut doc = load(BASIC);
    let (control, content) = (by_id(&doc, "t1"), by_id(&doc, "c1"));
    let expand = Expand::new(&mut doc, control, ExpandOptions::default()).unwrap();
    expand.events().on::<BeforeExpand>(Rc::new(
        |_doc: &mut Document, _detail: &ToggleDetail| -> anyhow::Result<()> { anyhow::bail!("veto") },
    ));

    let err = expand.expand(&mut doc).unwrap_err();
    assert!(matches!(err, ComponentError::Handler(_)));
    assert_eq!(doc.attr(control, "aria-expanded"), Some("false"));
    assert!(doc.has_attr(content, "hidden"));

    expand.events().set_mode(DispatchMode::Isolate);
    expand.expand(&mut doc).unwrap();
    assert!(expand.is_expanded(&doc));
}

#[test]
fn test_removing_the_control_drops_the_instance() {
    let mut doc = load(BASIC);
    let control = by_id(&doc, "t1");
    let expand = Expand::new(&mut doc, control, ExpandOptions::default()).unwrap();
    let weak = Rc::downgrade(&expand);
    drop(expand);

    doc.remove_node(control).unwrap();
    assert!(weak.upgrade().is_none());
}

#[test]
fn test_removing_an_expanded_control_undoes_inert() {
    let mut doc = load(INERT);
    let [control, menu, top, main, bottom] = ["t1", "menu", "top", "main", "bottom"].map(|id| by_id(&doc, id));
    let expand = Expand::new(&mut doc, control, ExpandOptions::default()).unwrap();
    expand.expand(&mut doc).unwrap();
    assert!(doc.has_attr(top, "inert"));

    doc.remove_node(menu).unwrap();
    assert!(!doc.has_attr(top, "inert"));
    assert!(!doc.has_attr(bottom, "inert"));
    assert!(doc.has_attr(main, "inert"));
    assert!(expand.inert_elements().is_empty());
    assert!(Expand::get_instance(&doc, control).is_none());

    let home = doc.query_selector(top, "a").unwrap().unwrap();
    assert!(doc.focus(home));
}
