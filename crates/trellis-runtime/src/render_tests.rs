use std::cell::Cell;
use std::rc::Rc;

use serde_json::{Value, json};

use crate::def::DirectiveDef;
use crate::error::RuntimeError;
use crate::flags::{LViewFlags, RenderFlags};
use crate::instructions::render_stringify;
use crate::test_utils::{State, component, mount, setup, setup_with};
use crate::view::HEADER_OFFSET;

fn counter() -> Rc<DirectiveDef> {
    component("Counter", "counter-cmp", 2, 3, |rt, rf| {
        if rf.contains(RenderFlags::CREATE) {
            rt.element_start(0, "button", &[("type", "button")])?;
            let state = rt.context::<State>()?;
            rt.listener("click", move |_| state.count.set(state.count.get() + 1))?;
            rt.text(1, "")?;
            rt.element_end()?;
        }
        if rf.contains(RenderFlags::UPDATE) {
            let state = rt.context::<State>()?;
            let count = state.count.get();
            rt.select(1)?;
            rt.text_interpolate(format!("Count: {count}"))?;
            rt.select(0)?;
            rt.attribute("data-count", count)?;
            rt.property("title", state.name.borrow().clone())?;
        }
        Ok(())
    })
}

#[test]
fn bindings_follow_state() {
    let (dom, mut rt) = setup();
    let host = mount(&dom, "counter-cmp");
    let cmp = rt.bootstrap(&counter(), host).unwrap();
    insta::assert_snapshot!(
        dom.outer_html(host),
        @r#"<counter-cmp><button type="button" data-count="0" title="">Count: 0</button></counter-cmp>"#
    );

    let state = cmp.instance_as::<State>().unwrap();
    *state.name.borrow_mut() = "Add one".to_string();
    let button = rt.native_at(cmp.component_view(), HEADER_OFFSET).unwrap().unwrap();
    assert_eq!(dom.dispatch(button, "click"), 1);
    assert_eq!(state.count.get(), 1);
    insta::assert_snapshot!(dom.inner_html(host), @r#"<button type="button" data-count="0" title="">Count: 0</button>"#);

    cmp.detect_changes(&mut rt).unwrap();
    insta::assert_snapshot!(dom.inner_html(host), @r#"<button type="button" data-count="1" title="Add one">Count: 1</button>"#);
}

#[test]
fn unchanged_bindings_leave_dom_alone() {
    let (dom, mut rt) = setup();
    let host = mount(&dom, "counter-cmp");
    let cmp = rt.bootstrap(&counter(), host).unwrap();
    let text = rt.native_at(cmp.component_view(), HEADER_OFFSET + 1).unwrap().unwrap();
    rt.renderer_mut().set_value(text, "edited");

    cmp.detect_changes(&mut rt).unwrap();
    assert_eq!(dom.node_value(text), "edited");
}

#[test]
fn null_attribute_is_removed() {
    let def = component("Toggle", "toggle-cmp", 1, 1, |rt, rf| {
        if rf.contains(RenderFlags::CREATE) {
            rt.element(0, "p", &[])?;
        }
        if rf.contains(RenderFlags::UPDATE) {
            let state = rt.context::<State>()?;
            let hidden = if state.show.get() { Value::Null } else { json!("") };
            rt.select(0)?;
            rt.attribute("hidden", hidden)?;
        }
        Ok(())
    });
    let (dom, mut rt) = setup();
    let host = mount(&dom, "toggle-cmp");
    let cmp = rt.bootstrap(&def, host).unwrap();
    insta::assert_snapshot!(dom.inner_html(host), @r#"<p hidden=""></p>"#);

    cmp.instance_as::<State>().unwrap().show.set(true);
    cmp.detect_changes(&mut rt).unwrap();
    insta::assert_snapshot!(dom.inner_html(host), @"<p></p>");
}

#[test]
fn verification_pass_reports_changed_expressions() {
    let def = component("Unstable", "unstable-cmp", 1, 1, |rt, rf| {
        if rf.contains(RenderFlags::CREATE) {
            rt.text(0, "")?;
        }
        if rf.contains(RenderFlags::UPDATE) {
            let state = rt.context::<State>()?;
            state.count.set(state.count.get() + 1);
            rt.select(0)?;
            rt.text_interpolate(state.count.get())?;
        }
        Ok(())
    });
    let (dom, mut rt) = setup_with(|b| b.check_no_changes(true));
    let host = mount(&dom, "unstable-cmp");
    let err = rt.bootstrap(&def, host).err().unwrap();
    assert!(matches!(err, RuntimeError::ExpressionChanged { .. }));
    insta::assert_snapshot!(err.to_string(), @"expression at slot 23 changed after it was checked: 1 -> 2");
    // The verification pass writes nothing.
    assert_eq!(dom.text_content(host), "1");
}

#[test]
fn verification_pass_accepts_stable_templates() {
    let (dom, mut rt) = setup_with(|b| b.check_no_changes(true));
    let host = mount(&dom, "counter-cmp");
    let cmp = rt.bootstrap(&counter(), host).unwrap();
    cmp.instance_as::<State>().unwrap().count.set(3);
    cmp.detect_changes(&mut rt).unwrap();
    assert_eq!(dom.text_content(host), "Count: 3");
}

#[test]
fn detached_view_is_skipped_until_reattached() {
    let (dom, mut rt) = setup();
    let host = mount(&dom, "counter-cmp");
    let cmp = rt.bootstrap(&counter(), host).unwrap();
    let state = cmp.instance_as::<State>().unwrap();
    let view_ref = cmp.change_detector_ref();

    view_ref.detach_from_change_detection(&mut rt).unwrap();
    state.count.set(5);
    cmp.detect_changes(&mut rt).unwrap();
    assert_eq!(dom.text_content(host), "Count: 0");

    // Refreshing the view directly still works.
    view_ref.detect_changes(&mut rt).unwrap();
    assert_eq!(dom.text_content(host), "Count: 5");

    state.count.set(6);
    view_ref.reattach(&mut rt).unwrap();
    cmp.detect_changes(&mut rt).unwrap();
    assert_eq!(dom.text_content(host), "Count: 6");
}

#[test]
fn mark_for_check_dirties_ancestors() {
    let (dom, mut rt) = setup();
    let host = mount(&dom, "counter-cmp");
    let cmp = rt.bootstrap(&counter(), host).unwrap();
    let root = cmp.host_view().view();
    assert!(!rt.lview(root).unwrap().flags().contains(LViewFlags::DIRTY));

    cmp.change_detector_ref().mark_for_check(&mut rt).unwrap();
    assert!(rt.lview(cmp.component_view()).unwrap().flags().contains(LViewFlags::DIRTY));
    assert!(rt.lview(root).unwrap().flags().contains(LViewFlags::DIRTY));
}

#[test]
fn destroy_runs_callbacks_and_removes_listeners() {
    let destroyed = Rc::new(Cell::new(false));
    let flag = destroyed.clone();
    let def = component("Cleanup", "cleanup-cmp", 1, 0, move |rt, rf| {
        if rf.contains(RenderFlags::CREATE) {
            rt.element(0, "button", &[])?;
            rt.listener("click", |_| {})?;
            let flag = flag.clone();
            rt.on_destroy(move |_| flag.set(true))?;
        }
        Ok(())
    });
    let (dom, mut rt) = setup();
    let host = mount(&dom, "cleanup-cmp");
    let cmp = rt.bootstrap(&def, host).unwrap();
    let button = rt.native_at(cmp.component_view(), HEADER_OFFSET).unwrap().unwrap();
    assert_eq!(dom.listener_count(), 1);

    cmp.destroy(&mut rt).unwrap();
    assert!(destroyed.get());
    assert_eq!(dom.listener_count(), 0);
    assert_eq!(dom.dispatch(button, "click"), 0);
    assert!(rt.is_destroyed(cmp.component_view()));
    assert!(matches!(rt.lview(cmp.component_view()), Err(RuntimeError::MissingView(_))));
}

#[test]
fn element_container_children_precede_its_comment() {
    let def = component("Group", "group-cmp", 3, 0, |rt, rf| {
        if rf.contains(RenderFlags::CREATE) {
            rt.element_container_start(0, &[])?;
            rt.text(1, "a")?;
            rt.element(2, "i", &[])?;
            rt.element_container_end()?;
        }
        Ok(())
    });
    let (dom, mut rt) = setup();
    let host = mount(&dom, "group-cmp");
    let cmp = rt.bootstrap(&def, host).unwrap();
    insta::assert_snapshot!(dom.inner_html(host), @"a<i></i><!--ng-container-->");

    let roots = cmp.change_detector_ref().root_nodes(&rt).unwrap();
    let rendered: Vec<String> = roots.iter().map(|&n| dom.outer_html(n)).collect();
    insta::assert_snapshot!(rendered.join("\n"), @r"
    <!--ng-container-->
    a
    <i></i>
    ");
}

#[test]
fn nested_components_render_into_their_hosts() {
    let child = component("Badge", "x-badge", 1, 1, |rt, rf| {
        if rf.contains(RenderFlags::CREATE) {
            rt.text(0, "")?;
        }
        if rf.contains(RenderFlags::UPDATE) {
            let state = rt.context::<State>()?;
            rt.select(0)?;
            rt.text_interpolate(state.count.get() * 10)?;
        }
        Ok(())
    });
    let parent = DirectiveDef::component(
        crate::di::Token::new("Card"),
        "x-card",
        crate::def::TemplateDef::new(3, 0, |rt, rf| {
            if rf.contains(RenderFlags::CREATE) {
                rt.element_start(0, "h1", &[])?;
                rt.text(1, "Title")?;
                rt.element_end()?;
                rt.element(2, "x-badge", &[])?;
            }
            Ok(())
        }),
        |_| Ok(Rc::new(State::default()) as crate::def::Instance),
    )
    .declarations(vec![child])
    .build();
    let (dom, mut rt) = setup();
    let host = mount(&dom, "x-card");
    rt.bootstrap(&parent, host).unwrap();
    insta::assert_snapshot!(dom.outer_html(host), @"<x-card><h1>Title</h1><x-badge>0</x-badge></x-card>");
}

#[test]
fn stringified_values() {
    let rendered: Vec<String> = [json!(null), json!("s"), json!(1.5), json!(true), json!([1, 2])]
        .iter()
        .map(render_stringify)
        .collect();
    insta::assert_snapshot!(rendered.join("|"), @"|s|1.5|true|[1,2]");
}

#[test]
fn instructions_need_an_active_view() {
    let (_, mut rt) = setup();
    let err = rt.text(0, "x").unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"`text` called outside of a template function");
}

#[test]
fn node_past_declared_slots_is_rejected() {
    let def = component("Overflow", "overflow-cmp", 1, 0, |rt, rf| {
        if rf.contains(RenderFlags::CREATE) {
            rt.element(0, "p", &[])?;
            rt.text(1, "extra")?;
        }
        Ok(())
    });
    let (dom, mut rt) = setup();
    let host = mount(&dom, "overflow-cmp");
    let err = rt.bootstrap(&def, host).err().unwrap();
    insta::assert_snapshot!(err.to_string(), @"node 1 is not among the 1 slots declared by its template");
}
