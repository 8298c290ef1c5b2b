use serde_json::json;
use trellis_core::Renderer;
use trellis_opcodes::{UpdateTape, dump_i18n, parse_raw};

use crate::flags::RenderFlags;
use crate::test_utils::{State, component, mount, setup, setup_with};
use crate::view::{HEADER_OFFSET, Slot};

const PLURAL: &str = "{�0�, plural, =1 {one <b>item</b>{�0�, select, other {x}}} other {�0� items}}";

fn plural_component() -> std::rc::Rc<crate::def::DirectiveDef> {
    component("PluralCmp", "plural-cmp", 2, 1, |rt, rf| {
        if rf.contains(RenderFlags::CREATE) {
            rt.element_start(0, "div", &[])?;
            rt.i18n(1, PLURAL)?;
            rt.element_end()?;
        }
        if rf.contains(RenderFlags::UPDATE) {
            let state = rt.context::<State>()?;
            rt.i18n_exp(state.count.get())?;
            rt.i18n_apply(1)?;
        }
        Ok(())
    })
}

#[test]
fn plural_switch_removes_previous_case() {
    let (dom, mut rt) = setup();
    let host = mount(&dom, "plural-cmp");
    let cmp = rt.bootstrap(&plural_component(), host).unwrap();
    let state = cmp.instance_as::<State>().unwrap();
    insta::assert_snapshot!(dom.inner_html(host), @"<div>0 items<!--ICU 25--></div>");

    state.count.set(1);
    cmp.detect_changes(&mut rt).unwrap();
    insta::assert_snapshot!(
        dom.inner_html(host),
        @"<div>one <b>item</b>x<!--nested ICU 30--><!--ICU 25--></div>"
    );
    let view = cmp.component_view();
    let bold = rt.native_at(view, 28).unwrap().unwrap();
    let nested_anchor = rt.native_at(view, 30).unwrap().unwrap();
    let nested_text = rt.native_at(view, 32).unwrap().unwrap();

    state.count.set(5);
    cmp.detect_changes(&mut rt).unwrap();
    insta::assert_snapshot!(dom.inner_html(host), @"<div>5 items<!--ICU 25--></div>");
    assert_eq!(dom.parent_node(bold), None);
    assert_eq!(dom.parent_node(nested_anchor), None);
    assert_eq!(dom.parent_node(nested_text), None);
    assert!(matches!(rt.lview(view).unwrap().slot(26), Slot::Case(1)));
}

#[test]
fn reselected_case_restores_nested_icu() {
    let (dom, mut rt) = setup();
    let host = mount(&dom, "plural-cmp");
    let cmp = rt.bootstrap(&plural_component(), host).unwrap();
    let state = cmp.instance_as::<State>().unwrap();

    for count in [1, 5, 1] {
        state.count.set(count);
        cmp.detect_changes(&mut rt).unwrap();
    }
    insta::assert_snapshot!(
        dom.inner_html(host),
        @"<div>one <b>item</b>x<!--nested ICU 30--><!--ICU 25--></div>"
    );
}

#[test]
fn same_case_does_not_recreate_nodes() {
    let (dom, mut rt) = setup();
    let host = mount(&dom, "plural-cmp");
    let cmp = rt.bootstrap(&plural_component(), host).unwrap();
    let state = cmp.instance_as::<State>().unwrap();

    state.count.set(5);
    cmp.detect_changes(&mut rt).unwrap();
    let view = cmp.component_view();
    let text = rt.native_at(view, 33).unwrap().unwrap();
    let created = dom.created_count();

    state.count.set(7);
    cmp.detect_changes(&mut rt).unwrap();
    cmp.detect_changes(&mut rt).unwrap();

    assert_eq!(dom.created_count(), created);
    assert_eq!(rt.native_at(view, 33).unwrap(), Some(text));
    insta::assert_snapshot!(dom.inner_html(host), @"<div>7 items<!--ICU 25--></div>");
}

#[test]
fn just_switched_icu_refreshes_when_its_group_is_masked_out() {
    let (dom, mut rt) = setup();
    let host = mount(&dom, "plural-cmp");
    let cmp = rt.bootstrap(&plural_component(), host).unwrap();
    let view = cmp.component_view();
    let i18n = rt.tview_of(view).unwrap().i18n(HEADER_OFFSET + 1).cloned().unwrap();
    let bindings_start = HEADER_OFFSET + 1;
    *rt.lview_mut(view).unwrap().slot_mut(HEADER_OFFSET + 2) = Slot::Value(json!(7));

    // Settled on "other": nothing runs under an empty mask.
    rt.apply_update_tape(view, &i18n.update, bindings_start, 0).unwrap();
    insta::assert_snapshot!(dom.inner_html(host), @"<div>0 items<!--ICU 25--></div>");

    // The same case marked as just switched refreshes all of its bindings.
    *rt.lview_mut(view).unwrap().slot_mut(26) = Slot::Case(!1);
    rt.apply_update_tape(view, &i18n.update, bindings_start, 0).unwrap();
    insta::assert_snapshot!(dom.inner_html(host), @"<div>7 items<!--ICU 25--></div>");
    assert!(matches!(rt.lview(view).unwrap().slot(26), Slot::Case(1)));
}

#[test]
fn plural_categories_follow_locale() {
    let message = "{�0�, plural, one {one} few {few} many {many} other {other}}";
    let def = component("RuCmp", "ru-cmp", 1, 1, move |rt, rf| {
        if rf.contains(RenderFlags::CREATE) {
            rt.i18n(0, message)?;
        }
        if rf.contains(RenderFlags::UPDATE) {
            let state = rt.context::<State>()?;
            rt.i18n_exp(state.count.get())?;
            rt.i18n_apply(0)?;
        }
        Ok(())
    });
    let (dom, mut rt) = setup_with(|b| b.locale("ru"));
    let host = mount(&dom, "ru-cmp");
    let cmp = rt.bootstrap(&def, host).unwrap();
    let state = cmp.instance_as::<State>().unwrap();

    let mut seen = Vec::new();
    for count in [1, 3, 5, 21] {
        state.count.set(count);
        cmp.detect_changes(&mut rt).unwrap();
        seen.push(dom.text_content(host));
    }
    assert_eq!(seen, ["one", "few", "many", "one"]);
}

#[test]
fn placeholders_and_bindings() {
    let message = "Hello �0�, �#2�you have �1� items�/#2�!";
    let def = component("Greeting", "greeting-cmp", 3, 2, move |rt, rf| {
        if rf.contains(RenderFlags::CREATE) {
            rt.element_start(0, "div", &[])?;
            rt.i18n_start(1, message)?;
            rt.element(2, "b", &[])?;
            rt.i18n_end()?;
            rt.element_end()?;
        }
        if rf.contains(RenderFlags::UPDATE) {
            let state = rt.context::<State>()?;
            let name = state.name.borrow().clone();
            rt.i18n_exp(name)?;
            rt.i18n_exp(state.count.get())?;
            rt.i18n_apply(1)?;
        }
        Ok(())
    });
    let (dom, mut rt) = setup();
    let host = mount(&dom, "greeting-cmp");
    let cmp = rt.bootstrap(&def, host).unwrap();
    let state = cmp.instance_as::<State>().unwrap();

    *state.name.borrow_mut() = "Ana".to_string();
    state.count.set(3);
    cmp.detect_changes(&mut rt).unwrap();
    insta::assert_snapshot!(dom.inner_html(host), @"<div>Hello Ana, <b>you have 3 items</b>!</div>");

    let i18n = rt.tview_of(cmp.component_view()).unwrap().i18n(HEADER_OFFSET + 1).cloned().unwrap();
    insta::assert_snapshot!(dump_i18n(&i18n), @r#"
    [create]
    @27 text "" eager
    @28 text ""
    @29 text "!" eager
    [update]
    0b00000001 "Hello " $0 ", " -> text @27
    0b00000010 "you have " $1 " items" -> text @28
    "#);

    // Only the group reading binding 1 runs when only the count changes.
    let greeting = rt.native_at(cmp.component_view(), 27).unwrap().unwrap();
    rt.renderer_mut().set_value(greeting, "untouched");
    state.count.set(4);
    cmp.detect_changes(&mut rt).unwrap();
    insta::assert_snapshot!(dom.inner_html(host), @"<div>untouched<b>you have 4 items</b>!</div>");
}

#[test]
fn update_tape_groups_are_mask_gated() {
    let def = component("Texts", "texts-cmp", 2, 2, |rt, rf| {
        if rf.contains(RenderFlags::CREATE) {
            rt.text(0, "")?;
            rt.text(1, "")?;
        }
        Ok(())
    });
    let (dom, mut rt) = setup();
    let host = mount(&dom, "texts-cmp");
    let cmp = rt.bootstrap(&def, host).unwrap();
    let view = cmp.component_view();
    *rt.lview_mut(view).unwrap().slot_mut(HEADER_OFFSET + 3) = Slot::Value(json!("hello"));

    let codes = parse_raw("[2, 2, -2, 92]").unwrap();
    let tape = UpdateTape::from_raw(&codes).unwrap();
    let bindings_start = HEADER_OFFSET + 1;

    rt.apply_update_tape(view, &tape, bindings_start, 0b0010).unwrap();
    assert_eq!(dom.inner_html(host), "hello");

    *rt.lview_mut(view).unwrap().slot_mut(HEADER_OFFSET + 3) = Slot::Value(json!("changed"));
    rt.apply_update_tape(view, &tape, bindings_start, 0b0100).unwrap();
    assert_eq!(dom.inner_html(host), "hello");
}

#[test]
fn malformed_message_is_an_error() {
    let def = component("Broken", "broken-cmp", 1, 0, |rt, rf| {
        if rf.contains(RenderFlags::CREATE) {
            rt.i18n(0, "�#2�unclosed")?;
        }
        Ok(())
    });
    let (dom, mut rt) = setup();
    let host = mount(&dom, "broken-cmp");
    let err = rt.bootstrap(&def, host).err().unwrap();
    insta::assert_snapshot!(err.to_string(), @"malformed i18n message: element placeholder 2 closed out of order");
}
