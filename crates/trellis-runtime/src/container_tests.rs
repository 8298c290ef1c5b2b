use std::cell::{Cell, RefCell};
use std::rc::Rc;

use trellis_core::MemoryDom;

use crate::container::{ComponentRef, EmbeddedViewOptions, TemplateRef, ViewContainerRef, ViewRef};
use crate::def::{Instance, Provider, TemplateDef};
use crate::di::{InjectorRef, ModuleInjector, Token};
use crate::error::RuntimeError;
use crate::flags::{InjectFlags, RenderFlags};
use crate::runtime::Runtime;
use crate::test_utils::{State, component, mount, setup};
use crate::view::CONTAINER_HEADER_OFFSET;

/// Context of one list item.
struct Item(&'static str);

fn item_template() -> TemplateDef {
    TemplateDef::new(1, 1, |rt, rf| {
        if rf.contains(RenderFlags::CREATE) {
            rt.text(0, "")?;
        }
        if rf.contains(RenderFlags::UPDATE) {
            let item = rt.context::<Item>()?;
            rt.select(0)?;
            rt.text_interpolate(item.0)?;
        }
        Ok(())
    })
}

struct List {
    dom: MemoryDom,
    rt: Runtime,
    cmp: ComponentRef,
    vcr: ViewContainerRef,
    template: TemplateRef,
}

impl List {
    fn new() -> Self {
        let def = component("ListCmp", "list-cmp", 1, 0, |rt, rf| {
            if rf.contains(RenderFlags::CREATE) {
                rt.template(0, item_template(), &[])?;
            }
            Ok(())
        });
        let (dom, mut rt) = setup();
        let host = mount(&dom, "list-cmp");
        let cmp = rt.bootstrap(&def, host).unwrap();
        let view = cmp.component_view();
        let vcr = rt.view_container_ref(view, 0).unwrap();
        let template = rt.template_ref(view, 0).unwrap();
        Self {
            dom,
            rt,
            cmp,
            vcr,
            template,
        }
    }

    fn create(&mut self, label: &'static str, index: Option<usize>) -> ViewRef {
        let context = Rc::new(Item(label)) as Instance;
        let options = EmbeddedViewOptions {
            index,
            ..Default::default()
        };
        self.vcr
            .create_embedded_view(&mut self.rt, self.template, Some(context), options)
            .unwrap()
    }

    fn html(&mut self) -> String {
        self.cmp.detect_changes(&mut self.rt).unwrap();
        self.dom.inner_html(self.cmp.host())
    }

    fn len(&self) -> usize {
        self.vcr.len(&self.rt).unwrap()
    }
}

#[test]
fn insert_at_explicit_indices() {
    let mut list = List::new();
    let a = list.create("a", Some(0));
    let b = list.create("b", Some(1));
    let c = list.create("c", Some(2));

    assert_eq!(list.len(), 3);
    assert_eq!(list.vcr.index_of(&list.rt, c).unwrap(), Some(2));
    assert_eq!(list.vcr.get(&list.rt, 0).unwrap(), Some(a));
    assert_eq!(list.vcr.get(&list.rt, 1).unwrap(), Some(b));
    insta::assert_snapshot!(list.html(), @"abc<!--container-->");
}

#[test]
fn insert_in_front_of_existing_views() {
    let mut list = List::new();
    list.create("a", None);
    list.create("b", Some(0));
    list.create("c", Some(1));
    insta::assert_snapshot!(list.html(), @"bca<!--container-->");
}

#[test]
fn remove_shifts_later_views_down() {
    let mut list = List::new();
    let a = list.create("a", Some(0));
    let b = list.create("b", Some(1));
    let c = list.create("c", Some(2));

    list.vcr.remove(&mut list.rt, Some(1)).unwrap();

    assert_eq!(list.len(), 2);
    assert_eq!(list.vcr.get(&list.rt, 0).unwrap(), Some(a));
    assert_eq!(list.vcr.get(&list.rt, 1).unwrap(), Some(c));
    assert_eq!(list.vcr.index_of(&list.rt, b).unwrap(), None);
    assert!(b.destroyed(&list.rt));
    insta::assert_snapshot!(list.html(), @"ac<!--container-->");
}

#[test]
fn remove_defaults_to_last_view() {
    let mut list = List::new();
    list.create("a", None);
    let b = list.create("b", None);
    list.vcr.remove(&mut list.rt, None).unwrap();
    assert!(b.destroyed(&list.rt));
    insta::assert_snapshot!(list.html(), @"a<!--container-->");
}

#[test]
fn detached_view_survives_and_can_be_reinserted() {
    let mut list = List::new();
    let a = list.create("a", None);
    list.create("b", None);
    list.create("c", None);

    let detached = list.vcr.detach(&mut list.rt, Some(0)).unwrap();
    assert_eq!(detached, Some(a));
    assert!(!a.destroyed(&list.rt));
    assert!(!list.rt.lview(a.view()).unwrap().is_attached_to_container());
    insta::assert_snapshot!(list.html(), @"bc<!--container-->");

    list.vcr.insert(&mut list.rt, a, None).unwrap();
    assert_eq!(list.vcr.index_of(&list.rt, a).unwrap(), Some(2));
    insta::assert_snapshot!(list.html(), @"bca<!--container-->");
}

#[test]
fn detach_then_insert_at_same_index_restores_position() {
    let mut list = List::new();
    list.create("a", None);
    let b = list.create("b", None);
    list.create("c", None);
    let before = list.html();

    let detached = list.vcr.detach(&mut list.rt, Some(1)).unwrap();
    assert_eq!(detached, Some(b));
    list.vcr.insert(&mut list.rt, b, Some(1)).unwrap();

    assert_eq!(list.vcr.get(&list.rt, 1).unwrap(), Some(b));
    assert_eq!(list.html(), before);
}

#[test]
fn insert_takes_a_view_from_another_container() {
    let def = component("TwoLists", "two-lists", 2, 0, |rt, rf| {
        if rf.contains(RenderFlags::CREATE) {
            rt.template(0, item_template(), &[])?;
            rt.template(1, item_template(), &[])?;
        }
        Ok(())
    });
    let (dom, mut rt) = setup();
    let host = mount(&dom, "two-lists");
    let cmp = rt.bootstrap(&def, host).unwrap();
    let view = cmp.component_view();
    let (first, second) = (rt.view_container_ref(view, 0).unwrap(), rt.view_container_ref(view, 1).unwrap());
    let template = rt.template_ref(view, 0).unwrap();
    let create = |rt: &mut Runtime, label: &'static str| {
        let context = Rc::new(Item(label)) as Instance;
        first
            .create_embedded_view(rt, template, Some(context), EmbeddedViewOptions::default())
            .unwrap()
    };
    create(&mut rt, "a");
    let b = create(&mut rt, "b");
    cmp.detect_changes(&mut rt).unwrap();

    second.insert(&mut rt, b, Some(0)).unwrap();

    assert_eq!(first.len(&rt).unwrap(), 1);
    assert_eq!(first.index_of(&rt, b).unwrap(), None);
    assert_eq!(second.index_of(&rt, b).unwrap(), Some(0));
    cmp.detect_changes(&mut rt).unwrap();
    insta::assert_snapshot!(dom.inner_html(host), @"a<!--container-->b<!--container-->");
}

#[test]
fn embedded_view_injector_answers_before_the_declaration() {
    let service = Token::new("Service");
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    let lookup_template = TemplateDef::new(1, 0, move |rt, rf| {
        if rf.contains(RenderFlags::CREATE) {
            rt.text(0, "")?;
            let found = rt.inject(service, InjectFlags::OPTIONAL)?;
            let text = found.and_then(|f| f.downcast::<String>().ok()).map(|s| (*s).clone());
            log.borrow_mut().push(text);
        }
        Ok(())
    });
    let def = component("Overlay", "overlay-cmp", 1, 0, move |rt, rf| {
        if rf.contains(RenderFlags::CREATE) {
            rt.template(0, lookup_template.clone(), &[])?;
        }
        Ok(())
    });
    let (dom, mut rt) = setup();
    let host = mount(&dom, "overlay-cmp");
    let cmp = rt.bootstrap(&def, host).unwrap();
    let view = cmp.component_view();
    let vcr = rt.view_container_ref(view, 0).unwrap();
    let template = rt.template_ref(view, 0).unwrap();

    let overlay = ModuleInjector::new(
        "overlay",
        vec![Provider::value(service, Rc::new("from-overlay".to_string()) as Instance)],
        None,
    );
    let with_overlay = EmbeddedViewOptions {
        injector: Some(InjectorRef::module(overlay)),
        ..Default::default()
    };
    vcr.create_embedded_view(&mut rt, template, None, with_overlay).unwrap();
    vcr.create_embedded_view(&mut rt, template, None, EmbeddedViewOptions::default())
        .unwrap();

    assert_eq!(*seen.borrow(), [Some("from-overlay".to_string()), None]);
}

#[test]
fn move_reorders_views_and_dom() {
    let mut list = List::new();
    list.create("a", None);
    list.create("b", None);
    let c = list.create("c", None);

    list.vcr.move_view(&mut list.rt, c, 0).unwrap();
    assert_eq!(list.vcr.index_of(&list.rt, c).unwrap(), Some(0));
    assert_eq!(list.len(), 3);
    insta::assert_snapshot!(list.html(), @"cab<!--container-->");
}

#[test]
fn clear_destroys_every_view() {
    let mut list = List::new();
    let views = [list.create("a", None), list.create("b", None)];
    let destroyed = Rc::new(Cell::new(0));
    for view in views {
        let destroyed = destroyed.clone();
        view.on_destroy(&mut list.rt, move |_| destroyed.set(destroyed.get() + 1))
            .unwrap();
    }

    list.vcr.clear(&mut list.rt).unwrap();

    assert!(list.vcr.is_empty(&list.rt).unwrap());
    assert_eq!(destroyed.get(), 2);
    assert!(views.iter().all(|v| v.destroyed(&list.rt)));
    insta::assert_snapshot!(list.html(), @"<!--container-->");
}

#[test]
fn raw_length_tracks_views_after_header() {
    let mut list = List::new();
    let loc = list.vcr.location();
    assert_eq!(list.rt.container_raw_len(loc).unwrap(), CONTAINER_HEADER_OFFSET);

    list.create("a", None);
    list.create("b", None);
    list.create("c", None);
    list.vcr.remove(&mut list.rt, Some(0)).unwrap();
    list.vcr.detach(&mut list.rt, None).unwrap();

    assert_eq!(list.rt.container_raw_len(loc).unwrap(), CONTAINER_HEADER_OFFSET + 1);
    assert_eq!(list.rt.container(loc).unwrap().raw_len(), CONTAINER_HEADER_OFFSET + 1);
}

#[test]
fn destroyed_view_cannot_be_inserted() {
    let mut list = List::new();
    let a = list.create("a", None);
    a.destroy(&mut list.rt).unwrap();

    assert!(list.vcr.is_empty(&list.rt).unwrap());
    let err = list.vcr.insert(&mut list.rt, a, None).unwrap_err();
    assert!(matches!(err, RuntimeError::DestroyedView));
    let err = list.vcr.move_view(&mut list.rt, a, 0).unwrap_err();
    assert!(matches!(err, RuntimeError::DestroyedView));
}

#[test]
fn index_past_the_end_is_rejected() {
    let mut list = List::new();
    list.create("a", None);
    let context = Rc::new(Item("b")) as Instance;
    let options = EmbeddedViewOptions {
        index: Some(5),
        ..Default::default()
    };
    let err = list
        .vcr
        .create_embedded_view(&mut list.rt, list.template, Some(context), options)
        .err()
        .unwrap();
    insta::assert_snapshot!(err.to_string(), @"index 5 is out of range for a view container of length 1");
}

#[test]
fn component_created_in_container() {
    let child = component("ChildCmp", "child-cmp", 1, 1, |rt, rf| {
        if rf.contains(RenderFlags::CREATE) {
            rt.text(0, "")?;
        }
        if rf.contains(RenderFlags::UPDATE) {
            let state = rt.context::<State>()?;
            rt.select(0)?;
            rt.text_interpolate(state.count.get())?;
        }
        Ok(())
    });
    let mut list = List::new();
    list.create("a", None);
    let created = list
        .vcr
        .create_component(&mut list.rt, &child, Default::default())
        .unwrap();
    created.instance_as::<State>().unwrap().count.set(7);

    assert_eq!(list.len(), 2);
    assert_eq!(list.vcr.index_of(&list.rt, created.host_view()).unwrap(), Some(1));
    insta::assert_snapshot!(list.html(), @"a<child-cmp>7</child-cmp><!--container-->");

    list.vcr.remove(&mut list.rt, Some(1)).unwrap();
    assert!(created.host_view().destroyed(&list.rt));
    insta::assert_snapshot!(list.html(), @"a<!--container-->");
}

#[test]
fn container_on_plain_element_gets_its_own_anchor() {
    let def = component("Plain", "plain-cmp", 1, 0, |rt, rf| {
        if rf.contains(RenderFlags::CREATE) {
            rt.element(0, "span", &[])?;
        }
        Ok(())
    });
    let (dom, mut rt) = setup();
    let host = mount(&dom, "plain-cmp");
    let cmp = rt.bootstrap(&def, host).unwrap();
    let vcr = rt.view_container_ref(cmp.component_view(), 0).unwrap();
    let again = rt.view_container_ref(cmp.component_view(), 0).unwrap();

    assert_eq!(vcr, again);
    assert!(vcr.anchor(&rt).unwrap().is_some());
    insta::assert_snapshot!(dom.inner_html(host), @"<span></span><!--container-->");
}
