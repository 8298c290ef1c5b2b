use trellis_core::Sanitizer;

use crate::compile::{SlotAllocator, compile_icu};
use crate::dump::dump_icu;
use crate::icu::TIcu;
use crate::message::parse_icu;
use crate::mutate::MutateOp;
use crate::remove::RemoveOp;
use crate::update::{UpdateOp, UpdateTape};

struct Slots {
    next: usize,
    nested: Vec<(usize, TIcu)>,
}

impl Slots {
    fn starting_at(next: usize) -> Self {
        Self {
            next,
            nested: Vec::new(),
        }
    }
}

impl SlotAllocator for Slots {
    fn alloc_slot(&mut self) -> usize {
        self.next += 1;
        self.next - 1
    }

    fn register_icu(&mut self, anchor_index: usize, icu: TIcu) {
        self.nested.push((anchor_index, icu));
    }
}

fn compile(source: &str, anchor: usize) -> (TIcu, u32, UpdateTape, Slots) {
    let expr = parse_icu(source).unwrap();
    let mut slots = Slots::starting_at(anchor + 1);
    let mut update = UpdateTape::new();
    let (icu, mask) = compile_icu(&expr, anchor, &mut slots, &mut update).unwrap();
    (icu, mask, update, slots)
}

#[test]
fn plural_case_tables() {
    let (icu, mask, update, slots) = compile("{�0�, plural, =1 {one <b>item</b>} other {�0� items}}", 22);

    assert_eq!(mask, 0b1);
    assert_eq!(slots.next, 28);
    assert_eq!(icu.case_position("1"), Some(0));
    insta::assert_snapshot!(dump_icu(&icu), @r#"
    [icu @22 plural case=@23]
    case "1"
      create
        text @24 "one "
        append @24 -> @22
        element @25 <b>
        append @25 -> @22
        text @26 "item"
        append @26 -> @25
      update
      remove @24 @25
    case "other"
      create
        text @27 ""
        append @27 -> @22
      update
        0b00000001 $0 " items" -> text @27
      remove @27
    "#);

    let groups = update.groups();
    assert_eq!(groups.len(), 2);
    assert_eq!(
        groups[0].ops,
        vec![UpdateOp::Binding(0), UpdateOp::IcuSwitch { index: 22 }]
    );
    assert_eq!(groups[1].mask, 0b1);
    assert_eq!(groups[1].leading_icu_update(), Some(22));
}

#[test]
fn nested_icu_gets_its_own_table() {
    let (icu, mask, _, slots) = compile(
        "{�1�, select, a {x{�0�, plural, one {<i>1</i>} other {n}}} other {}}",
        22,
    );

    assert_eq!(mask, 0b11);
    insta::assert_snapshot!(dump_icu(&icu), @r#"
    [icu @22 select case=@23]
    case "a"
      create
        text @24 "x"
        append @24 -> @22
        comment @25 "nested ICU 25"
        append @25 -> @22
      update
        0b00000001 $0 -> icu.switch @25
        0b00000000 -> icu.update @25
      remove @24 ~@25 @25
    case "other"
      create
      update
      remove
    "#);

    let [(anchor, nested)] = slots.nested.as_slice() else {
        panic!("expected one nested icu");
    };
    assert_eq!(*anchor, 25);
    assert_eq!(nested.current_case_index, 26);
    assert_eq!(nested.cases, vec!["one".to_string(), "other".to_string()]);
    assert_eq!(nested.remove[0].ops(), &[RemoveOp::Node(27)]);
    assert_eq!(nested.remove[1].ops(), &[RemoveOp::Node(29)]);
}

#[test]
fn disallowed_content_is_dropped() {
    let (icu, _, _, slots) = compile(
        r#"{�0�, select, other {<script>x</script><b onclick="y" class="c">z</b>}}"#,
        10,
    );

    assert_eq!(slots.next, 14);
    assert_eq!(
        icu.create[0].ops(),
        &[
            MutateOp::CreateElement {
                index: 12,
                tag: "b".into()
            },
            MutateOp::AppendChild {
                parent: 10,
                child: 12
            },
            MutateOp::Attr {
                index: 12,
                name: "class".into(),
                value: "c".into()
            },
            MutateOp::CreateText {
                index: 13,
                text: "z".into()
            },
            MutateOp::AppendChild {
                parent: 12,
                child: 13
            },
        ]
    );
    assert_eq!(icu.remove[0].ops(), &[RemoveOp::Node(12)]);
}

#[test]
fn uri_attributes_are_sanitized() {
    let (icu, mask, _, _) = compile(
        r#"{�0�, select, other {<a href="javascript:alert(1)">a</a><img src="�1�">}}"#,
        10,
    );

    assert_eq!(mask, 0b11);
    assert!(icu.create[0].ops().contains(&MutateOp::Attr {
        index: 12,
        name: "href".into(),
        value: "unsafe:javascript:alert(1)".into()
    }));
    assert_eq!(
        icu.update[0].groups()[0].ops,
        vec![
            UpdateOp::Binding(1),
            UpdateOp::Attr {
                index: 14,
                name: "src".into(),
                sanitizer: Some(Sanitizer::Url)
            }
        ]
    );
}
