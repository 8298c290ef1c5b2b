use trellis_core::Sanitizer;

use crate::create::CreateOp;
use crate::dump::{dump_i18n, dump_mutate, dump_remove};
use crate::icu::TI18n;
use crate::mutate::{MutateOp, MutateTape};
use crate::remove::{RemoveOp, RemoveTape};
use crate::update::ValuePart;

#[test]
fn dump_i18n_block() {
    let mut i18n = TI18n::default();
    i18n.create.push(CreateOp::text(22, "Hello ", true));
    i18n.create.push(CreateOp::comment(23, "ICU 23", true));
    i18n.create.push(CreateOp::text(24, "", false));
    i18n.update.push_text(
        &[ValuePart::Literal("by ".into()), ValuePart::Binding(1)],
        24,
    );
    i18n.update.push_attr(&[ValuePart::Binding(2)], 20, "href", Some(Sanitizer::Url));
    i18n.update.push_icu(0, 23, 0b10);

    insta::assert_snapshot!(dump_i18n(&i18n), @r#"
    [create]
    @22 text "Hello " eager
    @23 comment "ICU 23" eager
    @24 text ""
    [update]
    0b00000010 "by " $1 -> text @24
    0b00000100 $2 -> attr @20 href |url
    0b00000001 $0 -> icu.switch @23
    0b00000010 -> icu.update @23
    "#);
}

#[test]
fn dump_single_tapes() {
    let mut remove = RemoveTape::new();
    remove.push(RemoveOp::Node(24));
    remove.push(RemoveOp::NestedIcu(25));
    remove.push(RemoveOp::Node(25));
    assert_eq!(dump_remove(&remove), "@24 ~@25 @25");

    let mut mutate = MutateTape::new();
    mutate
        .push(MutateOp::CreateText {
            index: 24,
            text: "a".into(),
        })
        .unwrap();
    mutate.push(MutateOp::AppendChild { parent: 22, child: 24 }).unwrap();
    insta::assert_snapshot!(dump_mutate(&mutate), @r#"
    text @24 "a"
    append @24 -> @22
    "#);
}
