use indoc::indoc;
use trellis_core::Sanitizer;

use crate::code::{RawCode, TapeError, parse_raw};
use crate::create::{CreateOp, CreateTape};
use crate::mutate::{MutateOp, MutateTape, append_code, attr_code, parent_of, ref_of};
use crate::remove::{RemoveOp, RemoveTape};
use crate::update::{UpdateOp, UpdateTape, ValuePart, to_mask_bit};

#[test]
fn create_tape_decodes_flags() {
    let raw = parse_raw(r#"[89, "Hello ", 95, "ICU 23", 96, ""]"#).unwrap();
    let tape = CreateTape::from_raw(&raw).unwrap();

    assert_eq!(
        tape.ops(),
        &[
            CreateOp::text(22, "Hello ", true),
            CreateOp::comment(23, "ICU 23", true),
            CreateOp::text(24, "", false),
        ]
    );
    assert_eq!(tape.to_raw(), raw);
}

#[test]
fn create_tape_rejects_truncated_pair() {
    let raw = parse_raw("[89]").unwrap();
    assert_eq!(CreateTape::from_raw(&raw), Err(TapeError::Truncated { at: 1 }));
}

#[test]
fn mutate_codes_pack_parent_and_ref() {
    let code = append_code(23, 25).unwrap();
    assert_eq!(code, 3014706);
    assert_eq!(parent_of(code), 23);
    assert_eq!(ref_of(code), 25);
    assert_eq!(attr_code(25).unwrap(), 51);
    assert_eq!(
        append_code(0, 70_000),
        Err(TapeError::IndexOverflow { index: 70_000 })
    );
}

#[test]
fn mutate_tape_decodes_markers_and_instructions() {
    let raw = parse_raw(indoc! {r#"
        [
            {"marker": "element"}, "b", 25, 3014706, 51, "title", "x",
            "one", 26, 3014708,
            {"marker": "icu"}, "nested ICU 27", 27
        ]
    "#})
    .unwrap();
    let tape = MutateTape::from_raw(&raw).unwrap();

    assert_eq!(
        tape.ops(),
        &[
            MutateOp::CreateElement {
                index: 25,
                tag: "b".into()
            },
            MutateOp::AppendChild {
                parent: 23,
                child: 25
            },
            MutateOp::Attr {
                index: 25,
                name: "title".into(),
                value: "x".into()
            },
            MutateOp::CreateText {
                index: 26,
                text: "one".into()
            },
            MutateOp::AppendChild {
                parent: 23,
                child: 26
            },
            MutateOp::CreateComment {
                index: 27,
                text: "nested ICU 27".into()
            },
        ]
    );
    assert_eq!(tape.created_indexes().collect::<Vec<_>>(), vec![25, 26, 27]);
    assert_eq!(tape.to_raw(), raw);
}

#[test]
fn mutate_tape_rejects_null_entry() {
    let raw = parse_raw("[null]").unwrap();
    assert_eq!(
        MutateTape::from_raw(&raw),
        Err(TapeError::Unexpected {
            at: 0,
            found: "null".into()
        })
    );
}

#[test]
fn update_tape_groups_bindings_and_instructions() {
    let raw = parse_raw(indoc! {r#"
        [
            1, 3, "Hi ", -1, 88,
            2, 2, -2, 94,
            4, 1, 95
        ]
    "#})
    .unwrap();
    let tape = UpdateTape::from_raw(&raw).unwrap();
    let groups = tape.groups();

    assert_eq!(groups.len(), 3);
    assert_eq!(groups[0].mask, 1);
    assert_eq!(
        groups[0].ops,
        vec![
            UpdateOp::Literal("Hi ".into()),
            UpdateOp::Binding(0),
            UpdateOp::Text { index: 22 },
        ]
    );
    assert_eq!(
        groups[1].ops,
        vec![UpdateOp::Binding(1), UpdateOp::IcuSwitch { index: 23 }]
    );
    assert_eq!(groups[2].leading_icu_update(), Some(23));
    assert_eq!(tape.mask(), 0b111);
    assert_eq!(tape.to_raw(), raw);
}

#[test]
fn update_tape_reads_attr_sanitizer() {
    let raw = parse_raw(r#"[1, 4, -1, 101, "href", "url", 1, 4, -1, 101, "title", null]"#).unwrap();
    let tape = UpdateTape::from_raw(&raw).unwrap();

    assert_eq!(
        tape.groups()[0].ops[1],
        UpdateOp::Attr {
            index: 25,
            name: "href".into(),
            sanitizer: Some(Sanitizer::Url)
        }
    );
    assert_eq!(
        tape.groups()[1].ops[1],
        UpdateOp::Attr {
            index: 25,
            name: "title".into(),
            sanitizer: None
        }
    );

    let raw = parse_raw(r#"[1, 4, -1, 101, "href", "html"]"#).unwrap();
    assert_eq!(
        UpdateTape::from_raw(&raw),
        Err(TapeError::UnknownSanitizer("html".into()))
    );
}

#[test]
fn update_tape_rejects_unpaired_switch() {
    let raw = parse_raw("[2, 2, -2, 94]").unwrap();
    assert_eq!(
        UpdateTape::from_raw(&raw),
        Err(TapeError::UnpairedIcuSwitch { index: 23 })
    );

    let raw = parse_raw("[2, 2, -2, 94, 4, 1, 99]").unwrap();
    assert_eq!(
        UpdateTape::from_raw(&raw),
        Err(TapeError::UnpairedIcuSwitch { index: 23 })
    );
}

#[test]
fn update_tape_rejects_short_group() {
    let raw = parse_raw(r#"[1, 5, "x", 88]"#).unwrap();
    assert_eq!(UpdateTape::from_raw(&raw), Err(TapeError::Truncated { at: 4 }));
}

#[test]
fn update_tape_accepts_full_mask() {
    let raw = parse_raw("[-1, 1, 88]").unwrap();
    let tape = UpdateTape::from_raw(&raw).unwrap();
    assert_eq!(tape.groups()[0].mask, u32::MAX);
}

#[test]
fn update_builders_emit_paired_icu_groups() {
    let mut tape = UpdateTape::new();
    tape.push_text(
        &[ValuePart::Literal("n=".into()), ValuePart::Binding(2)],
        30,
    );
    tape.push_icu(0, 23, 0);

    assert_eq!(tape.groups().len(), 3);
    assert_eq!(tape.groups()[0].mask, 0b100);
    assert_eq!(tape.groups()[1].mask, 0b1);
    assert_eq!(tape.groups()[2].mask, 0);
    assert_eq!(tape.groups()[2].leading_icu_update(), Some(23));
    assert!(UpdateTape::from_groups(tape.groups().to_vec()).is_ok());
}

#[test]
fn mask_bits_saturate() {
    assert_eq!(to_mask_bit(0), 1);
    assert_eq!(to_mask_bit(31), 1 << 31);
    assert_eq!(to_mask_bit(40), 1 << 31);
}

#[test]
fn remove_tape_decodes_sign() {
    let raw = parse_raw("[25, -27]").unwrap();
    let tape = RemoveTape::from_raw(&raw).unwrap();

    assert_eq!(tape.ops(), &[RemoveOp::Node(25), RemoveOp::NestedIcu(26)]);
    assert_eq!(tape.to_raw(), raw);
    assert_eq!(
        RemoveTape::from_raw(&[RawCode::Num(0)]),
        Err(TapeError::UnknownOpcode { at: 0, code: 0 })
    );
}
