//! Human-readable tape dumps for debugging and snapshot tests.

use crate::create::CreateTape;
use crate::icu::{TI18n, TIcu};
use crate::mutate::{MutateOp, MutateTape};
use crate::remove::{RemoveOp, RemoveTape};
use crate::update::{UpdateOp, UpdateTape};

/// Dump a compiled i18n block.
pub fn dump_i18n(i18n: &TI18n) -> String {
    let mut out = String::new();
    out.push_str("[create]\n");
    write_create(&mut out, &i18n.create);
    out.push_str("[update]\n");
    write_update(&mut out, &i18n.update, "");
    out
}

/// Dump an ICU case table, one block per case.
pub fn dump_icu(icu: &TIcu) -> String {
    let mut out = format!(
        "[icu @{} {} case=@{}]\n",
        icu.anchor_index,
        icu.kind.as_str(),
        icu.current_case_index
    );
    for (i, label) in icu.cases.iter().enumerate() {
        out.push_str(&format!("case {label:?}\n"));
        out.push_str("  create\n");
        write_mutate(&mut out, &icu.create[i], "    ");
        out.push_str("  update\n");
        write_update(&mut out, &icu.update[i], "    ");
        out.push_str("  remove");
        write_remove(&mut out, &icu.remove[i]);
        out.push('\n');
    }
    out
}

pub fn dump_create(tape: &CreateTape) -> String {
    let mut out = String::new();
    write_create(&mut out, tape);
    out
}

pub fn dump_mutate(tape: &MutateTape) -> String {
    let mut out = String::new();
    write_mutate(&mut out, tape, "");
    out
}

pub fn dump_update(tape: &UpdateTape) -> String {
    let mut out = String::new();
    write_update(&mut out, tape, "");
    out
}

/// Remove entries on one line: `@n` for a node, `~@n` for a nested ICU.
pub fn dump_remove(tape: &RemoveTape) -> String {
    let mut out = String::new();
    write_remove(&mut out, tape);
    out.trim_start().to_string()
}

fn write_create(out: &mut String, tape: &CreateTape) {
    for op in tape.ops() {
        let kind = if op.is_comment { "comment" } else { "text" };
        let eager = if op.append_eagerly { " eager" } else { "" };
        out.push_str(&format!("@{} {kind} {:?}{eager}\n", op.index, op.text));
    }
}

fn write_mutate(out: &mut String, tape: &MutateTape, indent: &str) {
    for op in tape.ops() {
        let line = match op {
            MutateOp::CreateText { index, text } => format!("text @{index} {text:?}"),
            MutateOp::CreateComment { index, text } => format!("comment @{index} {text:?}"),
            MutateOp::CreateElement { index, tag } => format!("element @{index} <{tag}>"),
            MutateOp::AppendChild { parent, child } => format!("append @{child} -> @{parent}"),
            MutateOp::Attr { index, name, value } => format!("attr @{index} {name}={value:?}"),
        };
        out.push_str(&format!("{indent}{line}\n"));
    }
}

fn write_update(out: &mut String, tape: &UpdateTape, indent: &str) {
    for group in tape.groups() {
        out.push_str(&format!("{indent}{:#010b}", group.mask));
        for op in &group.ops {
            let piece = match op {
                UpdateOp::Literal(s) => format!("{s:?}"),
                UpdateOp::Binding(k) => format!("${k}"),
                UpdateOp::Text { index } => format!("-> text @{index}"),
                UpdateOp::Attr {
                    index,
                    name,
                    sanitizer,
                } => match sanitizer {
                    Some(s) => format!("-> attr @{index} {name} |{}", s.name()),
                    None => format!("-> attr @{index} {name}"),
                },
                UpdateOp::IcuSwitch { index } => format!("-> icu.switch @{index}"),
                UpdateOp::IcuUpdate { index } => format!("-> icu.update @{index}"),
            };
            out.push(' ');
            out.push_str(&piece);
        }
        out.push('\n');
    }
}

fn write_remove(out: &mut String, tape: &RemoveTape) {
    for op in tape.ops() {
        match op {
            RemoveOp::Node(index) => out.push_str(&format!(" @{index}")),
            RemoveOp::NestedIcu(index) => out.push_str(&format!(" ~@{index}")),
        }
    }
}
