//! Mutate tape: the DOM an ICU case builds when it becomes active.
//!
//! Entry layout:
//! - `"text", index`: create a text node at `index` unless one exists
//! - `{marker: icu}, "text", index`: create a comment (nested ICU anchor)
//! - `{marker: element}, "tag", index`: create an element
//! - `code` with bit 0 clear: append `ref` to `parent`
//!   (bits 31-17 parent slot, bits 16-1 ref slot)
//! - `code` with bit 0 set, then `name`, `value`: write an attribute on `ref`

use crate::code::{MarkerKind, RawCode, RawReader, TapeError};

pub const SHIFT_REF: u32 = 1;
pub const SHIFT_PARENT: u32 = 17;
pub const MASK_REF: u32 = 0b1_1111_1111_1111_1110;
pub const MASK_INSTRUCTION: u32 = 0b1;

pub const APPEND_CHILD: u32 = 0;
pub const ATTR: u32 = 1;

const MAX_REF: usize = (MASK_REF >> SHIFT_REF) as usize;
const MAX_PARENT: usize = (u32::MAX >> SHIFT_PARENT) as usize;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum MutateOp {
    CreateText { index: usize, text: String },
    CreateComment { index: usize, text: String },
    CreateElement { index: usize, tag: String },
    AppendChild { parent: usize, child: usize },
    Attr { index: usize, name: String, value: String },
}

fn check_ref(index: usize) -> Result<u32, TapeError> {
    if index > MAX_REF {
        return Err(TapeError::IndexOverflow { index });
    }
    Ok(index as u32)
}

fn check_parent(index: usize) -> Result<u32, TapeError> {
    if index > MAX_PARENT {
        return Err(TapeError::IndexOverflow { index });
    }
    Ok(index as u32)
}

/// Pack an append instruction.
pub fn append_code(parent: usize, child: usize) -> Result<u32, TapeError> {
    Ok(check_parent(parent)? << SHIFT_PARENT | check_ref(child)? << SHIFT_REF | APPEND_CHILD)
}

/// Pack an attribute instruction.
pub fn attr_code(index: usize) -> Result<u32, TapeError> {
    Ok(check_ref(index)? << SHIFT_REF | ATTR)
}

pub fn parent_of(code: u32) -> usize {
    (code >> SHIFT_PARENT) as usize
}

pub fn ref_of(code: u32) -> usize {
    ((code & MASK_REF) >> SHIFT_REF) as usize
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct MutateTape {
    ops: Vec<MutateOp>,
}

impl MutateTape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[MutateOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Append an instruction, rejecting slot indexes the packed form cannot carry.
    pub fn push(&mut self, op: MutateOp) -> Result<(), TapeError> {
        match &op {
            MutateOp::AppendChild { parent, child } => {
                append_code(*parent, *child)?;
            }
            MutateOp::Attr { index, .. } => {
                attr_code(*index)?;
            }
            MutateOp::CreateText { .. } | MutateOp::CreateComment { .. } | MutateOp::CreateElement { .. } => {}
        }
        self.ops.push(op);
        Ok(())
    }

    /// Slots this tape creates nodes in, in creation order.
    pub fn created_indexes(&self) -> impl Iterator<Item = usize> + '_ {
        self.ops.iter().filter_map(|op| match op {
            MutateOp::CreateText { index, .. }
            | MutateOp::CreateComment { index, .. }
            | MutateOp::CreateElement { index, .. } => Some(*index),
            MutateOp::AppendChild { .. } | MutateOp::Attr { .. } => None,
        })
    }

    pub fn from_raw(codes: &[RawCode]) -> Result<Self, TapeError> {
        let mut reader = RawReader::new(codes);
        let mut tape = Self::new();
        while !reader.is_done() {
            let at = reader.pos();
            let op = match reader.next()? {
                RawCode::Str(text) => MutateOp::CreateText {
                    text: text.clone(),
                    index: reader.index()?,
                },
                RawCode::Marker { marker } => {
                    let text = reader.string()?.to_string();
                    let index = reader.index()?;
                    match marker {
                        MarkerKind::Icu => MutateOp::CreateComment { index, text },
                        MarkerKind::Element => MutateOp::CreateElement { index, tag: text },
                    }
                }
                RawCode::Num(code) => {
                    let code = u32::try_from(*code).map_err(|_| TapeError::UnknownOpcode { at, code: *code })?;
                    match code & MASK_INSTRUCTION {
                        APPEND_CHILD => MutateOp::AppendChild {
                            parent: parent_of(code),
                            child: ref_of(code),
                        },
                        _ => MutateOp::Attr {
                            index: ref_of(code),
                            name: reader.string()?.to_string(),
                            value: reader.string()?.to_string(),
                        },
                    }
                }
                RawCode::Null => {
                    return Err(TapeError::Unexpected {
                        at,
                        found: "null".to_string(),
                    });
                }
            };
            tape.push(op)?;
        }
        Ok(tape)
    }

    pub fn to_raw(&self) -> Vec<RawCode> {
        let mut out = Vec::new();
        for op in &self.ops {
            match op {
                MutateOp::CreateText { index, text } => {
                    out.push(RawCode::Str(text.clone()));
                    out.push(RawCode::Num(*index as i64));
                }
                MutateOp::CreateComment { index, text } => {
                    out.push(RawCode::Marker { marker: MarkerKind::Icu });
                    out.push(RawCode::Str(text.clone()));
                    out.push(RawCode::Num(*index as i64));
                }
                MutateOp::CreateElement { index, tag } => {
                    out.push(RawCode::Marker {
                        marker: MarkerKind::Element,
                    });
                    out.push(RawCode::Str(tag.clone()));
                    out.push(RawCode::Num(*index as i64));
                }
                MutateOp::AppendChild { parent, child } => {
                    let code = (*parent as u32) << SHIFT_PARENT | (*child as u32) << SHIFT_REF;
                    out.push(RawCode::Num(code as i64));
                }
                MutateOp::Attr { index, name, value } => {
                    out.push(RawCode::Num(((*index as u32) << SHIFT_REF | ATTR) as i64));
                    out.push(RawCode::Str(name.clone()));
                    out.push(RawCode::Str(value.clone()));
                }
            }
        }
        out
    }
}
