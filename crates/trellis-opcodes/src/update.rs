//! Update tape: binding-driven writes replayed on every change detection pass.
//!
//! The tape is a run of groups `mask, skip, entries...`. A group runs only
//! when `mask & change_mask != 0`. `skip` is the number of raw entries in
//! the group body. Body entries:
//! - a string literal, appended to the group's running value
//! - `-1 - k`: binding `k`, appended to the running value
//! - `index << 2 | op`: an instruction consuming the running value
//!   - `Text` (0): write into the text node at `index`
//!   - `Attr` (1), then `name`, then sanitizer name or `null`
//!   - `IcuSwitch` (2): select the ICU case at `index`
//!   - `IcuUpdate` (3): refresh the active case of the ICU at `index`
//!
//! An `IcuSwitch` group is always followed by a group that starts with the
//! `IcuUpdate` for the same ICU.

use trellis_core::Sanitizer;

use crate::code::{RawCode, RawReader, TapeError};

pub const SHIFT_REF: u32 = 2;
pub const MASK_OPCODE: u32 = 0b11;

pub const TEXT: u32 = 0b00;
pub const ATTR: u32 = 0b01;
pub const ICU_SWITCH: u32 = 0b10;
pub const ICU_UPDATE: u32 = 0b11;

/// Change-mask bit for binding `k`. Bindings past 31 share bit 31.
#[inline]
pub fn to_mask_bit(binding: usize) -> u32 {
    1 << binding.min(31)
}

/// Literal or binding piece of an interpolated value.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ValuePart {
    Literal(String),
    Binding(usize),
}

impl ValuePart {
    pub fn mask(parts: &[ValuePart]) -> u32 {
        parts.iter().fold(0, |mask, part| match part {
            ValuePart::Binding(k) => mask | to_mask_bit(*k),
            ValuePart::Literal(_) => mask,
        })
    }

    pub fn has_binding(parts: &[ValuePart]) -> bool {
        parts.iter().any(|p| matches!(p, ValuePart::Binding(_)))
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum UpdateOp {
    Literal(String),
    Binding(usize),
    Text { index: usize },
    Attr {
        index: usize,
        name: String,
        sanitizer: Option<Sanitizer>,
    },
    IcuSwitch { index: usize },
    IcuUpdate { index: usize },
}

impl UpdateOp {
    fn raw_len(&self) -> usize {
        match self {
            Self::Attr { .. } => 3,
            _ => 1,
        }
    }

    fn from_part(part: &ValuePart) -> Self {
        match part {
            ValuePart::Literal(s) => Self::Literal(s.clone()),
            ValuePart::Binding(k) => Self::Binding(*k),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct UpdateGroup {
    pub mask: u32,
    pub ops: Vec<UpdateOp>,
}

impl UpdateGroup {
    /// Raw entries in the group body.
    pub fn skip(&self) -> usize {
        self.ops.iter().map(UpdateOp::raw_len).sum()
    }

    fn icu_switch(&self) -> Option<usize> {
        self.ops.iter().find_map(|op| match op {
            UpdateOp::IcuSwitch { index } => Some(*index),
            _ => None,
        })
    }

    /// The ICU this group refreshes, when it opens with an `IcuUpdate`.
    pub fn leading_icu_update(&self) -> Option<usize> {
        match self.ops.first() {
            Some(UpdateOp::IcuUpdate { index }) => Some(*index),
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct UpdateTape {
    groups: Vec<UpdateGroup>,
}

impl UpdateTape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tape from groups, checking the `IcuSwitch`/`IcuUpdate` pairing.
    pub fn from_groups(groups: Vec<UpdateGroup>) -> Result<Self, TapeError> {
        let tape = Self { groups };
        tape.validate()?;
        Ok(tape)
    }

    pub fn groups(&self) -> &[UpdateGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Union of every group mask.
    pub fn mask(&self) -> u32 {
        self.groups.iter().fold(0, |m, g| m | g.mask)
    }

    /// Interpolate `parts` into the text node at `index`.
    pub fn push_text(&mut self, parts: &[ValuePart], index: usize) {
        let mut ops: Vec<UpdateOp> = parts.iter().map(UpdateOp::from_part).collect();
        ops.push(UpdateOp::Text { index });
        self.groups.push(UpdateGroup {
            mask: ValuePart::mask(parts),
            ops,
        });
    }

    /// Interpolate `parts` into attribute `name` of the element at `index`.
    pub fn push_attr(&mut self, parts: &[ValuePart], index: usize, name: &str, sanitizer: Option<Sanitizer>) {
        let mut ops: Vec<UpdateOp> = parts.iter().map(UpdateOp::from_part).collect();
        ops.push(UpdateOp::Attr {
            index,
            name: name.to_string(),
            sanitizer,
        });
        self.groups.push(UpdateGroup {
            mask: ValuePart::mask(parts),
            ops,
        });
    }

    /// Emit the switch/update pair for the ICU anchored at `index`.
    ///
    /// `case_mask` covers every binding read by any case.
    pub fn push_icu(&mut self, main_binding: usize, index: usize, case_mask: u32) {
        self.groups.push(UpdateGroup {
            mask: to_mask_bit(main_binding),
            ops: vec![UpdateOp::Binding(main_binding), UpdateOp::IcuSwitch { index }],
        });
        self.groups.push(UpdateGroup {
            mask: case_mask,
            ops: vec![UpdateOp::IcuUpdate { index }],
        });
    }

    fn validate(&self) -> Result<(), TapeError> {
        for (i, group) in self.groups.iter().enumerate() {
            if let Some(index) = group.icu_switch() {
                let paired = self
                    .groups
                    .get(i + 1)
                    .and_then(UpdateGroup::leading_icu_update)
                    == Some(index);
                if !paired {
                    return Err(TapeError::UnpairedIcuSwitch { index });
                }
            }
        }
        Ok(())
    }

    pub fn from_raw(codes: &[RawCode]) -> Result<Self, TapeError> {
        let mut reader = RawReader::new(codes);
        let mut groups = Vec::new();
        while !reader.is_done() {
            let mask_at = reader.pos();
            let mask = reader.num()?;
            let mask = u32::try_from(mask)
                .or_else(|_| i32::try_from(mask).map(|m| m as u32))
                .map_err(|_| TapeError::Unexpected {
                    at: mask_at,
                    found: format!("mask {mask}"),
                })?;
            let skip = reader.index()?;
            let end = reader.pos() + skip;
            let mut ops = Vec::new();
            while reader.pos() < end {
                let at = reader.pos();
                let op = match reader.next()? {
                    RawCode::Str(s) => UpdateOp::Literal(s.clone()),
                    RawCode::Num(n) if *n < 0 => UpdateOp::Binding((-1 - *n) as usize),
                    RawCode::Num(n) => {
                        let code = u32::try_from(*n).map_err(|_| TapeError::UnknownOpcode { at, code: *n })?;
                        let index = (code >> SHIFT_REF) as usize;
                        match code & MASK_OPCODE {
                            TEXT => UpdateOp::Text { index },
                            ATTR => {
                                let name = reader.string()?.to_string();
                                let sanitizer = match reader.next()? {
                                    RawCode::Null => None,
                                    RawCode::Str(s) => Some(
                                        Sanitizer::from_name(s)
                                            .ok_or_else(|| TapeError::UnknownSanitizer(s.clone()))?,
                                    ),
                                    other => {
                                        return Err(TapeError::Unexpected {
                                            at: reader.pos() - 1,
                                            found: other.describe(),
                                        });
                                    }
                                };
                                UpdateOp::Attr {
                                    index,
                                    name,
                                    sanitizer,
                                }
                            }
                            ICU_SWITCH => UpdateOp::IcuSwitch { index },
                            _ => UpdateOp::IcuUpdate { index },
                        }
                    }
                    other => {
                        return Err(TapeError::Unexpected {
                            at,
                            found: other.describe(),
                        });
                    }
                };
                ops.push(op);
            }
            if reader.pos() != end {
                return Err(TapeError::Truncated { at: end });
            }
            groups.push(UpdateGroup { mask, ops });
        }
        Self::from_groups(groups)
    }

    pub fn to_raw(&self) -> Vec<RawCode> {
        let mut out = Vec::new();
        for group in &self.groups {
            out.push(RawCode::Num(group.mask as i64));
            out.push(RawCode::Num(group.skip() as i64));
            for op in &group.ops {
                match op {
                    UpdateOp::Literal(s) => out.push(RawCode::Str(s.clone())),
                    UpdateOp::Binding(k) => out.push(RawCode::Num(-1 - *k as i64)),
                    UpdateOp::Text { index } => out.push(instruction(*index, TEXT)),
                    UpdateOp::Attr {
                        index,
                        name,
                        sanitizer,
                    } => {
                        out.push(instruction(*index, ATTR));
                        out.push(RawCode::Str(name.clone()));
                        out.push(match sanitizer {
                            Some(s) => RawCode::Str(s.name().to_string()),
                            None => RawCode::Null,
                        });
                    }
                    UpdateOp::IcuSwitch { index } => out.push(instruction(*index, ICU_SWITCH)),
                    UpdateOp::IcuUpdate { index } => out.push(instruction(*index, ICU_UPDATE)),
                }
            }
        }
        out
    }
}

fn instruction(index: usize, op: u32) -> RawCode {
    RawCode::Num(((index as u32) << SHIFT_REF | op) as i64)
}
