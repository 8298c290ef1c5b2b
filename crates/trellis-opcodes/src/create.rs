//! Create tape: nodes an i18n block creates up front.
//!
//! Each instruction is a `(code, text)` pair:
//! - Bits 31-2: target slot index
//! - Bit 1: create a comment instead of a text node
//! - Bit 0: append to the parent as soon as the node exists

use crate::code::{RawCode, RawReader, TapeError};

pub const SHIFT: u32 = 2;
pub const APPEND_EAGERLY: u32 = 0b01;
pub const COMMENT: u32 = 0b10;

/// Decoded create instruction.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CreateOp {
    pub index: usize,
    pub is_comment: bool,
    pub append_eagerly: bool,
    pub text: String,
}

impl CreateOp {
    pub fn text(index: usize, text: impl Into<String>, append_eagerly: bool) -> Self {
        Self {
            index,
            is_comment: false,
            append_eagerly,
            text: text.into(),
        }
    }

    pub fn comment(index: usize, text: impl Into<String>, append_eagerly: bool) -> Self {
        Self {
            index,
            is_comment: true,
            append_eagerly,
            text: text.into(),
        }
    }

    pub fn code(&self) -> u32 {
        let mut code = (self.index as u32) << SHIFT;
        if self.is_comment {
            code |= COMMENT;
        }
        if self.append_eagerly {
            code |= APPEND_EAGERLY;
        }
        code
    }

    pub fn from_code(code: u32, text: impl Into<String>) -> Self {
        Self {
            index: (code >> SHIFT) as usize,
            is_comment: code & COMMENT == COMMENT,
            append_eagerly: code & APPEND_EAGERLY == APPEND_EAGERLY,
            text: text.into(),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct CreateTape {
    ops: Vec<CreateOp>,
}

impl CreateTape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: CreateOp) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[CreateOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn from_raw(codes: &[RawCode]) -> Result<Self, TapeError> {
        let mut reader = RawReader::new(codes);
        let mut tape = Self::new();
        while !reader.is_done() {
            let at = reader.pos();
            let code = reader.num()?;
            let code = u32::try_from(code).map_err(|_| TapeError::UnknownOpcode { at, code })?;
            let text = reader.string()?;
            tape.push(CreateOp::from_code(code, text));
        }
        Ok(tape)
    }

    pub fn to_raw(&self) -> Vec<RawCode> {
        self.ops
            .iter()
            .flat_map(|op| [RawCode::Num(op.code() as i64), RawCode::Str(op.text.clone())])
            .collect()
    }
}
