//! Remove tape: what tearing down an ICU case detaches.
//!
//! A positive entry is the slot of a node to remove. A negative entry
//! `~index` removes the active case of the nested ICU anchored at `index`.

use crate::code::{RawCode, RawReader, TapeError};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RemoveOp {
    Node(usize),
    NestedIcu(usize),
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct RemoveTape {
    ops: Vec<RemoveOp>,
}

impl RemoveTape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: RemoveOp) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[RemoveOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn from_raw(codes: &[RawCode]) -> Result<Self, TapeError> {
        let mut reader = RawReader::new(codes);
        let mut tape = Self::new();
        while !reader.is_done() {
            let at = reader.pos();
            let n = reader.num()?;
            let op = match n {
                0 => return Err(TapeError::UnknownOpcode { at, code: n }),
                n if n > 0 => RemoveOp::Node(n as usize),
                n => RemoveOp::NestedIcu(!n as usize),
            };
            tape.push(op);
        }
        Ok(tape)
    }

    pub fn to_raw(&self) -> Vec<RawCode> {
        self.ops
            .iter()
            .map(|op| match op {
                RemoveOp::Node(index) => RawCode::Num(*index as i64),
                RemoveOp::NestedIcu(index) => RawCode::Num(!(*index as i64)),
            })
            .collect()
    }
}
