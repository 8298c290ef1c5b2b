//! ICU case table compilation.
//!
//! Turns a parsed ICU expression into a `TIcu`: one mutate, update and
//! remove tape per case. Slot allocation is delegated to the caller, which
//! owns the template data the new slots live in.

use trellis_core::Sanitizer;
use trellis_core::sanitize::{is_uri_attribute, is_valid_attribute, is_valid_element, sanitize_url};

use crate::code::TapeError;
use crate::icu::TIcu;
use crate::message::{IcuAttr, IcuExpression, IcuNode};
use crate::mutate::{MutateOp, MutateTape};
use crate::remove::{RemoveOp, RemoveTape};
use crate::update::{UpdateTape, ValuePart, to_mask_bit};

/// Template-side storage the compiler reserves slots in.
pub trait SlotAllocator {
    /// Reserve one expando slot and return its index.
    fn alloc_slot(&mut self) -> usize;

    /// Store the case table of a nested ICU anchored at `anchor_index`.
    fn register_icu(&mut self, anchor_index: usize, icu: TIcu);
}

/// Compile `expr` anchored at `anchor_index`.
///
/// The switch/update pair for the ICU is appended to `update`. Returns the
/// case table and the mask of every binding the ICU reads, its main binding
/// included.
pub fn compile_icu(
    expr: &IcuExpression,
    anchor_index: usize,
    alloc: &mut dyn SlotAllocator,
    update: &mut UpdateTape,
) -> Result<(TIcu, u32), TapeError> {
    let case_slot = alloc.alloc_slot();
    let mut icu = TIcu::new(expr.kind, anchor_index, case_slot);
    let mut case_mask = 0;
    for case in &expr.cases {
        let mut tapes = CaseTapes::default();
        case_mask |= tapes.walk(&case.content, anchor_index, 0, alloc)?;
        icu.push_case(&case.label, tapes.create, tapes.update, tapes.remove);
    }
    update.push_icu(expr.main_binding, anchor_index, case_mask);
    Ok((icu, case_mask | to_mask_bit(expr.main_binding)))
}

#[derive(Default)]
struct CaseTapes {
    create: MutateTape,
    update: UpdateTape,
    remove: RemoveTape,
}

impl CaseTapes {
    fn walk(
        &mut self,
        nodes: &[IcuNode],
        parent: usize,
        depth: usize,
        alloc: &mut dyn SlotAllocator,
    ) -> Result<u32, TapeError> {
        let mut mask = 0;
        for node in nodes {
            mask |= match node {
                IcuNode::Text(parts) => self.text(parts, parent, depth, alloc)?,
                IcuNode::Element {
                    tag,
                    attrs,
                    children,
                } => self.element(tag, attrs, children, parent, depth, alloc)?,
                IcuNode::Icu(nested) => self.nested_icu(nested, parent, depth, alloc)?,
            };
        }
        Ok(mask)
    }

    fn text(
        &mut self,
        parts: &[ValuePart],
        parent: usize,
        depth: usize,
        alloc: &mut dyn SlotAllocator,
    ) -> Result<u32, TapeError> {
        let index = alloc.alloc_slot();
        let bound = ValuePart::has_binding(parts);
        let text = if bound { String::new() } else { literal(parts) };
        self.create.push(MutateOp::CreateText { index, text })?;
        self.append(parent, index, depth)?;
        if !bound {
            return Ok(0);
        }
        self.update.push_text(parts, index);
        Ok(ValuePart::mask(parts))
    }

    fn element(
        &mut self,
        tag: &str,
        attrs: &[IcuAttr],
        children: &[IcuNode],
        parent: usize,
        depth: usize,
        alloc: &mut dyn SlotAllocator,
    ) -> Result<u32, TapeError> {
        if !is_valid_element(tag) {
            tracing::warn!(tag, "dropping disallowed element from translated content");
            return Ok(0);
        }
        let index = alloc.alloc_slot();
        self.create.push(MutateOp::CreateElement {
            index,
            tag: tag.to_string(),
        })?;
        self.append(parent, index, depth)?;

        let mut mask = 0;
        for attr in attrs {
            if !is_valid_attribute(&attr.name) {
                tracing::warn!(tag, attr = attr.name.as_str(), "dropping disallowed attribute from translated content");
                continue;
            }
            let uri = is_uri_attribute(&attr.name);
            if ValuePart::has_binding(&attr.value) {
                let sanitizer = uri.then_some(Sanitizer::Url);
                self.update.push_attr(&attr.value, index, &attr.name, sanitizer);
                mask |= ValuePart::mask(&attr.value);
            } else {
                let value = literal(&attr.value);
                let value = if uri { sanitize_url(&value) } else { value };
                self.create.push(MutateOp::Attr {
                    index,
                    name: attr.name.clone(),
                    value,
                })?;
            }
        }

        mask |= self.walk(children, index, depth + 1, alloc)?;
        Ok(mask)
    }

    fn nested_icu(
        &mut self,
        expr: &IcuExpression,
        parent: usize,
        depth: usize,
        alloc: &mut dyn SlotAllocator,
    ) -> Result<u32, TapeError> {
        let index = alloc.alloc_slot();
        self.create.push(MutateOp::CreateComment {
            index,
            text: format!("nested ICU {index}"),
        })?;
        self.create.push(MutateOp::AppendChild { parent, child: index })?;
        if depth == 0 {
            self.remove.push(RemoveOp::NestedIcu(index));
            self.remove.push(RemoveOp::Node(index));
        }
        let (icu, mask) = compile_icu(expr, index, alloc, &mut self.update)?;
        alloc.register_icu(index, icu);
        Ok(mask)
    }

    /// Append `child` under `parent`. Only top-level case nodes need removing;
    /// their descendants go with them.
    fn append(&mut self, parent: usize, child: usize, depth: usize) -> Result<(), TapeError> {
        self.create.push(MutateOp::AppendChild { parent, child })?;
        if depth == 0 {
            self.remove.push(RemoveOp::Node(child));
        }
        Ok(())
    }
}

fn literal(parts: &[ValuePart]) -> String {
    parts
        .iter()
        .filter_map(|p| match p {
            ValuePart::Literal(s) => Some(s.as_str()),
            ValuePart::Binding(_) => None,
        })
        .collect()
}
